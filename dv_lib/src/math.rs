use ndarray::{Array1, ArrayView1};

/// Index of the median in a decile list (0th, 10th, ..., 100th percentile).
pub const MEDIAN_DECILE: usize = 5;

/// Returns `v / ||v||`, or `None` when the norm is zero or not finite.
pub fn l2_normalize(v: ArrayView1<f32>) -> Option<Array1<f32>> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 && norm.is_finite() {
        Some(v.mapv(|x| x / norm))
    } else {
        None
    }
}

/// Mean absolute elementwise difference between two histograms.
pub fn mean_abs_diff(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    (&a - &b).mapv(f64::abs).mean().unwrap_or(0.0)
}

/// Median of a decile list, `None` if the list is too short.
pub fn median_decile(decile: &[f64]) -> Option<f64> {
    decile.get(MEDIAN_DECILE).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalize_has_unit_norm() {
        let v = array![3.0_f32, 4.0];
        let n = l2_normalize(v.view()).unwrap();
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
        assert!((n.dot(&n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_is_none() {
        let v = Array1::<f32>::zeros(4);
        assert!(l2_normalize(v.view()).is_none());
    }

    #[test]
    fn mean_abs_diff_against_zeros() {
        let a = array![2.0, -4.0, 6.0];
        let zeros = Array1::<f64>::zeros(3);
        assert_eq!(mean_abs_diff(a.view(), zeros.view()), 4.0);
    }

    #[test]
    fn median_decile_needs_six_entries() {
        assert_eq!(median_decile(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), Some(5.0));
        assert_eq!(median_decile(&[0.0, 1.0]), None);
    }
}
