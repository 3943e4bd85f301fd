use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr};
use serde::Deserialize;

/// Process-wide settings, read once at start-up and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(rename = "basepath")]
    pub base_path: PathBuf,
}

impl Config {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Config {
            base_path: base_path.into(),
        }
    }

    /// Reads a `params.json` file of the form `{"basepath": "/data/dv"}`.
    pub fn load(path: &Path) -> Result<Config> {
        let json_data = fs::read_to_string(path)
            .wrap_err_with(|| format!("Reading parameter file {}", path.display()))?;
        let config: Config = serde_json::from_str(&json_data)
            .wrap_err_with(|| format!("Parsing parameter file {}", path.display()))?;
        Ok(config)
    }

    /// `--base-path` wins over the parameter file.
    pub fn resolve(base_path: Option<&Path>, params: &Path) -> Result<Config> {
        match base_path {
            Some(base) => Ok(Config::new(base)),
            None => Config::load(params),
        }
    }

    pub fn input_dir(&self, series: &str) -> PathBuf {
        self.base_path.join("input").join(series)
    }

    pub fn stage_root(&self) -> PathBuf {
        self.base_path.join("stage")
    }

    pub fn stage_dir(&self, series: &str) -> PathBuf {
        self.stage_root().join(series)
    }

    pub fn fingerprint_path(&self, series: &str) -> PathBuf {
        self.base_path
            .join("model")
            .join("fprint")
            .join(format!("{series}fingerprint.bin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params.json");
        fs::write(&params, r#"{"basepath": "/data/dv", "unused": 1}"#).unwrap();

        let config = Config::load(&params).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/data/dv"));
        assert_eq!(config.stage_dir("bw"), PathBuf::from("/data/dv/stage/bw"));
        assert_eq!(
            config.fingerprint_path("bw"),
            PathBuf::from("/data/dv/model/fprint/bwfingerprint.bin")
        );
    }

    #[test]
    fn base_path_flag_skips_params_file() {
        let config = Config::resolve(Some(Path::new("/tmp/dv")), Path::new("missing.json")).unwrap();
        assert_eq!(config.input_dir("idoj"), PathBuf::from("/tmp/dv/input/idoj"));
    }
}
