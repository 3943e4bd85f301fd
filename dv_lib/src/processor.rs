//! Shot segmentation and face labelling over one episode's record stream.
//!
//! Records arrive in frame order. For each frame the processor measures how
//! far the colour histogram moved since the previous frame (`hval`) and reads
//! the median pixel difference reported by the toolkit (`dval`). A frame
//! where both jump past their thresholds, far enough from the start of the
//! current shot, closes that shot.
//!
//! All rows of a frame, including a frame that closes a shot, carry the shot
//! id in force before the boundary; the next frame starts the new shot.

use ndarray::{Array1, ArrayView1};
use tracing::{debug, trace};

use crate::{
    error::StreamError,
    fingerprint::Fingerprint,
    math::{mean_abs_diff, median_decile},
    records::{FrameRecord, Record, VideoMeta},
    tables::{EpisodeTables, FaceRow, FrameRow, ObjectRow, ShotRow, VideoRow},
};

/// Video name attached to rows seen before the metadata record.
pub const UNKNOWN_VIDEO: &str = "unknown";
/// `dval` of a frame without a difference descriptor.
pub const NO_DIFFERENCE: f64 = 0.0;

/// Shot boundary thresholds. All three comparisons are strict.
///
/// The defaults were tuned by hand on sitcom DVD rips and are kept as-is for
/// output compatibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotThresholds {
    /// A cut needs a median frame difference strictly above this.
    pub dval_above: f64,
    /// A cut needs a histogram distance strictly above this.
    pub hval_above: f64,
    /// Frames that must separate the boundary frame from the shot start.
    pub shot_len_above: u64,
}

impl Default for ShotThresholds {
    fn default() -> Self {
        Self {
            dval_above: 12.0,
            hval_above: 4000.0,
            shot_len_above: 12,
        }
    }
}

impl ShotThresholds {
    pub fn is_boundary(&self, dval: f64, hval: f64, frames_since_start: u64) -> bool {
        dval > self.dval_above && hval > self.hval_above && frames_since_start > self.shot_len_above
    }
}

#[derive(Debug)]
pub struct EpisodeProcessor<'a> {
    fingerprint: &'a Fingerprint,
    thresholds: ShotThresholds,
    meta: Option<VideoMeta>,
    video: String,
    sid: u32,
    last_frame: u64,
    last_hist: Option<Array1<f64>>,
    frames: Vec<FrameRow>,
    shots: Vec<ShotRow>,
    faces: Vec<FaceRow>,
    objects: Vec<ObjectRow>,
}

impl<'a> EpisodeProcessor<'a> {
    pub fn new(fingerprint: &'a Fingerprint) -> Self {
        Self::with_thresholds(fingerprint, ShotThresholds::default())
    }

    pub fn with_thresholds(fingerprint: &'a Fingerprint, thresholds: ShotThresholds) -> Self {
        Self {
            fingerprint,
            thresholds,
            meta: None,
            video: UNKNOWN_VIDEO.to_owned(),
            sid: 0,
            last_frame: 0,
            last_hist: None,
            frames: Vec::new(),
            shots: Vec::new(),
            faces: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Current shot id.
    pub fn sid(&self) -> u32 {
        self.sid
    }

    pub fn ingest(&mut self, record: Record) -> Result<(), StreamError> {
        match record {
            Record::Video(meta) => {
                self.video = meta.video.clone();
                self.meta = Some(meta);
                Ok(())
            }
            Record::Frame(frame) => self.process_frame(frame),
            Record::Other => Ok(()),
        }
    }

    pub fn ingest_all<I>(&mut self, records: I) -> Result<(), StreamError>
    where
        I: IntoIterator<Item = Result<Record, StreamError>>,
    {
        for record in records {
            self.ingest(record?)?;
        }
        Ok(())
    }

    fn histogram_distance(&mut self, frame: u64, hist: &[f64]) -> Result<f64, StreamError> {
        let current = ArrayView1::from(hist);
        let hval = match &self.last_hist {
            Some(last) if last.len() != current.len() => {
                return Err(StreamError::HistogramLength {
                    frame,
                    expected: last.len(),
                    found: current.len(),
                });
            }
            Some(last) => mean_abs_diff(current, last.view()),
            // The lookback starts as an all-zero histogram.
            None => mean_abs_diff(current, Array1::zeros(current.len()).view()),
        };
        self.last_hist = Some(current.to_owned());
        Ok(hval)
    }

    fn process_frame(&mut self, record: FrameRecord) -> Result<(), StreamError> {
        let frame = record.frame;
        let hval = self.histogram_distance(frame, record.hist.values())?;
        let dval = record
            .diff
            .as_ref()
            .and_then(|diff| median_decile(&diff.decile))
            .unwrap_or(NO_DIFFERENCE);

        let sid = self.sid;
        self.frames.push(FrameRow {
            video: self.video.clone(),
            frame,
            sid,
            dval,
            hval,
        });

        if self
            .thresholds
            .is_boundary(dval, hval, frame.saturating_sub(self.last_frame))
        {
            self.shots.push(ShotRow {
                video: self.video.clone(),
                frame_start: self.last_frame,
                frame_stop: frame - 1,
                sid,
            });
            debug!("Finished scene number {sid:03}.");
            self.last_frame = frame;
            self.sid += 1;
        }

        for object in record.object.into_iter().flatten() {
            self.objects.push(ObjectRow {
                video: self.video.clone(),
                frame,
                sid,
                class: object.class,
                bbox: object.bbox,
                score: object.score,
            });
        }

        for face in record.face.into_iter().flatten() {
            let identity = self.fingerprint.lookup(&face.embed);
            trace!(frame, character = %identity.character, score = identity.score, "face");
            self.faces.push(FaceRow {
                video: self.video.clone(),
                frame,
                sid,
                character: identity.character,
                bbox: face.bbox,
                score: identity.score,
                overlap: face.overlap,
            });
        }

        Ok(())
    }

    /// Consumes the processor and returns the accumulated tables.
    pub fn finish(self) -> Result<EpisodeTables, StreamError> {
        let meta = self.meta.ok_or(StreamError::IncompleteStream)?;
        Ok(EpisodeTables {
            video: vec![VideoRow::from(meta)],
            frames: self.frames,
            shots: self.shots,
            faces: self.faces,
            objects: self.objects,
        })
    }
}
