//! Per-line records written by the annotation toolkit.
//!
//! Every line of a `-dvt.jsonl` file is one JSON object carrying a `type`
//! field. Only `video` and `frame` records drive the tables; other kinds are
//! kept as [`Record::Other`] so newer toolkit output still streams through.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Video(VideoMeta),
    Frame(FrameRecord),
    #[serde(other)]
    Other,
}

impl Record {
    /// The `type` tag this record was read from; unrecognised kinds are `"other"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Video(_) => "video",
            Record::Frame(_) => "frame",
            Record::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub video: String,
    pub fps: f64,
    pub frames: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub hist: Histogram,
    #[serde(default)]
    pub diff: Option<Difference>,
    #[serde(default)]
    pub face: Option<Vec<Face>>,
    #[serde(default)]
    pub object: Option<Vec<Object>>,
}

/// HSV colour histogram, either bare or under an `hsv` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Histogram {
    Bare(Vec<f64>),
    Channels { hsv: Vec<f64> },
}

impl Histogram {
    pub fn values(&self) -> &[f64] {
        match self {
            Histogram::Bare(values) => values,
            Histogram::Channels { hsv } => hsv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Difference {
    pub decile: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Face {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub embed: Vec<f32>,
    #[serde(rename = "hog_overlap", alias = "overlap")]
    pub overlap: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Object {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub class: String,
    pub score: f64,
}

/// Parses one record per non-blank line. Line numbers in errors are 1-based.
pub fn read_records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Record, StreamError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str(&line)
                    .map_err(|source| StreamError::Json { line: i + 1, source }),
            ),
            Err(e) => Some(Err(e.into())),
        })
}

pub fn open_jsonl(path: &Path) -> Result<impl Iterator<Item = Result<Record, StreamError>>, StreamError> {
    let file = File::open(path)?;
    Ok(read_records(BufReader::new(file)))
}

pub fn load_jsonl(path: &Path) -> Result<Vec<Record>, StreamError> {
    open_jsonl(path)?.collect()
}
