use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures while building or reading a series fingerprint.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// No curated seed set is registered for the series.
    #[error("no fingerprint seeds registered for series \"{0}\"")]
    UnknownSeries(String),

    #[error("seed stream {stream:?} has no record at offset {offset}")]
    MissingSeedRecord { stream: PathBuf, offset: usize },

    #[error("seed record {offset} in {stream:?} is a {kind} record, not a frame")]
    SeedNotFrame {
        stream: PathBuf,
        offset: usize,
        kind: &'static str,
    },

    #[error("seed record {offset} in {stream:?} contains no face")]
    MissingSeedFace { stream: PathBuf, offset: usize },

    #[error("embedding for \"{0}\" has zero or non-finite norm")]
    DegenerateEmbedding(String),

    #[error("fingerprint cache {path:?}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures while consuming a record stream for one episode.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A results table was requested before any video metadata record.
    #[error("stream ended without a video metadata record")]
    IncompleteStream,

    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame {frame}: histogram has {found} bins, expected {expected}")]
    HistogramLength {
        frame: u64,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
