pub mod batch;
pub mod chapters;
pub mod config;
pub mod episodes;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod math;
pub mod processor;
pub mod records;
pub mod seeds;
pub mod subtitles;
pub mod tables;
