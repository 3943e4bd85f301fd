use std::{
    path::Path,
    process::{Command, Stdio},
};

use eyre::{OptionExt, Result, WrapErr, eyre};
use serde::Deserialize;

use crate::tables::ChapterRow;

#[derive(Debug, Deserialize, PartialEq)]
pub struct ProbeChapters {
    #[serde(default)]
    pub chapters: Vec<ProbeChapter>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ProbeChapter {
    pub id: i64,
    pub start_time: String,
    pub end_time: String,
}

/// Converts `ffprobe -show_chapters` JSON into chapter rows, numbered from 0
/// in the order ffprobe lists them.
pub fn parse_chapters(video: &str, json: &str) -> Result<Vec<ChapterRow>> {
    let probe: ProbeChapters = serde_json::from_str(json)?;
    probe
        .chapters
        .iter()
        .enumerate()
        .map(|(chapter, c)| -> Result<ChapterRow> {
            let seconds = |value: &str| {
                value
                    .parse::<f64>()
                    .wrap_err_with(|| format!("Invalid time '{value}' in chapter {}", c.id))
            };
            Ok(ChapterRow {
                video: video.to_owned(),
                chapter,
                start: seconds(&c.start_time)?,
                end: seconds(&c.end_time)?,
            })
        })
        .collect()
}

/// Reads the chapter breaks of a video file with ffprobe.
pub fn probe_chapters(video_path: &Path) -> Result<Vec<ChapterRow>> {
    let video_str = video_path
        .to_str()
        .ok_or_eyre("Invalid UTF-8 in video path")?;
    let video = video_path
        .file_stem()
        .ok_or_eyre("No file name")?
        .to_str()
        .ok_or_eyre("Invalid UTF-8 in video path")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_chapters",
            video_str,
        ])
        .stdin(Stdio::null())
        .output()
        .wrap_err("Failed to run ffprobe")?;

    if !output.status.success() {
        return Err(eyre!(
            "ffprobe exited with {} for {}",
            output.status,
            video_path.display()
        ));
    }

    parse_chapters(video, &String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_output() {
        let json = r#"{
            "chapters": [
                {"id": 0, "time_base": "1/1000", "start": 0, "start_time": "0.000000",
                 "end": 95095, "end_time": "95.095000", "tags": {"title": "Chapter 1"}},
                {"id": 1, "time_base": "1/1000", "start": 95095, "start_time": "95.095000",
                 "end": 610210, "end_time": "610.210000"}
            ]
        }"#;
        let rows = parse_chapters("bw-s02-e02", json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].chapter, 1);
        assert_eq!(rows[1].start, 95.095);
        assert_eq!(rows[1].end, 610.21);
        assert_eq!(rows[0].video, "bw-s02-e02");
    }

    #[test]
    fn no_chapters_is_empty() {
        assert!(parse_chapters("x", "{}").unwrap().is_empty());
    }

    #[test]
    fn bad_time_is_an_error() {
        let json = r#"{"chapters":[{"id":3,"start_time":"N/A","end_time":"1.0"}]}"#;
        assert!(parse_chapters("x", json).is_err());
    }
}
