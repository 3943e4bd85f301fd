use std::{borrow::Cow, fs, path::Path, sync::LazyLock};

use eyre::{Result, WrapErr};
use itertools::Itertools;
use regex::Regex;
use tracing::warn;

use crate::tables::TitleRow;

/// Parses an SRT timestamp (`HH:MM:SS,mmm`) into seconds.
pub fn time_to_seconds(time: &str) -> Option<f64> {
    let (hours, minutes, rest) = time.trim().split(':').collect_tuple()?;
    let (seconds, millis) = rest.split_once([',', '.'])?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    let millis: u32 = millis.parse().ok()?;
    Some(
        f64::from(millis) / 1000.0
            + f64::from(seconds)
            + f64::from(minutes) * 60.0
            + f64::from(hours) * 3600.0,
    )
}

fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    // cue settings may follow the end time
    let end = end.split_whitespace().next()?;
    Some((time_to_seconds(start)?, time_to_seconds(end)?))
}

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Replaces every `<...>` markup tag with a space.
fn strip_tags(text: &str) -> Cow<'_, str> {
    TAGS.replace_all(text, " ")
}

/// Parses the cues of an SRT document into title rows for `video`.
pub fn parse_srt(video: &str, srt: &str) -> Vec<TitleRow> {
    let srt = srt.trim_start_matches('\u{feff}');
    let mut rows = Vec::new();

    for (is_blank, block) in &srt.lines().chunk_by(|line| line.trim().is_empty()) {
        if is_blank {
            continue;
        }
        let block: Vec<&str> = block.collect();
        let Some(timing) = block.get(1) else {
            warn!(video, cue = block[0], "subtitle cue without timing line");
            continue;
        };
        let Some((start, end)) = parse_timing(timing) else {
            warn!(video, timing, "skipping subtitle cue with malformed timing");
            continue;
        };

        let text = strip_tags(&block[2..].join(" "))
            .split_whitespace()
            .join(" ");
        rows.push(TitleRow {
            video: video.to_owned(),
            start,
            end,
            text,
        });
    }

    rows
}

/// Reads `<episode>.srt`; rows are labelled `<episode>.mp4`.
pub fn load_subtitles(episode: &str, path: &Path) -> Result<Vec<TitleRow>> {
    let srt = fs::read_to_string(path)
        .wrap_err_with(|| format!("Reading subtitles {}", path.display()))?;
    Ok(parse_srt(&format!("{episode}.mp4"), &srt))
}
