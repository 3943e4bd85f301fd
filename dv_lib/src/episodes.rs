use std::{fmt, fs, path::PathBuf, str::FromStr};

use eyre::{Result, WrapErr, eyre};
use itertools::Itertools;

use crate::config::Config;

/// Episode identifier of the form `<series>-sXX-eXX`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpisodeId {
    pub series: String,
    pub season: u32,
    pub episode: u32,
}

fn two_digits(s: &str, prefix: char) -> Option<u32> {
    let digits = s.strip_prefix(prefix)?;
    if digits.len() == 2 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

impl FromStr for EpisodeId {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let parse = || {
            let (series, season, episode) = s.split('-').collect_tuple()?;
            if series.is_empty() {
                return None;
            }
            Some(EpisodeId {
                series: series.to_owned(),
                season: two_digits(season, 's')?,
                episode: two_digits(episode, 'e')?,
            })
        };
        parse().ok_or_else(|| eyre!("'{s}' is not a <series>-sXX-eXX episode name"))
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-s{:02}-e{:02}", self.series, self.season, self.episode)
    }
}

/// Which episodes of a series to process. Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub series: String,
    pub seasons: Vec<u32>,
    pub episodes: Vec<u32>,
}

impl Selection {
    pub fn matches(&self, id: &EpisodeId) -> bool {
        id.series == self.series
            && (self.seasons.is_empty() || self.seasons.contains(&id.season))
            && (self.episodes.is_empty() || self.episodes.contains(&id.episode))
    }

    /// Keeps the stems that parse as episodes of the selection, sorted.
    /// Names that do not follow the pattern are dropped silently.
    pub fn filter<'s>(&self, stems: impl IntoIterator<Item = &'s str>) -> Vec<EpisodeId> {
        stems
            .into_iter()
            .filter_map(|stem| stem.parse::<EpisodeId>().ok())
            .filter(|id| self.matches(id))
            .sorted()
            .dedup()
            .collect()
    }
}

/// Lists `<base>/input/<series>/*.mp4` and returns the selected episodes.
pub fn find_episodes(config: &Config, selection: &Selection) -> Result<Vec<EpisodeId>> {
    let input_dir = config.input_dir(&selection.series);
    let entries = fs::read_dir(&input_dir).wrap_err_with(|| {
        format!(
            "No video inputs found for series '{}' in {}",
            selection.series,
            input_dir.display()
        )
    })?;

    let mut stems = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "mp4") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_owned());
            }
        }
    }

    Ok(selection.filter(stems.iter().map(String::as_str)))
}

/// Files read and written for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePaths {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    pub stage_dir: PathBuf,
    pub annotations: PathBuf,
}

impl EpisodePaths {
    pub fn new(config: &Config, id: &EpisodeId) -> Self {
        let input_dir = config.input_dir(&id.series);
        let stage_dir = config.stage_dir(&id.series);
        EpisodePaths {
            video: input_dir.join(format!("{id}.mp4")),
            subtitles: input_dir.join(format!("{id}.srt")),
            annotations: stage_dir.join(format!("{id}-dvt.jsonl")),
            stage_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_episode_names() {
        let id: EpisodeId = "bw-s02-e11".parse().unwrap();
        assert_eq!(id.series, "bw");
        assert_eq!(id.season, 2);
        assert_eq!(id.episode, 11);
        assert_eq!(id.to_string(), "bw-s02-e11");
    }

    #[test]
    fn rejects_loose_names() {
        for name in ["bw-s2-e11", "bw-s02-e011", "bw-s02", "bw-s02-e11-extra", "bw_s02_e11", "-s01-e01", "bw-sab-e01"] {
            assert!(name.parse::<EpisodeId>().is_err(), "{name}");
        }
    }

    #[test]
    fn selection_filters_and_sorts() {
        let stems = ["bw-s02-e03", "bw-s01-e01", "bw-s02-e01", "idoj-s02-e01", "bw-s02-e01-trailer", "notes"];
        let all = Selection {
            series: "bw".into(),
            ..Default::default()
        };
        let names: Vec<String> = all.filter(stems).iter().map(ToString::to_string).collect();
        assert_eq!(names, ["bw-s01-e01", "bw-s02-e01", "bw-s02-e03"]);

        let picked = Selection {
            series: "bw".into(),
            seasons: vec![2],
            episodes: vec![3, 4],
        };
        let names: Vec<String> = picked.filter(stems).iter().map(ToString::to_string).collect();
        assert_eq!(names, ["bw-s02-e03"]);
    }

    #[test]
    fn finds_mp4_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let input = config.input_dir("friends");
        fs::create_dir_all(&input).unwrap();
        for name in ["friends-s02-e03.mp4", "friends-s02-e01.mp4", "friends-s02-e01.srt", "cover.mp4"] {
            fs::write(input.join(name), b"").unwrap();
        }

        let selection = Selection {
            series: "friends".into(),
            ..Default::default()
        };
        let found = find_episodes(&config, &selection).unwrap();
        assert_eq!(
            found.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["friends-s02-e01", "friends-s02-e03"]
        );

        let paths = EpisodePaths::new(&config, &found[0]);
        assert!(paths.annotations.ends_with("stage/friends/friends-s02-e01-dvt.jsonl"));
        assert!(paths.subtitles.ends_with("input/friends/friends-s02-e01.srt"));
    }

    #[test]
    fn missing_series_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let selection = Selection {
            series: "bw".into(),
            ..Default::default()
        };
        assert!(find_episodes(&Config::new(dir.path()), &selection).is_err());
    }
}
