use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{error, info};

use crate::{
    chapters::probe_chapters,
    config::Config,
    episodes::{EpisodeId, EpisodePaths},
    fingerprint::Fingerprint,
    processor::{EpisodeProcessor, ShotThresholds},
    records::open_jsonl,
    subtitles::load_subtitles,
    tables::write_csv,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeOptions {
    pub thresholds: ShotThresholds,
    /// Also write `<episode>-chaps.csv` from the mp4 chapter list.
    pub chapter_breaks: bool,
    /// Also write `<episode>-title.csv` from the srt file.
    pub subtitles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub episode: EpisodeId,
    pub frames: usize,
    pub shots: usize,
    pub faces: usize,
    pub objects: usize,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<EpisodeSummary>,
    pub failed: Vec<(EpisodeId, eyre::Report)>,
}

/// Converts one episode's annotation stream into its CSV tables.
pub fn process_episode(
    config: &Config,
    id: &EpisodeId,
    fingerprint: &Fingerprint,
    options: &EpisodeOptions,
) -> Result<EpisodeSummary> {
    let paths = EpisodePaths::new(config, id);
    let episode = id.to_string();

    let records = open_jsonl(&paths.annotations)
        .wrap_err_with(|| format!("Opening {}", paths.annotations.display()))?;
    let mut processor = EpisodeProcessor::with_thresholds(fingerprint, options.thresholds);
    processor
        .ingest_all(records)
        .wrap_err_with(|| format!("Reading {}", paths.annotations.display()))?;
    let tables = processor
        .finish()
        .wrap_err_with(|| format!("Processing {episode}"))?;

    tables
        .write(&paths.stage_dir, &episode)
        .wrap_err_with(|| format!("Writing tables for {episode}"))?;

    if options.chapter_breaks {
        let chapters = probe_chapters(&paths.video)?;
        write_csv(&paths.stage_dir.join(format!("{episode}-chaps.csv")), &chapters)?;
    }

    if options.subtitles {
        let titles = load_subtitles(&episode, &paths.subtitles)?;
        write_csv(&paths.stage_dir.join(format!("{episode}-title.csv")), &titles)?;
    }

    Ok(EpisodeSummary {
        episode: id.clone(),
        frames: tables.frames.len(),
        shots: tables.shots.len(),
        faces: tables.faces.len(),
        objects: tables.objects.len(),
    })
}

/// Processes episodes in parallel against a shared fingerprint. A failing
/// episode is logged and reported without stopping the others.
pub fn process_episodes(
    config: &Config,
    episodes: &[EpisodeId],
    fingerprint: &Fingerprint,
    options: &EpisodeOptions,
) -> Result<BatchReport> {
    let pb = ProgressBar::new(episodes.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {prefix} {wide_bar} {pos}/{len} {msg}",
    )?);
    pb.set_message("Processing episodes");

    let results: Vec<(EpisodeId, Result<EpisodeSummary>)> = episodes
        .par_iter()
        .map(|id| {
            let result = process_episode(config, id, fingerprint, options);
            match &result {
                Ok(summary) => info!(
                    episode = %id,
                    frames = summary.frames,
                    shots = summary.shots,
                    faces = summary.faces,
                    "Finished with {id}"
                ),
                Err(e) => error!(episode = %id, "{e:#}"),
            }
            pb.inc(1);
            (id.clone(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut report = BatchReport::default();
    for (id, result) in results {
        match result {
            Ok(summary) => report.succeeded.push(summary),
            Err(e) => report.failed.push((id, e)),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn frame_line(frame: u64, level: f64, dval: f64) -> String {
        let hist = vec![level; 48];
        let decile = [0.0, 0.0, 0.0, 0.0, 0.0, dval, 0.0, 0.0, 0.0, 0.0, 0.0];
        serde_json::json!({
            "type": "frame",
            "frame": frame,
            "hist": {"hsv": hist},
            "diff": {"decile": decile},
            "face": [{
                "box": {"top": 1, "bottom": 2, "left": 3, "right": 4},
                "embed": [1.0, 0.1],
                "hog_overlap": 0.5
            }]
        })
        .to_string()
    }

    fn write_episode(config: &Config, id: &EpisodeId, with_meta: bool) {
        let paths = EpisodePaths::new(config, id);
        fs::create_dir_all(&paths.stage_dir).unwrap();
        let mut lines = Vec::new();
        if with_meta {
            lines.push(
                serde_json::json!({
                    "type": "video", "video": id.to_string(), "fps": 23.976,
                    "frames": 30, "width": 720, "height": 480
                })
                .to_string(),
            );
        }
        for f in 0..30 {
            let level = if f >= 15 { 5000.0 } else { 0.0 };
            lines.push(frame_line(f, level, if f == 15 { 20.0 } else { 1.0 }));
        }
        fs::write(&paths.annotations, lines.join("\n")).unwrap();
    }

    #[test]
    fn batch_writes_tables_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let good: EpisodeId = "bw-s01-e01".parse().unwrap();
        let bad: EpisodeId = "bw-s01-e02".parse().unwrap();
        write_episode(&config, &good, true);
        write_episode(&config, &bad, false);
        let fingerprint = Fingerprint::from_embeddings([("sam", vec![1.0, 0.0])]).unwrap();

        let report = process_episodes(
            &config,
            &[good.clone(), bad.clone()],
            &fingerprint,
            &EpisodeOptions::default(),
        )
        .unwrap();

        assert_eq!(
            report.succeeded,
            vec![EpisodeSummary {
                episode: good,
                frames: 30,
                shots: 1,
                faces: 30,
                objects: 0,
            }]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);

        let stage = config.stage_dir("bw");
        let shots = fs::read_to_string(stage.join("bw-s01-e01-shots.csv")).unwrap();
        assert_eq!(shots, "video,frame_start,frame_stop,sid\nbw-s01-e01,0,14,0\n");
        let faces = fs::read_to_string(stage.join("bw-s01-e01-faces.csv")).unwrap();
        assert!(faces.lines().nth(1).unwrap().starts_with("bw-s01-e01,0,0,sam,1,2,3,4,"));
        assert!(!stage.join("bw-s01-e02-video.csv").exists());
    }

    #[test]
    fn subtitles_are_written_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let id: EpisodeId = "idoj-s05-e08".parse().unwrap();
        write_episode(&config, &id, true);
        let paths = EpisodePaths::new(&config, &id);
        fs::create_dir_all(paths.subtitles.parent().unwrap()).unwrap();
        fs::write(&paths.subtitles, "1\n00:00:01,000 --> 00:00:02,000\nMaster?\n").unwrap();

        let options = EpisodeOptions {
            subtitles: true,
            ..Default::default()
        };
        process_episode(&config, &id, &Fingerprint::default(), &options).unwrap();

        let title = fs::read_to_string(paths.stage_dir.join("idoj-s05-e08-title.csv")).unwrap();
        assert_eq!(title, "video,start,end,text\nidoj-s05-e08.mp4,1.0,2.0,Master?\n");
    }
}
