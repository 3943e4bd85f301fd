use clap::{ArgAction, Parser};
use dv_lib::{
    batch::{EpisodeOptions, process_episodes},
    config::Config,
    episodes::{Selection, find_episodes},
    fingerprint::Fingerprint,
    logging,
    processor::ShotThresholds,
};
use eyre::{Result, WrapErr, eyre};
use std::path::PathBuf;
use tracing::{info, warn};

/// Convert annotation jsonl files into semantic csv files.
/// Select the series and, optionally, seasons and episodes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the series to process
    #[arg(short, long)]
    series: String,

    /// Seasons to parse, separated by spaces (default: all seasons)
    #[arg(long, num_args = 1..)]
    season: Vec<u32>,

    /// Episodes to parse, separated by spaces (default: all episodes)
    #[arg(long, num_args = 1..)]
    episode: Vec<u32>,

    /// Data directory (overrides the "basepath" of the parameter file)
    #[arg(short, long = "base-path", value_parser = clap::value_parser!(PathBuf))]
    base_path: Option<PathBuf>,

    /// Parameter file with the data directory
    #[arg(long, default_value = "params.json", value_parser = clap::value_parser!(PathBuf))]
    params: PathBuf,

    /// Also write chapter breaks from the mp4 file (needs ffprobe)
    #[arg(long = "breaks", action = ArgAction::SetTrue, default_value_t = false)]
    chapter_breaks: bool,

    /// Also write the subtitles of the srt file
    #[arg(long = "titles", action = ArgAction::SetTrue, default_value_t = false)]
    sub_titles: bool,

    /// Median frame difference a shot cut must exceed
    #[arg(long = "dval-above", default_value_t = 12.0)]
    dval_above: f64,

    /// Histogram distance a shot cut must exceed
    #[arg(long = "hval-above", default_value_t = 4000.0)]
    hval_above: f64,

    /// Frames a shot must exceed before the next cut
    #[arg(long = "shot-len-above", default_value_t = 12)]
    shot_len_above: u64,

    /// Enable verbose output
    #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = Config::resolve(args.base_path.as_deref(), &args.params)?;
    let fingerprint_path = config.fingerprint_path(&args.series);
    let fingerprint = Fingerprint::load(&fingerprint_path).wrap_err_with(|| {
        format!(
            "Loading {} (run `fingerprint --series {}` first)",
            fingerprint_path.display(),
            args.series
        )
    })?;

    let selection = Selection {
        series: args.series,
        seasons: args.season,
        episodes: args.episode,
    };
    let episodes = find_episodes(&config, &selection)?;
    if episodes.is_empty() {
        warn!(series = %selection.series, "No episodes matched the selection");
        return Ok(());
    }
    info!(
        "Episodes: {}",
        episodes.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    );

    let options = EpisodeOptions {
        thresholds: ShotThresholds {
            dval_above: args.dval_above,
            hval_above: args.hval_above,
            shot_len_above: args.shot_len_above,
        },
        chapter_breaks: args.chapter_breaks,
        subtitles: args.sub_titles,
    };
    let report = process_episodes(&config, &episodes, &fingerprint, &options)?;

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch finished"
    );
    if !report.failed.is_empty() {
        let names: Vec<String> = report.failed.iter().map(|(id, _)| id.to_string()).collect();
        return Err(eyre!("{} episode(s) failed: {}", names.len(), names.join(", ")));
    }

    Ok(())
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Args::command().debug_assert();
}

#[test]
fn parses_selection_lists() {
    let args = Args::try_parse_from([
        "process-json",
        "--series",
        "idoj",
        "--season",
        "5",
        "--episode",
        "8",
        "9",
        "10",
    ])
    .unwrap();
    assert_eq!(args.season, vec![5]);
    assert_eq!(args.episode, vec![8, 9, 10]);
    assert_eq!(args.shot_len_above, 12);
}

#[test]
fn parses_threshold_overrides() {
    let args = Args::try_parse_from([
        "process-json",
        "--series",
        "bw",
        "--dval-above",
        "8.5",
        "--hval-above",
        "3000",
        "--shot-len-above",
        "24",
    ])
    .unwrap();
    assert_eq!(args.dval_above, 8.5);
    assert_eq!(args.hval_above, 3000.0);
    assert_eq!(args.shot_len_above, 24);
}
