use clap::{ArgAction, Parser};
use dv_lib::{config::Config, fingerprint::Fingerprint, logging, seeds::SeedSet};
use eyre::{Result, WrapErr};
use std::{fs, path::PathBuf};
use tracing::info;

/// Create (or load) the fingerprint file of a series: one reference face
/// embedding per character, taken from hand-picked frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the series to build the fingerprint for
    #[arg(short, long)]
    series: String,

    /// Data directory (overrides the "basepath" of the parameter file)
    #[arg(short, long = "base-path", value_parser = clap::value_parser!(PathBuf))]
    base_path: Option<PathBuf>,

    /// Parameter file with the data directory
    #[arg(long, default_value = "params.json", value_parser = clap::value_parser!(PathBuf))]
    params: PathBuf,

    /// Seed file listing the reference frames of each series
    #[arg(long, default_value = "seeds.toml", value_parser = clap::value_parser!(PathBuf))]
    seeds: PathBuf,

    /// Discard an existing fingerprint file and build it again
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    rebuild: bool,

    /// Enable verbose output
    #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = Config::resolve(args.base_path.as_deref(), &args.params)?;
    let cache_path = config.fingerprint_path(&args.series);

    if args.rebuild && fs::exists(&cache_path)? {
        fs::remove_file(&cache_path)?;
    }

    // seeds are only read when the cache has to be built
    let seeds = if fs::exists(&cache_path)? {
        SeedSet::default()
    } else {
        SeedSet::load(&args.seeds)?
    };
    let fingerprint =
        Fingerprint::load_or_build(&args.series, &seeds, &config.stage_root(), &cache_path)
            .wrap_err_with(|| format!("Fingerprint for series '{}'", args.series))?;

    info!(
        path = %cache_path.display(),
        "Fingerprint ready: {}",
        fingerprint.characters().collect::<Vec<_>>().join(", ")
    );

    Ok(())
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Args::command().debug_assert();
}
