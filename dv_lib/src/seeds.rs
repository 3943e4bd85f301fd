use std::{collections::HashMap, fs, path::Path};

use eyre::{Result, WrapErr};
use serde::Deserialize;

/// Curated reference frames, keyed by series.
///
/// ```toml
/// [[series.bw]]
/// stream = "bw/bw-s02-e02-dvt.jsonl"
/// offset = 7921
/// character = "larry"
/// ```
///
/// `stream` is relative to the stage directory, `offset` is the 0-based
/// record index within that stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedSet {
    #[serde(default)]
    pub series: HashMap<String, Vec<Seed>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Seed {
    pub stream: String,
    pub offset: usize,
    pub character: String,
}

impl SeedSet {
    pub fn load(path: &Path) -> Result<SeedSet> {
        let toml_content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Reading seed file {}", path.display()))?;
        Self::parse(&toml_content).wrap_err_with(|| format!("Parsing seed file {}", path.display()))
    }

    pub fn parse(toml_content: &str) -> Result<SeedSet> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn get(&self, series: &str) -> Option<&[Seed]> {
        self.series.get(series).map(Vec::as_slice)
    }
}
