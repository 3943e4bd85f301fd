//! Reference face embeddings for the recurring characters of a series.

use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::FingerprintError,
    math::l2_normalize,
    records::{Record, open_jsonl},
    seeds::SeedSet,
};

/// Character label used when no reference matches.
pub const UNKNOWN_CHARACTER: &str = "unknown";
/// Similarity reported together with [`UNKNOWN_CHARACTER`].
pub const UNKNOWN_SCORE: f32 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub character: String,
    pub score: f32,
}

impl Identity {
    pub fn unknown() -> Self {
        Identity {
            character: UNKNOWN_CHARACTER.to_owned(),
            score: UNKNOWN_SCORE,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.character == UNKNOWN_CHARACTER && self.score == UNKNOWN_SCORE
    }
}

/// Insertion-ordered map from character name to unit-norm embedding.
/// Immutable once built; share it by reference between episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    entries: Vec<(String, Array1<f32>)>,
}

impl Fingerprint {
    /// Normalizes every embedding. A repeated name replaces the earlier vector
    /// but keeps its position.
    pub fn from_embeddings<I, S>(embeddings: I) -> Result<Fingerprint, FingerprintError>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut fingerprint = Fingerprint::default();
        for (name, embed) in embeddings {
            let name = name.into();
            let unit = l2_normalize(ArrayView1::from(embed.as_slice()))
                .ok_or_else(|| FingerprintError::DegenerateEmbedding(name.clone()))?;
            fingerprint.insert(name, unit);
        }
        Ok(fingerprint)
    }

    fn insert(&mut self, name: String, unit: Array1<f32>) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, vector)) => *vector = unit,
            None => self.entries.push((name, unit)),
        }
    }

    /// Builds the fingerprint of `series` from its curated seed frames.
    ///
    /// Each seed names a stream under `stage_dir` and a record offset in it;
    /// the first face of that record is the reference. Every stream is read
    /// once, keeping only the records a seed points at.
    pub fn build(
        series: &str,
        seeds: &SeedSet,
        stage_dir: &Path,
    ) -> Result<Fingerprint, FingerprintError> {
        let seeds = seeds
            .get(series)
            .ok_or_else(|| FingerprintError::UnknownSeries(series.to_owned()))?;

        let mut picked: HashMap<(&str, usize), Record> = HashMap::new();
        for stream in seeds.iter().map(|seed| seed.stream.as_str()).unique() {
            let wanted: HashSet<usize> = seeds
                .iter()
                .filter(|seed| seed.stream == stream)
                .map(|seed| seed.offset)
                .collect();
            let last = wanted.iter().copied().max().unwrap_or(0);

            debug!(stream, offsets = wanted.len(), "reading seed stream");
            for (offset, record) in open_jsonl(&stage_dir.join(stream))?.enumerate() {
                if offset > last {
                    break;
                }
                let record = record?;
                if wanted.contains(&offset) {
                    picked.insert((stream, offset), record);
                }
            }
        }

        let mut fingerprint = Fingerprint::default();
        for seed in seeds {
            let stream = stage_dir.join(&seed.stream);
            let frame = match picked.get(&(seed.stream.as_str(), seed.offset)) {
                Some(Record::Frame(frame)) => frame,
                Some(other) => {
                    return Err(FingerprintError::SeedNotFrame {
                        stream,
                        offset: seed.offset,
                        kind: other.kind(),
                    });
                }
                None => {
                    return Err(FingerprintError::MissingSeedRecord {
                        stream,
                        offset: seed.offset,
                    });
                }
            };
            let face = frame
                .face
                .as_deref()
                .and_then(<[_]>::first)
                .ok_or_else(|| FingerprintError::MissingSeedFace {
                    stream,
                    offset: seed.offset,
                })?;
            let unit = l2_normalize(ArrayView1::from(face.embed.as_slice()))
                .ok_or_else(|| FingerprintError::DegenerateEmbedding(seed.character.clone()))?;
            fingerprint.insert(seed.character.clone(), unit);
        }

        info!(series, characters = fingerprint.len(), "built fingerprint");
        Ok(fingerprint)
    }

    /// Nearest reference by cosine similarity.
    ///
    /// The first entry wins on exact ties. Entries whose dimension differs
    /// from the query are skipped. An empty fingerprint, or a query with zero
    /// norm, yields [`Identity::unknown`].
    pub fn lookup(&self, embed: &[f32]) -> Identity {
        let Some(query) = l2_normalize(ArrayView1::from(embed)) else {
            return Identity::unknown();
        };

        let mut best: Option<usize> = None;
        let mut best_score = UNKNOWN_SCORE;
        for (i, (_, reference)) in self.entries.iter().enumerate() {
            if reference.len() != query.len() {
                continue;
            }
            let similarity = reference.dot(&query);
            if similarity > best_score {
                best_score = similarity;
                best = Some(i);
            }
        }

        match best {
            Some(i) => Identity {
                character: self.entries[i].0.clone(),
                score: best_score,
            },
            None => Identity::unknown(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn characters(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, character: &str) -> Option<ArrayView1<'_, f32>> {
        self.entries
            .iter()
            .find(|(name, _)| name == character)
            .map(|(_, vector)| vector.view())
    }

    pub fn save(&self, path: &Path) -> Result<(), FingerprintError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self).map_err(|source| FingerprintError::Cache {
            path: path.to_owned(),
            source,
        })?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Fingerprint, FingerprintError> {
        let reader = BufReader::new(File::open(path)?);
        bincode::deserialize_from(reader).map_err(|source| FingerprintError::Cache {
            path: path.to_owned(),
            source,
        })
    }

    /// Reads the cache at `cache_path`, building and writing it first if it
    /// does not exist yet.
    pub fn load_or_build(
        series: &str,
        seeds: &SeedSet,
        stage_dir: &Path,
        cache_path: &Path,
    ) -> Result<Fingerprint, FingerprintError> {
        if cache_path.exists() {
            debug!(path = %cache_path.display(), "loading cached fingerprint");
            return Fingerprint::load(cache_path);
        }

        let fingerprint = Fingerprint::build(series, seeds, stage_dir)?;
        fingerprint.save(cache_path)?;
        info!(path = %cache_path.display(), "saved fingerprint cache");
        Ok(fingerprint)
    }
}
