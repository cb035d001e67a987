//! Seed melodies for generation.

use std::path::Path;

use chrono::{DateTime, Utc};
use codec::{EncodedSong, Encoder};
use croonconf::EncodingConfig;
use tracing::info;

use crate::batch::{self, BatchReport};

/// A named starting point. The name becomes the output file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub name: String,
    pub song: EncodedSong,
}

/// `count` names from one UTC timestamp: `2024-05-01-12-30-00-1`, `...-2`, ...
pub fn scratch_names(count: usize, now: DateTime<Utc>) -> Vec<String> {
    let stamp = now.format("%Y-%m-%d-%H-%M-%S");
    (1..=count).map(|i| format!("{}-{}", stamp, i)).collect()
}

/// Empty seeds: the model starts from a window of fillers.
pub fn from_scratch(count: usize, now: DateTime<Utc>) -> Vec<Seed> {
    scratch_names(count, now)
        .into_iter()
        .map(|name| Seed {
            name,
            song: EncodedSong::default(),
        })
        .collect()
}

/// Encode every allow-listed file under `dir` into a seed named after its
/// file stem. Files that fail to encode are counted and left out.
pub fn from_inputs(dir: &Path, encoding: &EncodingConfig, encoder: &Encoder) -> (Vec<Seed>, BatchReport) {
    let paths: Vec<_> = batch::score_files(dir, encoding).collect();
    let (songs, report) = batch::encode_files(&paths, encoder);

    let seeds = paths
        .iter()
        .zip(songs)
        .filter_map(|(path, song)| {
            let name = path.file_stem()?.to_string_lossy().into_owned();
            Some(Seed { name, song: song? })
        })
        .collect();

    (seeds, report)
}

/// Seeds from `inputs_dir` when it holds any score files, otherwise
/// `song_count` empty seeds.
pub fn collect(
    inputs_dir: &Path,
    encoding: &EncodingConfig,
    encoder: &Encoder,
    song_count: usize,
    now: DateTime<Utc>,
) -> (Vec<Seed>, BatchReport) {
    let has_inputs = inputs_dir.is_dir() && batch::score_files(inputs_dir, encoding).next().is_some();

    if has_inputs {
        info!(dir = %inputs_dir.display(), "seeding from input files");
        from_inputs(inputs_dir, encoding, encoder)
    } else {
        info!(count = song_count, "generating from scratch");
        (from_scratch(song_count, now), BatchReport::default())
    }
}
