//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use codec::{corpus, training_windows, Corpus, Decoder, EncodedSong, Encoder, Rational, Vocabulary};
use croonconf::{ConfigSources, CroonConfig};
use improv::{steps_for_bars, GenerateError, GenerationConfig, NgramModel, Sampler};
use rayon::prelude::*;
use score::{MidiParams, ScoreError};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::batch::{self, BatchReport};
use crate::seeds::{self, Seed};

/// Build the encoder the configuration describes.
pub fn encoder(config: &CroonConfig) -> Result<Encoder> {
    let (numer, denom) = config.encoding.step_fraction()?;
    Ok(Encoder::new(Rational::new(numer, denom)))
}

/// Walk the dataset, encode every song, save vocabulary and corpus.
pub fn encode(config: &CroonConfig) -> Result<BatchReport> {
    let encoder = encoder(config)?;
    let dataset = &config.paths.dataset_dir;
    if !dataset.is_dir() {
        bail!("Dataset directory {} does not exist", dataset.display());
    }

    let paths: Vec<PathBuf> = batch::score_files(dataset, &config.encoding).collect();
    if paths.is_empty() {
        warn!(dir = %dataset.display(), "no score files found");
    }
    info!(files = paths.len(), dir = %dataset.display(), "encoding dataset");

    let (songs, report) = batch::encode_files(&paths, &encoder);
    let (vocabulary, corpus) = corpus::build(&songs);

    vocabulary
        .save(&config.paths.vocabulary_path)
        .context("Failed to save vocabulary")?;
    corpus
        .save(&config.paths.corpus_path)
        .context("Failed to save corpus")?;

    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub songs: usize,
    pub windows: usize,
    pub vocabulary: usize,
    pub order: usize,
    pub contexts: usize,
}

/// Fit the n-gram model on the saved corpus and save its weights.
pub fn train(config: &CroonConfig) -> Result<TrainSummary> {
    let paths = &config.paths;
    let vocabulary = Vocabulary::load(&paths.vocabulary_path)
        .with_context(|| format!("Failed to load vocabulary from {}", paths.vocabulary_path.display()))?;
    let corpus = Corpus::load(&paths.corpus_path)
        .with_context(|| format!("Failed to load corpus from {}", paths.corpus_path.display()))?;
    corpus
        .validate(vocabulary.len())
        .context("Corpus does not match vocabulary")?;

    let segment_length = config.generation.segment_length;
    let order = config.model.order;
    let model = NgramModel::train(
        training_windows(&corpus, segment_length, vocabulary.filler_id()),
        order,
        vocabulary.len(),
    );
    model
        .save(&paths.weights_path)
        .context("Failed to save model weights")?;

    Ok(TrainSummary {
        songs: corpus.len(),
        windows: corpus.token_count() + corpus.len(),
        vocabulary: vocabulary.len(),
        order,
        contexts: model.context_count(),
    })
}

#[derive(Debug, thiserror::Error)]
enum SeedFailure {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Write(#[from] ScoreError),
}

struct Generator<'a> {
    vocabulary: &'a Vocabulary,
    model: &'a NgramModel,
    config: GenerationConfig,
    decoder: Decoder,
    outputs: &'a Path,
    rng_seed: Option<u64>,
}

impl Generator<'_> {
    fn run(&self, index: usize, seed: &Seed) -> Result<PathBuf, SeedFailure> {
        let mut sampler = match self.rng_seed {
            Some(base) => Sampler::with_seed(base.wrapping_add(index as u64)),
            None => Sampler::new(),
        };

        let song = improv::generate(&seed.song, self.vocabulary, self.config, self.model, &mut sampler)?;
        let events = self.decoder.decode(song.tokens());

        let path = self.outputs.join(format!("{}.mid", seed.name));
        score::midi::write_events(&path, &events, &MidiParams::default())?;
        info!(path = %path.display(), tokens = song.len(), events = events.len(), "wrote melody");
        Ok(path)
    }
}

/// Continue each seed with the trained model and write the results as MIDI.
pub fn generate(config: &CroonConfig) -> Result<BatchReport> {
    let encoder = encoder(config)?;
    let paths = &config.paths;

    let vocabulary = Vocabulary::load(&paths.vocabulary_path)
        .with_context(|| format!("Failed to load vocabulary from {}", paths.vocabulary_path.display()))?;
    let model = NgramModel::load(&paths.weights_path)
        .with_context(|| format!("Failed to load model weights from {}", paths.weights_path.display()))?;
    if model.vocab_size() != vocabulary.len() {
        bail!(
            "Model was trained on {} tokens but the vocabulary has {}; re-run `crooner train`",
            model.vocab_size(),
            vocabulary.len()
        );
    }

    let (seeds, mut report) = seeds::collect(
        &paths.inputs_dir,
        &config.encoding,
        &encoder,
        config.generation.song_count,
        Utc::now(),
    );

    std::fs::create_dir_all(&paths.outputs_dir)
        .with_context(|| format!("Failed to create {}", paths.outputs_dir.display()))?;

    let generator = Generator {
        vocabulary: &vocabulary,
        model: &model,
        config: GenerationConfig {
            segment_length: config.generation.segment_length,
            max_steps: steps_for_bars(config.generation.max_bars, encoder.step()),
            temperature: config.generation.temperature,
        },
        decoder: Decoder::new(encoder.step()),
        outputs: &paths.outputs_dir,
        rng_seed: config.generation.seed,
    };

    let outcomes: Vec<Result<PathBuf, SeedFailure>> = seeds
        .par_iter()
        .enumerate()
        .map(|(index, seed)| generator.run(index, seed))
        .collect();

    for (seed, outcome) in seeds.iter().zip(outcomes) {
        match outcome {
            Ok(_) => report.generated += 1,
            Err(SeedFailure::Generate(e @ GenerateError::UnknownToken { .. })) => {
                warn!(seed = %seed.name, error = %e, "skipping seed");
                report.unknown_seed_tokens += 1;
            }
            Err(e) => {
                error!(seed = %seed.name, error = %e, "generation failed");
                report.generation_failures += 1;
            }
        }
    }

    Ok(report)
}

/// Token stream for a single score file.
pub fn tokens(config: &CroonConfig, path: &Path) -> Result<EncodedSong> {
    let encoder = encoder(config)?;
    batch::encode_file(path, &encoder).with_context(|| format!("Failed to encode {}", path.display()))
}

/// The effective configuration as TOML, prefixed by where it came from.
pub fn show_config(config: &CroonConfig, sources: &ConfigSources) -> String {
    let mut output = String::new();
    if sources.files.is_empty() {
        output.push_str("# Sources: defaults only\n");
    } else {
        for file in &sources.files {
            output.push_str(&format!("# Loaded: {}\n", file.display()));
        }
    }
    for var in &sources.env_overrides {
        output.push_str(&format!("# Env override: {}\n", var));
    }
    output.push_str(&config.to_toml());
    output
}
