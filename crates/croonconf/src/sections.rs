//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

/// Where songs come from and where artifacts go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Training scores, walked recursively.
    /// Default: dataset
    #[serde(default = "PathsConfig::default_dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Seed scores for generation. Empty or missing means from scratch.
    /// Default: inputs
    #[serde(default = "PathsConfig::default_inputs_dir")]
    pub inputs_dir: PathBuf,

    /// Generated MIDI files.
    /// Default: outputs
    #[serde(default = "PathsConfig::default_outputs_dir")]
    pub outputs_dir: PathBuf,

    /// Default: corpus.bin
    #[serde(default = "PathsConfig::default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Default: vocabulary.json
    #[serde(default = "PathsConfig::default_vocabulary_path")]
    pub vocabulary_path: PathBuf,

    /// Default: weights.json
    #[serde(default = "PathsConfig::default_weights_path")]
    pub weights_path: PathBuf,
}

impl PathsConfig {
    fn default_dataset_dir() -> PathBuf {
        PathBuf::from("dataset")
    }

    fn default_inputs_dir() -> PathBuf {
        PathBuf::from("inputs")
    }

    fn default_outputs_dir() -> PathBuf {
        PathBuf::from("outputs")
    }

    fn default_corpus_path() -> PathBuf {
        PathBuf::from("corpus.bin")
    }

    fn default_vocabulary_path() -> PathBuf {
        PathBuf::from("vocabulary.json")
    }

    fn default_weights_path() -> PathBuf {
        PathBuf::from("weights.json")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset_dir: Self::default_dataset_dir(),
            inputs_dir: Self::default_inputs_dir(),
            outputs_dir: Self::default_outputs_dir(),
            corpus_path: Self::default_corpus_path(),
            vocabulary_path: Self::default_vocabulary_path(),
            weights_path: Self::default_weights_path(),
        }
    }
}

/// How scores become tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// File extensions (no dot) picked up when walking a directory.
    #[serde(default = "EncodingConfig::default_extensions")]
    pub extensions: Vec<String>,

    /// Token duration in quarter notes, written as a fraction.
    /// Default: "1/4"
    #[serde(default = "EncodingConfig::default_step")]
    pub step: String,
}

impl EncodingConfig {
    fn default_extensions() -> Vec<String> {
        ["musicxml", "xml", "mxl", "midi", "mid", "krn"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn default_step() -> String {
        "1/4".to_string()
    }

    /// The step as a positive `(numerator, denominator)` pair.
    ///
    /// Accepts `"n/d"` or a bare integer `"n"`.
    pub fn step_fraction(&self) -> Result<(i32, i32), ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: "encoding.step".to_string(),
            message: format!("expected a positive fraction like \"1/4\", got {:?}", self.step),
        };

        let (numer, denom) = match self.step.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (self.step.trim(), "1"),
        };
        let numer: i32 = numer.parse().map_err(|_| invalid())?;
        let denom: i32 = denom.parse().map_err(|_| invalid())?;
        if numer <= 0 || denom <= 0 {
            return Err(invalid());
        }
        Ok((numer, denom))
    }

    /// Whether `ext` (no dot, any case) is on the allow-list.
    pub fn accepts(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            extensions: Self::default_extensions(),
            step: Self::default_step(),
        }
    }
}

/// Sampling and stopping parameters for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Window length seen by the predictor.
    /// Default: 128
    #[serde(default = "GenerationSettings::default_segment_length")]
    pub segment_length: usize,

    /// Default: 0.8
    #[serde(default = "GenerationSettings::default_temperature")]
    pub temperature: f64,

    /// Bars of 4/4 to generate per song; 0 means until the model stops.
    /// Default: 0
    #[serde(default)]
    pub max_bars: usize,

    /// Songs generated from scratch when there are no seed files.
    /// Default: 3
    #[serde(default = "GenerationSettings::default_song_count")]
    pub song_count: usize,

    /// RNG seed; unset draws from the OS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationSettings {
    fn default_segment_length() -> usize {
        128
    }

    fn default_temperature() -> f64 {
        0.8
    }

    fn default_song_count() -> usize {
        3
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            segment_length: Self::default_segment_length(),
            temperature: Self::default_temperature(),
            max_bars: 0,
            song_count: Self::default_song_count(),
            seed: None,
        }
    }
}

/// The n-gram predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Longest context the model conditions on.
    /// Default: 4
    #[serde(default = "ModelConfig::default_order")]
    pub order: usize,
}

impl ModelConfig {
    fn default_order() -> usize {
        4
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an
    /// `EnvFilter` expression).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
