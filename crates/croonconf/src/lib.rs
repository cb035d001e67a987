//! Configuration loading for crooner.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/crooner/config.toml` (system)
//! 2. `~/.config/crooner/config.toml` (user)
//! 3. `./crooner.toml` (local override), or the path given with `--config`
//! 4. Environment variables (`CROONER_*`, `RUST_LOG`)
//!
//! Files are merged as TOML tables before deserializing, so a file only needs
//! the keys it changes.
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! dataset_dir = "~/music/chorales"
//! outputs_dir = "outputs"
//!
//! [encoding]
//! step = "1/4"
//!
//! [generation]
//! segment_length = 128
//! temperature = 0.8
//! max_bars = 8
//!
//! [model]
//! order = 4
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use sections::{EncodingConfig, GenerationSettings, ModelConfig, PathsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete crooner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CroonConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CroonConfig {
    /// Defaults, then every discovered file (`config_path` standing in for
    /// `./crooner.toml`), then the environment. Also reports which files and
    /// variables took part.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::merge_tables(&mut merged, loader::load_table(&path)?);
            sources.files.push(path);
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::from_table(merged, &origin)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Expand `~/` and `$VAR/` prefixes in every path.
    pub fn expand_paths(&mut self) {
        let paths = &mut self.paths;
        for path in [
            &mut paths.dataset_dir,
            &mut paths.inputs_dir,
            &mut paths.outputs_dir,
            &mut paths.corpus_path,
            &mut paths.vocabulary_path,
            &mut paths.weights_path,
        ] {
            let expanded = expand_path(&path.to_string_lossy());
            *path = expanded;
        }
    }

    /// Render the effective configuration as a TOML document.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# crooner configuration\n\n");

        output.push_str("[paths]\n");
        for (key, path) in [
            ("dataset_dir", &self.paths.dataset_dir),
            ("inputs_dir", &self.paths.inputs_dir),
            ("outputs_dir", &self.paths.outputs_dir),
            ("corpus_path", &self.paths.corpus_path),
            ("vocabulary_path", &self.paths.vocabulary_path),
            ("weights_path", &self.paths.weights_path),
        ] {
            output.push_str(&format!("{} = {:?}\n", key, path.display().to_string()));
        }

        output.push_str("\n[encoding]\n");
        output.push_str("extensions = [");
        let extensions: Vec<String> = self
            .encoding
            .extensions
            .iter()
            .map(|e| format!("{:?}", e))
            .collect();
        output.push_str(&extensions.join(", "));
        output.push_str("]\n");
        output.push_str(&format!("step = {:?}\n", self.encoding.step));

        output.push_str("\n[generation]\n");
        output.push_str(&format!("segment_length = {}\n", self.generation.segment_length));
        output.push_str(&format!("temperature = {:?}\n", self.generation.temperature));
        output.push_str(&format!("max_bars = {}\n", self.generation.max_bars));
        output.push_str(&format!("song_count = {}\n", self.generation.song_count));
        match self.generation.seed {
            Some(seed) => output.push_str(&format!("seed = {}\n", seed)),
            None => output.push_str("# seed = 0\n"),
        }

        output.push_str("\n[model]\n");
        output.push_str(&format!("order = {}\n", self.model.order));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {:?}\n", self.telemetry.log_level));

        output
    }
}
