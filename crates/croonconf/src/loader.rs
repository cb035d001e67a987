//! Config file discovery, table merging, and environment variable overlay.

use crate::{ConfigError, CroonConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Which files and environment variables produced a `CroonConfig`.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Files merged, lowest precedence first
    pub files: Vec<PathBuf>,
    /// Names of the environment variables that replaced a value
    pub env_overrides: Vec<String>,
}

const SYSTEM_CONFIG: &str = "/etc/crooner/config.toml";
const LOCAL_CONFIG: &str = "crooner.toml";

fn user_config() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("crooner").join("config.toml"))
}

/// Existing config files in load order: system, user, local.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Like [`discover_config_files`], but an existing `cli_path` takes the
/// place of `./crooner.toml`.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let last = match cli_path.filter(|p| p.exists()) {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(LOCAL_CONFIG),
    };

    [Some(PathBuf::from(SYSTEM_CONFIG)), user_config(), Some(last)]
        .into_iter()
        .flatten()
        .filter(|candidate| candidate.is_file())
        .collect()
}

/// Read one TOML file as a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in the overlay replaces the base value whole.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Deserialize a merged table; missing keys take their defaults.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<CroonConfig, ConfigError> {
    let mut config: CroonConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
    config.expand_paths();
    Ok(config)
}

/// Overlay `CROONER_*` and `RUST_LOG` from the process environment.
pub fn apply_env_overrides(config: &mut CroonConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any variable lookup. Values that don't parse for
/// their field are ignored.
pub fn apply_overrides_from<F>(config: &mut CroonConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut path_var = |name: &str, target: &mut PathBuf| {
        if let Some(v) = lookup(name) {
            *target = expand_path(&v);
            sources.env_overrides.push(name.to_string());
        }
    };

    let paths = &mut config.paths;
    path_var("CROONER_DATASET_DIR", &mut paths.dataset_dir);
    path_var("CROONER_INPUTS_DIR", &mut paths.inputs_dir);
    path_var("CROONER_OUTPUTS_DIR", &mut paths.outputs_dir);
    path_var("CROONER_CORPUS_PATH", &mut paths.corpus_path);
    path_var("CROONER_VOCABULARY_PATH", &mut paths.vocabulary_path);
    path_var("CROONER_WEIGHTS_PATH", &mut paths.weights_path);

    let generation = &mut config.generation;
    if let Some(v) = lookup("CROONER_SEGMENT_LENGTH").and_then(|v| v.parse().ok()) {
        generation.segment_length = v;
        sources.env_overrides.push("CROONER_SEGMENT_LENGTH".to_string());
    }
    if let Some(v) = lookup("CROONER_TEMPERATURE").and_then(|v| v.parse().ok()) {
        generation.temperature = v;
        sources.env_overrides.push("CROONER_TEMPERATURE".to_string());
    }
    if let Some(v) = lookup("CROONER_MAX_BARS").and_then(|v| v.parse().ok()) {
        generation.max_bars = v;
        sources.env_overrides.push("CROONER_MAX_BARS".to_string());
    }
    if let Some(v) = lookup("CROONER_SONG_COUNT").and_then(|v| v.parse().ok()) {
        generation.song_count = v;
        sources.env_overrides.push("CROONER_SONG_COUNT".to_string());
    }
    if let Some(v) = lookup("CROONER_SEED").and_then(|v| v.parse().ok()) {
        generation.seed = Some(v);
        sources.env_overrides.push("CROONER_SEED".to_string());
    }

    if let Some(v) = lookup("CROONER_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("CROONER_LOG_LEVEL".to_string());
    }
    // RUST_LOG wins over CROONER_LOG_LEVEL
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand a leading `~/` to the home directory and a leading `$VAR` (alone
/// or followed by `/rest`) to that variable's value. Anything unresolvable
/// comes back as written.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = if let Some(rest) = path.strip_prefix("~/") {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(rest))
    } else if let Some(var) = path.strip_prefix('$') {
        let (name, rest) = var.split_once('/').unwrap_or((var, ""));
        env::var(name).ok().map(|value| {
            let base = PathBuf::from(value);
            if rest.is_empty() {
                base
            } else {
                base.join(rest)
            }
        })
    } else {
        None
    };

    expanded.unwrap_or_else(|| PathBuf::from(path))
}
