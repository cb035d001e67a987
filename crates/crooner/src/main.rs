//! crooner - melody corpus encoder, trainer and generator
//!
//! Subcommands:
//! - `crooner encode` - Encode the dataset into a vocabulary and corpus
//! - `crooner train` - Fit the n-gram model on the corpus
//! - `crooner generate` - Continue seed melodies and write MIDI files
//! - `crooner tokens <file>` - Print the token stream for one score
//! - `crooner config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use croonconf::CroonConfig;
use crooner::commands;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crooner")]
#[command(about = "Learn melodies from a score corpus and improvise new ones")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./crooner.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode every score under the dataset directory
    Encode {
        /// Dataset directory (overrides paths.dataset_dir)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// Train the model on the encoded corpus
    Train {
        /// Longest context the model conditions on
        #[arg(long)]
        order: Option<usize>,
    },

    /// Generate melodies from seeds or from scratch
    Generate {
        /// Directory of seed scores
        #[arg(short, long)]
        inputs: Option<PathBuf>,

        /// Where generated MIDI files go
        #[arg(short, long)]
        outputs: Option<PathBuf>,

        /// Songs to generate when there are no seeds
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Stop after this many 4/4 bars (0 = until the model ends the song)
        #[arg(long)]
        max_bars: Option<usize>,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the token stream for one score file
    Tokens {
        /// Score file (MIDI or MusicXML)
        file: PathBuf,
    },

    /// Show the effective configuration and where it came from
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = CroonConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode { dataset } => {
            if let Some(dataset) = dataset {
                config.paths.dataset_dir = dataset;
            }
            print_json(&commands::encode(&config)?)
        }
        Commands::Train { order } => {
            if let Some(order) = order {
                config.model.order = order;
            }
            print_json(&commands::train(&config)?)
        }
        Commands::Generate {
            inputs,
            outputs,
            count,
            temperature,
            max_bars,
            seed,
        } => {
            let generation = &mut config.generation;
            if let Some(count) = count {
                generation.song_count = count;
            }
            if let Some(temperature) = temperature {
                generation.temperature = temperature;
            }
            if let Some(max_bars) = max_bars {
                generation.max_bars = max_bars;
            }
            if seed.is_some() {
                generation.seed = seed;
            }
            if let Some(inputs) = inputs {
                config.paths.inputs_dir = inputs;
            }
            if let Some(outputs) = outputs {
                config.paths.outputs_dir = outputs;
            }
            print_json(&commands::generate(&config)?)
        }
        Commands::Tokens { file } => {
            println!("{}", commands::tokens(&config, &file)?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", commands::show_config(&config, &sources));
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
