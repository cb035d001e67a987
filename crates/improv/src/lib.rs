//! Melody continuation.
//!
//! The generator is model-agnostic: anything implementing [`Predictor`]
//! (window of ids → probability vector) can drive it. [`NgramModel`] is the
//! trainable predictor shipped with the crate.
//!
//! ```
//! use codec::{EncodedSong, Vocabulary};
//! use improv::{generate, GenerationConfig, Sampler};
//!
//! let vocab = Vocabulary::build(&[Some("60 - 0".parse().unwrap())]);
//! let filler = vocab.filler_id();
//! let stop = move |_: &[usize]| {
//!     let mut dist = vec![0.0; 4];
//!     dist[filler] = 1.0;
//!     dist
//! };
//!
//! let seed: EncodedSong = "60 -".parse().unwrap();
//! let song = generate(&seed, &vocab, GenerationConfig::default(), &stop, &mut Sampler::with_seed(0)).unwrap();
//! assert_eq!(song.to_string(), "60 - *");
//! ```

pub mod generate;
pub mod ngram;
pub mod predictor;
pub mod sampler;

pub use generate::{generate, steps_for_bars, GenerateError, Generation, GenerationConfig, Step};
pub use ngram::NgramModel;
pub use predictor::{one_hot, Predictor, PredictorError};
pub use sampler::{adjust, SampleError, Sampler};

use std::path::PathBuf;

/// Errors persisting model weights.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("weights file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("weights JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid weights: {0}")]
    Invalid(String),
}
