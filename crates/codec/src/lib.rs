//! Melody tokenizer.
//!
//! Turns key-normalized melodies into fixed-step token sequences and back:
//!
//! - [`token`]: the alphabet (`"60"`, `"0"`, `"-"`, `"*"`) and [`EncodedSong`]
//! - [`encode`]: `Part` → tokens on a quantization grid
//! - [`decode`]: tokens → timed notes and rests
//! - [`vocab`], [`corpus`]: the sorted vocabulary and the id corpus, plus
//!   their on-disk forms (JSON and bincode)
//! - [`windows`]: fixed-length training windows with filler padding
//!
//! ```
//! use codec::{corpus, Decoder, EncodedSong};
//!
//! let song: EncodedSong = "60 - 0".parse().unwrap();
//! let (vocab, corpus) = corpus::build(&[Some(song.clone())]);
//! assert_eq!(vocab.len(), 4);
//! assert_eq!(corpus.songs()[0], vec![3, 1, 2]);
//!
//! let events = Decoder::default().decode(song.tokens());
//! assert_eq!(events.len(), 2);
//! ```

pub mod corpus;
pub mod decode;
pub mod encode;
pub mod token;
pub mod vocab;
pub mod windows;

pub use corpus::Corpus;
pub use decode::Decoder;
pub use encode::{EncodeError, Encoder, DEFAULT_STEP};
pub use token::{EncodedSong, Token, TokenError};
pub use vocab::Vocabulary;
pub use windows::{training_windows, TrainingWindow};

pub use score::Rational;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("vocabulary file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("vocabulary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("invalid vocabulary: {0}")]
    Invalid(String),

    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(Token),

    #[error("id {0} is outside the vocabulary")]
    UnknownId(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corpus encoding: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("song {song} position {position}: id {id} out of range for {vocab_size} tokens")]
    IdOutOfRange {
        song: usize,
        position: usize,
        id: usize,
        vocab_size: usize,
    },
}
