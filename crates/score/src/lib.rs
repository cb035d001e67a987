//! Score model for single-line melodies.
//!
//! A `Score` is what a notation reader hands to the tokenizer: ordered parts,
//! each a monophonic run of `ScoreEvent`s with exact rational durations in
//! quarter notes. The crate also owns the pieces that sit on either side of
//! the token codec:
//!
//! - [`key`]: key-signature detection and transposition to C major / A minor
//! - [`midi`]: Standard MIDI File reading (score source) and writing (event sink)
//! - [`musicxml`]: uncompressed MusicXML reading
//! - [`format`]: the file-extension allow-list and `load_score` dispatch
//!
//! # Example
//!
//! ```
//! use score::{key, KeySignature, Mode, Part, Rational, ScoreEvent};
//!
//! let part = Part::new(vec![
//!     ScoreEvent::KeySignature(KeySignature::new(7, Mode::Major)),
//!     ScoreEvent::Note { pitch: 67, duration: Rational::new(1, 2) },
//! ]);
//!
//! let normalized = key::normalize(part);
//! assert_eq!(
//!     normalized.events[1],
//!     ScoreEvent::Note { pitch: 72, duration: Rational::new(1, 2) }
//! );
//! ```

pub mod event;
pub mod format;
pub mod key;
pub mod midi;
pub mod musicxml;

pub use event::{DecodedEvent, EventKind, KeySignature, Mode, Part, Rational, Score, ScoreEvent};
pub use format::{load_score, Format, EXTENSIONS};
pub use midi::MidiParams;

use std::path::PathBuf;

/// Errors from reading or writing score files.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("MusicXML parse error: {0}")]
    MusicXml(String),

    #[error("unsupported score format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ScoreError>;
