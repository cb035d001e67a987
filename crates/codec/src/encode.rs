//! Score events to tokens.

use score::{key, Part, Rational, Score, ScoreEvent};
use tracing::debug;

use crate::token::{EncodedSong, Token};

/// One sixteenth note: the default time resolution of a token.
pub const DEFAULT_STEP: Rational = Rational::new_raw(1, 4);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("event {index} lasts {duration} quarters, not a positive multiple of {step}")]
    InvalidDuration {
        index: usize,
        duration: Rational,
        step: Rational,
    },

    #[error("score has no parts")]
    NoMelody,
}

/// Quantizing encoder for a single melodic line.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    step: Rational,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder { step: DEFAULT_STEP }
    }
}

impl Encoder {
    /// `step` is the duration of one token in quarter notes and must be positive.
    pub fn new(step: Rational) -> Self {
        Encoder { step }
    }

    pub fn step(&self) -> Rational {
        self.step
    }

    /// How many tokens `duration` takes, if it is a whole positive number of steps.
    pub fn steps(&self, duration: Rational) -> Option<usize> {
        if *self.step.numer() <= 0 {
            return None;
        }
        let steps = duration / self.step;
        if steps.is_integer() && steps.to_integer() > 0 {
            Some(steps.to_integer() as usize)
        } else {
            None
        }
    }

    /// Encode a part as tokens.
    ///
    /// One event whose duration doesn't fit the grid invalidates the whole
    /// song; nothing partial comes back.
    pub fn encode(&self, part: &Part) -> Result<EncodedSong, EncodeError> {
        let mut song = EncodedSong::default();

        for (index, event) in part.events.iter().enumerate() {
            let (onset, duration) = match event {
                ScoreEvent::Note { pitch, duration } => (Token::pitch(*pitch), *duration),
                ScoreEvent::Rest { duration } => (Token::Rest, *duration),
                // Melody only: keep the last pitch of the chord
                ScoreEvent::Chord { pitches, duration } => match pitches.last() {
                    Some(pitch) => (Token::pitch(*pitch), *duration),
                    None => (Token::Rest, *duration),
                },
                ScoreEvent::KeySignature(_) | ScoreEvent::Other => continue,
            };

            let steps = self.steps(duration).ok_or(EncodeError::InvalidDuration {
                index,
                duration,
                step: self.step,
            })?;

            song.push(onset);
            song.extend(std::iter::repeat(Token::Hold).take(steps - 1));
        }

        Ok(song)
    }

    /// Normalize the key of the score's first part and encode it.
    pub fn encode_score(&self, score: Score) -> Result<EncodedSong, EncodeError> {
        let melody = score.into_melody().ok_or(EncodeError::NoMelody)?;
        let song = self.encode(&key::normalize(melody))?;
        debug!(tokens = song.len(), "encoded melody");
        Ok(song)
    }
}
