//! Tokens back to timed events.

use score::{DecodedEvent, EventKind, Rational};

use crate::encode::DEFAULT_STEP;
use crate::token::Token;

#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    step: Rational,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder { step: DEFAULT_STEP }
    }
}

impl Decoder {
    pub fn new(step: Rational) -> Self {
        Decoder { step }
    }

    pub fn step(&self) -> Rational {
        self.step
    }

    /// Rebuild notes and rests from a token sequence.
    ///
    /// Each onset token opens an event one step long and every following hold
    /// stretches it by one step. The first filler ends the song. Holds that
    /// arrive before any onset have nothing to extend and only move the
    /// timeline forward.
    pub fn decode(&self, tokens: &[Token]) -> Vec<DecodedEvent> {
        let mut events = Vec::new();
        let mut offset = Rational::from_integer(0);
        let mut pending: Option<(EventKind, Rational)> = None;

        for token in tokens {
            let kind = match token {
                Token::Filler => break,
                Token::Hold => {
                    match pending.as_mut() {
                        Some((_, duration)) => *duration += self.step,
                        None => offset += self.step,
                    }
                    continue;
                }
                Token::Pitch(pitch) => EventKind::Note { pitch: *pitch },
                Token::Rest => EventKind::Rest,
            };

            if let Some((kind, duration)) = pending.take() {
                events.push(DecodedEvent { kind, duration, offset });
                offset += duration;
            }
            pending = Some((kind, self.step));
        }

        if let Some((kind, duration)) = pending {
            events.push(DecodedEvent { kind, duration, offset });
        }

        events
    }
}
