//! Score events, parts, and the decoded timeline.

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

/// Exact duration or offset in quarter notes.
pub type Rational = Rational32;

const NOTE_NAMES_SHARP: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const NOTE_NAMES_FLAT: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

/// Pitch classes conventionally spelled with flats.
const FLAT_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10]; // Db, Eb, F, Gb, Ab, Bb

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// Key signature: tonic pitch class (C=0 .. B=11) and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    pub tonic: u8,
    pub mode: Mode,
}

impl KeySignature {
    pub fn new(tonic: u8, mode: Mode) -> Self {
        KeySignature {
            tonic: tonic % 12,
            mode,
        }
    }

    /// Build from a circle-of-fifths position (sharps positive, flats
    /// negative), as stored by both MIDI and MusicXML.
    pub fn from_fifths(fifths: i8, mode: Mode) -> Self {
        let major_tonic = (fifths as i16 * 7).rem_euclid(12) as u8;
        let tonic = match mode {
            Mode::Major => major_tonic,
            Mode::Minor => (major_tonic + 9) % 12,
        };
        KeySignature { tonic, mode }
    }

    /// Tonic of the major key sharing this signature.
    pub fn canonical_tonic(&self) -> u8 {
        match self.mode {
            Mode::Major => self.tonic,
            Mode::Minor => (self.tonic + 3) % 12,
        }
    }

    pub fn transpose(&self, semitones: i8) -> Self {
        KeySignature {
            tonic: (self.tonic as i16 + semitones as i16).rem_euclid(12) as u8,
            mode: self.mode,
        }
    }

    /// Root note name, preferring flats where that is the usual spelling.
    pub fn tonic_name(&self) -> &'static str {
        if FLAT_ROOTS.contains(&self.tonic) {
            NOTE_NAMES_FLAT[self.tonic as usize]
        } else {
            NOTE_NAMES_SHARP[self.tonic as usize]
        }
    }
}

impl std::fmt::Display for KeySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.tonic_name(), self.mode)
    }
}

/// One element of a melodic line, in document order.
///
/// `pitch` values are MIDI note numbers. Chord pitches keep the order the
/// reader produced them in; the tokenizer only looks at the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreEvent {
    Note { pitch: u8, duration: Rational },
    Rest { duration: Rational },
    Chord { pitches: Vec<u8>, duration: Rational },
    KeySignature(KeySignature),
    Other,
}

impl ScoreEvent {
    /// Notes, rests and chords take up time; everything else doesn't.
    pub fn is_sounding(&self) -> bool {
        self.duration().is_some()
    }

    pub fn duration(&self) -> Option<Rational> {
        match self {
            ScoreEvent::Note { duration, .. }
            | ScoreEvent::Rest { duration }
            | ScoreEvent::Chord { duration, .. } => Some(*duration),
            ScoreEvent::KeySignature(_) | ScoreEvent::Other => None,
        }
    }

    fn transpose(self, semitones: i8) -> Self {
        match self {
            ScoreEvent::Note { pitch, duration } => ScoreEvent::Note {
                pitch: shift_pitch(pitch, semitones),
                duration,
            },
            ScoreEvent::Chord { pitches, duration } => ScoreEvent::Chord {
                pitches: pitches
                    .into_iter()
                    .map(|p| shift_pitch(p, semitones))
                    .collect(),
                duration,
            },
            ScoreEvent::KeySignature(key) => ScoreEvent::KeySignature(key.transpose(semitones)),
            other => other,
        }
    }
}

/// Apply a semitone offset and clamp to the MIDI range
fn shift_pitch(pitch: u8, semitones: i8) -> u8 {
    (pitch as i16 + semitones as i16).clamp(0, 127) as u8
}

/// A single monophonic line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    pub name: Option<String>,
    pub events: Vec<ScoreEvent>,
}

impl Part {
    pub fn new(events: Vec<ScoreEvent>) -> Self {
        Part { name: None, events }
    }

    /// Shift every pitched element (and key signature) by `semitones`.
    pub fn transpose(self, semitones: i8) -> Self {
        if semitones == 0 {
            return self;
        }
        Part {
            name: self.name,
            events: self
                .events
                .into_iter()
                .map(|e| e.transpose(semitones))
                .collect(),
        }
    }
}

/// A parsed score: title plus parts in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub title: Option<String>,
    pub parts: Vec<Part>,
}

impl Score {
    /// The first part, conventionally the melody.
    pub fn into_melody(self) -> Option<Part> {
        self.parts.into_iter().next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Note { pitch: u8 },
    Rest,
}

/// A note or rest placed on the timeline, as rebuilt from tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub kind: EventKind,
    pub duration: Rational,
    pub offset: Rational,
}

impl DecodedEvent {
    pub fn note(pitch: u8, duration: Rational, offset: Rational) -> Self {
        DecodedEvent {
            kind: EventKind::Note { pitch },
            duration,
            offset,
        }
    }

    pub fn rest(duration: Rational, offset: Rational) -> Self {
        DecodedEvent {
            kind: EventKind::Rest,
            duration,
            offset,
        }
    }

    pub fn pitch(&self) -> Option<u8> {
        match self.kind {
            EventKind::Note { pitch } => Some(pitch),
            EventKind::Rest => None,
        }
    }

    pub fn end(&self) -> Rational {
        self.offset + self.duration
    }
}
