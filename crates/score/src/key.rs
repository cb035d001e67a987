//! Key normalization.
//!
//! Melodies are moved to a shared tonal center before tokenizing so the model
//! sees one key's worth of pitch statistics: major keys go to C major, minor
//! keys to A minor (their relative major tonic goes to C).

use tracing::debug;

use crate::event::{KeySignature, Part, ScoreEvent};

/// Find the governing key signature of a part.
///
/// Only a key signature that appears before the first sounding event counts;
/// the scan stops at whichever of the two comes first.
pub fn find_key(part: &Part) -> Option<KeySignature> {
    for event in &part.events {
        match event {
            ScoreEvent::KeySignature(key) => return Some(*key),
            e if e.is_sounding() => return None,
            _ => continue,
        }
    }
    None
}

/// Smallest transposition (in -6..=5 semitones) that moves `tonic` to C.
///
/// A tritone is ambiguous; it resolves downward.
pub fn transposition_to_c(tonic: u8) -> i8 {
    let up = ((12 - tonic % 12) % 12) as i8;
    if up > 5 {
        up - 12
    } else {
        up
    }
}

/// Transpose a part to C major / A minor.
///
/// Parts with no leading key signature are assumed to be in C already and
/// come back untouched.
pub fn normalize(part: Part) -> Part {
    let Some(key) = find_key(&part) else {
        return part;
    };

    let semitones = transposition_to_c(key.canonical_tonic());
    debug!(key = %key, semitones, "normalizing key");
    part.transpose(semitones)
}
