//! Standard MIDI File adapters.
//!
//! Reading turns each note-bearing track into a monophonic `Part`: notes
//! sharing an onset become a chord, gaps become rests, and overlaps are cut at
//! the next onset. Key-signature meta events from any track (usually the
//! conductor track in format 1 files) are interleaved into every part.
//!
//! Writing renders a decoded timeline as an SMF format 0 file.

use std::collections::HashMap;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use tracing::debug;

use crate::event::{DecodedEvent, EventKind, KeySignature, Mode, Part, Rational, Score, ScoreEvent};
use crate::{Result, ScoreError};

/// Ticks per quarter note used for output, and for SMPTE-timed input.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Parameters for MIDI rendering
#[derive(Debug, Clone)]
pub struct MidiParams {
    /// MIDI velocity for notes (1-127)
    pub velocity: u8,
    /// Ticks per quarter note
    pub ticks_per_beat: u16,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// General MIDI program (0-127), 0 is acoustic grand piano
    pub program: u8,
    pub bpm: u16,
}

impl Default for MidiParams {
    fn default() -> Self {
        MidiParams {
            velocity: 80,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            channel: 0,
            program: 0,
            bpm: 120,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RawNote {
    onset: u64,
    offset: u64,
    pitch: u8,
}

/// Parse SMF bytes into a score with one part per note-bearing track.
pub fn read_score(bytes: &[u8]) -> Result<Score> {
    let smf = Smf::parse(bytes).map_err(|e| ScoreError::Midi(e.to_string()))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(_, _) => DEFAULT_TICKS_PER_BEAT,
    };

    let mut keys: Vec<(u64, KeySignature)> = Vec::new();
    let mut tracks: Vec<(Option<String>, Vec<RawNote>)> = Vec::new();

    for track in &smf.tracks {
        let mut current_tick: u64 = 0;
        let mut name = None;
        let mut notes = Vec::new();
        // Map (channel, pitch) → onset ticks, stacked for repeated note-ons
        let mut pending: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::KeySignature(fifths, minor)) => {
                    let mode = if minor { Mode::Minor } else { Mode::Major };
                    keys.push((current_tick, KeySignature::from_fifths(fifths, mode)));
                }
                TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                    name = Some(String::from_utf8_lossy(raw).trim().to_string());
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push(current_tick);
                        }
                        // vel=0 NoteOn is NoteOff
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            if let Some(onset) = pending
                                .get_mut(&(ch, key.as_int()))
                                .and_then(|stack| stack.pop())
                            {
                                notes.push(RawNote {
                                    onset,
                                    offset: current_tick,
                                    pitch: key.as_int(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close any unclosed notes at the track's final tick
        for ((_, pitch), stack) in pending {
            for onset in stack {
                notes.push(RawNote {
                    onset,
                    offset: current_tick,
                    pitch,
                });
            }
        }

        if !notes.is_empty() {
            tracks.push((name, notes));
        }
    }

    keys.sort_by_key(|(tick, _)| *tick);

    let parts: Vec<Part> = tracks
        .into_iter()
        .map(|(name, notes)| {
            let mut part = build_part(notes, &keys, ppq);
            part.name = name.filter(|n| !n.is_empty());
            part
        })
        .collect();

    debug!(parts = parts.len(), ppq, keys = keys.len(), "parsed MIDI score");

    Ok(Score { title: None, parts })
}

/// Flatten one track's notes into a monophonic event list.
fn build_part(mut notes: Vec<RawNote>, keys: &[(u64, KeySignature)], ppq: u16) -> Part {
    notes.sort_by_key(|n| (n.onset, n.pitch));

    // (onset, offset, pitches) per distinct onset
    let mut groups: Vec<(u64, u64, Vec<u8>)> = Vec::new();
    for note in notes.into_iter().filter(|n| n.offset > n.onset) {
        match groups.last_mut() {
            Some(group) if group.0 == note.onset => {
                group.1 = group.1.max(note.offset);
                group.2.push(note.pitch);
            }
            _ => groups.push((note.onset, note.offset, vec![note.pitch])),
        }
    }

    let mut events = Vec::new();
    let mut keys = keys.iter().peekable();
    let mut cursor: u64 = 0;

    for (i, (onset, offset, pitches)) in groups.iter().enumerate() {
        while let Some((_, key)) = keys.next_if(|(tick, _)| tick <= onset) {
            events.push(ScoreEvent::KeySignature(*key));
        }

        if *onset > cursor {
            events.push(ScoreEvent::Rest {
                duration: ticks_to_quarters(onset - cursor, ppq),
            });
        }

        let end = match groups.get(i + 1) {
            Some((next_onset, _, _)) => (*offset).min(*next_onset),
            None => *offset,
        };
        let duration = ticks_to_quarters(end - onset, ppq);

        events.push(match pitches.as_slice() {
            [pitch] => ScoreEvent::Note {
                pitch: *pitch,
                duration,
            },
            _ => ScoreEvent::Chord {
                pitches: pitches.clone(),
                duration,
            },
        });
        cursor = end;
    }

    Part::new(events)
}

fn ticks_to_quarters(ticks: u64, ppq: u16) -> Rational {
    Rational::new(ticks.min(i32::MAX as u64) as i32, ppq.max(1) as i32)
}

fn quarters_to_ticks(quarters: Rational, ticks_per_beat: u16) -> u64 {
    (quarters * Rational::from_integer(ticks_per_beat as i32))
        .to_integer()
        .max(0) as u64
}

/// Render a decoded timeline as SMF format 0 bytes.
pub fn events_to_smf(events: &[DecodedEvent], params: &MidiParams) -> Result<Vec<u8>> {
    let channel = u4::new(params.channel.min(15));
    let mut track: Track<'static> = Vec::new();

    let tempo = 60_000_000 / params.bpm.max(1) as u32;
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(params.program.min(127)),
            },
        },
    });

    // (tick, is_on, pitch); offs sort before ons on the same tick
    let mut messages: Vec<(u64, bool, u8)> = Vec::new();
    for event in events {
        if let EventKind::Note { pitch } = event.kind {
            let pitch = pitch.min(127);
            messages.push((quarters_to_ticks(event.offset, params.ticks_per_beat), true, pitch));
            messages.push((quarters_to_ticks(event.end(), params.ticks_per_beat), false, pitch));
        }
    }
    messages.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let velocity = u7::new(params.velocity.clamp(1, 127));
    let mut last_tick = 0u64;
    for (tick, is_on, pitch) in messages {
        let key = u7::new(pitch);
        let message = if is_on {
            MidiMessage::NoteOn { key, vel: velocity }
        } else {
            MidiMessage::NoteOff { key, vel: u7::new(0) }
        };
        track.push(TrackEvent {
            delta: u28::new((tick - last_tick) as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    // Trailing rests still count toward the file length
    let end_tick = events
        .iter()
        .map(|e| quarters_to_ticks(e.end(), params.ticks_per_beat))
        .max()
        .unwrap_or(0);
    track.push(TrackEvent {
        delta: u28::new(end_tick.saturating_sub(last_tick) as u32),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(params.ticks_per_beat)),
    ));
    smf.tracks.push(track);

    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| ScoreError::Midi(e.to_string()))?;
    Ok(buf)
}

/// Render a decoded timeline and write it to `path`.
pub fn write_events(path: &Path, events: &[DecodedEvent], params: &MidiParams) -> Result<()> {
    let bytes = events_to_smf(events, params)?;
    std::fs::write(path, bytes).map_err(|source| ScoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
