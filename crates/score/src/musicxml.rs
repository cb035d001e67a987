//! Uncompressed MusicXML (score-partwise) reader.
//!
//! Only what a single melodic line needs is read: divisions, key signatures,
//! notes, rests, `<forward>` gaps and chord membership. Secondary voices are
//! skipped, as are grace notes, which carry no duration.

use roxmltree::{Document, Node};
use tracing::debug;

use crate::event::{KeySignature, Mode, Part, Rational, Score, ScoreEvent};
use crate::{Result, ScoreError};

/// Parse a MusicXML document into a score.
pub fn read_score(text: &str) -> Result<Score> {
    let doc = Document::parse(text).map_err(|e| ScoreError::MusicXml(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(ScoreError::MusicXml(format!(
            "unsupported root element <{}>",
            root.tag_name().name()
        )));
    }

    let title = child(root, "work")
        .and_then(|work| child_text(work, "work-title"))
        .or_else(|| child_text(root, "movement-title"))
        .map(str::to_string);

    let part_names: Vec<(String, String)> = child(root, "part-list")
        .map(|list| {
            list.children()
                .filter(|n| n.has_tag_name("score-part"))
                .filter_map(|sp| {
                    let id = sp.attribute("id")?;
                    let name = child_text(sp, "part-name")?;
                    Some((id.to_string(), name.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut parts = Vec::new();
    for part_node in root.children().filter(|n| n.has_tag_name("part")) {
        let mut part = read_part(part_node)?;
        part.name = part_node.attribute("id").and_then(|id| {
            part_names
                .iter()
                .find(|(pid, _)| pid == id)
                .map(|(_, name)| name.clone())
        });
        parts.push(part);
    }

    debug!(parts = parts.len(), title = ?title, "parsed MusicXML score");
    Ok(Score { title, parts })
}

fn read_part(part: Node) -> Result<Part> {
    let mut divisions: i32 = 1;
    let mut events: Vec<ScoreEvent> = Vec::new();

    for measure in part.children().filter(|n| n.has_tag_name("measure")) {
        for element in measure.children().filter(Node::is_element) {
            match element.tag_name().name() {
                "attributes" => {
                    if let Some(d) = child_text(element, "divisions") {
                        divisions = parse_number(d, "divisions")?;
                        if divisions <= 0 {
                            return Err(ScoreError::MusicXml(format!(
                                "non-positive divisions {}",
                                divisions
                            )));
                        }
                    }
                    if let Some(key) = child(element, "key").and_then(read_key) {
                        events.push(ScoreEvent::KeySignature(key));
                    }
                }
                "note" => read_note(element, divisions, &mut events)?,
                // An invisible rest in the melody voice still takes time
                "forward" if in_melody_voice(element) => {
                    if let Some(duration) = child_text(element, "duration") {
                        events.push(ScoreEvent::Rest {
                            duration: Rational::new(parse_number(duration, "duration")?, divisions),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    Ok(Part::new(events))
}

fn read_key(key: Node) -> Option<KeySignature> {
    let fifths: i8 = child_text(key, "fifths")?.trim().parse().ok()?;
    let mode = match child_text(key, "mode").map(str::trim) {
        Some("minor") => Mode::Minor,
        _ => Mode::Major,
    };
    Some(KeySignature::from_fifths(fifths, mode))
}

fn read_note(note: Node, divisions: i32, events: &mut Vec<ScoreEvent>) -> Result<()> {
    if child(note, "grace").is_some() {
        return Ok(());
    }
    if !in_melody_voice(note) {
        return Ok(());
    }

    let Some(duration) = child_text(note, "duration") else {
        return Ok(());
    };
    let duration = Rational::new(parse_number(duration, "duration")?, divisions);

    if child(note, "rest").is_some() {
        events.push(ScoreEvent::Rest { duration });
        return Ok(());
    }

    let pitch = child(note, "pitch")
        .ok_or_else(|| ScoreError::MusicXml("note without pitch or rest".to_string()))
        .and_then(read_pitch)?;

    if child(note, "chord").is_some() {
        match events.last_mut() {
            Some(last @ ScoreEvent::Note { .. }) => {
                if let ScoreEvent::Note { pitch: first, duration: d } = *last {
                    *last = ScoreEvent::Chord {
                        pitches: vec![first, pitch],
                        duration: d,
                    };
                }
            }
            Some(ScoreEvent::Chord { pitches, .. }) => pitches.push(pitch),
            // Nothing to stack on: the chord note takes no time of its own
            _ => {}
        }
        return Ok(());
    }

    events.push(ScoreEvent::Note { pitch, duration });
    Ok(())
}

/// Elements without a `<voice>` belong to voice 1.
fn in_melody_voice(element: Node) -> bool {
    child_text(element, "voice").map_or(true, |voice| voice.trim() == "1")
}

fn read_pitch(pitch: Node) -> Result<u8> {
    let step = match child_text(pitch, "step").map(str::trim) {
        Some("C") => 0,
        Some("D") => 2,
        Some("E") => 4,
        Some("F") => 5,
        Some("G") => 7,
        Some("A") => 9,
        Some("B") => 11,
        other => {
            return Err(ScoreError::MusicXml(format!("invalid pitch step {:?}", other)));
        }
    };
    // Microtonal alters round to the nearest semitone
    let alter = child_text(pitch, "alter")
        .and_then(|a| a.trim().parse::<f64>().ok())
        .map(|a| a.round() as i32)
        .unwrap_or(0);
    let octave: i32 = match child_text(pitch, "octave") {
        Some(o) => parse_number(o, "octave")?,
        None => 4,
    };

    Ok(((octave + 1) * 12 + step + alter).clamp(0, 127) as u8)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text())
}

fn parse_number(text: &str, what: &str) -> Result<i32> {
    text.trim()
        .parse()
        .map_err(|_| ScoreError::MusicXml(format!("invalid {} '{}'", what, text.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWINKLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <work><work-title>Twinkle</work-title></work>
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>4</divisions>
        <key><fifths>2</fifths><mode>major</mode></key>
      </attributes>
      <note><pitch><step>D</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice></note>
      <note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>2</duration></note>
      <note><rest/><duration>2</duration></note>
      <note><grace/><pitch><step>E</step><octave>4</octave></pitch></note>
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>8</duration></note>
      <note><chord/><pitch><step>D</step><octave>5</octave></pitch><duration>8</duration></note>
      <note><pitch><step>B</step><octave>3</octave></pitch><duration>8</duration><voice>2</voice></note>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn reads_melody_line() {
        let score = read_score(TWINKLE).unwrap();
        assert_eq!(score.title.as_deref(), Some("Twinkle"));
        assert_eq!(score.parts.len(), 1);

        let part = &score.parts[0];
        assert_eq!(part.name.as_deref(), Some("Flute"));
        assert_eq!(
            part.events,
            vec![
                ScoreEvent::KeySignature(KeySignature::new(2, Mode::Major)),
                ScoreEvent::Note { pitch: 62, duration: Rational::new(1, 1) },
                ScoreEvent::Note { pitch: 66, duration: Rational::new(1, 2) },
                ScoreEvent::Rest { duration: Rational::new(1, 2) },
                ScoreEvent::Chord { pitches: vec![69, 74], duration: Rational::new(2, 1) },
            ]
        );
    }

    #[test]
    fn minor_mode_key() {
        let xml = r#"<score-partwise><part id="P1"><measure>
            <attributes><divisions>1</divisions><key><fifths>-3</fifths><mode>minor</mode></key></attributes>
            <note><pitch><step>C</step><octave>4</octave></pitch><duration>3</duration></note>
        </measure></part></score-partwise>"#;

        let score = read_score(xml).unwrap();
        assert_eq!(
            score.parts[0].events[0],
            ScoreEvent::KeySignature(KeySignature::new(0, Mode::Minor))
        );
        assert_eq!(
            score.parts[0].events[1],
            ScoreEvent::Note { pitch: 60, duration: Rational::from_integer(3) }
        );
    }

    #[test]
    fn forward_in_melody_voice_is_a_rest() {
        let xml = r#"<score-partwise><part id="P1"><measure>
            <attributes><divisions>2</divisions></attributes>
            <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
            <forward><duration>1</duration><voice>1</voice></forward>
            <forward><duration>4</duration><voice>2</voice></forward>
            <forward><duration>3</duration></forward>
            <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
        </measure></part></score-partwise>"#;

        let score = read_score(xml).unwrap();
        assert_eq!(
            score.parts[0].events,
            vec![
                ScoreEvent::Note { pitch: 60, duration: Rational::new(1, 1) },
                ScoreEvent::Rest { duration: Rational::new(1, 2) },
                ScoreEvent::Rest { duration: Rational::new(3, 2) },
                ScoreEvent::Note { pitch: 62, duration: Rational::new(1, 1) },
            ]
        );
    }

    #[test]
    fn chord_note_after_rest_adds_no_time() {
        let xml = r#"<score-partwise><part id="P1"><measure>
            <attributes><divisions>1</divisions></attributes>
            <note><rest/><duration>1</duration></note>
            <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
            <note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration></note>
        </measure></part></score-partwise>"#;

        let score = read_score(xml).unwrap();
        assert_eq!(
            score.parts[0].events,
            vec![
                ScoreEvent::Rest { duration: Rational::from_integer(1) },
                ScoreEvent::Note { pitch: 67, duration: Rational::from_integer(1) },
            ]
        );
    }

    #[test]
    fn rejects_timewise_scores() {
        let err = read_score("<score-timewise/>").unwrap_err();
        assert!(matches!(err, ScoreError::MusicXml(_)));
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = read_score("<score-partwise><part>").unwrap_err();
        assert!(matches!(err, ScoreError::MusicXml(_)));
    }
}
