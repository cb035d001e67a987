//! Encode → vocabulary → corpus → decode, across module boundaries.

use codec::{corpus, Decoder, EncodedSong, Encoder, Token, Vocabulary};
use pretty_assertions::assert_eq;
use score::{DecodedEvent, KeySignature, Mode, Part, Rational, Score, ScoreEvent};

fn q(n: i32, d: i32) -> Rational {
    Rational::new(n, d)
}

fn note(pitch: u8, sixteenths: i32) -> ScoreEvent {
    ScoreEvent::Note { pitch, duration: q(sixteenths, 4) }
}

fn rest(sixteenths: i32) -> ScoreEvent {
    ScoreEvent::Rest { duration: q(sixteenths, 4) }
}

fn score(events: Vec<ScoreEvent>) -> Score {
    Score {
        title: None,
        parts: vec![Part::new(events)],
    }
}

#[test]
fn note_and_rest_end_to_end() {
    let song = Encoder::default()
        .encode_score(score(vec![note(60, 2), rest(1)]))
        .unwrap();
    let text: Vec<String> = song.iter().map(Token::to_string).collect();
    assert_eq!(text, vec!["60", "-", "0"]);

    assert_eq!(
        Decoder::default().decode(song.tokens()),
        vec![
            DecodedEvent::note(60, q(1, 2), q(0, 1)),
            DecodedEvent::rest(q(1, 4), q(1, 2)),
        ]
    );
}

#[test]
fn decode_inverts_encode() {
    let events = vec![
        note(60, 4),
        note(62, 2),
        rest(2),
        note(64, 1),
        note(64, 1),
        rest(1),
        note(67, 12),
        rest(3),
    ];

    let song = Encoder::default().encode(&Part::new(events.clone())).unwrap();
    let decoded = Decoder::default().decode(song.tokens());

    let mut offset = q(0, 1);
    let expected: Vec<DecodedEvent> = events
        .iter()
        .map(|event| {
            let placed = match event {
                ScoreEvent::Note { pitch, duration } => DecodedEvent::note(*pitch, *duration, offset),
                ScoreEvent::Rest { duration } => DecodedEvent::rest(*duration, offset),
                other => panic!("unexpected {:?}", other),
            };
            offset += placed.duration;
            placed
        })
        .collect();

    assert_eq!(decoded, expected);
}

#[test]
fn one_bad_duration_discards_the_song() {
    let encoder = Encoder::default();
    let results: Vec<Option<EncodedSong>> = vec![
        score(vec![note(60, 4)]),
        score(vec![note(62, 4), ScoreEvent::Note { pitch: 64, duration: q(3, 10) }]),
    ]
    .into_iter()
    .map(|s| encoder.encode_score(s).ok())
    .collect();

    assert!(results[1].is_none());
    let (vocab, corpus) = corpus::build(&results);
    assert_eq!(corpus.len(), 1);
    // nothing from the discarded song leaks into the vocabulary
    assert_eq!(vocab.id(&Token::Pitch(62)), None);
}

#[test]
fn vocabulary_ignores_processing_order() {
    let songs: Vec<Option<EncodedSong>> = ["60 - 0 62", "72 - - 71", "0 - 65 - 64", "100 99"]
        .iter()
        .map(|t| Some(t.parse().unwrap()))
        .collect();
    let mut reversed = songs.clone();
    reversed.reverse();

    let (v1, c1) = corpus::build(&songs);
    let (v2, c2) = corpus::build(&reversed);
    assert_eq!(v1, v2);

    let mut forward: Vec<Vec<usize>> = c1.songs().to_vec();
    let mut backward: Vec<Vec<usize>> = c2.songs().to_vec();
    forward.sort();
    backward.sort();
    assert_eq!(forward, backward);
}

#[test]
fn key_is_normalized_before_encoding() {
    // D major scale fragment lands on C major
    let s = score(vec![
        ScoreEvent::KeySignature(KeySignature::new(2, Mode::Major)),
        note(62, 1),
        note(64, 1),
        note(66, 1),
    ]);
    assert_eq!(
        Encoder::default().encode_score(s).unwrap().to_string(),
        "60 62 64"
    );
}

#[test]
fn vocabulary_file_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocabulary.json");
    let (vocab, _) = corpus::build(&[Some("60 - 0 67 - 65".parse().unwrap())]);

    vocab.save(&path).unwrap();
    let first = std::fs::read(&path).unwrap();
    Vocabulary::load(&path).unwrap().save(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn notes_clamped_to_the_floor_keep_the_vocabulary_loadable() {
    // F major moves down five semitones; pitch 3 bottoms out at 0
    let s = score(vec![
        ScoreEvent::KeySignature(KeySignature::new(5, Mode::Major)),
        note(3, 1),
        rest(1),
        note(65, 2),
    ]);
    let song = Encoder::default().encode_score(s).unwrap();
    assert_eq!(song.tokens(), &[Token::Rest, Token::Rest, Token::Pitch(60), Token::Hold]);

    let (vocab, corpus) = corpus::build(&[Some(song)]);
    let strings: Vec<String> = vocab.tokens().iter().map(Token::to_string).collect();
    assert_eq!(strings, vec!["*", "-", "0", "60"]);
    corpus.validate(vocab.len()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocabulary.json");
    vocab.save(&path).unwrap();
    assert_eq!(Vocabulary::load(&path).unwrap(), vocab);
}
