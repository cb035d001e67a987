//! Fixed-length training windows over the corpus.

use crate::corpus::Corpus;

/// A context of `segment_length` ids and the id that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingWindow {
    pub segment: Vec<usize>,
    pub target: usize,
}

/// Windows for one song.
///
/// The song is padded with `segment_length` fillers in front and one behind,
/// so a song of n ids yields n + 1 windows and the last target is the filler.
pub fn song_windows(
    song: &[usize],
    segment_length: usize,
    filler_id: usize,
) -> impl Iterator<Item = TrainingWindow> {
    let padded: Vec<usize> = std::iter::repeat(filler_id)
        .take(segment_length)
        .chain(song.iter().copied())
        .chain(std::iter::once(filler_id))
        .collect();
    let count = song.len() + 1;

    (0..count).map(move |i| TrainingWindow {
        segment: padded[i..i + segment_length].to_vec(),
        target: padded[i + segment_length],
    })
}

/// Windows for every song in the corpus, song by song.
pub fn training_windows(
    corpus: &Corpus,
    segment_length: usize,
    filler_id: usize,
) -> impl Iterator<Item = TrainingWindow> + '_ {
    corpus
        .iter()
        .flat_map(move |song| song_windows(song, segment_length, filler_id))
}
