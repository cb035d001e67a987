//! The integer corpus: every valid song as a list of vocabulary ids.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::token::EncodedSong;
use crate::vocab::Vocabulary;
use crate::CorpusError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    songs: Vec<Vec<usize>>,
}

/// Build the vocabulary over all valid songs, then map each through it.
///
/// `None` entries are songs that failed to encode and contribute nothing.
pub fn build(songs: &[Option<EncodedSong>]) -> (Vocabulary, Corpus) {
    let vocabulary = Vocabulary::build(songs);
    let corpus = Corpus {
        songs: songs
            .iter()
            .flatten()
            // every token is in the vocabulary, it was built from these songs
            .map(|song| song.iter().filter_map(|t| vocabulary.id(t)).collect())
            .collect(),
    };
    info!(
        songs = corpus.len(),
        skipped = songs.len() - corpus.len(),
        tokens = vocabulary.len(),
        "built corpus"
    );
    (vocabulary, corpus)
}

impl Corpus {
    pub fn new(songs: Vec<Vec<usize>>) -> Self {
        Corpus { songs }
    }

    pub fn songs(&self) -> &[Vec<usize>] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.songs.iter().map(Vec::as_slice)
    }

    /// Total number of ids across all songs.
    pub fn token_count(&self) -> usize {
        self.songs.iter().map(Vec::len).sum()
    }

    /// Check every id indexes into a vocabulary of `vocab_size` entries.
    pub fn validate(&self, vocab_size: usize) -> Result<(), CorpusError> {
        for (song, ids) in self.songs.iter().enumerate() {
            if let Some((position, &id)) = ids.iter().enumerate().find(|(_, id)| **id >= vocab_size) {
                return Err(CorpusError::IdOutOfRange {
                    song,
                    position,
                    id,
                    vocab_size,
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CorpusError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), songs = self.len(), "saved corpus");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(bincode::deserialize(&bytes)?)
    }
}
