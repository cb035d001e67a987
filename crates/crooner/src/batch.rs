//! Directory walking and parallel encoding.
//!
//! Every file is handled on its own: a parse failure or an off-grid duration
//! drops that one song, gets logged and counted, and the batch carries on.

use std::path::{Path, PathBuf};

use codec::{EncodeError, EncodedSong, Encoder};
use croonconf::EncodingConfig;
use rayon::prelude::*;
use score::ScoreError;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Why a file produced no song.
#[derive(Debug, thiserror::Error)]
pub enum SongFailure {
    #[error(transparent)]
    Parse(#[from] ScoreError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Counts for one batch run, printed at the end of every command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub files: usize,
    pub encoded: usize,
    pub parse_failures: usize,
    pub invalid_durations: usize,
    pub empty_scores: usize,
    pub unknown_seed_tokens: usize,
    pub generation_failures: usize,
    pub generated: usize,
}

impl BatchReport {
    pub fn record_failure(&mut self, failure: &SongFailure) {
        match failure {
            SongFailure::Parse(_) => self.parse_failures += 1,
            SongFailure::Encode(EncodeError::InvalidDuration { .. }) => self.invalid_durations += 1,
            SongFailure::Encode(EncodeError::NoMelody) => self.empty_scores += 1,
        }
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.files += other.files;
        self.encoded += other.encoded;
        self.parse_failures += other.parse_failures;
        self.invalid_durations += other.invalid_durations;
        self.empty_scores += other.empty_scores;
        self.unknown_seed_tokens += other.unknown_seed_tokens;
        self.generation_failures += other.generation_failures;
        self.generated += other.generated;
    }
}

/// Allow-listed score files under `root`, in a stable order.
///
/// Unreadable directory entries are logged and skipped.
pub fn score_files<'a>(root: &Path, encoding: &'a EncodingConfig) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(move |path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| encoding.accepts(ext))
        })
}

/// Parse, normalize and encode one file.
pub fn encode_file(path: &Path, encoder: &Encoder) -> Result<EncodedSong, SongFailure> {
    let score = score::load_score(path)?;
    let song = encoder.encode_score(score)?;
    debug!(path = %path.display(), tokens = song.len(), "encoded");
    Ok(song)
}

/// Encode files in parallel. The result keeps input order, with `None` for
/// every file that failed.
pub fn encode_files(paths: &[PathBuf], encoder: &Encoder) -> (Vec<Option<EncodedSong>>, BatchReport) {
    let results: Vec<Result<EncodedSong, SongFailure>> =
        paths.par_iter().map(|path| encode_file(path, encoder)).collect();

    let mut report = BatchReport {
        files: paths.len(),
        ..Default::default()
    };

    let songs = results
        .into_iter()
        .zip(paths)
        .map(|(result, path)| match result {
            Ok(song) => {
                report.encoded += 1;
                Some(song)
            }
            Err(failure) => {
                warn!(path = %path.display(), error = %failure, "skipping song");
                report.record_failure(&failure);
                None
            }
        })
        .collect();

    info!(files = report.files, encoded = report.encoded, "encoding finished");
    (songs, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use score::{DecodedEvent, MidiParams, Rational};
    use std::fs;

    fn write_midi(path: &Path, events: &[DecodedEvent]) {
        score::midi::write_events(path, events, &MidiParams::default()).unwrap();
    }

    #[test]
    fn walk_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("b.mid"), b"").unwrap();
        fs::write(dir.path().join("a.MusicXML"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("nested/deeper/c.krn"), b"").unwrap();

        let encoding = EncodingConfig::default();
        let names: Vec<String> = score_files(dir.path(), &encoding)
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.MusicXML", "b.mid", "c.krn"]);
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.mid");
        let garbage = dir.path().join("garbage.mid");
        let triplet = dir.path().join("triplet.mid");
        let q = |n, d| Rational::new(n, d);

        write_midi(&good, &[DecodedEvent::note(60, q(1, 2), q(0, 1))]);
        fs::write(&garbage, b"not midi at all").unwrap();
        write_midi(&triplet, &[DecodedEvent::note(60, q(1, 3), q(0, 1))]);

        let paths = vec![good, garbage, triplet];
        let (songs, report) = encode_files(&paths, &Encoder::default());

        assert_eq!(songs.len(), 3);
        assert_eq!(songs[0].as_ref().map(|s| s.to_string()), Some("60 -".to_string()));
        assert!(songs[1].is_none());
        assert!(songs[2].is_none());
        assert_eq!(
            report,
            BatchReport {
                files: 3,
                encoded: 1,
                parse_failures: 1,
                invalid_durations: 1,
                ..Default::default()
            }
        );
    }
}
