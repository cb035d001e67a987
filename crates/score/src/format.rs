//! Notation file formats and loading.

use std::path::Path;

use tracing::debug;

use crate::event::Score;
use crate::{midi, musicxml, Result, ScoreError};

/// Recognized notation file extensions, lowercase and without the dot.
pub const EXTENSIONS: [&str; 6] = ["musicxml", "xml", "mxl", "midi", "mid", "krn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    MusicXml,
    /// Zipped MusicXML (`.mxl`)
    CompressedMusicXml,
    Midi,
    /// Humdrum `**kern`
    Kern,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "musicxml" | "xml" => Some(Format::MusicXml),
            "mxl" => Some(Format::CompressedMusicXml),
            "midi" | "mid" => Some(Format::Midi),
            "krn" => Some(Format::Kern),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::MusicXml => "MusicXML",
            Format::CompressedMusicXml => "compressed MusicXML",
            Format::Midi => "MIDI",
            Format::Kern => "Humdrum kern",
        }
    }
}

/// Read and parse a score file, choosing the parser by extension.
pub fn load_score(path: &Path) -> Result<Score> {
    let format = Format::from_path(path).ok_or_else(|| {
        ScoreError::UnsupportedFormat(format!("unrecognized extension on {}", path.display()))
    })?;

    let io_err = |source| ScoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    debug!(path = %path.display(), format = format.name(), "loading score");

    match format {
        Format::Midi => {
            let bytes = std::fs::read(path).map_err(io_err)?;
            midi::read_score(&bytes)
        }
        Format::MusicXml => {
            let text = std::fs::read_to_string(path).map_err(io_err)?;
            musicxml::read_score(&text)
        }
        Format::CompressedMusicXml | Format::Kern => {
            Err(ScoreError::UnsupportedFormat(format.name().to_string()))
        }
    }
}
