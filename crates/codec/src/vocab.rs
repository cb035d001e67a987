//! Token vocabulary: a sorted, duplicate-free list of token strings.
//!
//! A token's id is its index in the list. The filler is always present.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::info;

use crate::token::{EncodedSong, Token};
use crate::VocabularyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<Token>,
    ids: HashMap<Token, usize>,
    filler_id: usize,
}

impl Vocabulary {
    /// Collect every distinct token, add the filler, sort by string form.
    ///
    /// Tokens are deduplicated by spelling, so two values that print the same
    /// share one id.
    pub fn from_tokens<I: IntoIterator<Item = Token>>(tokens: I) -> Self {
        let unique: HashSet<Token> = tokens
            .into_iter()
            .map(Token::canonical)
            .chain(std::iter::once(Token::Filler))
            .collect();
        let mut tokens: Vec<Token> = unique.into_iter().collect();
        tokens.sort_by_cached_key(Token::to_string);
        Self::from_sorted(tokens)
    }

    /// Vocabulary over the valid songs; invalid (`None`) entries are skipped.
    pub fn build(songs: &[Option<EncodedSong>]) -> Self {
        Self::from_tokens(songs.iter().flatten().flat_map(|song| song.iter().copied()))
    }

    fn from_sorted(tokens: Vec<Token>) -> Self {
        let ids: HashMap<Token, usize> = tokens.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        let filler_id = ids.get(&Token::Filler).copied().unwrap_or_default();
        Vocabulary {
            tokens,
            ids,
            filler_id,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Never true: the filler is always there.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn id(&self, token: &Token) -> Option<usize> {
        self.ids.get(&token.canonical()).copied()
    }

    pub fn token(&self, id: usize) -> Option<Token> {
        self.tokens.get(id).copied()
    }

    pub fn filler_id(&self) -> usize {
        self.filler_id
    }

    pub fn encode(&self, song: &EncodedSong) -> Result<Vec<usize>, VocabularyError> {
        song.iter()
            .map(|t| self.id(t).ok_or(VocabularyError::UnknownToken(*t)))
            .collect()
    }

    pub fn decode(&self, ids: &[usize]) -> Result<EncodedSong, VocabularyError> {
        ids.iter()
            .map(|&id| self.token(id).ok_or(VocabularyError::UnknownId(id)))
            .collect()
    }

    /// JSON array of token strings, 4-space indented.
    pub fn to_json(&self) -> Result<String, VocabularyError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&self.tokens, &mut ser)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| VocabularyError::Invalid(e.to_string()))
    }

    /// Parse and check a saved vocabulary: strictly ascending strings, filler included.
    pub fn from_json(text: &str) -> Result<Self, VocabularyError> {
        let raw: Vec<String> = serde_json::from_str(text)?;

        if let Some(pair) = raw.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(VocabularyError::Invalid(format!(
                "entries not strictly ascending at '{}', '{}'",
                pair[0], pair[1]
            )));
        }

        let tokens = raw
            .iter()
            .map(|s| s.parse::<Token>())
            .collect::<Result<Vec<_>, _>>()?;

        if !tokens.contains(&Token::Filler) {
            return Err(VocabularyError::Invalid("missing filler token".to_string()));
        }

        Ok(Self::from_sorted(tokens))
    }

    pub fn save(&self, path: &Path) -> Result<(), VocabularyError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| VocabularyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, self.to_json()?).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), tokens = self.len(), "saved vocabulary");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let text = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn songs(texts: &[Option<&str>]) -> Vec<Option<EncodedSong>> {
        texts.iter().map(|t| t.map(|t| t.parse().unwrap())).collect()
    }

    #[test]
    fn sorted_by_string_form() {
        let vocab = Vocabulary::build(&songs(&[Some("60 - 0"), Some("7 - 62 100")]));
        let strings: Vec<String> = vocab.tokens().iter().map(Token::to_string).collect();
        assert_eq!(strings, vec!["*", "-", "0", "100", "60", "62", "7"]);
        assert_eq!(vocab.filler_id(), 0);
    }

    #[test]
    fn invalid_songs_contribute_nothing() {
        let vocab = Vocabulary::build(&songs(&[None, Some("60"), None]));
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.id(&Token::Pitch(60)), Some(1));
    }

    #[test]
    fn empty_corpus_still_has_filler() {
        let vocab = Vocabulary::build(&[]);
        assert_eq!(vocab.tokens(), &[Token::Filler]);
        assert!(!vocab.is_empty());
    }

    #[test]
    fn ids_and_tokens_agree() {
        let vocab = Vocabulary::build(&songs(&[Some("60 - 0 64 - - 67")]));
        for (id, token) in vocab.tokens().iter().enumerate() {
            assert_eq!(vocab.id(token), Some(id));
            assert_eq!(vocab.token(id), Some(*token));
        }
        assert_eq!(vocab.token(vocab.len()), None);
        assert_eq!(vocab.id(&Token::Pitch(1)), None);
    }

    #[test]
    fn same_spelling_shares_an_id() {
        let vocab = Vocabulary::from_tokens([Token::Pitch(0), Token::Rest, Token::Pitch(60)]);
        let strings: Vec<String> = vocab.tokens().iter().map(Token::to_string).collect();
        assert_eq!(strings, vec!["*", "0", "60"]);
        assert_eq!(vocab.id(&Token::Pitch(0)), vocab.id(&Token::Rest));
        assert_eq!(Vocabulary::from_json(&vocab.to_json().unwrap()).unwrap(), vocab);
    }

    #[test]
    fn unknown_token_on_encode() {
        let vocab = Vocabulary::build(&songs(&[Some("60 -")]));
        let err = vocab.encode(&"60 61".parse().unwrap()).unwrap_err();
        assert!(matches!(err, VocabularyError::UnknownToken(Token::Pitch(61))));
        assert!(matches!(vocab.decode(&[0, 9]), Err(VocabularyError::UnknownId(9))));
    }

    #[test]
    fn json_layout() {
        let vocab = Vocabulary::build(&songs(&[Some("60 - 0")]));
        assert_eq!(
            vocab.to_json().unwrap(),
            "[\n    \"*\",\n    \"-\",\n    \"0\",\n    \"60\"\n]\n"
        );
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vocab.json");
        let vocab = Vocabulary::build(&songs(&[Some("72 - - 0 - 71")]));

        vocab.save(&path).unwrap();
        assert_eq!(Vocabulary::load(&path).unwrap(), vocab);
    }

    #[test]
    fn rejects_unsorted_or_incomplete_files() {
        assert!(matches!(
            Vocabulary::from_json(r#"["*", "60", "0"]"#),
            Err(VocabularyError::Invalid(_))
        ));
        assert!(matches!(
            Vocabulary::from_json(r#"["*", "-", "-"]"#),
            Err(VocabularyError::Invalid(_))
        ));
        assert!(matches!(
            Vocabulary::from_json(r#"["-", "60"]"#),
            Err(VocabularyError::Invalid(_))
        ));
        assert!(matches!(
            Vocabulary::from_json(r#"["*", "x"]"#),
            Err(VocabularyError::Token(_))
        ));
        assert!(matches!(Vocabulary::from_json("{"), Err(VocabularyError::Json(_))));
    }
}
