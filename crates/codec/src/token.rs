//! The token alphabet.
//!
//! Every token stands for one quantization step. Its string form is its
//! identity: it is what gets sorted into the vocabulary and written to disk.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const REST: &str = "0";
pub const HOLD: &str = "-";
pub const FILLER: &str = "*";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid token '{0}'")]
pub struct TokenError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Token {
    /// Onset of a note with this MIDI pitch
    Pitch(u8),
    /// Onset of a rest
    Rest,
    /// Continue whatever started before
    Hold,
    /// Padding before a song and end-of-song marker
    Filler,
}

impl Token {
    /// Onset token for a MIDI pitch. Pitch 0 is spelled like the rest token,
    /// so it becomes one.
    pub fn pitch(pitch: u8) -> Token {
        Token::Pitch(pitch).canonical()
    }

    /// The token this one reads back as from its string form.
    pub fn canonical(self) -> Token {
        match self {
            Token::Pitch(0) => Token::Rest,
            other => other,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pitch(p) => write!(f, "{}", p),
            Token::Rest => f.write_str(REST),
            Token::Hold => f.write_str(HOLD),
            Token::Filler => f.write_str(FILLER),
        }
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REST => Ok(Token::Rest),
            HOLD => Ok(Token::Hold),
            FILLER => Ok(Token::Filler),
            _ => match s.parse::<u8>() {
                // Only the canonical spelling, so "060" can't alias "60"
                Ok(p) if p != 0 && p.to_string() == s => Ok(Token::Pitch(p)),
                _ => Err(TokenError(s.to_string())),
            },
        }
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for Token {
    type Error = TokenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A song as a token sequence, one token per quantization step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedSong(Vec<Token>);

impl EncodedSong {
    pub fn new(tokens: Vec<Token>) -> Self {
        EncodedSong(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    pub fn push(&mut self, token: Token) {
        self.0.push(token);
    }
}

impl FromIterator<Token> for EncodedSong {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        EncodedSong(iter.into_iter().collect())
    }
}

impl Extend<Token> for EncodedSong {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a EncodedSong {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for EncodedSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Whitespace-separated tokens, the same form `Display` writes.
impl FromStr for EncodedSong {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().map(str::parse).collect()
    }
}
