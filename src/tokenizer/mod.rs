mod error;
mod external;
mod source_file;


pub use error::TokenizeError;
pub use external::{DEFAULT_CHECK_SYNTAX_FLAG, ExternalTokenizer, InputMode, decode_output};

use crate::lexeme::Token;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Tokens and syntax tree for one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parsed {
    pub tokens: Vec<Token>,
    /// Opaque to this crate; stored as-is
    pub ast: serde_json::Value,
}

/// Source handed to a tokenizer
pub enum SourceInput<'a> {
    /// Encoded as UTF-8
    Text(&'a str),
    Bytes(&'a [u8]),
    /// An already-open stream, read to the end
    Reader(&'a mut dyn Read),
}

impl<'a> From<&'a str> for SourceInput<'a> {
    fn from(text: &'a str) -> Self {
        SourceInput::Text(text)
    }
}

impl<'a> From<&'a [u8]> for SourceInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        SourceInput::Bytes(bytes)
    }
}

/// Core trait every tokenizer implements.
///
/// The worker only sees this seam, so an in-process lexer can replace the
/// subprocess without touching the mining loop.
pub trait Tokenizer: Send + Sync {
    /// Lex and parse a source file
    ///
    /// # Errors
    /// `TokenizeError::Syntax` when the source is malformed; anything else is
    /// an unexpected fault.
    fn tokenize(&self, source: SourceInput<'_>) -> Result<Parsed, TokenizeError>;

    /// Only validate the source
    fn check_syntax(&self, source: SourceInput<'_>) -> Result<bool, TokenizeError>;
}
