use std::borrow::Cow;
use thiserror::Error;

use super::{Location, Token, TokenKind};

pub const IDENTIFIER: &str = "<IDENTIFIER>";
pub const NUMBER: &str = "<NUMBER>";
pub const STRING: &str = "<STRING>";
pub const REGEXP: &str = "<REGEXP>";
pub const NULL: &str = "null";
pub const STANDALONE_TEMPLATE: &str = "<STANDALONE-TEMPLATE>";
pub const TEMPLATE_HEAD: &str = "<TEMPLATE-HEAD>";
pub const TEMPLATE_MIDDLE: &str = "<TEMPLATE-MIDDLE>";
pub const TEMPLATE_TAIL: &str = "<TEMPLATE-TAIL>";

/// Template delimiters
pub(crate) const QUOTE: char = '`';
pub(crate) const INTERPOLATION_OPEN: &str = "${";
pub(crate) const INTERPOLATION_CLOSE: char = '}';

/// A token fell outside the canonical alphabet. Either the lexer emitted
/// something new or the canonicalizer is out of date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizeError {
    #[error("Unsupported token kind: {0}")]
    UnsupportedTokenKind(String),

    #[error("Unhandled template literal: {0}")]
    MalformedTemplate(String),
}

/// Map a token onto its canonical vocabulary symbol.
///
/// Keywords, punctuators and booleans are already a small exact alphabet and
/// come back verbatim (borrowed). Everything open-ended collapses to a fixed
/// placeholder.
pub fn canonicalize(token: &Token) -> Result<Cow<'_, str>, CanonicalizeError> {
    let text = token.text.as_str();
    let symbol = match &token.kind {
        TokenKind::Boolean | TokenKind::Keyword | TokenKind::Punctuator => Cow::Borrowed(text),
        TokenKind::Null => Cow::Borrowed(NULL),
        TokenKind::Identifier => Cow::Borrowed(IDENTIFIER),
        TokenKind::Numeric => Cow::Borrowed(NUMBER),
        TokenKind::String => Cow::Borrowed(STRING),
        TokenKind::RegularExpression => Cow::Borrowed(REGEXP),
        TokenKind::Template => Cow::Borrowed(template_shape(text)?),
        TokenKind::Other(name) => {
            return Err(CanonicalizeError::UnsupportedTokenKind(name.clone()));
        }
    };
    Ok(symbol)
}

/// Classify a template fragment by its opening and closing delimiters
pub fn template_shape(text: &str) -> Result<&'static str, CanonicalizeError> {
    if text.chars().count() < 2 {
        return Err(CanonicalizeError::MalformedTemplate(text.to_string()));
    }

    let opens_quote = text.starts_with(QUOTE);
    let opens_continuation = text.starts_with(INTERPOLATION_CLOSE);
    let closes_quote = text.ends_with(QUOTE);
    let closes_interpolation = text.ends_with(INTERPOLATION_OPEN);

    match (opens_quote, opens_continuation, closes_quote, closes_interpolation) {
        (true, _, true, _) => Ok(STANDALONE_TEMPLATE),
        (true, _, _, true) => Ok(TEMPLATE_HEAD),
        (_, true, true, _) => Ok(TEMPLATE_TAIL),
        (_, true, _, true) => Ok(TEMPLATE_MIDDLE),
        _ => Err(CanonicalizeError::MalformedTemplate(text.to_string())),
    }
}

/// Canonical symbols for a token stream, paired with where each token sits.
///
/// Lazy; stops being useful at the first error, which callers should treat as
/// fatal for the stream.
pub fn vocabularize<'a, I>(
    tokens: I,
) -> impl Iterator<Item = Result<(Location, Cow<'a, str>), CanonicalizeError>>
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens
        .into_iter()
        .map(|token| canonicalize(token).map(|symbol| (token.location(), symbol)))
}
