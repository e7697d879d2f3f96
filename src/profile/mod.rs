mod counts;

#[cfg(test)]
mod tests;

pub use counts::CodepointCounts;

use crate::lexeme::{INTERPOLATION_OPEN, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Literal too short to strip its delimiters: {0:?}")]
    MalformedLiteral(String),
}

/// Label a scalar value in U+ notation (`U+0041`, `U+1F618`)
pub fn uplus_label(scalar: char) -> String {
    let ordinal = scalar as u32;
    if ordinal > 0xFFFF {
        format!("U+{:05X}", ordinal)
    } else {
        format!("U+{:04X}", ordinal)
    }
}

/// Strip the surrounding quotes of a string literal
pub fn strip_string(literal: &str) -> Result<&str, ProfileError> {
    strip(literal, 1)
}

/// Strip the delimiters of a template fragment.
///
/// The leading character is always a delimiter (`` ` `` or `}`); the tail is
/// either `` ` `` or `${`.
pub fn strip_template(literal: &str) -> Result<&str, ProfileError> {
    let end_trim = if literal.ends_with(INTERPOLATION_OPEN) {
        2
    } else {
        1
    };
    strip(literal, end_trim)
}

fn strip(literal: &str, end_trim: usize) -> Result<&str, ProfileError> {
    let malformed = || ProfileError::MalformedLiteral(literal.to_string());

    let start = literal.chars().next().map(char::len_utf8).ok_or_else(malformed)?;
    let end = literal
        .char_indices()
        .rev()
        .nth(end_trim - 1)
        .map(|(index, _)| index)
        .ok_or_else(malformed)?;

    if end < start {
        return Err(malformed());
    }
    Ok(&literal[start..end])
}

/// Literal contents of every string and template token, delimiters removed
pub fn find_literals(tokens: &[Token]) -> impl Iterator<Item = Result<&str, ProfileError>> {
    tokens.iter().filter_map(|token| match token.kind {
        TokenKind::String => Some(strip_string(&token.text)),
        TokenKind::Template => Some(strip_template(&token.text)),
        _ => None,
    })
}

/// Count the scalar values appearing inside literals
pub fn profile(tokens: &[Token]) -> Result<CodepointCounts, ProfileError> {
    let mut counts = CodepointCounts::new();
    for literal in find_literals(tokens) {
        for scalar in literal?.chars() {
            counts.add(uplus_label(scalar), 1);
        }
    }
    Ok(counts)
}
