mod canonical;
mod summary;
mod token;

#[cfg(test)]
mod tests;

pub use canonical::{
    CanonicalizeError, IDENTIFIER, NULL, NUMBER, REGEXP, STANDALONE_TEMPLATE, STRING,
    TEMPLATE_HEAD, TEMPLATE_MIDDLE, TEMPLATE_TAIL, canonicalize, template_shape, vocabularize,
};
pub(crate) use canonical::INTERPOLATION_OPEN;
pub use summary::{SourceSummary, summarize};
pub use token::{Location, Position, Token, TokenKind};
