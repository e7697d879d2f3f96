use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Token;

/// Size of a parsed source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Distinct lines containing at least part of a token
    pub sloc: u32,
    pub n_tokens: u32,
}

impl SourceSummary {
    pub fn new(sloc: u32, n_tokens: u32) -> Self {
        Self { sloc, n_tokens }
    }
}

/// Count source lines of code and tokens
pub fn summarize(tokens: &[Token]) -> SourceSummary {
    let lines: BTreeSet<u32> = tokens.iter().flat_map(Token::lines).collect();

    SourceSummary {
        sloc: lines.len() as u32,
        n_tokens: tokens.len() as u32,
    }
}
