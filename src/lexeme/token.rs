use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Lexer token categories.
///
/// The named variants form the alphabet the canonicalizer understands. Any
/// other name the lexer emits is kept verbatim in `Other` so it can still be
/// stored, but it has no canonical symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TokenKind {
    Boolean,
    Identifier,
    Keyword,
    Null,
    Numeric,
    Punctuator,
    String,
    RegularExpression,
    Template,
    Other(String),
}

impl TokenKind {
    /// Name as the lexer spells it
    pub fn as_str(&self) -> &str {
        match self {
            TokenKind::Boolean => "Boolean",
            TokenKind::Identifier => "Identifier",
            TokenKind::Keyword => "Keyword",
            TokenKind::Null => "Null",
            TokenKind::Numeric => "Numeric",
            TokenKind::Punctuator => "Punctuator",
            TokenKind::String => "String",
            TokenKind::RegularExpression => "RegularExpression",
            TokenKind::Template => "Template",
            TokenKind::Other(name) => name,
        }
    }

    /// Whether this kind carries quoted literal content
    pub fn is_literal(&self) -> bool {
        matches!(self, TokenKind::String | TokenKind::Template)
    }
}

impl From<String> for TokenKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Boolean" => TokenKind::Boolean,
            "Identifier" => TokenKind::Identifier,
            "Keyword" => TokenKind::Keyword,
            "Null" => TokenKind::Null,
            "Numeric" => TokenKind::Numeric,
            "Punctuator" => TokenKind::Punctuator,
            "String" => TokenKind::String,
            "RegularExpression" => TokenKind::RegularExpression,
            "Template" => TokenKind::Template,
            _ => TokenKind::Other(name),
        }
    }
}

impl From<&str> for TokenKind {
    fn from(name: &str) -> Self {
        TokenKind::from(name.to_string())
    }
}

impl From<TokenKind> for String {
    fn from(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in the source: 1-indexed line, 0-indexed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Start and end of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

/// One lexed token.
///
/// Serialized in the lexer's own shape
/// (`{type, value, loc: {start, end}}`) so stored token streams can be read
/// back by the same decoder that reads parser output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireToken", into = "WireToken")]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn new(
        kind: impl Into<TokenKind>,
        text: impl Into<String>,
        start: Position,
        end: Position,
    ) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            start,
            end,
        }
    }

    pub fn location(&self) -> Location {
        Location {
            start: self.start,
            end: self.end,
        }
    }

    /// Lines this token touches (multi-line templates and comments span several)
    pub fn lines(&self) -> RangeInclusive<u32> {
        self.start.line..=self.end.line.max(self.start.line)
    }
}

#[derive(Serialize, Deserialize)]
struct WireToken {
    #[serde(rename = "type")]
    kind: TokenKind,
    value: String,
    loc: Location,
}

impl From<WireToken> for Token {
    fn from(wire: WireToken) -> Self {
        Self {
            kind: wire.kind,
            text: wire.value,
            start: wire.loc.start,
            end: wire.loc.end,
        }
    }
}

impl From<Token> for WireToken {
    fn from(token: Token) -> Self {
        Self {
            loc: token.location(),
            kind: token.kind,
            value: token.text,
        }
    }
}
