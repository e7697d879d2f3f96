use crate::lexeme::{
    CanonicalizeError, Location, Position, SourceSummary, Token, TokenKind, canonicalize,
    summarize, template_shape, vocabularize,
};

fn lexeme(kind: &str, text: &str) -> Token {
    Token::new(kind, text, Position::new(1, 0), Position::new(1, text.len() as u32))
}

fn symbol(kind: &str, text: &str) -> String {
    canonicalize(&lexeme(kind, text)).unwrap().into_owned()
}

// ========================================================================
// Canonicalization
// ========================================================================

#[test]
fn test_verbatim_kinds() {
    assert_eq!(symbol("Punctuator", "**="), "**=");
    assert_eq!(symbol("Punctuator", "+"), "+");
    assert_eq!(symbol("Punctuator", "-"), "-");
    assert_eq!(symbol("Keyword", "var"), "var");
    assert_eq!(symbol("Boolean", "false"), "false");
}

#[test]
fn test_placeholder_kinds() {
    assert_eq!(symbol("Null", "null"), "null");
    assert_eq!(symbol("String", "\"hello world\""), "<STRING>");
    assert_eq!(symbol("Identifier", "💩"), "<IDENTIFIER>");
    assert_eq!(symbol("RegularExpression", "/g/i"), "<REGEXP>");
    assert_eq!(symbol("Numeric", "3.14"), "<NUMBER>");
}

#[test]
fn test_template_shapes() {
    assert_eq!(symbol("Template", "`${"), "<TEMPLATE-HEAD>");
    assert_eq!(symbol("Template", "}text${"), "<TEMPLATE-MIDDLE>");
    assert_eq!(symbol("Template", "}  ${"), "<TEMPLATE-MIDDLE>");
    assert_eq!(symbol("Template", "}`"), "<TEMPLATE-TAIL>");
    assert_eq!(symbol("Template", "`standalone`"), "<STANDALONE-TEMPLATE>");
    assert_eq!(symbol("Template", "``"), "<STANDALONE-TEMPLATE>");
}

#[test]
fn test_malformed_template() {
    for text in ["`", "}", "abc", "\"hello\"", "`unterminated"] {
        let result = template_shape(text);
        assert_eq!(
            result,
            Err(CanonicalizeError::MalformedTemplate(text.to_string())),
            "Failed for {}",
            text
        );
    }
}

#[test]
fn test_unsupported_kind() {
    let token = lexeme("JSXText", "<div>");
    let err = canonicalize(&token).unwrap_err();
    assert_eq!(err, CanonicalizeError::UnsupportedTokenKind("JSXText".to_string()));
    assert!(err.to_string().contains("JSXText"));
}

#[test]
fn test_every_defined_kind_has_a_symbol() {
    let samples = [
        ("Boolean", "true"),
        ("Identifier", "x"),
        ("Keyword", "if"),
        ("Null", "null"),
        ("Numeric", "0"),
        ("Punctuator", ";"),
        ("String", "''"),
        ("RegularExpression", "/a/"),
        ("Template", "``"),
    ];

    for (kind, text) in samples {
        let token = lexeme(kind, text);
        assert!(!matches!(token.kind, TokenKind::Other(_)), "{} should be known", kind);
        assert!(canonicalize(&token).is_ok(), "Failed for {}", kind);
    }
}

#[test]
fn test_canonicalize_is_deterministic() {
    let first = lexeme("Identifier", "foo");
    let second = lexeme("Identifier", "foo");
    assert_eq!(first, second);
    assert_eq!(canonicalize(&first).unwrap(), canonicalize(&second).unwrap());
    assert_eq!(canonicalize(&first).unwrap(), canonicalize(&first).unwrap());
}

// ========================================================================
// Token wire format
// ========================================================================

#[test]
fn test_token_from_lexer_json() {
    let json = r#"{
        "type": "Punctuator",
        "value": ";",
        "loc": {"start": {"line": 1, "column": 6}, "end": {"line": 1, "column": 7}}
    }"#;
    let token: Token = serde_json::from_str(json).unwrap();

    assert_eq!(token.kind, TokenKind::Punctuator);
    assert_eq!(token.text, ";");
    assert_eq!(token.start, Position::new(1, 6));
    assert_eq!(token.end, Position::new(1, 7));
}

#[test]
fn test_token_keeps_unknown_kind() {
    let json = r#"{"type": "JSXIdentifier", "value": "div",
        "loc": {"start": {"line": 2, "column": 1}, "end": {"line": 2, "column": 4}}}"#;
    let token: Token = serde_json::from_str(json).unwrap();
    assert_eq!(token.kind, TokenKind::Other("JSXIdentifier".to_string()));

    let back = serde_json::to_value(&token).unwrap();
    assert_eq!(back["type"], "JSXIdentifier");
    assert_eq!(back["value"], "div");
    assert_eq!(back["loc"]["end"]["column"], 4);
}

#[test]
fn test_token_ignores_extra_fields() {
    let json = r#"{"type": "RegularExpression", "value": "/a/g",
        "regex": {"pattern": "a", "flags": "g"},
        "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 4}}}"#;
    let token: Token = serde_json::from_str(json).unwrap();
    assert_eq!(token.kind, TokenKind::RegularExpression);
}

// ========================================================================
// Vocabulary export and summaries
// ========================================================================

#[test]
fn test_vocabularize_pairs_locations() {
    let tokens = vec![
        Token::new("Keyword", "void", Position::new(1, 0), Position::new(1, 4)),
        Token::new("Numeric", "0", Position::new(1, 5), Position::new(1, 6)),
        Token::new("Punctuator", ";", Position::new(1, 6), Position::new(1, 7)),
    ];

    let vocab: Vec<(Location, String)> = vocabularize(&tokens)
        .map(|entry| entry.map(|(loc, symbol)| (loc, symbol.into_owned())))
        .collect::<Result<_, _>>()
        .unwrap();

    let symbols: Vec<&str> = vocab.iter().map(|(_, s)| s.as_str()).collect();
    assert_eq!(symbols, vec!["void", "<NUMBER>", ";"]);
    assert_eq!(vocab[1].0.start, Position::new(1, 5));
}

#[test]
fn test_vocabularize_surfaces_errors() {
    let tokens = vec![lexeme("Keyword", "let"), lexeme("JSXText", "hi")];
    let results: Vec<_> = vocabularize(&tokens).collect();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_summarize_counts_distinct_lines() {
    let tokens = vec![
        Token::new("Keyword", "var", Position::new(1, 0), Position::new(1, 3)),
        Token::new("Identifier", "foo", Position::new(1, 4), Position::new(1, 7)),
        Token::new("Template", "`a\nb\nc`", Position::new(3, 0), Position::new(5, 2)),
    ];

    assert_eq!(summarize(&tokens), SourceSummary::new(4, 3));
}

#[test]
fn test_summarize_empty() {
    assert_eq!(summarize(&[]), SourceSummary::new(0, 0));
}
