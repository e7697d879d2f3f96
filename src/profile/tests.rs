use crate::lexeme::{Position, Token};
use crate::profile::{
    CodepointCounts, ProfileError, find_literals, profile, strip_string, strip_template,
    uplus_label,
};

fn token(kind: &str, text: &str) -> Token {
    Token::new(kind, text, Position::new(1, 0), Position::new(1, 1))
}

// ========================================================================
// Labels
// ========================================================================

#[test]
fn test_uplus_label_bmp() {
    assert_eq!(uplus_label('a'), "U+0061");
    assert_eq!(uplus_label('A'), "U+0041");
    assert_eq!(uplus_label(' '), "U+0020");
    assert_eq!(uplus_label('\u{FFFF}'), "U+FFFF");
}

#[test]
fn test_uplus_label_astral() {
    assert_eq!(uplus_label('😀'), "U+1F600");
    assert_eq!(uplus_label('\u{1F618}'), "U+1F618");
    assert_eq!(uplus_label('\u{10000}'), "U+10000");
    assert_eq!(uplus_label('\u{10FFFF}'), "U+10FFFF");
}

// ========================================================================
// Delimiter stripping
// ========================================================================

#[test]
fn test_strip_string() {
    assert_eq!(strip_string("''").unwrap(), "");
    assert_eq!(strip_string("\"\"").unwrap(), "");
    assert_eq!(strip_string("\"hello\"").unwrap(), "hello");
    assert_eq!(strip_string("'hello'").unwrap(), "hello");
    assert_eq!(strip_string("'😘'").unwrap(), "😘");
}

#[test]
fn test_strip_string_too_short() {
    assert_eq!(
        strip_string("'"),
        Err(ProfileError::MalformedLiteral("'".to_string()))
    );
    assert!(strip_string("").is_err());
}

#[test]
fn test_strip_template() {
    assert_eq!(strip_template("}`").unwrap(), "");
    assert_eq!(strip_template("}!`").unwrap(), "!");
    assert_eq!(strip_template("`${").unwrap(), "");
    assert_eq!(strip_template("`Hello, ${").unwrap(), "Hello, ");
    assert_eq!(strip_template("}, ${").unwrap(), ", ");
    assert_eq!(strip_template("`standalone`").unwrap(), "standalone");
}

#[test]
fn test_strip_template_too_short() {
    assert!(strip_template("`").is_err());
    assert!(strip_template("${").is_err());
}

// ========================================================================
// Profiling
// ========================================================================

#[test]
fn test_find_literals_skips_other_kinds() {
    let tokens = vec![
        token("Identifier", "hello"),
        token("String", "'a'"),
        token("Punctuator", ";"),
        token("Template", "`b${"),
    ];

    let literals: Vec<&str> = find_literals(&tokens).collect::<Result<_, _>>().unwrap();
    assert_eq!(literals, vec!["a", "b"]);
}

#[test]
fn test_profile_mixed_literals() {
    // ""; ''; `${hello}, ${world}`; '😘';
    let tokens = vec![
        token("String", "\"\""),
        token("Punctuator", ";"),
        token("String", "''"),
        token("Punctuator", ";"),
        token("Template", "`${"),
        token("Identifier", "hello"),
        token("Template", "}, ${"),
        token("Identifier", "world"),
        token("Template", "}`"),
        token("Punctuator", ";"),
        token("String", "'😘'"),
        token("Punctuator", ";"),
    ];

    let counts = profile(&tokens).unwrap();
    let expected: CodepointCounts =
        [("U+0020", 1), ("U+002C", 1), ("U+1F618", 1)].into_iter().collect();
    assert_eq!(counts, expected);
}

#[test]
fn test_profile_counts_repeats() {
    let tokens = vec![token("String", "'aab'"), token("Template", "`a`")];
    let counts = profile(&tokens).unwrap();

    assert_eq!(counts.get("U+0061"), 3);
    assert_eq!(counts.get("U+0062"), 1);
    assert_eq!(counts.total(), 4);
    assert_eq!(counts.len(), 2);
}

#[test]
fn test_profile_without_literals() {
    let tokens = vec![token("Keyword", "void"), token("Numeric", "0")];
    assert!(profile(&tokens).unwrap().is_empty());
}

#[test]
fn test_profile_rejects_malformed_literal() {
    let tokens = vec![token("String", "'")];
    assert!(matches!(
        profile(&tokens),
        Err(ProfileError::MalformedLiteral(_))
    ));
}

#[test]
fn test_counts_merge() {
    let mut left: CodepointCounts = [("U+0041", 2)].into_iter().collect();
    let right: CodepointCounts = [("U+0041", 1), ("U+0042", 5)].into_iter().collect();
    left.merge(&right);

    assert_eq!(left.get("U+0041"), 3);
    assert_eq!(left.get("U+0042"), 5);
    assert_eq!(left.get("U+0043"), 0);
}
