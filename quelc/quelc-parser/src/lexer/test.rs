use insta::assert_debug_snapshot;

use crate::error::Reason;
use crate::lexer::lr::{Literal, TokenKind};
use crate::lexer::{lex_source, Lexer};

#[test]
fn basic_tokens() {
    assert_debug_snapshot!(lex_source("retrieve (p.name)").unwrap(), @r#"
    Tokens(
        [
            0..8: Keyword("retrieve"),
            9..10: Control('('),
            10..11: Ident("p"),
            11..12: Control('.'),
            12..16: Ident("name"),
            16..17: Control(')'),
        ],
    )
    "#);
}

#[test]
fn numbers() {
    assert_debug_snapshot!(lex_source("1 2.5 -3").unwrap(), @r"
    Tokens(
        [
            0..1: Literal(Integer(1)),
            2..5: Literal(Float(2.5)),
            6..8: Literal(Integer(-3)),
        ],
    )
    ");

    // `-` must touch the digit to form a negative literal
    assert_debug_snapshot!(lex_source("- 3").unwrap(), @r"
    Tokens(
        [
            0..1: Control('-'),
            2..3: Literal(Integer(3)),
        ],
    )
    ");

    let err = lex_source("1.2.3").unwrap_err();
    assert!(matches!(err.reason, Reason::MalformedNumber { .. }));
}

#[test]
fn operators() {
    assert_debug_snapshot!(lex_source("== != <> >= <= << >> ->").unwrap(), @r"
    Tokens(
        [
            0..2: Eq,
            3..5: Ne,
            6..8: Ne,
            9..11: Gte,
            12..14: Lte,
            15..17: ShiftLeft,
            18..20: ShiftRight,
            21..23: ArrowThin,
        ],
    )
    ");
}

#[test]
fn keywords_are_case_insensitive() {
    let tokens = lex_source("RETRIEVE Unique wHeRe").unwrap();
    let kinds: Vec<_> = tokens.0.into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Keyword("retrieve".to_string()),
            TokenKind::Keyword("unique".to_string()),
            TokenKind::Keyword("where".to_string()),
        ]
    );
}

#[test]
fn params_and_directives() {
    assert_debug_snapshot!(lex_source(":min @InValuesAreFinal").unwrap(), @r#"
    Tokens(
        [
            0..4: Param("min"),
            5..22: Directive("InValuesAreFinal"),
        ],
    )
    "#);
}

fn string_value(source: &str) -> String {
    let tokens = lex_source(source).unwrap();
    match &tokens.0[0].kind {
        TokenKind::Literal(Literal::String(s)) => s.value.clone(),
        other => panic!("expected a string literal, got {other:?}"),
    }
}

#[test]
fn double_quoted_escapes() {
    assert_eq!(string_value(r#""a\nb""#), "a\nb");
    assert_eq!(string_value(r#""tab\there""#), "tab\there");
    assert_eq!(string_value(r#""quote\"end""#), "quote\"end");
    assert_eq!(string_value(r#""back\\slash""#), "back\\slash");

    let err = lex_source(r#""bad\q""#).unwrap_err();
    assert!(matches!(err.reason, Reason::InvalidEscape { found: 'q' }));
}

#[test]
fn single_quoted_escapes() {
    // only \\ and \' unescape; everything else passes through verbatim
    assert_eq!(string_value(r"'a\qb'"), r"a\qb");
    assert_eq!(string_value(r"'don\'t'"), "don't");
    assert_eq!(string_value(r"'a\\b'"), r"a\b");
}

#[test]
fn unterminated_strings() {
    let err = lex_source(r#""no end"#).unwrap_err();
    assert!(matches!(err.reason, Reason::UnexpectedEof));

    let err = lex_source("\"line\nbreak\"").unwrap_err();
    assert!(matches!(err.reason, Reason::Unterminated { what: "string" }));
}

#[test]
fn line_tracking() {
    let tokens = lex_source("a\nb\n\nc").unwrap();
    let lines: Vec<_> = tokens.0.iter().map(|t| t.line).collect();
    assert_eq!(lines, vec![1, 2, 4]);
}

#[test]
fn unknown_characters_are_not_fatal() {
    let tokens = lex_source("a $ b").unwrap();
    assert_eq!(tokens.0[1].kind, TokenKind::Unknown('$'));
}

#[test]
fn save_and_restore() {
    let mut lexer = Lexer::new("a b c").unwrap();
    assert_eq!(lexer.peek().kind, TokenKind::Ident("a".to_string()));

    let state = lexer.save();
    lexer.advance().unwrap();
    lexer.advance().unwrap();
    assert_eq!(lexer.peek().kind, TokenKind::Ident("c".to_string()));

    lexer.restore(state);
    assert_eq!(lexer.peek().kind, TokenKind::Ident("a".to_string()));
    assert_eq!(lexer.peek_next().kind, TokenKind::Ident("b".to_string()));
}

#[test]
fn fetch_regex() {
    let mut lexer = Lexer::new("/ab+c/i rest").unwrap();
    assert_eq!(lexer.peek().kind, TokenKind::Control('/'));

    let token = lexer.fetch_regex().unwrap();
    assert_eq!(
        token.kind,
        TokenKind::Regex {
            pattern: "ab+c".to_string(),
            flags: "i".to_string(),
        }
    );
    assert_eq!(lexer.peek().kind, TokenKind::Ident("rest".to_string()));
}

#[test]
fn fetch_regex_with_escaped_slash() {
    let mut lexer = Lexer::new("/a\\/b/").unwrap();
    let token = lexer.fetch_regex().unwrap();
    assert_eq!(
        token.kind,
        TokenKind::Regex {
            pattern: "a\\/b".to_string(),
            flags: String::new(),
        }
    );
}

#[test]
fn unterminated_regex() {
    let mut lexer = Lexer::new("/ab\nc/").unwrap();
    let err = lexer.fetch_regex().unwrap_err();
    assert!(matches!(
        err.reason,
        Reason::Unterminated {
            what: "regular expression"
        }
    ));
}

#[test]
fn cancellation() {
    let token = crate::lexer::CancellationToken::new();
    token.cancel();
    let err = Lexer::with_cancellation("retrieve (p)", token).unwrap_err();
    assert!(matches!(err.reason, Reason::Cancelled));
}
