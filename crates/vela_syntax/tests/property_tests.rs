//! Property-based tests for the Vela syntax frontend.
//!
//! These verify determinism invariants across many generated inputs: for a
//! fixed byte sequence, lexing produces the same token sequence every time,
//! and re-parsing identical source text produces structurally identical
//! trees.

use proptest::prelude::*;

use vela_syntax::lexer::Lexer;
use vela_syntax::location::{FileId, SourceMap};
use vela_syntax::options::CompileOptions;
use vela_syntax::parser;
use vela_syntax::token::TokenKind;

fn lex_all(source: &str) -> Result<Vec<TokenKind>, String> {
    let mut lexer = Lexer::new(source, FileId(0));
    let mut kinds = Vec::new();
    loop {
        match lexer.next_token() {
            Ok(token) => {
                let done = token.kind == TokenKind::Eof;
                kinds.push(token.kind);
                if done {
                    return Ok(kinds);
                }
            }
            Err(err) => return Err(err.message),
        }
    }
}

proptest! {
    /// Lexing is a pure function of the input bytes.
    #[test]
    fn lexing_is_deterministic(source in "[ -~\\n]{0,200}") {
        prop_assert_eq!(lex_all(&source), lex_all(&source));
    }

    /// Identifier-shaped inputs always lex to a single token (keyword or
    /// identifier) plus the end-of-file sentinel.
    #[test]
    fn identifiers_lex_to_one_token(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}") {
        let kinds = lex_all(&name).unwrap();
        prop_assert_eq!(kinds.len(), 2);
        prop_assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    /// Non-negative decimal literals lex back to their value.
    #[test]
    fn decimal_literals_roundtrip(value in 0i64..=i64::MAX) {
        let kinds = lex_all(&value.to_string()).unwrap();
        prop_assert_eq!(&kinds[0], &TokenKind::IntLiteral(value));
    }

    /// Parsing identical source twice yields structurally identical results,
    /// whether that result is a tree or an error.
    #[test]
    fn parsing_is_deterministic(source in "[ -~\\n]{0,150}") {
        let options = CompileOptions::default();

        let mut first_map = SourceMap::new();
        let first = parser::parse_source("prop.vela", &source, &options, &mut first_map);
        let mut second_map = SourceMap::new();
        let second = parser::parse_source("prop.vela", &source, &options, &mut second_map);

        prop_assert_eq!(first, second);
    }
}
