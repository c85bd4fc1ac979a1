//! Lexer for the Vela programming language.
//!
//! Converts source bytes into a stream of [`Token`]s, one at a time. Handles:
//! - keywords, identifiers, and the full operator set (maximal munch)
//! - numeric literals with `0b`/`0o`/`0x` prefixes
//! - string and character literals with escape decoding
//! - `//` line comments and the `#if`/`#else`/`#endif` token family
//!
//! The lexer owns its buffer and scanning cursor; one instance lexes one
//! file. A `\n` increments the line and resets the column to 0, so the first
//! character of a line sits at column 1.

use std::path::Path;

use crate::diagnostics::CompileError;
use crate::location::{FileId, SourceLocation, SourceMap};
use crate::token::{Token, TokenKind, keyword};

/// Lexer state for a single source file.
pub struct Lexer {
    source: Vec<u8>,
    /// Index of the next byte to read.
    pos: usize,
    file: FileId,
    line: u32,
    /// Column of the most recently read byte.
    column: u32,
}

impl Lexer {
    /// Create a lexer over an in-memory source buffer.
    pub fn new(source: impl Into<String>, file: FileId) -> Self {
        Self {
            source: source.into().into_bytes(),
            pos: 0,
            file,
            line: 1,
            column: 0,
        }
    }

    /// Open `path`, register it in the source map, and lex it.
    pub fn from_file(path: impl AsRef<Path>, map: &mut SourceMap) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| CompileError::io(format!("couldn't open file '{}': {err}", path.display())))?;
        let file = map.add(path, source.clone());
        Ok(Self::new(source, file))
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn read_char(&mut self) -> u8 {
        let ch = self.source.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        ch
    }

    fn unread_char(&mut self, ch: u8) {
        self.pos -= 1;
        if ch == b'\n' {
            self.line -= 1;
            // The column is stale until the next read_char, which is fine: a
            // token never starts immediately after unreading a newline.
        } else {
            self.column -= 1;
        }
    }

    fn peek(&self) -> u8 {
        self.source.get(self.pos).copied().unwrap_or(0)
    }

    fn match_char(&mut self, expected: u8) -> bool {
        let ch = self.read_char();
        if ch == expected {
            true
        } else {
            self.unread_char(ch);
            false
        }
    }

    /// Location of the most recently read byte.
    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file, self.line, self.column)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Produce the next token. Call repeatedly until [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        use TokenKind::*;

        loop {
            let ch = self.read_char();
            let location = self.location();

            let kind = match ch {
                b' ' | b'\t' | b'\r' | b'\n' => continue,
                0 => Eof,
                b'/' => {
                    if self.match_char(b'/') {
                        // Comment until end of line.
                        loop {
                            let c = self.read_char();
                            if c == b'\n' || c == 0 {
                                break;
                            }
                        }
                        continue;
                    } else if self.match_char(b'=') {
                        SlashEqual
                    } else {
                        Slash
                    }
                }
                b'+' => {
                    if self.match_char(b'+') {
                        Increment
                    } else if self.match_char(b'=') {
                        PlusEqual
                    } else {
                        Plus
                    }
                }
                b'-' => {
                    if self.match_char(b'-') {
                        Decrement
                    } else if self.match_char(b'>') {
                        RightArrow
                    } else if self.match_char(b'=') {
                        MinusEqual
                    } else {
                        Minus
                    }
                }
                b'*' => {
                    if self.match_char(b'=') {
                        StarEqual
                    } else {
                        Star
                    }
                }
                b'<' => {
                    if self.match_char(b'=') {
                        LessOrEqual
                    } else if self.match_char(b'<') {
                        if self.match_char(b'=') { LeftShiftEqual } else { LeftShift }
                    } else {
                        Less
                    }
                }
                b'>' => {
                    if self.match_char(b'=') {
                        GreaterOrEqual
                    } else if self.match_char(b'>') {
                        if self.match_char(b'=') { RightShiftEqual } else { RightShift }
                    } else {
                        Greater
                    }
                }
                b'=' => {
                    if self.match_char(b'=') { Equal } else { Assign }
                }
                b'!' => {
                    if self.match_char(b'=') { NotEqual } else { Not }
                }
                b'&' => {
                    if self.match_char(b'&') {
                        if self.match_char(b'=') { AndAndEqual } else { AndAnd }
                    } else if self.match_char(b'=') {
                        AndEqual
                    } else {
                        And
                    }
                }
                b'|' => {
                    if self.match_char(b'|') {
                        if self.match_char(b'=') { OrOrEqual } else { OrOr }
                    } else if self.match_char(b'=') {
                        OrEqual
                    } else {
                        Or
                    }
                }
                b'^' => {
                    if self.match_char(b'=') { XorEqual } else { Xor }
                }
                b'~' => Tilde,
                b'?' => QuestionMark,
                b'(' => LeftParen,
                b')' => RightParen,
                b'[' => LeftBracket,
                b']' => RightBracket,
                b'{' => LeftBrace,
                b'}' => RightBrace,
                b',' => Comma,
                b';' => Semicolon,
                b':' => {
                    if self.match_char(b':') { ColonColon } else { Colon }
                }
                b'.' => {
                    if self.match_char(b'.') {
                        if self.match_char(b'.') {
                            DotDotDot
                        } else {
                            // Leave the second '.' for the next token.
                            self.unread_char(b'.');
                            Dot
                        }
                    } else {
                        Dot
                    }
                }
                b'#' => return self.lex_hash_directive(location),
                b'0' => return self.lex_zero_prefixed_number(location),
                b'1'..=b'9' => return self.lex_decimal_number(ch, location),
                b'"' => {
                    let content = self.lex_quoted(b'"', location)?;
                    StringLiteral(content)
                }
                b'\'' => {
                    let content = self.lex_quoted(b'\'', location)?;
                    if content.len() != 1 {
                        return Err(CompileError::lex(
                            "character literal must consist of a single byte",
                            location,
                        ));
                    }
                    CharLiteral(content.as_bytes()[0])
                }
                c if c.is_ascii_alphabetic() || c == b'_' => return self.lex_identifier(c, location),
                other => {
                    return Err(CompileError::lex(
                        format!("unknown token '{}'", other as char),
                        location,
                    ));
                }
            };

            return Ok(Token::new(kind, location));
        }
    }

    fn lex_identifier(&mut self, first: u8, location: SourceLocation) -> Result<Token, CompileError> {
        let mut text = String::from(first as char);
        loop {
            let ch = self.read_char();
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                text.push(ch as char);
            } else {
                self.unread_char(ch);
                break;
            }
        }

        let kind = keyword(&text).unwrap_or(TokenKind::Identifier(text));
        Ok(Token::new(kind, location))
    }

    fn lex_hash_directive(&mut self, location: SourceLocation) -> Result<Token, CompileError> {
        let mut name = String::new();
        loop {
            let ch = self.read_char();
            if ch.is_ascii_alphabetic() {
                name.push(ch as char);
            } else {
                self.unread_char(ch);
                break;
            }
        }

        let kind = match name.as_str() {
            "if" => TokenKind::HashIf,
            "else" => TokenKind::HashElse,
            "endif" => TokenKind::HashEndif,
            _ => {
                return Err(CompileError::lex(format!("unknown directive '#{name}'"), location));
            }
        };
        Ok(Token::new(kind, location))
    }

    // ========================================================================
    // Numeric literals
    // ========================================================================

    /// A literal starting with '0': either a base-prefixed integer, the bare
    /// integer 0, or a decimal fraction like `0.5`. `0` followed by another
    /// decimal digit is rejected with a hint to use the `0o` prefix.
    fn lex_zero_prefixed_number(&mut self, location: SourceLocation) -> Result<Token, CompileError> {
        let ch = self.read_char();
        match ch {
            b'b' => self.lex_prefixed_number(2, location),
            b'o' => self.lex_prefixed_number(8, location),
            b'x' => self.lex_prefixed_number(16, location),
            c if c.is_ascii_digit() => Err(CompileError::lex(
                "numbers cannot start with 0[0-9], use 0o prefix for octal literal",
                location,
            )),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                Err(CompileError::lex(format!("unexpected '{}'", c as char), self.location()))
            }
            b'.' if self.peek().is_ascii_digit() => {
                self.lex_decimal_tail(String::from("0."), true, location)
            }
            _ => {
                self.unread_char(ch);
                Ok(Token::new(TokenKind::IntLiteral(0), location))
            }
        }
    }

    fn lex_prefixed_number(&mut self, base: u32, location: SourceLocation) -> Result<Token, CompileError> {
        let mut digits = String::new();
        // 0 = not set yet, >0 = uppercase, <0 = lowercase
        let mut lettercase = 0i32;

        loop {
            let ch = self.read_char();
            let valid = match base {
                2 => matches!(ch, b'0' | b'1'),
                8 => matches!(ch, b'0'..=b'7'),
                16 => match ch {
                    b'0'..=b'9' => true,
                    b'A'..=b'F' => {
                        if lettercase < 0 {
                            return Err(CompileError::lex("mixed letter case in hex literal", self.location()));
                        }
                        lettercase = 1;
                        true
                    }
                    b'a'..=b'f' => {
                        if lettercase > 0 {
                            return Err(CompileError::lex("mixed letter case in hex literal", self.location()));
                        }
                        lettercase = -1;
                        true
                    }
                    _ => false,
                },
                _ => unreachable!("invalid integer base"),
            };

            if valid {
                digits.push(ch as char);
            } else {
                self.unread_char(ch);
                break;
            }
        }

        if digits.is_empty() {
            let prefix = match base {
                2 => "0b",
                8 => "0o",
                _ => "0x",
            };
            return Err(CompileError::lex(format!("missing digits after '{prefix}'"), location));
        }

        let value = i64::from_str_radix(&digits, base)
            .map_err(|_| CompileError::lex("integer literal is too large", location))?;
        Ok(Token::new(TokenKind::IntLiteral(value), location))
    }

    fn lex_decimal_number(&mut self, first: u8, location: SourceLocation) -> Result<Token, CompileError> {
        self.lex_decimal_tail(String::from(first as char), false, location)
    }

    /// Scan the remainder of a decimal literal. At most one '.' is part of
    /// the literal; a trailing '.' is left for the following token.
    fn lex_decimal_tail(
        &mut self,
        mut text: String,
        mut is_float: bool,
        location: SourceLocation,
    ) -> Result<Token, CompileError> {
        loop {
            let ch = self.read_char();
            match ch {
                b'.' if !is_float => {
                    is_float = true;
                    text.push('.');
                }
                b'0'..=b'9' => text.push(ch as char),
                _ => {
                    self.unread_char(ch);
                    break;
                }
            }
        }

        if text.ends_with('.') {
            self.unread_char(b'.');
            text.pop();
            is_float = false;
        }

        let kind = if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| CompileError::lex("invalid float literal", location))?;
            TokenKind::FloatLiteral(value)
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| CompileError::lex("integer literal is too large", location))?;
            TokenKind::IntLiteral(value)
        };
        Ok(Token::new(kind, location))
    }

    // ========================================================================
    // String and character literals
    // ========================================================================

    /// Scan a quote-delimited literal body, decoding escape sequences.
    fn lex_quoted(&mut self, quote: u8, location: SourceLocation) -> Result<String, CompileError> {
        let mut content = String::new();

        loop {
            let ch = self.read_char();
            match ch {
                c if c == quote => return Ok(content),
                0 => {
                    return Err(CompileError::lex("unterminated string literal", location));
                }
                b'\n' => {
                    return Err(CompileError::lex("newline inside string literal", location));
                }
                b'\\' => {
                    let escape = self.read_char();
                    let decoded = match escape {
                        b'0' => '\0',
                        b'a' => '\x07',
                        b'b' => '\x08',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        b'v' => '\x0b',
                        b'"' => '"',
                        b'\'' => '\'',
                        b'\\' => '\\',
                        other => {
                            return Err(CompileError::lex(
                                format!("unknown escape character '\\{}'", other as char),
                                self.location(),
                            ));
                        }
                    };
                    content.push(decoded);
                }
                other => content.push(other as char),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn lex_all(source: &str) -> Result<Vec<TokenKind>, CompileError> {
        let mut lexer = Lexer::new(source, FileId(0));
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == Eof;
            kinds.push(token.kind);
            if done {
                return Ok(kinds);
            }
        }
    }

    #[test]
    fn keywords_and_identifiers() {
        let kinds = lex_all("func foo struct Bar _ _tmp").unwrap();
        assert_eq!(
            kinds,
            vec![
                Func,
                Identifier("foo".into()),
                Struct,
                Identifier("Bar".into()),
                Underscore,
                Identifier("_tmp".into()),
                Eof
            ]
        );
    }

    #[test]
    fn maximal_munch_operators() {
        let kinds = lex_all("<<= >>= &&= ||= :: -> ++ -- == != <= >=").unwrap();
        assert_eq!(
            kinds,
            vec![
                LeftShiftEqual,
                RightShiftEqual,
                AndAndEqual,
                OrOrEqual,
                ColonColon,
                RightArrow,
                Increment,
                Decrement,
                Equal,
                NotEqual,
                LessOrEqual,
                GreaterOrEqual,
                Eof
            ]
        );
    }

    #[test]
    fn single_char_fallbacks() {
        let kinds = lex_all("< > & | ! = + - * /").unwrap();
        assert_eq!(
            kinds,
            vec![Less, Greater, And, Or, Not, Assign, Plus, Minus, Star, Slash, Eof]
        );
    }

    #[test]
    fn hex_literals_accept_consistent_case() {
        assert_eq!(lex_all("0x1A").unwrap(), vec![IntLiteral(0x1A), Eof]);
        assert_eq!(lex_all("0x1a").unwrap(), vec![IntLiteral(0x1A), Eof]);
        assert_eq!(lex_all("0xFF").unwrap(), vec![IntLiteral(255), Eof]);
    }

    #[test]
    fn hex_literals_reject_mixed_case() {
        let err = lex_all("0x1Aa").unwrap_err();
        assert!(err.message.contains("mixed letter case"));
        let err = lex_all("0x1aA").unwrap_err();
        assert!(err.message.contains("mixed letter case"));
    }

    #[test]
    fn leading_zero_requires_octal_prefix() {
        let err = lex_all("007").unwrap_err();
        assert!(err.message.contains("0o prefix"));
        assert_eq!(lex_all("0o7").unwrap(), vec![IntLiteral(7), Eof]);
        assert_eq!(lex_all("0b101").unwrap(), vec![IntLiteral(5), Eof]);
    }

    #[test]
    fn zero_literals() {
        assert_eq!(lex_all("0").unwrap(), vec![IntLiteral(0), Eof]);
        assert_eq!(lex_all("0.5").unwrap(), vec![FloatLiteral(0.5), Eof]);
    }

    #[test]
    fn decimal_with_one_dot() {
        assert_eq!(lex_all("1.5").unwrap(), vec![FloatLiteral(1.5), Eof]);
        // A second '.' terminates the literal.
        assert_eq!(
            lex_all("1.5.2").unwrap(),
            vec![FloatLiteral(1.5), Dot, IntLiteral(2), Eof]
        );
        // A trailing '.' is left for the following token.
        assert_eq!(lex_all("1.foo").unwrap()[..2], [IntLiteral(1), Dot]);
    }

    #[test]
    fn missing_digits_after_prefix() {
        assert!(lex_all("0x").unwrap_err().message.contains("missing digits"));
        assert!(lex_all("0b2").unwrap_err().message.contains("missing digits"));
    }

    #[test]
    fn string_escapes_decode() {
        let kinds = lex_all(r#""a\tb\n\"c\"\\""#).unwrap();
        assert_eq!(kinds, vec![StringLiteral("a\tb\n\"c\"\\".into()), Eof]);
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let err = lex_all(r#""\q""#).unwrap_err();
        assert!(err.message.contains("unknown escape character"));
    }

    #[test]
    fn newline_in_string_is_an_error() {
        let err = lex_all("\"abc\ndef\"").unwrap_err();
        assert!(err.message.contains("newline inside string literal"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex_all("\"abc").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn character_literals_are_single_byte() {
        assert_eq!(lex_all("'x'").unwrap(), vec![CharLiteral(b'x'), Eof]);
        assert_eq!(lex_all(r"'\n'").unwrap(), vec![CharLiteral(b'\n'), Eof]);
        assert!(lex_all("'xy'").unwrap_err().message.contains("single byte"));
        assert!(lex_all("''").unwrap_err().message.contains("single byte"));
    }

    #[test]
    fn comments_are_skipped() {
        let kinds = lex_all("1 // comment\n2").unwrap();
        assert_eq!(kinds, vec![IntLiteral(1), IntLiteral(2), Eof]);
    }

    #[test]
    fn hash_directives() {
        let kinds = lex_all("#if debug\n#else\n#endif").unwrap();
        assert_eq!(
            kinds,
            vec![HashIf, Identifier("debug".into()), HashElse, HashEndif, Eof]
        );
        assert!(lex_all("#define").unwrap_err().message.contains("unknown directive"));
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let mut lexer = Lexer::new("foo\n  bar", FileId(0));
        let foo = lexer.next_token().unwrap();
        assert_eq!((foo.location.line, foo.location.column), (1, 1));
        let bar = lexer.next_token().unwrap();
        assert_eq!((bar.location.line, bar.location.column), (2, 3));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = lex_all("$").unwrap_err();
        assert!(err.message.contains("unknown token"));
    }
}
