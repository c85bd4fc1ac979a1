/// Parser core: state, entrypoints, token helpers, statement terminators,
/// and conditional compilation.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser`; see that module's doc.
/// - One parser instance parses one file, so the per-file terminator-style
///   state resets by construction when the next file gets its own parser.

/// Statement terminator styles. The first style seen in a file becomes the
/// expected style for the rest of that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Newline,
    Semicolon,
}

impl Terminator {
    fn description(self) -> &'static str {
        match self {
            Terminator::Newline => "newline",
            Terminator::Semicolon => "';'",
        }
    }
}

/// Parser state for a single source file.
pub struct Parser<'a> {
    stream: TokenStream,
    path: PathBuf,
    file: FileId,
    options: &'a CompileOptions,
    warnings: Vec<Diagnostic>,
    established_terminator: Option<Terminator>,
}

impl<'a> Parser<'a> {
    /// Open `path` and prepare to parse it.
    pub fn from_file(
        path: impl AsRef<Path>,
        options: &'a CompileOptions,
        map: &mut SourceMap,
    ) -> Result<Self, CompileError> {
        let path = path.as_ref().to_path_buf();
        let lexer = Lexer::from_file(&path, map)?;
        let file = lexer.file();
        Ok(Self {
            stream: TokenStream::new(lexer)?,
            path,
            file,
            options,
            warnings: Vec::new(),
            established_terminator: None,
        })
    }

    /// Prepare to parse an in-memory source buffer registered under `name`.
    pub fn from_source(
        name: impl AsRef<Path>,
        source: &str,
        options: &'a CompileOptions,
        map: &mut SourceMap,
    ) -> Result<Self, CompileError> {
        let path = name.as_ref().to_path_buf();
        let file = map.add(&path, source.to_string());
        Ok(Self {
            stream: TokenStream::new(Lexer::new(source, file))?,
            path,
            file,
            options,
            warnings: Vec::new(),
            established_terminator: None,
        })
    }

    /// Parse the whole file. Fatal on the first syntax error.
    pub fn parse_source_file(&mut self) -> Result<SourceFile, CompileError> {
        let mut decls = Vec::new();

        while self.current_kind() != &TokenKind::Eof {
            if self.current_kind() == &TokenKind::HashIf {
                self.parse_ifdef(&mut decls, true)?;
            } else {
                decls.push(self.parse_top_level_decl()?);
            }
        }

        Ok(SourceFile {
            path: self.path.clone(),
            file: self.file,
            decls,
        })
    }

    /// Warnings accumulated so far, leaving the parser's buffer empty.
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn current(&self) -> &Token {
        self.stream.current()
    }

    fn current_kind(&self) -> &TokenKind {
        &self.stream.current().kind
    }

    fn location(&self) -> SourceLocation {
        self.stream.current().location
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn consume(&mut self) -> Result<Token, CompileError> {
        self.stream.consume()
    }

    /// Kind of the token `offset` positions ahead. Offsets before the start
    /// of the buffer report as `Eof`.
    fn look_ahead_kind(&mut self, offset: isize) -> Result<TokenKind, CompileError> {
        Ok(self
            .stream
            .look_ahead(offset)?
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof))
    }

    fn unexpected_token(&self, expected: &[String], context: Option<&str>) -> CompileError {
        let found = self.current_kind().to_string();
        let message = if expected.is_empty() {
            match context {
                Some(ctx) => format!("unexpected {found} {ctx}"),
                None => format!("unexpected {found}"),
            }
        } else {
            let list = format_expected(expected);
            match context {
                Some(ctx) => format!("expected {list} {ctx}, got {found}"),
                None => format!("expected {list}, got {found}"),
            }
        };
        CompileError::parse(message, self.location())
    }

    /// Consume the expected token or fail with a parse error.
    fn expect_token(&mut self, expected: TokenKind, context: Option<&str>) -> Result<Token, CompileError> {
        if self.current_kind() == &expected {
            self.consume()
        } else {
            Err(self.unexpected_token(&[expected.to_string()], context))
        }
    }

    fn parse_identifier(&mut self, context: Option<&str>) -> Result<(String, SourceLocation), CompileError> {
        if matches!(self.current_kind(), TokenKind::Identifier(_)) {
            let token = self.consume()?;
            match token.kind {
                TokenKind::Identifier(name) => Ok((name, token.location)),
                _ => unreachable!("checked above"),
            }
        } else {
            Err(self.unexpected_token(&["identifier".to_string()], context))
        }
    }

    fn warn(&mut self, message: String, location: SourceLocation) -> Result<(), CompileError> {
        report_warning(self.options.warning_mode, &mut self.warnings, message, location)
    }

    // ========================================================================
    // Statement terminators
    // ========================================================================

    /// A statement ends at a newline (the next token sits on a later line),
    /// at a `;`, or implicitly before `}` / end of file. Only `;` is
    /// consumed.
    fn parse_stmt_terminator(&mut self, context: Option<&str>) -> Result<(), CompileError> {
        if self.location().line != self.stream.previous().location.line {
            let location = self.stream.previous().location;
            return self.note_terminator(Terminator::Newline, location);
        }

        match self.current_kind() {
            TokenKind::RightBrace | TokenKind::Eof => {
                let location = self.location();
                self.note_terminator(Terminator::Newline, location)
            }
            TokenKind::Semicolon => {
                let location = self.location();
                self.consume()?;
                self.note_terminator(Terminator::Semicolon, location)
            }
            _ => Err(self.unexpected_token(&["newline".to_string(), "';'".to_string()], context)),
        }
    }

    /// Record a terminator sighting. The first style seen wins; every later
    /// statement whose style differs warns against it.
    fn note_terminator(&mut self, terminator: Terminator, location: SourceLocation) -> Result<(), CompileError> {
        match self.established_terminator {
            None => {
                self.established_terminator = Some(terminator);
                Ok(())
            }
            Some(expected) if expected != terminator => self.warn(
                format!("inconsistent statement terminator, expected {}", expected.description()),
                location,
            ),
            Some(_) => Ok(()),
        }
    }

    // ========================================================================
    // Conditional compilation
    // ========================================================================

    /// `#if [!]flag` / `#if [!]hasInclude("path")` ... `#else` ... `#endif`.
    ///
    /// Declarations in a not-taken branch are still parsed, so their syntax
    /// errors surface, but they are discarded instead of registered.
    fn parse_ifdef(&mut self, decls: &mut Vec<Decl>, active: bool) -> Result<(), CompileError> {
        self.expect_token(TokenKind::HashIf, None)?;
        let negate = if self.at(&TokenKind::Not) {
            self.consume()?;
            true
        } else {
            false
        };
        let (name, _) = self.parse_identifier(Some("after '#if'"))?;

        let mut condition = if name == "hasInclude" {
            self.expect_token(TokenKind::LeftParen, None)?;
            let header = match self.current_kind().clone() {
                TokenKind::StringLiteral(path) => {
                    self.consume()?;
                    path
                }
                _ => {
                    return Err(
                        self.unexpected_token(&["string literal".to_string()], Some("in 'hasInclude'"))
                    );
                }
            };
            self.expect_token(TokenKind::RightParen, None)?;
            self.options.has_include(&header)
        } else {
            self.options.is_defined(&name)
        };
        if negate {
            condition = !condition;
        }

        while !matches!(self.current_kind(), TokenKind::HashElse | TokenKind::HashEndif) {
            if self.current_kind() == &TokenKind::Eof {
                return Err(self.unexpected_token(&["'#endif'".to_string()], None));
            }
            self.parse_ifdef_body(decls, active && condition)?;
        }

        if self.at(&TokenKind::HashElse) {
            self.consume()?;
            while !self.at(&TokenKind::HashEndif) {
                if self.current_kind() == &TokenKind::Eof {
                    return Err(self.unexpected_token(&["'#endif'".to_string()], None));
                }
                self.parse_ifdef_body(decls, active && !condition)?;
            }
        }

        self.consume()?; // '#endif'
        Ok(())
    }

    fn parse_ifdef_body(&mut self, decls: &mut Vec<Decl>, active: bool) -> Result<(), CompileError> {
        if self.at(&TokenKind::HashIf) {
            self.parse_ifdef(decls, active)
        } else {
            let decl = self.parse_top_level_decl()?;
            if active {
                decls.push(decl);
            }
            Ok(())
        }
    }
}

/// Format an expected-token list: `'a'`, `'a' or 'b'`, `'a', 'b', or 'c'`.
fn format_expected(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [single] => single.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

// ============================================================================
// Convenience entrypoints
// ============================================================================

/// Parse one file from disk.
#[tracing::instrument(skip(options, map))]
pub fn parse_file(
    path: impl AsRef<Path> + std::fmt::Debug,
    options: &CompileOptions,
    map: &mut SourceMap,
) -> Result<(SourceFile, Vec<Diagnostic>), CompileError> {
    let mut parser = Parser::from_file(path, options, map)?;
    let file = parser.parse_source_file()?;
    Ok((file, parser.take_warnings()))
}

/// Parse an in-memory source buffer registered under `name`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn parse_source(
    name: impl AsRef<Path>,
    source: &str,
    options: &CompileOptions,
    map: &mut SourceMap,
) -> Result<(SourceFile, Vec<Diagnostic>), CompileError> {
    let mut parser = Parser::from_source(name, source, options, map)?;
    let file = parser.parse_source_file()?;
    Ok((file, parser.take_warnings()))
}
