/// Statement parsing: variable declarations (with the type-vs-expression
/// backtrack), control flow, and statement lists.

impl<'a> Parser<'a> {
    /// stmt ::= var-stmt | return-stmt | expr-stmt | defer-stmt | if-stmt
    ///        | switch-stmt | while-stmt | for-stmt | break-stmt | continue-stmt
    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match self.current_kind() {
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Defer => {
                self.consume()?;
                let expr = self.parse_expr()?;
                self.parse_stmt_terminator(None)?;
                Ok(Stmt::Defer(expr))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Break => {
                let location = self.location();
                self.consume()?;
                self.parse_stmt_terminator(None)?;
                Ok(Stmt::Break(location))
            }
            TokenKind::Continue => {
                let location = self.location();
                self.consume()?;
                self.parse_stmt_terminator(None)?;
                Ok(Stmt::Continue(location))
            }
            TokenKind::Underscore => {
                // `_ = expr` evaluates and discards the result.
                self.consume()?;
                self.expect_token(TokenKind::Assign, None)?;
                let expr = self.parse_stmt_level_expr()?;
                self.parse_stmt_terminator(None)?;
                Ok(Stmt::Expr(expr))
            }
            _ => {
                if self.should_parse_var_stmt()? {
                    return Ok(Stmt::Var(self.parse_var_decl(true, AccessLevel::Default)?));
                }

                // The statement starts with an expression.
                let expr = self.parse_stmt_level_expr()?;
                if !expr.is_call() && !expr.is_increment_or_decrement() && !expr.is_assignment() {
                    return Err(self.unexpected_token(&[], None));
                }
                self.parse_stmt_terminator(None)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Speculatively parse a type to decide between a variable declaration
    /// (`int x = ...`) and an expression statement. The cursor is restored
    /// either way.
    fn should_parse_var_stmt(&mut self) -> Result<bool, CompileError> {
        if self.at(&TokenKind::Var) {
            return Ok(true);
        }

        let checkpoint = self.stream.checkpoint();
        let result = match self.parse_type() {
            Ok(_) => matches!(self.current_kind(), TokenKind::Identifier(_)),
            Err(err) if err.kind == ErrorKind::Parse => false,
            Err(err) => return Err(err),
        };
        self.stream.rewind(checkpoint);
        Ok(result)
    }

    /// return-stmt ::= 'return' expr? terminator
    fn parse_return_stmt(&mut self) -> Result<Stmt, CompileError> {
        let location = self.location();
        self.consume()?; // 'return'
        let value = if matches!(self.current_kind(), TokenKind::Semicolon | TokenKind::RightBrace) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.parse_stmt_terminator(None)?;
        Ok(Stmt::Return(ReturnStmt { value, location }))
    }

    /// var-decl ::= type-specifier id ('=' initializer terminator)?
    /// type-specifier ::= 'const'? (type | 'var')
    fn parse_var_decl(
        &mut self,
        require_initializer: bool,
        access_level: AccessLevel,
    ) -> Result<VarDecl, CompileError> {
        let mut mutability = Mutability::Mutable;
        if self.at(&TokenKind::Const) {
            self.consume()?;
            mutability = Mutability::Const;
        }

        let declared_type = if self.at(&TokenKind::Var) {
            self.consume()?;
            None
        } else if self.look_ahead_kind(1)? != TokenKind::Assign {
            Some(self.parse_type()?.with_mutability(mutability))
        } else {
            None
        };

        let (name, location) = self.parse_identifier(None)?;
        self.parse_var_decl_after_name(require_initializer, access_level, declared_type, mutability, name, location)
    }

    fn parse_var_decl_after_name(
        &mut self,
        require_initializer: bool,
        access_level: AccessLevel,
        declared_type: Option<Type>,
        mutability: Mutability,
        name: String,
        location: SourceLocation,
    ) -> Result<VarDecl, CompileError> {
        let initializer = if require_initializer {
            self.expect_token(TokenKind::Assign, None)?;
            let expr = self.parse_expr()?;
            self.parse_stmt_terminator(None)?;
            Some(expr)
        } else {
            None
        };

        Ok(VarDecl {
            declared_type,
            mutability,
            name,
            initializer,
            access_level,
            location,
        })
    }

    /// if-stmt ::= 'if' '(' expr ')' block-or-stmt ('else' block-or-stmt)?
    fn parse_if_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.consume()?; // 'if'
        self.expect_token(TokenKind::LeftParen, None)?;
        let condition = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        let then_body = self.parse_block_or_stmt()?;
        let else_body = if self.at(&TokenKind::Else) {
            self.consume()?;
            self.parse_block_or_stmt()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If(IfStmt {
            condition,
            then_body,
            else_body,
        }))
    }

    /// while-stmt ::= 'while' '(' expr ')' block-or-stmt
    fn parse_while_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.consume()?; // 'while'
        self.expect_token(TokenKind::LeftParen, None)?;
        let condition = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::While(WhileStmt { condition, body }))
    }

    /// for-stmt ::= 'for' '(' var-decl 'in' expr ')' block-or-stmt
    fn parse_for_stmt(&mut self) -> Result<Stmt, CompileError> {
        let location = self.location();
        self.consume()?; // 'for'
        self.expect_token(TokenKind::LeftParen, None)?;
        let variable = self.parse_var_decl(false, AccessLevel::Default)?;
        self.expect_token(TokenKind::In, None)?;
        let range = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::For(ForStmt {
            variable,
            range,
            body,
            location,
        }))
    }

    /// switch-stmt ::= 'switch' '(' expr ')' '{' case+ '}'
    /// case ::= 'case' expr ('as' id)? ':' stmt+ | 'default' ':' stmt+
    ///
    /// Duplicate `default` clauses parse fine; rejecting them is the type
    /// checker's job.
    fn parse_switch_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.consume()?; // 'switch'
        self.expect_token(TokenKind::LeftParen, None)?;
        let condition = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        self.expect_token(TokenKind::LeftBrace, None)?;

        let case_enders = [TokenKind::Case, TokenKind::Default, TokenKind::RightBrace];
        let mut cases = Vec::new();

        loop {
            match self.current_kind() {
                TokenKind::Case => {
                    let location = self.location();
                    self.consume()?;
                    let value = self.parse_expr()?;
                    let binding = if self.at(&TokenKind::As) {
                        self.consume()?;
                        let (name, binding_location) = self.parse_identifier(None)?;
                        Some(CaseBinding {
                            name,
                            location: binding_location,
                        })
                    } else {
                        None
                    };
                    self.expect_token(TokenKind::Colon, None)?;
                    let stmts = self.parse_stmts_until(&case_enders)?;
                    cases.push(SwitchCase {
                        pattern: CasePattern::Expr(value),
                        binding,
                        stmts,
                        location,
                    });
                }
                TokenKind::Default => {
                    let location = self.location();
                    self.consume()?;
                    self.expect_token(TokenKind::Colon, None)?;
                    let stmts = self.parse_stmts_until(&case_enders)?;
                    cases.push(SwitchCase {
                        pattern: CasePattern::Default,
                        binding: None,
                        stmts,
                        location,
                    });
                }
                _ => {
                    return Err(
                        self.unexpected_token(&["'case'".to_string(), "'default'".to_string()], None)
                    );
                }
            }

            if self.at(&TokenKind::RightBrace) {
                break;
            }
        }

        self.consume()?; // '}'
        Ok(Stmt::Switch(SwitchStmt { condition, cases }))
    }

    /// block-or-stmt ::= '{' stmt* '}' | stmt
    fn parse_block_or_stmt(&mut self) -> Result<Vec<Stmt>, CompileError> {
        if self.at(&TokenKind::LeftBrace) {
            self.consume()?;
            let stmts = self.parse_stmts_until(&[TokenKind::RightBrace])?;
            self.consume()?;
            Ok(stmts)
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    /// Parse statements until one of `stops` (not consumed).
    fn parse_stmts_until(&mut self, stops: &[TokenKind]) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        while !stops.contains(self.current_kind()) {
            if self.current_kind() == &TokenKind::Eof {
                return Err(self.unexpected_token(&["'}'".to_string()], None));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }
}
