/// Expression parsing: precedence climbing with the assignment backtrack,
/// ternary `?:` at binary level, postfix chains, and the paren ambiguity
/// (lambda vs. tuple literal vs. parenthesized expression).

impl<'a> Parser<'a> {
    /// expr ::= prefix-expr | postfix-expr | binary-expr | if-expr
    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_expr(0)
    }

    /// binary-expr ::= expr op expr
    ///
    /// Precedence climbing. Two special cases:
    /// - the ternary `a ? b : c` participates at [`TERNARY_PRECEDENCE`];
    /// - after speculatively parsing a right-hand side, finding another
    ///   assignment operator means this is a chained assignment; the cursor
    ///   rewinds to before the operator and the statement-level parser
    ///   takes over (see [`parse_stmt_level_expr`](Self::parse_stmt_level_expr)).
    fn parse_binary_expr(&mut self, min_precedence: i32) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_pre_or_postfix_expr()?;

        loop {
            if self.at(&TokenKind::QuestionMark) {
                if TERNARY_PRECEDENCE < min_precedence {
                    break;
                }
                lhs = self.parse_if_expr(lhs)?;
                continue;
            }

            let Some(op) = BinaryOp::from_token(self.current_kind()) else {
                break;
            };
            if op.precedence() < min_precedence {
                break;
            }

            let checkpoint = self.stream.checkpoint();
            let op_token = self.consume()?;
            let rhs = self.parse_binary_expr(op.precedence() + 1)?;

            if self.current_kind().is_assignment_operator() {
                self.stream.rewind(checkpoint);
                break;
            }

            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location: op_token.location,
            });
        }

        Ok(lhs)
    }

    /// Expression at statement position. Also accepts chained assignment,
    /// which the expression grammar itself rewinds out of: `a = b = c` is a
    /// statement-level construct only.
    fn parse_stmt_level_expr(&mut self) -> Result<Expr, CompileError> {
        let expr = self.parse_expr()?;

        if let Some(op) = BinaryOp::from_token(self.current_kind()) {
            if op.is_assignment() {
                let location = self.location();
                self.consume()?;
                let rhs = self.parse_stmt_level_expr()?;
                return Ok(Expr::Binary(BinaryExpr {
                    op,
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                    location,
                }));
            }
        }

        Ok(expr)
    }

    fn parse_pre_or_postfix_expr(&mut self) -> Result<Expr, CompileError> {
        if self.current_kind().is_unary_operator() {
            self.parse_prefix_expr()
        } else {
            self.parse_postfix_expr()
        }
    }

    /// prefix-expr ::= prefix-operator (prefix-expr | postfix-expr)
    fn parse_prefix_expr(&mut self) -> Result<Expr, CompileError> {
        let op_token = self.consume()?;
        let op = UnaryOp::from_token(&op_token.kind).expect("caller checked is_unary_operator");
        let operand = self.parse_pre_or_postfix_expr()?;
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            location: op_token.location,
        }))
    }

    /// postfix-expr ::= primary postfix-op*
    /// postfix-op ::= subscript | call | '.' member | '++' | '--' | '!'
    fn parse_postfix_expr(&mut self) -> Result<Expr, CompileError> {
        let kind = self.current_kind().clone();
        let location = self.location();

        let mut expr = match kind {
            TokenKind::Identifier(_) | TokenKind::Init => {
                let next = self.look_ahead_kind(1)?;
                let is_call = next == TokenKind::LeftParen
                    || (next == TokenKind::Less && self.should_parse_generic_argument_list()?);
                if is_call {
                    let callee = self.parse_var_expr()?;
                    self.parse_call_expr(callee)?
                } else {
                    self.parse_var_expr()?
                }
            }
            TokenKind::This => {
                self.consume()?;
                Expr::Var(VarExpr {
                    name: "this".to_string(),
                    location,
                })
            }
            TokenKind::IntLiteral(value) => {
                self.consume()?;
                Expr::IntLiteral { value, location }
            }
            TokenKind::FloatLiteral(value) => {
                self.consume()?;
                Expr::FloatLiteral { value, location }
            }
            TokenKind::StringLiteral(value) => {
                self.consume()?;
                Expr::StringLiteral { value, location }
            }
            TokenKind::CharLiteral(value) => {
                self.consume()?;
                Expr::CharLiteral { value, location }
            }
            TokenKind::True | TokenKind::False => {
                self.consume()?;
                Expr::BoolLiteral {
                    value: kind == TokenKind::True,
                    location,
                }
            }
            TokenKind::Null => {
                self.consume()?;
                Expr::NullLiteral { location }
            }
            TokenKind::Undefined => {
                self.consume()?;
                Expr::UndefinedLiteral { location }
            }
            TokenKind::LeftParen => {
                if self.arrow_after_parentheses()? {
                    self.parse_lambda_expr()?
                } else if matches!(self.look_ahead_kind(1)?, TokenKind::Identifier(_))
                    && matches!(self.look_ahead_kind(2)?, TokenKind::Colon | TokenKind::Comma)
                {
                    self.parse_tuple_literal()?
                } else {
                    self.parse_paren_expr()?
                }
            }
            TokenKind::LeftBracket => self.parse_array_literal()?,
            TokenKind::Sizeof => self.parse_sizeof_expr()?,
            TokenKind::Addressof => self.parse_addressof_expr()?,
            _ => return Err(self.unexpected_token(&[], None)),
        };

        loop {
            match self.current_kind() {
                TokenKind::LeftBracket => expr = self.parse_subscript_expr(expr)?,
                TokenKind::LeftParen => expr = self.parse_call_expr(expr)?,
                TokenKind::Dot => {
                    self.consume()?;
                    expr = self.parse_member_expr(expr)?;
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    let token = self.consume()?;
                    let op = UnaryOp::from_token(&token.kind).expect("increment or decrement");
                    expr = Expr::Unary(UnaryExpr {
                        op,
                        operand: Box::new(expr),
                        location: token.location,
                    });
                }
                TokenKind::Not => {
                    let location = self.location();
                    self.consume()?;
                    expr = Expr::Unwrap(UnwrapExpr {
                        operand: Box::new(expr),
                        location,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    // ========================================================================
    // Disambiguation
    // ========================================================================

    /// Spacing heuristic for `Foo<Bar>` vs. `Foo < Bar`: a generic argument
    /// list is assumed when there is no whitespace between the identifier
    /// and `<`, or none between `<` and the token after it. Preserved
    /// verbatim from the column arithmetic the language has always used;
    /// the grammar does not guarantee unambiguous parsing here.
    fn should_parse_generic_argument_list(&mut self) -> Result<bool, CompileError> {
        let t0 = self.current().clone();
        let t1 = self.stream.look_ahead(1)?.expect("positive lookahead").clone();
        let t2 = self.stream.look_ahead(2)?.expect("positive lookahead").clone();

        Ok(t0.location.column + t0.kind.width() == t1.location.column
            || t1.location.column + 1 == t2.location.column)
    }

    /// True if a `->` immediately follows the parenthesized group starting
    /// at the current `(`.
    fn arrow_after_parentheses(&mut self) -> Result<bool, CompileError> {
        debug_assert!(self.at(&TokenKind::LeftParen));
        let mut offset = 1isize;
        let mut paren_depth = 1i32;

        while paren_depth > 0 {
            match self.look_ahead_kind(offset)? {
                TokenKind::LeftParen => paren_depth += 1,
                TokenKind::RightParen => paren_depth -= 1,
                TokenKind::Eof => return Ok(false),
                _ => {}
            }
            offset += 1;
        }

        Ok(self.look_ahead_kind(offset)? == TokenKind::RightArrow)
    }

    // ========================================================================
    // Primary expressions
    // ========================================================================

    /// var-expr ::= id
    ///
    /// Also accepts the `init` keyword so delegating initializer calls
    /// (`init(...)`) and `Foo.init` member references parse.
    fn parse_var_expr(&mut self) -> Result<Expr, CompileError> {
        let token = self.consume()?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            TokenKind::Init => "init".to_string(),
            _ => unreachable!("caller checked for identifier or 'init'"),
        };
        Ok(Expr::Var(VarExpr {
            name,
            location: token.location,
        }))
    }

    /// argument-list ::= '(' (argument (',' argument)*)? ')'
    /// argument ::= (id ':')? expr
    fn parse_argument_list(&mut self) -> Result<Vec<NamedValue>, CompileError> {
        self.expect_token(TokenKind::LeftParen, None)?;
        let mut args = Vec::new();

        while !self.at(&TokenKind::RightParen) {
            let mut name = None;
            let mut name_location = None;
            if matches!(self.current_kind(), TokenKind::Identifier(_))
                && self.look_ahead_kind(1)? == TokenKind::Colon
            {
                let (label, location) = self.parse_identifier(None)?;
                self.consume()?; // ':'
                name = Some(label);
                name_location = Some(location);
            }
            let value = self.parse_expr()?;
            let location = name_location.unwrap_or_else(|| value.location());
            args.push(NamedValue { name, value, location });
            if !self.at(&TokenKind::RightParen) {
                self.expect_token(TokenKind::Comma, None)?;
            }
        }

        self.consume()?;
        Ok(args)
    }

    /// call-expr ::= expr generic-argument-list? argument-list
    fn parse_call_expr(&mut self, callee: Expr) -> Result<Expr, CompileError> {
        let generic_args = if self.at(&TokenKind::Less) {
            self.parse_generic_argument_list()?
        } else {
            Vec::new()
        };
        let location = self.location();
        let args = self.parse_argument_list()?;
        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            generic_args,
            location,
        }))
    }

    /// member-expr ::= expr '.' (id | 'init' | 'deinit')
    fn parse_member_expr(&mut self, operand: Expr) -> Result<Expr, CompileError> {
        let location = self.location();
        let member = match self.current_kind() {
            TokenKind::Identifier(_) => self.parse_identifier(None)?.0,
            TokenKind::Init => {
                self.consume()?;
                "init".to_string()
            }
            TokenKind::Deinit => {
                self.consume()?;
                "deinit".to_string()
            }
            _ => return Err(self.unexpected_token(&["identifier".to_string()], None)),
        };
        Ok(Expr::Member(MemberExpr {
            operand: Box::new(operand),
            member,
            location,
        }))
    }

    /// subscript-expr ::= expr '[' expr ']'
    fn parse_subscript_expr(&mut self, operand: Expr) -> Result<Expr, CompileError> {
        let location = self.location();
        self.expect_token(TokenKind::LeftBracket, None)?;
        let index = self.parse_expr()?;
        self.expect_token(TokenKind::RightBracket, None)?;
        Ok(Expr::Subscript(SubscriptExpr {
            operand: Box::new(operand),
            index: Box::new(index),
            location,
        }))
    }

    /// if-expr ::= expr '?' expr ':' expr
    fn parse_if_expr(&mut self, condition: Expr) -> Result<Expr, CompileError> {
        let location = self.location();
        self.expect_token(TokenKind::QuestionMark, None)?;
        let then_expr = self.parse_expr()?;
        self.expect_token(TokenKind::Colon, None)?;
        let else_expr = self.parse_expr()?;
        Ok(Expr::If(IfExpr {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            location,
        }))
    }

    /// lambda-expr ::= param-list '->' expr
    fn parse_lambda_expr(&mut self) -> Result<Expr, CompileError> {
        let location = self.location();
        let params = self.parse_param_list(None)?;
        self.expect_token(TokenKind::RightArrow, None)?;
        let body = self.parse_expr()?;
        Ok(Expr::Lambda(LambdaExpr {
            params,
            body: Box::new(body),
            location,
        }))
    }

    /// paren-expr ::= '(' expr ')'
    fn parse_paren_expr(&mut self) -> Result<Expr, CompileError> {
        self.expect_token(TokenKind::LeftParen, None)?;
        let expr = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        Ok(expr)
    }

    /// tuple-literal ::= '(' argument-list ')'
    ///
    /// Unnamed elements that are plain variable references adopt the
    /// variable's name; any other unnamed element is an error.
    fn parse_tuple_literal(&mut self) -> Result<Expr, CompileError> {
        let location = self.location();
        let elements = self.parse_argument_list()?;
        let mut named = Vec::with_capacity(elements.len());

        for mut element in elements {
            if element.name.is_none() {
                match &element.value {
                    Expr::Var(var) => element.name = Some(var.name.clone()),
                    _ => {
                        return Err(CompileError::parse(
                            "tuple elements must have names",
                            element.location,
                        ));
                    }
                }
            }
            named.push(element);
        }

        Ok(Expr::TupleLiteral {
            elements: named,
            location,
        })
    }

    /// array-literal ::= '[' (expr (',' expr)*)? ']'
    fn parse_array_literal(&mut self) -> Result<Expr, CompileError> {
        let location = self.location();
        self.expect_token(TokenKind::LeftBracket, None)?;
        let mut elements = Vec::new();

        while !self.at(&TokenKind::RightBracket) {
            elements.push(self.parse_expr()?);
            if !self.at(&TokenKind::RightBracket) {
                self.expect_token(TokenKind::Comma, None)?;
            }
        }

        self.consume()?;
        Ok(Expr::ArrayLiteral { elements, location })
    }

    /// sizeof-expr ::= 'sizeof' '(' type ')'
    fn parse_sizeof_expr(&mut self) -> Result<Expr, CompileError> {
        let location = self.location();
        self.consume()?; // 'sizeof'
        self.expect_token(TokenKind::LeftParen, None)?;
        let ty = self.parse_type()?;
        self.expect_token(TokenKind::RightParen, None)?;
        Ok(Expr::Sizeof(SizeofExpr { ty, location }))
    }

    /// addressof-expr ::= 'addressof' '(' expr ')'
    fn parse_addressof_expr(&mut self) -> Result<Expr, CompileError> {
        let location = self.location();
        self.consume()?; // 'addressof'
        self.expect_token(TokenKind::LeftParen, None)?;
        let operand = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen, None)?;
        Ok(Expr::Addressof(AddressofExpr {
            operand: Box::new(operand),
            location,
        }))
    }
}
