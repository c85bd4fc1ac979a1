/// Declaration parsing: functions and templates, structs and interfaces,
/// enums, imports, globals, operator-function names, and the synthesized
/// memberwise initializer for structs with no explicit `init`.

impl<'a> Parser<'a> {
    /// top-level-decl ::= function-decl | extern-function-decl | type-decl
    ///                  | type-template-decl | enum-decl | import-decl | var-decl
    fn parse_top_level_decl(&mut self) -> Result<Decl, CompileError> {
        let mut access_level = AccessLevel::Default;

        loop {
            match self.current_kind() {
                TokenKind::Private => {
                    if access_level != AccessLevel::Default {
                        let location = self.location();
                        self.warn("duplicate access specifier".to_string(), location)?;
                    }
                    access_level = AccessLevel::Private;
                    self.consume()?;
                }
                TokenKind::Extern => {
                    if access_level != AccessLevel::Default {
                        let location = self.stream.previous().location;
                        self.warn("extern functions cannot have access specifiers".to_string(), location)?;
                    }
                    self.consume()?;
                    return self.parse_top_level_function_or_variable(true, AccessLevel::Default);
                }
                TokenKind::Struct | TokenKind::Interface => {
                    return if self.look_ahead_kind(2)? == TokenKind::Less {
                        Ok(Decl::TypeTemplate(self.parse_type_template(access_level)?))
                    } else {
                        Ok(Decl::Type(self.parse_type_decl(None, access_level)?))
                    };
                }
                TokenKind::Enum => return Ok(Decl::Enum(self.parse_enum_decl(access_level)?)),
                TokenKind::Var | TokenKind::Const => {
                    // `const` may open a constant declaration or qualify the
                    // return type of a function; the third token decides.
                    if self.at(&TokenKind::Const) && self.look_ahead_kind(2)? != TokenKind::Assign {
                        return self.parse_top_level_function_or_variable(false, access_level);
                    }
                    return Ok(Decl::Var(self.parse_var_decl(true, access_level)?));
                }
                TokenKind::Import => {
                    if access_level != AccessLevel::Default {
                        let location = self.stream.previous().location;
                        self.warn("imports cannot have access specifiers".to_string(), location)?;
                    }
                    return Ok(Decl::Import(self.parse_import_decl()?));
                }
                _ => return self.parse_top_level_function_or_variable(false, access_level),
            }
        }
    }

    /// Shared tail for top-level declarations that start with a type:
    /// functions, function templates, and typed global variables.
    fn parse_top_level_function_or_variable(
        &mut self,
        is_extern: bool,
        access_level: AccessLevel,
    ) -> Result<Decl, CompileError> {
        let ty = self.parse_type()?;
        let location = self.location();
        let name = self.parse_function_name(None)?;

        match self.current_kind() {
            TokenKind::LeftParen => {
                let decl = if is_extern {
                    self.parse_extern_function_decl(ty, name, location)?
                } else {
                    self.parse_function_decl(access_level, false, ty, name, location)?
                };
                Ok(Decl::Function(decl))
            }
            TokenKind::Less => Ok(Decl::FunctionTemplate(
                self.parse_function_template(access_level, ty, name, location)?,
            )),
            _ => {
                let mutability = ty.mutability;
                let decl = self.parse_var_decl_after_name(
                    true,
                    access_level,
                    Some(ty),
                    mutability,
                    name,
                    location,
                )?;
                Ok(Decl::Var(decl))
            }
        }
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// A function name is an identifier, or `operator` followed by `[` `]`
    /// (the subscript operator, allowed as a member) or an overloadable
    /// operator token (non-member functions only).
    fn parse_function_name(&mut self, receiver: Option<&str>) -> Result<String, CompileError> {
        let (name, name_location) = self.parse_identifier(None)?;
        if name != "operator" {
            return Ok(name);
        }

        let op = self.consume()?;
        if op.kind == TokenKind::LeftBracket {
            self.expect_token(TokenKind::RightBracket, None)?;
            return Ok("[]".to_string());
        }
        if !op.kind.is_overloadable() {
            return Err(CompileError::parse(
                format!("unexpected {} as function name", op.kind),
                op.location,
            ));
        }
        if receiver.is_some() {
            return Err(CompileError::parse(
                "operator functions other than subscript must be non-member functions",
                name_location,
            ));
        }
        Ok(op
            .kind
            .text()
            .expect("overloadable operators have fixed spellings")
            .to_string())
    }

    /// param-decl ::= type id
    fn parse_param(&mut self) -> Result<ParamDecl, CompileError> {
        let ty = self.parse_type()?;
        let (name, location) = self.parse_identifier(None)?;
        Ok(ParamDecl {
            ty: Some(ty),
            name,
            location,
        })
    }

    /// param-list ::= '(' (param-decl (',' param-decl)*)? '...'? ')'
    ///
    /// The `...` variadic marker is only accepted when the caller passes a
    /// flag to receive it (extern functions).
    fn parse_param_list(&mut self, mut is_variadic: Option<&mut bool>) -> Result<Vec<ParamDecl>, CompileError> {
        self.expect_token(TokenKind::LeftParen, None)?;
        let mut params = Vec::new();

        while !self.at(&TokenKind::RightParen) {
            if let Some(variadic) = is_variadic.as_deref_mut() {
                if self.at(&TokenKind::DotDotDot) {
                    self.consume()?;
                    *variadic = true;
                    break;
                }
            }
            params.push(self.parse_param()?);
            if !self.at(&TokenKind::RightParen) {
                self.expect_token(TokenKind::Comma, None)?;
            }
        }

        self.expect_token(TokenKind::RightParen, None)?;
        Ok(params)
    }

    /// generic-param-list ::= '<' generic-param (',' generic-param)* '>'
    /// generic-param ::= id (':' type)?
    fn parse_generic_param_list(&mut self, params: &mut Vec<GenericParamDecl>) -> Result<(), CompileError> {
        self.expect_token(TokenKind::Less, None)?;

        loop {
            let (name, location) = self.parse_identifier(None)?;
            let mut param = GenericParamDecl {
                name,
                constraints: Vec::new(),
                location,
            };
            if self.at(&TokenKind::Colon) {
                self.consume()?;
                param.constraints.push(self.parse_type()?);
            }
            params.push(param);

            if self.at(&TokenKind::Greater) {
                break;
            }
            self.expect_token(TokenKind::Comma, None)?;
        }

        self.expect_token(TokenKind::Greater, None)?;
        Ok(())
    }

    /// function-proto ::= type id generic-param-list? param-list
    fn parse_function_proto(
        &mut self,
        is_extern: bool,
        access_level: AccessLevel,
        generic_params: Option<&mut Vec<GenericParamDecl>>,
        return_type: Type,
        name: String,
        location: SourceLocation,
    ) -> Result<FunctionDecl, CompileError> {
        if self.at(&TokenKind::Less) {
            if let Some(params) = generic_params {
                self.parse_generic_param_list(params)?;
            }
        }

        let mut is_variadic = false;
        let params = self.parse_param_list(if is_extern { Some(&mut is_variadic) } else { None })?;

        Ok(FunctionDecl {
            name,
            return_type,
            params,
            body: None,
            is_extern,
            is_variadic,
            access_level,
            location,
        })
    }

    /// function-decl ::= function-proto ('{' stmt* '}' | terminator)
    fn parse_function_decl(
        &mut self,
        access_level: AccessLevel,
        require_body: bool,
        return_type: Type,
        name: String,
        location: SourceLocation,
    ) -> Result<FunctionDecl, CompileError> {
        let mut decl = self.parse_function_proto(false, access_level, None, return_type, name, location)?;

        if require_body || self.at(&TokenKind::LeftBrace) {
            self.expect_token(TokenKind::LeftBrace, None)?;
            decl.body = Some(self.parse_stmts_until(&[TokenKind::RightBrace])?);
            self.expect_token(TokenKind::RightBrace, None)?;
        }

        if self.stream.previous().kind != TokenKind::RightBrace {
            self.parse_stmt_terminator(None)?;
        }

        Ok(decl)
    }

    /// function-template-decl ::= type id generic-param-list param-list '{' stmt* '}'
    fn parse_function_template(
        &mut self,
        access_level: AccessLevel,
        return_type: Type,
        name: String,
        location: SourceLocation,
    ) -> Result<FunctionTemplate, CompileError> {
        let mut generic_params = Vec::new();
        let mut function = self.parse_function_proto(
            false,
            access_level,
            Some(&mut generic_params),
            return_type,
            name,
            location,
        )?;

        self.expect_token(TokenKind::LeftBrace, None)?;
        function.body = Some(self.parse_stmts_until(&[TokenKind::RightBrace])?);
        self.expect_token(TokenKind::RightBrace, None)?;

        Ok(FunctionTemplate {
            generic_params,
            function,
            access_level,
        })
    }

    /// extern-function-decl ::= 'extern' function-proto terminator
    fn parse_extern_function_decl(
        &mut self,
        return_type: Type,
        name: String,
        location: SourceLocation,
    ) -> Result<FunctionDecl, CompileError> {
        let decl = self.parse_function_proto(true, AccessLevel::Default, None, return_type, name, location)?;
        self.parse_stmt_terminator(None)?;
        Ok(decl)
    }

    // ========================================================================
    // Structs and interfaces
    // ========================================================================

    /// init-decl ::= 'init' param-list '{' stmt* '}'
    fn parse_init_decl(&mut self, access_level: AccessLevel) -> Result<InitDecl, CompileError> {
        let location = self.expect_token(TokenKind::Init, None)?.location;
        let params = self.parse_param_list(None)?;
        self.expect_token(TokenKind::LeftBrace, None)?;
        let body = self.parse_stmts_until(&[TokenKind::RightBrace])?;
        self.expect_token(TokenKind::RightBrace, None)?;
        Ok(InitDecl {
            params,
            body,
            access_level,
            location,
        })
    }

    /// deinit-decl ::= 'deinit' '(' ')' '{' stmt* '}'
    fn parse_deinit_decl(&mut self) -> Result<DeinitDecl, CompileError> {
        let location = self.expect_token(TokenKind::Deinit, None)?.location;
        self.expect_token(TokenKind::LeftParen, None)?;
        if self.current_kind() != &TokenKind::RightParen {
            return Err(CompileError::parse(
                "deinitializers cannot have parameters",
                self.location(),
            ));
        }
        self.consume()?;
        self.expect_token(TokenKind::LeftBrace, None)?;
        let body = self.parse_stmts_until(&[TokenKind::RightBrace])?;
        self.expect_token(TokenKind::RightBrace, None)?;
        Ok(DeinitDecl { body, location })
    }

    /// type-header ::= id generic-param-list? (':' non-empty-type-list)?
    fn parse_type_header(
        &mut self,
        generic_params: Option<&mut Vec<GenericParamDecl>>,
    ) -> Result<(String, SourceLocation, Vec<Type>), CompileError> {
        let (name, location) = self.parse_identifier(None)?;

        if self.at(&TokenKind::Less) {
            match generic_params {
                Some(params) => self.parse_generic_param_list(params)?,
                None => return Err(self.unexpected_token(&[], None)),
            }
        }

        let interfaces = if self.at(&TokenKind::Colon) {
            self.consume()?;
            self.parse_nonempty_type_list()?
        } else {
            Vec::new()
        };

        Ok((name, location, interfaces))
    }

    /// type-decl ::= ('struct' | 'interface') type-header '{' member-decl* '}'
    /// member-decl ::= 'private'? (field-decl | function-decl | init-decl | deinit-decl)
    fn parse_type_decl(
        &mut self,
        mut generic_params: Option<&mut Vec<GenericParamDecl>>,
        type_access_level: AccessLevel,
    ) -> Result<TypeDecl, CompileError> {
        let tag = match self.consume()?.kind {
            TokenKind::Struct => TypeTag::Struct,
            TokenKind::Interface => TypeTag::Interface,
            _ => unreachable!("caller checked for 'struct' or 'interface'"),
        };

        let (name, location, interfaces) = self.parse_type_header(generic_params.as_deref_mut())?;
        let mut decl = TypeDecl {
            tag,
            name,
            interfaces,
            fields: Vec::new(),
            members: Vec::new(),
            access_level: type_access_level,
            location,
        };
        let mut has_initializer = false;

        self.expect_token(TokenKind::LeftBrace, None)?;

        while !self.at(&TokenKind::RightBrace) {
            let mut access_level = AccessLevel::Default;

            loop {
                match self.current_kind() {
                    TokenKind::Private => {
                        let specifier_location = self.location();
                        if tag == TypeTag::Interface {
                            self.warn("interface members cannot be private".to_string(), specifier_location)?;
                        }
                        if access_level != AccessLevel::Default {
                            self.warn("duplicate access specifier".to_string(), specifier_location)?;
                        }
                        access_level = AccessLevel::Private;
                        self.consume()?;
                    }
                    TokenKind::Init => {
                        decl.members.push(MemberDecl::Init(self.parse_init_decl(access_level)?));
                        has_initializer = true;
                        break;
                    }
                    TokenKind::Deinit => {
                        if access_level != AccessLevel::Default {
                            let specifier_location = self.stream.previous().location;
                            self.warn(
                                format!("deinitializers cannot be {access_level}"),
                                specifier_location,
                            )?;
                        }
                        decl.members.push(MemberDecl::Deinit(self.parse_deinit_decl()?));
                        break;
                    }
                    TokenKind::Eof => return Err(self.unexpected_token(&["'}'".to_string()], None)),
                    _ => {
                        let ty = self.parse_type()?;
                        let member_location = self.location();
                        let member_name = self.parse_function_name(Some(&decl.name))?;

                        match self.current_kind() {
                            TokenKind::LeftParen => {
                                let require_body = tag != TypeTag::Interface;
                                decl.members.push(MemberDecl::Method(self.parse_function_decl(
                                    access_level,
                                    require_body,
                                    ty,
                                    member_name,
                                    member_location,
                                )?));
                            }
                            TokenKind::Less => {
                                decl.members
                                    .push(MemberDecl::MethodTemplate(self.parse_function_template(
                                        access_level,
                                        ty,
                                        member_name,
                                        member_location,
                                    )?));
                            }
                            _ => {
                                self.parse_stmt_terminator(None)?;
                                decl.fields.push(FieldDecl {
                                    ty,
                                    name: member_name,
                                    access_level,
                                    location: member_location,
                                });
                            }
                        }
                        break;
                    }
                }
            }
        }

        if tag == TypeTag::Struct && !has_initializer {
            decl.members.push(MemberDecl::Init(autogenerated_initializer(&decl)));
        }

        self.consume()?; // '}'
        Ok(decl)
    }

    /// type-template-decl ::= ('struct' | 'interface') id generic-param-list '{' member-decl* '}'
    fn parse_type_template(&mut self, access_level: AccessLevel) -> Result<TypeTemplate, CompileError> {
        let mut generic_params = Vec::new();
        let type_decl = self.parse_type_decl(Some(&mut generic_params), access_level)?;
        Ok(TypeTemplate {
            generic_params,
            type_decl,
            access_level,
        })
    }

    // ========================================================================
    // Enums and imports
    // ========================================================================

    /// enum-decl ::= 'enum' type-header '{' enum-case (',' enum-case)* '}'
    /// enum-case ::= id tuple-type?
    fn parse_enum_decl(&mut self, access_level: AccessLevel) -> Result<EnumDecl, CompileError> {
        self.consume()?; // 'enum'

        if self.look_ahead_kind(1)? == TokenKind::Less {
            return Err(CompileError::parse("generic enums are not supported", self.location()));
        }

        let (name, location, _interfaces) = self.parse_type_header(None)?;
        self.expect_token(TokenKind::LeftBrace, None)?;

        let mut cases = Vec::new();
        let mut value = 0i64;

        while !self.at(&TokenKind::RightBrace) {
            let (case_name, case_location) = self.parse_identifier(None)?;
            let associated_type = if self.at(&TokenKind::LeftParen) {
                Some(self.parse_tuple_type()?)
            } else {
                None
            };
            cases.push(EnumCase {
                name: case_name,
                associated_type,
                value,
                location: case_location,
            });
            if !self.at(&TokenKind::RightBrace) {
                self.expect_token(TokenKind::Comma, None)?;
            }
            value += 1;
        }

        self.consume()?;
        Ok(EnumDecl {
            name,
            cases,
            access_level,
            location,
        })
    }

    /// import-decl ::= 'import' (id | string-literal) terminator
    fn parse_import_decl(&mut self) -> Result<ImportDecl, CompileError> {
        self.consume()?; // 'import'
        let location = self.location();

        let target = match self.current_kind().clone() {
            TokenKind::StringLiteral(target) => {
                self.consume()?;
                target
            }
            TokenKind::Identifier(_) => self.parse_identifier(None)?.0,
            _ => {
                return Err(self.unexpected_token(
                    &["identifier".to_string(), "string literal".to_string()],
                    Some("after 'import'"),
                ));
            }
        };

        self.parse_stmt_terminator(Some("after 'import' declaration"))?;
        Ok(ImportDecl { target, location })
    }
}

/// Build the memberwise initializer a struct gets when it declares no `init`
/// of its own: one parameter per field in declaration order, and a body that
/// assigns each parameter to the correspondingly named field of `this`.
fn autogenerated_initializer(type_decl: &TypeDecl) -> InitDecl {
    let params = type_decl
        .fields
        .iter()
        .map(|field| ParamDecl {
            ty: Some(field.ty.clone()),
            name: field.name.clone(),
            location: field.location,
        })
        .collect();

    let body = type_decl
        .fields
        .iter()
        .map(|field| {
            let target = Expr::Member(MemberExpr {
                operand: Box::new(Expr::Var(VarExpr {
                    name: "this".to_string(),
                    location: field.location,
                })),
                member: field.name.clone(),
                location: field.location,
            });
            let value = Expr::Var(VarExpr {
                name: field.name.clone(),
                location: field.location,
            });
            Stmt::Expr(Expr::Binary(BinaryExpr {
                op: BinaryOp::Assign,
                lhs: Box::new(target),
                rhs: Box::new(value),
                location: field.location,
            }))
        })
        .collect();

    InitDecl {
        params,
        body,
        access_level: type_decl.access_level,
        location: type_decl.location,
    }
}
