/// Type parsing: simple types, generic argument lists, tuple and function
/// types, array size brackets, and the pointer/optional suffixes.

impl<'a> Parser<'a> {
    /// type ::= simple-type | 'const' simple-type | tuple-type
    ///        | type '*' | type '?' | type '(' param-types ')' | type '[' array-size ']'
    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let location = self.location();
        let mut ty = match self.current_kind() {
            TokenKind::Identifier(_) => self.parse_simple_type(Mutability::Mutable)?,
            TokenKind::Const => {
                self.consume()?;
                self.parse_simple_type(Mutability::Const)?
            }
            TokenKind::LeftParen => self.parse_tuple_type()?,
            _ => return Err(self.unexpected_token(&[], None)),
        };

        loop {
            match self.current_kind() {
                TokenKind::Star => {
                    let suffix_location = self.location();
                    self.consume()?;
                    ty = Type::new(TypeKind::Pointer(Box::new(ty)), Mutability::Mutable, suffix_location);
                }
                TokenKind::QuestionMark => {
                    let suffix_location = self.location();
                    self.consume()?;
                    ty = Type::new(TypeKind::Optional(Box::new(ty)), Mutability::Mutable, suffix_location);
                }
                TokenKind::LeftParen => {
                    ty = self.parse_function_type(ty)?;
                }
                TokenKind::LeftBracket => {
                    let bracket_location = self.location();
                    let size = self.parse_array_size_in_brackets()?;
                    let mutability = ty.mutability;
                    ty = Type::new(
                        TypeKind::Array {
                            element: Box::new(ty),
                            size,
                        },
                        mutability,
                        bracket_location,
                    );
                }
                TokenKind::And => {
                    return Err(CompileError::parse(
                        "Vela doesn't have C++-style references; use pointers ('*') instead, \
                         they are non-null by default",
                        self.location(),
                    ));
                }
                _ => return Ok(ty.with_location(location)),
            }
        }
    }

    /// simple-type ::= id | id generic-argument-list | id '[' array-size ']'
    fn parse_simple_type(&mut self, mutability: Mutability) -> Result<Type, CompileError> {
        let (name, location) = self.parse_identifier(None)?;

        match self.current_kind() {
            TokenKind::Less => {
                let generic_args = self.parse_generic_argument_list()?;
                Ok(Type::new(TypeKind::Basic { name, generic_args }, mutability, location))
            }
            TokenKind::LeftBracket => {
                let bracket_location = self.location();
                let element = Type::new(
                    TypeKind::Basic {
                        name,
                        generic_args: Vec::new(),
                    },
                    mutability,
                    location,
                );
                let size = self.parse_array_size_in_brackets()?;
                Ok(Type::new(
                    TypeKind::Array {
                        element: Box::new(element),
                        size,
                    },
                    mutability,
                    bracket_location,
                ))
            }
            _ => Ok(Type::new(
                TypeKind::Basic {
                    name,
                    generic_args: Vec::new(),
                },
                mutability,
                location,
            )),
        }
    }

    /// array-size ::= int-literal | '' | '?'
    fn parse_array_size_in_brackets(&mut self) -> Result<ArraySize, CompileError> {
        self.expect_token(TokenKind::LeftBracket, None)?;

        let size = match self.current_kind() {
            TokenKind::IntLiteral(value) => {
                let value = *value;
                self.consume()?;
                ArraySize::Known(value)
            }
            TokenKind::RightBracket => ArraySize::Runtime,
            TokenKind::QuestionMark => {
                self.consume()?;
                ArraySize::Unknown
            }
            _ => {
                return Err(self.unexpected_token(
                    &["integer literal".to_string(), "']'".to_string(), "'?'".to_string()],
                    Some("in array size"),
                ));
            }
        };

        self.expect_token(TokenKind::RightBracket, None)?;
        Ok(size)
    }

    /// tuple-type ::= '(' tuple-type-element (',' tuple-type-element)* ')'
    /// tuple-type-element ::= type id
    fn parse_tuple_type(&mut self) -> Result<Type, CompileError> {
        let location = self.location();
        self.expect_token(TokenKind::LeftParen, None)?;
        let mut elements = Vec::new();

        while !self.at(&TokenKind::RightParen) {
            let ty = self.parse_type()?;
            let (name, _) = self.parse_identifier(None)?;
            elements.push(TupleElement { name, ty });
            if !self.at(&TokenKind::RightParen) {
                self.expect_token(TokenKind::Comma, None)?;
            }
        }

        self.consume()?;
        Ok(Type::new(TypeKind::Tuple(elements), Mutability::Mutable, location))
    }

    /// function-type ::= type '(' (type (',' type)*)? ')'
    fn parse_function_type(&mut self, return_type: Type) -> Result<Type, CompileError> {
        self.expect_token(TokenKind::LeftParen, None)?;
        let mut param_types = Vec::new();

        while !self.at(&TokenKind::RightParen) {
            param_types.push(self.parse_type()?);
            if !self.at(&TokenKind::RightParen) {
                self.expect_token(TokenKind::Comma, None)?;
            }
        }

        self.consume()?;
        let location = return_type.location;
        Ok(Type::new(
            TypeKind::Function {
                return_type: Box::new(return_type),
                param_types,
            },
            Mutability::Mutable,
            location,
        ))
    }

    /// generic-argument-list ::= '<' non-empty-type-list '>'
    fn parse_generic_argument_list(&mut self) -> Result<Vec<Type>, CompileError> {
        self.expect_token(TokenKind::Less, None)?;
        let args = self.parse_nonempty_type_list()?;
        self.expect_token(TokenKind::Greater, None)?;
        Ok(args)
    }

    /// non-empty-type-list ::= type (',' type)*
    ///
    /// If the list ends at a `>>` token (nested generics like `Box<Box<int>>`),
    /// the token is split into two `>` so each list can consume its closer.
    fn parse_nonempty_type_list(&mut self) -> Result<Vec<Type>, CompileError> {
        let mut types = Vec::new();

        loop {
            types.push(self.parse_type()?);
            if self.at(&TokenKind::Comma) {
                self.consume()?;
                continue;
            }
            if self.at(&TokenKind::RightShift) {
                self.stream.split_right_shift();
            }
            return Ok(types);
        }
    }
}
