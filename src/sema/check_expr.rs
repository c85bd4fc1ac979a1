//! Expression checking: literals, name resolution with overload sets, member
//! access (fields, enum cases, methods including interface defaults), calls
//! (functions, methods, constructors, templates), operators, and lambdas.

use std::rc::Rc;

use vela_syntax::ast::*;
use vela_syntax::diagnostics::CompileError;
use vela_syntax::location::SourceLocation;

use super::instantiate;
use super::symbols::{Symbol, VarSymbol};
use super::{Typechecker, is_integer_type_name, is_numeric_type_name};

impl Typechecker<'_> {
    /// Check an expression and return its type.
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        match expr {
            Expr::Var(var) => self.check_var_expr(var),
            Expr::IntLiteral { location, .. } => Ok(Type::basic("int", *location)),
            Expr::FloatLiteral { location, .. } => Ok(Type::basic("float", *location)),
            Expr::BoolLiteral { location, .. } => Ok(Type::basic("bool", *location)),
            Expr::StringLiteral { location, .. } => Ok(Type::basic("string", *location)),
            Expr::CharLiteral { location, .. } => Ok(Type::basic("char", *location)),
            Expr::NullLiteral { location } => Ok(Type::basic("null", *location)),
            Expr::UndefinedLiteral { location } => Ok(Type::basic("undefined", *location)),
            Expr::ArrayLiteral { elements, location } => self.check_array_literal(elements, *location),
            Expr::TupleLiteral { elements, location } => {
                let mut checked = Vec::with_capacity(elements.len());
                for element in elements {
                    checked.push(TupleElement {
                        name: element.name.clone().unwrap_or_default(),
                        ty: self.check_expr(&element.value)?,
                    });
                }
                Ok(Type::new(TypeKind::Tuple(checked), Mutability::Mutable, *location))
            }
            Expr::Call(call) => self.check_call_expr(call),
            Expr::Member(member) => self.check_member_expr(member),
            Expr::Subscript(subscript) => self.check_subscript_expr(subscript),
            Expr::Unary(unary) => self.check_unary_expr(unary),
            Expr::Unwrap(unwrap) => {
                let ty = self.check_expr(&unwrap.operand)?;
                match &ty.kind {
                    TypeKind::Optional(wrapped) => Ok((**wrapped).clone()),
                    _ => Err(CompileError::conversion(
                        format!("cannot unwrap value of non-optional type '{ty}'"),
                        unwrap.location,
                    )),
                }
            }
            Expr::Binary(binary) => self.check_binary_expr(binary),
            Expr::If(if_expr) => self.check_if_expr(if_expr),
            Expr::Lambda(lambda) => self.check_lambda_expr(lambda),
            Expr::Sizeof(sizeof) => {
                self.check_type(&sizeof.ty, AccessLevel::Private)?;
                Ok(Type::basic("uint64", sizeof.location))
            }
            Expr::Addressof(addressof) => {
                let ty = self.check_expr(&addressof.operand)?;
                Ok(Type::new(
                    TypeKind::Pointer(Box::new(ty)),
                    Mutability::Mutable,
                    addressof.location,
                ))
            }
        }
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn check_var_expr(&mut self, var: &VarExpr) -> Result<Type, CompileError> {
        let symbols = self.symbols.find(&var.name).to_vec();
        match symbols.as_slice() {
            [] => Err(CompileError::name_resolution(
                format!("unknown identifier '{}'", var.name),
                var.location,
            )),
            [Symbol::Var(v)] => Ok(v.ty.clone().with_location(var.location)),
            [Symbol::Function(f)] => Ok(function_type(f, var.location)),
            [Symbol::FunctionTemplate(_)] => Err(CompileError::name_resolution(
                format!("cannot reference generic function '{}' without generic arguments", var.name),
                var.location,
            )),
            [Symbol::Type(_) | Symbol::TypeTemplate(_) | Symbol::Enum(_)] => Err(
                CompileError::name_resolution(format!("'{}' is not a value", var.name), var.location),
            ),
            _ => Err(CompileError::name_resolution(
                format!("reference to '{}' is ambiguous", var.name),
                var.location,
            )),
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn check_array_literal(&mut self, elements: &[Expr], location: SourceLocation) -> Result<Type, CompileError> {
        let Some(first) = elements.first() else {
            return Err(CompileError::conversion(
                "couldn't infer element type of empty array literal".to_string(),
                location,
            ));
        };
        let element_ty = self.check_expr(first)?;
        for element in &elements[1..] {
            let ty = self.check_expr(element)?;
            if !self.convert(&ty, &element_ty) {
                return Err(CompileError::conversion(
                    format!("mixed element types '{element_ty}' and '{ty}' in array literal"),
                    element.location(),
                ));
            }
        }
        Ok(Type::new(
            TypeKind::Array {
                element: Box::new(element_ty),
                size: ArraySize::Known(elements.len() as i64),
            },
            Mutability::Mutable,
            location,
        ))
    }

    // ========================================================================
    // Member access
    // ========================================================================

    fn check_member_expr(&mut self, member: &MemberExpr) -> Result<Type, CompileError> {
        // `EnumName.case` - the operand names the enum itself, not a value.
        if let Expr::Var(var) = &*member.operand {
            if let Some(enum_decl) = self.resolve_enum_decl(&var.name) {
                return match enum_decl.find_case(&member.member) {
                    Some(_) => Ok(Type::basic(enum_decl.name.clone(), member.location)),
                    None => Err(CompileError::name_resolution(
                        format!("enum '{}' has no case '{}'", enum_decl.name, member.member),
                        member.location,
                    )),
                };
            }
        }

        let operand_ty = self.check_expr(&member.operand)?;
        self.member_type(&operand_ty, &member.member, member.location)
    }

    /// The type of `operand.member`, looking through one level of pointer.
    pub(crate) fn member_type(
        &mut self,
        operand_ty: &Type,
        member: &str,
        location: SourceLocation,
    ) -> Result<Type, CompileError> {
        let ty = peel_pointer(operand_ty);
        match &ty.kind {
            TypeKind::Tuple(elements) => elements
                .iter()
                .find(|e| e.name == member)
                .map(|e| e.ty.clone())
                .ok_or_else(|| {
                    CompileError::name_resolution(
                        format!("tuple has no element named '{member}'"),
                        location,
                    )
                }),
            TypeKind::Basic { .. } => {
                let Some(decl) = self.resolve_type_decl(ty) else {
                    return Err(CompileError::name_resolution(
                        format!("type '{ty}' has no member '{member}'"),
                        location,
                    ));
                };
                if let Some(field) = decl.find_field(member) {
                    let inside_type = self
                        .current_receiver
                        .as_ref()
                        .map(|r| r.name == decl.name)
                        .unwrap_or(false);
                    if field.access_level == AccessLevel::Private && !inside_type {
                        return Err(CompileError::name_resolution(
                            format!("'{member}' is private"),
                            location,
                        ));
                    }
                    return Ok(field.ty.clone());
                }
                if let Some((param_types, return_type)) = self.method_signature(&decl, member) {
                    return Ok(Type::new(
                        TypeKind::Function {
                            return_type: Box::new(return_type),
                            param_types,
                        },
                        Mutability::Mutable,
                        location,
                    ));
                }
                Err(CompileError::name_resolution(
                    format!("type '{}' has no member '{member}'", decl.name),
                    location,
                ))
            }
            _ => Err(CompileError::name_resolution(
                format!("type '{ty}' has no member '{member}'"),
                location,
            )),
        }
    }

    /// Parameter and return types of a named method, searching the type's
    /// own methods first and then defaulted methods of its interfaces, with
    /// `This` substituted.
    pub(crate) fn method_signature(&self, decl: &Rc<TypeDecl>, name: &str) -> Option<(Vec<Type>, Type)> {
        let this_ty = Type::basic(decl.name.clone(), decl.location);
        if let Some(method) = decl.methods().find(|m| m.name == name) {
            return Some(signature_of(method, &this_ty));
        }
        for interface_ty in &decl.interfaces {
            if let Some(interface_decl) = self.resolve_type_decl(interface_ty) {
                if let Some(method) = interface_decl
                    .methods()
                    .find(|m| m.name == name && m.body.is_some())
                {
                    return Some(signature_of(method, &this_ty));
                }
            }
        }
        None
    }

    // ========================================================================
    // Subscripts, unary and binary operators
    // ========================================================================

    fn check_subscript_expr(&mut self, subscript: &SubscriptExpr) -> Result<Type, CompileError> {
        let operand_ty = self.check_expr(&subscript.operand)?;
        let index_ty = self.check_expr(&subscript.index)?;
        let peeled = peel_pointer(&operand_ty).clone();

        match &peeled.kind {
            TypeKind::Array { element, .. } => {
                if !is_integer_type(&index_ty) {
                    return Err(CompileError::conversion(
                        format!("array index must be an integer, got '{index_ty}'"),
                        subscript.index.location(),
                    ));
                }
                Ok((**element).clone())
            }
            TypeKind::Basic { .. } => {
                let decl = self.resolve_type_decl(&peeled);
                if let Some(decl) = decl {
                    if let Some((param_types, return_type)) = self.method_signature(&decl, "[]") {
                        if param_types.len() == 1 && self.convert(&index_ty, &param_types[0]) {
                            return Ok(return_type);
                        }
                        return Err(CompileError::conversion(
                            format!("no matching subscript operator on '{}' for index '{index_ty}'", decl.name),
                            subscript.location,
                        ));
                    }
                }
                Err(CompileError::conversion(
                    format!("'{operand_ty}' is not subscriptable"),
                    subscript.location,
                ))
            }
            _ => Err(CompileError::conversion(
                format!("'{operand_ty}' is not subscriptable"),
                subscript.location,
            )),
        }
    }

    fn check_unary_expr(&mut self, unary: &UnaryExpr) -> Result<Type, CompileError> {
        let ty = self.check_expr(&unary.operand)?;
        match unary.op {
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Increment | UnaryOp::Decrement => {
                if !is_numeric_type(&ty) {
                    return Err(CompileError::conversion(
                        format!("invalid operand of type '{ty}' to unary operator"),
                        unary.location,
                    ));
                }
                Ok(ty)
            }
            UnaryOp::Not => {
                let bool_ty = Type::basic("bool", unary.location);
                if !self.convert(&ty, &bool_ty) {
                    return Err(CompileError::conversion(
                        format!("invalid operand of type '{ty}' to logical not"),
                        unary.location,
                    ));
                }
                Ok(bool_ty)
            }
            UnaryOp::BitNot => {
                if !is_integer_type(&ty) {
                    return Err(CompileError::conversion(
                        format!("invalid operand of type '{ty}' to bitwise complement"),
                        unary.location,
                    ));
                }
                Ok(ty)
            }
            UnaryOp::Deref => match &ty.kind {
                TypeKind::Pointer(pointee) => Ok((**pointee).clone()),
                _ => Err(CompileError::conversion(
                    format!("cannot dereference non-pointer type '{ty}'"),
                    unary.location,
                )),
            },
            UnaryOp::AddrOf => Ok(Type::new(
                TypeKind::Pointer(Box::new(ty)),
                Mutability::Mutable,
                unary.location,
            )),
        }
    }

    fn check_binary_expr(&mut self, binary: &BinaryExpr) -> Result<Type, CompileError> {
        if binary.op.is_assignment() {
            return self.check_assignment(binary);
        }

        let lhs = self.check_expr(&binary.lhs)?;
        let rhs = self.check_expr(&binary.rhs)?;

        use BinaryOp::*;
        match binary.op {
            Equal | NotEqual | Less | LessOrEqual | Greater | GreaterOrEqual => {
                if self.convert(&lhs, &rhs) || self.convert(&rhs, &lhs) {
                    return Ok(Type::basic("bool", binary.location));
                }
                if let Some(result) = self.operator_overload(binary.op, &lhs, &rhs) {
                    return Ok(result.with_location(binary.location));
                }
                Err(invalid_operands(binary.op, &lhs, &rhs, binary.location))
            }
            And | Or => {
                let bool_ty = Type::basic("bool", binary.location);
                if self.convert(&lhs, &bool_ty) && self.convert(&rhs, &bool_ty) {
                    Ok(bool_ty)
                } else {
                    Err(invalid_operands(binary.op, &lhs, &rhs, binary.location))
                }
            }
            Shl | Shr | BitAnd | BitOr | BitXor => {
                if is_integer_type(&lhs) && is_integer_type(&rhs) {
                    Ok(lhs)
                } else {
                    Err(invalid_operands(binary.op, &lhs, &rhs, binary.location))
                }
            }
            Add | Sub | Mul | Div => {
                if is_numeric_type(&lhs) && is_numeric_type(&rhs) {
                    if self.convert(&rhs, &lhs) {
                        return Ok(lhs);
                    }
                    if self.convert(&lhs, &rhs) {
                        return Ok(rhs);
                    }
                }
                if let Some(result) = self.operator_overload(binary.op, &lhs, &rhs) {
                    return Ok(result.with_location(binary.location));
                }
                Err(invalid_operands(binary.op, &lhs, &rhs, binary.location))
            }
            _ => unreachable!("assignment handled above"),
        }
    }

    /// Find a non-member `operator` function matching the operand types.
    fn operator_overload(&self, op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<Type> {
        let candidates: Vec<Rc<FunctionDecl>> = self
            .symbols
            .find(&op.to_string())
            .iter()
            .filter_map(|s| match s {
                Symbol::Function(f) => Some(Rc::clone(f)),
                _ => None,
            })
            .collect();

        for function in candidates {
            if function.params.len() != 2 {
                continue;
            }
            let matches = function
                .params
                .iter()
                .zip([lhs, rhs])
                .all(|(param, arg)| match &param.ty {
                    Some(ty) => self.convert(arg, ty),
                    None => false,
                });
            if matches {
                return Some(function.return_type.clone());
            }
        }
        None
    }

    fn check_assignment(&mut self, binary: &BinaryExpr) -> Result<Type, CompileError> {
        let lhs_ty = self.check_expr(&binary.lhs)?;
        let rhs_ty = self.check_expr(&binary.rhs)?;

        if !is_assignable_expr(&binary.lhs) {
            return Err(CompileError::conversion(
                "expression is not assignable".to_string(),
                binary.lhs.location(),
            ));
        }
        if !self.convert(&rhs_ty, &lhs_ty) {
            let hint = if rhs_ty.is_null() && !lhs_ty.is_optional() {
                " (add '?' to the type to make it nullable)"
            } else {
                ""
            };
            return Err(CompileError::conversion(
                format!("cannot assign value of type '{rhs_ty}' to '{lhs_ty}'{hint}"),
                binary.rhs.location(),
            ));
        }

        if !self.is_implicitly_copyable(&lhs_ty) {
            self.mark_moved(&binary.rhs);
        }
        Ok(Type::basic("void", binary.location))
    }

    fn check_if_expr(&mut self, if_expr: &IfExpr) -> Result<Type, CompileError> {
        let condition_ty = self.check_expr(&if_expr.condition)?;
        let bool_ty = Type::basic("bool", if_expr.condition.location());
        if !self.convert(&condition_ty, &bool_ty) {
            return Err(CompileError::conversion(
                format!("condition must have type 'bool', got '{condition_ty}'"),
                if_expr.condition.location(),
            ));
        }

        let then_ty = self.check_expr(&if_expr.then_expr)?;
        let else_ty = self.check_expr(&if_expr.else_expr)?;
        if self.convert(&else_ty, &then_ty) {
            Ok(then_ty)
        } else if self.convert(&then_ty, &else_ty) {
            Ok(else_ty)
        } else {
            Err(CompileError::conversion(
                format!("incompatible branch types '{then_ty}' and '{else_ty}' in conditional expression"),
                if_expr.location,
            ))
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn check_call_expr(&mut self, call: &CallExpr) -> Result<Type, CompileError> {
        let mut arg_types = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            arg_types.push(self.check_expr(&arg.value)?);
        }

        match &*call.callee {
            Expr::Var(var) => self.check_named_call(var, call, &arg_types),
            Expr::Member(member) => self.check_method_call(member, call, &arg_types),
            other => {
                let callee_ty = self.check_expr(other)?;
                self.check_function_value_call(&callee_ty, call, &arg_types)
            }
        }
    }

    fn check_named_call(
        &mut self,
        var: &VarExpr,
        call: &CallExpr,
        arg_types: &[Type],
    ) -> Result<Type, CompileError> {
        // `init(...)` inside an initializer delegates to another initializer
        // of the same type.
        if var.name == "init" && self.in_initializer {
            let receiver = self.current_receiver.clone().ok_or_else(|| {
                CompileError::name_resolution("'init' can only be called on a type".to_string(), var.location)
            })?;
            self.resolve_init_call(&receiver, call, arg_types)?;
            self.delegated_init = true;
            return Ok(Type::basic("void", call.location));
        }

        let symbols = self.symbols.find(&var.name).to_vec();
        if symbols.is_empty() {
            return Err(CompileError::name_resolution(
                format!("unknown identifier '{}'", var.name),
                var.location,
            ));
        }

        match &symbols[0] {
            // Constructor call: the callee names a type or a type template.
            Symbol::Type(_) | Symbol::TypeTemplate(_) => {
                let ty = Type::new(
                    TypeKind::Basic {
                        name: var.name.clone(),
                        generic_args: call.generic_args.clone(),
                    },
                    Mutability::Mutable,
                    call.location,
                );
                self.check_type(&ty, AccessLevel::Private)?;
                let decl = self.resolve_type_decl(&ty).ok_or_else(|| {
                    CompileError::name_resolution(
                        format!("'{}' is not constructible", var.name),
                        call.location,
                    )
                })?;
                self.resolve_init_call(&decl, call, arg_types)?;
                return Ok(ty);
            }
            Symbol::Var(v) => {
                let ty = v.ty.clone();
                return self.check_function_value_call(&ty, call, arg_types);
            }
            Symbol::Enum(_) => {
                return Err(CompileError::name_resolution(
                    format!("'{}' is not callable", var.name),
                    call.location,
                ));
            }
            Symbol::Function(_) | Symbol::FunctionTemplate(_) => {}
        }

        let functions: Vec<Rc<FunctionDecl>> = symbols
            .iter()
            .filter_map(|s| match s {
                Symbol::Function(f) => Some(Rc::clone(f)),
                _ => None,
            })
            .collect();
        let templates: Vec<Rc<FunctionTemplate>> = symbols
            .iter()
            .filter_map(|s| match s {
                Symbol::FunctionTemplate(t) => Some(Rc::clone(t)),
                _ => None,
            })
            .collect();

        // Explicit generic arguments select a template directly.
        if !call.generic_args.is_empty() {
            let template = templates.first().ok_or_else(|| {
                CompileError::arity(format!("'{}' is not generic", var.name), call.location)
            })?;
            for arg in &call.generic_args {
                self.check_type(arg, AccessLevel::Private)?;
            }
            let instantiation =
                self.instantiate_function_reference(template, &call.generic_args, call.location)?;
            self.check_call_args(&instantiation, call, arg_types)?;
            return Ok(instantiation.return_type.clone());
        }

        let matches: Vec<Rc<FunctionDecl>> = functions
            .iter()
            .filter(|f| self.call_args_match(f, arg_types))
            .cloned()
            .collect();

        match matches.as_slice() {
            [only] => {
                self.check_named_args(only, call)?;
                Ok(only.return_type.clone())
            }
            [] if !templates.is_empty() => {
                // Positional inference: each generic parameter takes the type
                // of the first argument whose parameter names it.
                let template = &templates[0];
                let inferred = infer_generic_args(template, arg_types).ok_or_else(|| {
                    CompileError::conversion(
                        format!("couldn't infer generic arguments for call to '{}'", var.name),
                        call.location,
                    )
                })?;
                let instantiation =
                    self.instantiate_function_reference(template, &inferred, call.location)?;
                self.check_call_args(&instantiation, call, arg_types)?;
                Ok(instantiation.return_type.clone())
            }
            [] => Err(CompileError::conversion(
                format!("no matching function for call to '{}'", var.name),
                call.location,
            )),
            multiple => {
                let exact: Vec<&Rc<FunctionDecl>> = multiple
                    .iter()
                    .filter(|f| exact_args_match(f, arg_types))
                    .collect();
                match exact.as_slice() {
                    [only] => {
                        self.check_named_args(only, call)?;
                        Ok(only.return_type.clone())
                    }
                    _ => Err(CompileError::name_resolution(
                        format!("call to '{}' is ambiguous", var.name),
                        call.location,
                    )),
                }
            }
        }
    }

    fn check_method_call(
        &mut self,
        member: &MemberExpr,
        call: &CallExpr,
        arg_types: &[Type],
    ) -> Result<Type, CompileError> {
        let operand_ty = self.check_expr(&member.operand)?;
        let peeled = peel_pointer(&operand_ty).clone();
        let decl = self.resolve_type_decl(&peeled).ok_or_else(|| {
            CompileError::name_resolution(
                format!("type '{operand_ty}' has no member function '{}'", member.member),
                member.location,
            )
        })?;

        // Generic method with explicit generic arguments.
        if !call.generic_args.is_empty() {
            let template = decl.members.iter().find_map(|m| match m {
                MemberDecl::MethodTemplate(t) if t.function.name == member.member => Some(t.clone()),
                _ => None,
            });
            let Some(template) = template else {
                return Err(CompileError::arity(
                    format!("'{}' is not generic", member.member),
                    call.location,
                ));
            };
            for arg in &call.generic_args {
                self.check_type(arg, AccessLevel::Private)?;
            }
            let template = Rc::new(template);
            let instantiation =
                self.instantiator
                    .instantiate_function(&template, &call.generic_args, call.location)?;
            if self
                .checked_decls
                .insert(format!("method {}.{}", decl.name, instantiation.name))
            {
                self.check_function(&instantiation, Some(&decl))?;
            }
            self.check_call_args(&instantiation, call, arg_types)?;
            return Ok(instantiation.return_type.clone());
        }

        let (param_types, return_type) =
            self.method_signature(&decl, &member.member).ok_or_else(|| {
                CompileError::name_resolution(
                    format!("type '{}' has no member function '{}'", decl.name, member.member),
                    member.location,
                )
            })?;

        let compatible = param_types.len() == arg_types.len()
            && param_types
                .iter()
                .zip(arg_types)
                .all(|(param, arg)| self.convert(arg, param));
        if !compatible {
            return Err(CompileError::conversion(
                format!("no matching member function for call to '{}'", member.member),
                call.location,
            ));
        }
        Ok(return_type)
    }

    fn check_function_value_call(
        &mut self,
        callee_ty: &Type,
        call: &CallExpr,
        arg_types: &[Type],
    ) -> Result<Type, CompileError> {
        match &callee_ty.kind {
            TypeKind::Function {
                return_type,
                param_types,
            } => {
                let compatible = param_types.len() == arg_types.len()
                    && param_types
                        .iter()
                        .zip(arg_types)
                        .all(|(param, arg)| self.convert(arg, param));
                if !compatible {
                    return Err(CompileError::conversion(
                        format!("arguments don't match function type '{callee_ty}'"),
                        call.location,
                    ));
                }
                Ok((**return_type).clone())
            }
            _ => Err(CompileError::conversion(
                format!("'{callee_ty}' is not callable"),
                call.location,
            )),
        }
    }

    /// Match a call against a type's initializers.
    pub(crate) fn resolve_init_call(
        &mut self,
        decl: &Rc<TypeDecl>,
        call: &CallExpr,
        arg_types: &[Type],
    ) -> Result<(), CompileError> {
        let matched = decl.inits().find(|init| {
            init.params.len() == arg_types.len()
                && init.params.iter().zip(arg_types).all(|(param, arg)| match &param.ty {
                    Some(ty) => self.convert(arg, ty),
                    None => false,
                })
        });
        let Some(matched) = matched else {
            return Err(CompileError::conversion(
                format!("no matching initializer for '{}'", decl.name),
                call.location,
            ));
        };
        check_argument_labels(&matched.params, call)
    }

    fn call_args_match(&self, function: &FunctionDecl, arg_types: &[Type]) -> bool {
        let fixed = function.params.len();
        if function.is_variadic {
            if arg_types.len() < fixed {
                return false;
            }
        } else if arg_types.len() != fixed {
            return false;
        }
        function
            .params
            .iter()
            .zip(arg_types)
            .all(|(param, arg)| match &param.ty {
                Some(ty) => self.convert(arg, ty),
                None => false,
            })
    }

    fn check_call_args(
        &mut self,
        function: &FunctionDecl,
        call: &CallExpr,
        arg_types: &[Type],
    ) -> Result<(), CompileError> {
        if !self.call_args_match(function, arg_types) {
            return Err(CompileError::conversion(
                format!("no matching function for call to '{}'", function.name),
                call.location,
            ));
        }
        check_argument_labels(&function.params, call)
    }

    fn check_named_args(&mut self, function: &FunctionDecl, call: &CallExpr) -> Result<(), CompileError> {
        check_argument_labels(&function.params, call)
    }

    /// Instantiate a function template reference, register it globally, and
    /// type-check the instantiation once.
    pub(crate) fn instantiate_function_reference(
        &mut self,
        template: &Rc<FunctionTemplate>,
        generic_args: &[Type],
        location: SourceLocation,
    ) -> Result<Rc<FunctionDecl>, CompileError> {
        let decl = self
            .instantiator
            .instantiate_function(template, generic_args, location)?;
        if self.checked_decls.insert(format!("function {}", decl.name)) {
            if !self.symbols.contains(&decl.name) {
                self.symbols
                    .add_global(&decl.name, Symbol::Function(Rc::clone(&decl)), false)?;
            }
            self.check_function(&decl, None)?;
        }
        Ok(decl)
    }

    // ========================================================================
    // Lambdas and switch bindings
    // ========================================================================

    /// A lambda's return type is inferred from its single body expression.
    fn check_lambda_expr(&mut self, lambda: &LambdaExpr) -> Result<Type, CompileError> {
        self.symbols.push_scope();
        let result = (|| -> Result<Type, CompileError> {
            let mut param_types = Vec::with_capacity(lambda.params.len());
            for param in &lambda.params {
                let Some(ty) = &param.ty else {
                    return Err(CompileError::conversion(
                        format!("lambda parameter '{}' needs a type annotation", param.name),
                        param.location,
                    ));
                };
                self.check_type(ty, AccessLevel::Private)?;
                self.symbols.add(
                    &param.name,
                    Symbol::Var(Rc::new(VarSymbol {
                        name: param.name.clone(),
                        ty: ty.clone(),
                        access_level: AccessLevel::Default,
                        location: param.location,
                    })),
                    false,
                )?;
                param_types.push(ty.clone());
            }
            let return_type = self.check_expr(&lambda.body)?;
            Ok(Type::new(
                TypeKind::Function {
                    return_type: Box::new(return_type),
                    param_types,
                },
                Mutability::Mutable,
                lambda.location,
            ))
        })();
        self.symbols.pop_scope();
        result
    }

    /// The associated-value type bound by `case value as name:`. The case
    /// value must resolve to an enum case carrying an associated type.
    pub(crate) fn associated_value_type(&mut self, value: &Expr) -> Result<Type, CompileError> {
        if let Expr::Member(member) = value {
            if let Expr::Var(var) = &*member.operand {
                if let Some(enum_decl) = self.resolve_enum_decl(&var.name) {
                    if let Some(case) = enum_decl.find_case(&member.member) {
                        if let Some(ty) = &case.associated_type {
                            return Ok(ty.clone());
                        }
                        return Err(CompileError::conversion(
                            format!("case '{}' has no associated value", member.member),
                            value.location(),
                        ));
                    }
                }
            }
        }
        Err(CompileError::conversion(
            "only enum cases with associated values can bind a value".to_string(),
            value.location(),
        ))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn peel_pointer(ty: &Type) -> &Type {
    match &ty.kind {
        TypeKind::Pointer(pointee) => pointee,
        _ => ty,
    }
}

fn function_type(decl: &FunctionDecl, location: SourceLocation) -> Type {
    let param_types = decl.params.iter().filter_map(|p| p.ty.clone()).collect();
    Type::new(
        TypeKind::Function {
            return_type: Box::new(decl.return_type.clone()),
            param_types,
        },
        Mutability::Mutable,
        location,
    )
}

fn signature_of(method: &FunctionDecl, this_ty: &Type) -> (Vec<Type>, Type) {
    let map = instantiate::single_substitution("This", this_ty);
    let mut params: Vec<Type> = method.params.iter().filter_map(|p| p.ty.clone()).collect();
    for param in &mut params {
        instantiate::substitute_in_type(param, &map);
    }
    let mut return_type = method.return_type.clone();
    instantiate::substitute_in_type(&mut return_type, &map);
    (params, return_type)
}

fn is_integer_type(ty: &Type) -> bool {
    matches!(&ty.kind, TypeKind::Basic { name, generic_args } if generic_args.is_empty() && is_integer_type_name(name))
}

fn is_numeric_type(ty: &Type) -> bool {
    matches!(&ty.kind, TypeKind::Basic { name, generic_args } if generic_args.is_empty() && is_numeric_type_name(name))
}

fn is_assignable_expr(expr: &Expr) -> bool {
    matches!(expr, Expr::Var(_) | Expr::Member(_) | Expr::Subscript(_))
        || matches!(expr, Expr::Unary(u) if u.op == UnaryOp::Deref)
}

fn exact_args_match(function: &FunctionDecl, arg_types: &[Type]) -> bool {
    function.params.len() == arg_types.len()
        && function
            .params
            .iter()
            .zip(arg_types)
            .all(|(param, arg)| param.ty.as_ref() == Some(arg))
}

fn invalid_operands(op: BinaryOp, lhs: &Type, rhs: &Type, location: SourceLocation) -> CompileError {
    CompileError::conversion(
        format!("invalid operands to binary expression ('{lhs}' {op} '{rhs}')"),
        location,
    )
}

fn check_argument_labels(params: &[ParamDecl], call: &CallExpr) -> Result<(), CompileError> {
    for (arg, param) in call.args.iter().zip(params) {
        if let Some(label) = &arg.name {
            if label != &param.name {
                return Err(CompileError::name_resolution(
                    format!("invalid argument label '{label}', expected '{}'", param.name),
                    arg.location,
                ));
            }
        }
    }
    Ok(())
}

fn infer_generic_args(template: &FunctionTemplate, arg_types: &[Type]) -> Option<Vec<Type>> {
    let mut inferred = Vec::with_capacity(template.generic_params.len());
    for param in &template.generic_params {
        let found = template
            .function
            .params
            .iter()
            .zip(arg_types)
            .find_map(|(function_param, arg)| {
                let ty = function_param.ty.as_ref()?;
                ty.is_basic_named(&param.name).then(|| arg.clone())
            });
        inferred.push(found?);
    }
    Some(inferred)
}
