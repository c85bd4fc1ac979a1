//! Generic template instantiation.
//!
//! Materializes concrete declarations from type and function templates by
//! substituting each generic parameter with its argument throughout the
//! prototype, keyed and memoized by qualified name (`Box<int>`). Re-requesting
//! an instantiation returns the cached `Rc`, so callers can rely on identity:
//! redundant instantiation would duplicate type-checking work and could
//! diverge under recursive generics.

use std::collections::HashMap;
use std::rc::Rc;

use vela_syntax::ast::*;
use vela_syntax::diagnostics::CompileError;
use vela_syntax::location::SourceLocation;

/// The memoization/lookup key for an instantiation: the template name
/// augmented with the argument types, e.g. `Box<int>` or `Map<string, int>`.
pub fn qualified_name(template_name: &str, generic_args: &[Type]) -> String {
    let args = generic_args
        .iter()
        .map(Type::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{template_name}<{args}>")
}

/// Process-wide instantiation cache, append-only for the run.
#[derive(Debug, Default)]
pub struct Instantiator {
    types: HashMap<String, Rc<TypeDecl>>,
    functions: HashMap<String, Rc<FunctionDecl>>,
}

impl Instantiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate a type template with the given arguments, or return the
    /// cached declaration if this qualified name was requested before.
    pub fn instantiate_type(
        &mut self,
        template: &TypeTemplate,
        generic_args: &[Type],
        location: SourceLocation,
    ) -> Result<Rc<TypeDecl>, CompileError> {
        validate_generic_arg_count(
            template.generic_params.len(),
            generic_args.len(),
            &template.type_decl.name,
            location,
        )?;

        let qualified = qualified_name(&template.type_decl.name, generic_args);
        if let Some(cached) = self.types.get(&qualified) {
            return Ok(Rc::clone(cached));
        }

        tracing::debug!(name = %qualified, "instantiating type template");
        let map = substitution_map(&template.generic_params, generic_args);
        let mut decl = template.type_decl.clone();
        decl.name = qualified.clone();
        substitute_in_type_decl(&mut decl, &map);

        let decl = Rc::new(decl);
        self.types.insert(qualified, Rc::clone(&decl));
        Ok(decl)
    }

    /// Instantiate a function template with the given arguments, memoized
    /// like [`instantiate_type`](Self::instantiate_type).
    pub fn instantiate_function(
        &mut self,
        template: &FunctionTemplate,
        generic_args: &[Type],
        location: SourceLocation,
    ) -> Result<Rc<FunctionDecl>, CompileError> {
        validate_generic_arg_count(
            template.generic_params.len(),
            generic_args.len(),
            &template.function.name,
            location,
        )?;

        let qualified = qualified_name(&template.function.name, generic_args);
        if let Some(cached) = self.functions.get(&qualified) {
            return Ok(Rc::clone(cached));
        }

        tracing::debug!(name = %qualified, "instantiating function template");
        let map = substitution_map(&template.generic_params, generic_args);
        let mut decl = template.function.clone();
        decl.name = qualified.clone();
        substitute_in_function(&mut decl, &map);

        let decl = Rc::new(decl);
        self.functions.insert(qualified, Rc::clone(&decl));
        Ok(decl)
    }
}

fn validate_generic_arg_count(
    expected: usize,
    got: usize,
    name: &str,
    location: SourceLocation,
) -> Result<(), CompileError> {
    if expected != got {
        let plural = if expected == 1 { "" } else { "s" };
        return Err(CompileError::arity(
            format!("expected {expected} generic argument{plural} to '{name}', got {got}"),
            location,
        ));
    }
    Ok(())
}

// ============================================================================
// Substitution
// ============================================================================

pub(crate) fn substitution_map(params: &[GenericParamDecl], args: &[Type]) -> HashMap<String, Type> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| (param.name.clone(), arg.clone()))
        .collect()
}

/// A one-entry map, used to substitute `This` with a concrete type when
/// copying interface default methods into a conforming type.
pub(crate) fn single_substitution(name: &str, ty: &Type) -> HashMap<String, Type> {
    HashMap::from([(name.to_string(), ty.clone())])
}

pub(crate) fn substitute_in_type(ty: &mut Type, map: &HashMap<String, Type>) {
    match &mut ty.kind {
        TypeKind::Basic { name, generic_args } => {
            if generic_args.is_empty() {
                if let Some(replacement) = map.get(name.as_str()) {
                    // The replacement keeps the reference's location, and a
                    // const-qualified reference stays const.
                    let keep_const = ty.mutability == Mutability::Const;
                    let location = ty.location;
                    *ty = replacement.clone();
                    ty.location = location;
                    if keep_const {
                        ty.mutability = Mutability::Const;
                    }
                    return;
                }
            }
            for arg in generic_args {
                substitute_in_type(arg, map);
            }
        }
        TypeKind::Pointer(pointee) => substitute_in_type(pointee, map),
        TypeKind::Optional(wrapped) => substitute_in_type(wrapped, map),
        TypeKind::Array { element, .. } => substitute_in_type(element, map),
        TypeKind::Tuple(elements) => {
            for element in elements {
                substitute_in_type(&mut element.ty, map);
            }
        }
        TypeKind::Function {
            return_type,
            param_types,
        } => {
            substitute_in_type(return_type, map);
            for param in param_types {
                substitute_in_type(param, map);
            }
        }
    }
}

pub(crate) fn substitute_in_expr(expr: &mut Expr, map: &HashMap<String, Type>) {
    match expr {
        Expr::Var(_)
        | Expr::IntLiteral { .. }
        | Expr::FloatLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::CharLiteral { .. }
        | Expr::NullLiteral { .. }
        | Expr::UndefinedLiteral { .. } => {}
        Expr::ArrayLiteral { elements, .. } => {
            for element in elements {
                substitute_in_expr(element, map);
            }
        }
        Expr::TupleLiteral { elements, .. } => {
            for element in elements {
                substitute_in_expr(&mut element.value, map);
            }
        }
        Expr::Call(call) => {
            substitute_in_expr(&mut call.callee, map);
            for arg in &mut call.args {
                substitute_in_expr(&mut arg.value, map);
            }
            for ty in &mut call.generic_args {
                substitute_in_type(ty, map);
            }
        }
        Expr::Member(member) => substitute_in_expr(&mut member.operand, map),
        Expr::Subscript(subscript) => {
            substitute_in_expr(&mut subscript.operand, map);
            substitute_in_expr(&mut subscript.index, map);
        }
        Expr::Unary(unary) => substitute_in_expr(&mut unary.operand, map),
        Expr::Unwrap(unwrap) => substitute_in_expr(&mut unwrap.operand, map),
        Expr::Binary(binary) => {
            substitute_in_expr(&mut binary.lhs, map);
            substitute_in_expr(&mut binary.rhs, map);
        }
        Expr::If(if_expr) => {
            substitute_in_expr(&mut if_expr.condition, map);
            substitute_in_expr(&mut if_expr.then_expr, map);
            substitute_in_expr(&mut if_expr.else_expr, map);
        }
        Expr::Lambda(lambda) => {
            for param in &mut lambda.params {
                if let Some(ty) = &mut param.ty {
                    substitute_in_type(ty, map);
                }
            }
            substitute_in_expr(&mut lambda.body, map);
        }
        Expr::Sizeof(sizeof) => substitute_in_type(&mut sizeof.ty, map),
        Expr::Addressof(addressof) => substitute_in_expr(&mut addressof.operand, map),
    }
}

pub(crate) fn substitute_in_stmt(stmt: &mut Stmt, map: &HashMap<String, Type>) {
    match stmt {
        Stmt::Var(decl) => substitute_in_var_decl(decl, map),
        Stmt::Return(ret) => {
            if let Some(value) = &mut ret.value {
                substitute_in_expr(value, map);
            }
        }
        Stmt::Expr(expr) | Stmt::Defer(expr) => substitute_in_expr(expr, map),
        Stmt::If(if_stmt) => {
            substitute_in_expr(&mut if_stmt.condition, map);
            substitute_in_stmts(&mut if_stmt.then_body, map);
            substitute_in_stmts(&mut if_stmt.else_body, map);
        }
        Stmt::While(while_stmt) => {
            substitute_in_expr(&mut while_stmt.condition, map);
            substitute_in_stmts(&mut while_stmt.body, map);
        }
        Stmt::For(for_stmt) => {
            substitute_in_var_decl(&mut for_stmt.variable, map);
            substitute_in_expr(&mut for_stmt.range, map);
            substitute_in_stmts(&mut for_stmt.body, map);
        }
        Stmt::Switch(switch) => {
            substitute_in_expr(&mut switch.condition, map);
            for case in &mut switch.cases {
                if let CasePattern::Expr(value) = &mut case.pattern {
                    substitute_in_expr(value, map);
                }
                substitute_in_stmts(&mut case.stmts, map);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn substitute_in_stmts(stmts: &mut [Stmt], map: &HashMap<String, Type>) {
    for stmt in stmts {
        substitute_in_stmt(stmt, map);
    }
}

fn substitute_in_var_decl(decl: &mut VarDecl, map: &HashMap<String, Type>) {
    if let Some(ty) = &mut decl.declared_type {
        substitute_in_type(ty, map);
    }
    if let Some(initializer) = &mut decl.initializer {
        substitute_in_expr(initializer, map);
    }
}

pub(crate) fn substitute_in_function(decl: &mut FunctionDecl, map: &HashMap<String, Type>) {
    substitute_in_type(&mut decl.return_type, map);
    for param in &mut decl.params {
        if let Some(ty) = &mut param.ty {
            substitute_in_type(ty, map);
        }
    }
    if let Some(body) = &mut decl.body {
        substitute_in_stmts(body, map);
    }
}

pub(crate) fn substitute_in_type_decl(decl: &mut TypeDecl, map: &HashMap<String, Type>) {
    for interface in &mut decl.interfaces {
        substitute_in_type(interface, map);
    }
    for field in &mut decl.fields {
        substitute_in_type(&mut field.ty, map);
    }
    for member in &mut decl.members {
        match member {
            MemberDecl::Method(method) => substitute_in_function(method, map),
            MemberDecl::Init(init) => {
                for param in &mut init.params {
                    if let Some(ty) = &mut param.ty {
                        substitute_in_type(ty, map);
                    }
                }
                substitute_in_stmts(&mut init.body, map);
            }
            MemberDecl::Deinit(deinit) => substitute_in_stmts(&mut deinit.body, map),
            MemberDecl::MethodTemplate(template) => {
                // The nested template's own parameters shadow the outer ones.
                let mut narrowed = map.clone();
                for param in &template.generic_params {
                    narrowed.remove(&param.name);
                }
                substitute_in_function(&mut template.function, &narrowed);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
