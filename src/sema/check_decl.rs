//! Declaration checking: registration, functions and initializers, type
//! declarations with interface conformance, enums, globals, and imports.

use std::collections::HashMap;
use std::rc::Rc;

use vela_syntax::ast::*;
use vela_syntax::diagnostics::CompileError;

use super::imports::ImportOutcome;
use super::instantiate;
use super::symbols::{Symbol, VarSymbol};
use super::{Typechecker, receiver_this_type};

impl Typechecker<'_> {
    // ========================================================================
    // Registration (first pass)
    // ========================================================================

    /// Register one top-level declaration in the global scope. Redefining a
    /// non-overloadable name is rejected here, which is what keeps later
    /// name lookups unambiguous.
    pub(crate) fn collect_decl(&mut self, decl: &Decl) -> Result<(), CompileError> {
        match decl {
            Decl::Function(f) => self
                .symbols
                .add(&f.name, Symbol::Function(Rc::new(f.clone())), false),
            Decl::FunctionTemplate(t) => {
                self.symbols
                    .add(&t.function.name, Symbol::FunctionTemplate(Rc::new(t.clone())), false)
            }
            Decl::Type(t) => self.symbols.add(&t.name, Symbol::Type(Rc::new(t.clone())), false),
            Decl::TypeTemplate(t) => {
                self.symbols
                    .add(&t.type_decl.name, Symbol::TypeTemplate(Rc::new(t.clone())), false)
            }
            Decl::Enum(e) => self.symbols.add(&e.name, Symbol::Enum(Rc::new(e.clone())), false),
            Decl::Var(v) => {
                // Globals with inferred types get a placeholder here; the
                // check pass fills in the real type.
                let ty = v
                    .declared_type
                    .clone()
                    .unwrap_or_else(|| Type::basic("undefined", v.location).with_mutability(v.mutability));
                self.symbols.add(
                    &v.name,
                    Symbol::Var(Rc::new(VarSymbol {
                        name: v.name.clone(),
                        ty,
                        access_level: v.access_level,
                        location: v.location,
                    })),
                    false,
                )
            }
            Decl::Import(_) => Ok(()),
        }
    }

    // ========================================================================
    // Check pass
    // ========================================================================

    pub(crate) fn check_top_level_decl(&mut self, decl: &Decl) -> Result<(), CompileError> {
        match decl {
            Decl::Function(f) => self.check_function(f, None),
            Decl::FunctionTemplate(t) => self.check_generic_params(&t.generic_params, t.access_level),
            Decl::Type(t) => {
                // Check the registered Rc so instantiation-time lookups and
                // this check agree on identity.
                match self.symbols.find(&t.name).first().cloned() {
                    Some(Symbol::Type(rc)) => self.check_type_decl(&rc),
                    _ => self.check_type_decl(&Rc::new(t.clone())),
                }
            }
            Decl::TypeTemplate(t) => self.check_generic_params(&t.generic_params, t.access_level),
            Decl::Enum(e) => self.check_enum_decl(e),
            Decl::Var(v) => self.check_var_decl(v, true).map(|_| ()),
            Decl::Import(i) => self.check_import_decl(i),
        }
    }

    /// Generic parameters may not collide with visible names, and their
    /// constraints must name interfaces.
    pub(crate) fn check_generic_params(
        &mut self,
        params: &[GenericParamDecl],
        user_level: AccessLevel,
    ) -> Result<(), CompileError> {
        for param in params {
            if self.symbols.contains(&param.name) {
                return Err(CompileError::name_resolution(
                    format!("redefinition of '{}'", param.name),
                    param.location,
                ));
            }
            for constraint in &param.constraints {
                self.check_type(constraint, user_level)?;
                let is_interface = self
                    .resolve_type_decl(constraint)
                    .map(|d| d.is_interface())
                    .unwrap_or(false);
                if !is_interface {
                    return Err(CompileError::name_resolution(
                        "only interface types can be used as generic constraints".to_string(),
                        constraint.location,
                    ));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub(crate) fn check_function(
        &mut self,
        decl: &FunctionDecl,
        receiver: Option<&Rc<TypeDecl>>,
    ) -> Result<(), CompileError> {
        if decl.is_extern {
            return Ok(());
        }

        self.symbols.push_scope();
        let saved_return = self.current_return_type.replace(decl.return_type.clone());
        let saved_receiver = match receiver {
            Some(r) => self.current_receiver.replace(Rc::clone(r)),
            None => self.current_receiver.take(),
        };

        let result = self.check_function_inner(decl, receiver);

        self.current_return_type = saved_return;
        self.current_receiver = saved_receiver;
        self.symbols.pop_scope();
        result?;

        // A non-void function must return on every control path. Interface
        // method prototypes are exempt; their conforming implementations are
        // checked instead.
        let in_interface = receiver.map(|r| r.is_interface()).unwrap_or(false);
        if !in_interface && !decl.return_type.is_void() {
            let returns = decl.body.as_deref().map(all_paths_return).unwrap_or(false);
            if !returns {
                return Err(CompileError::control_flow(
                    format!("'{}' is missing a return statement", decl.name),
                    decl.location,
                ));
            }
        }
        Ok(())
    }

    fn check_function_inner(
        &mut self,
        decl: &FunctionDecl,
        receiver: Option<&Rc<TypeDecl>>,
    ) -> Result<(), CompileError> {
        self.check_params(&decl.params, decl.access_level)?;
        self.check_type(&decl.return_type, decl.access_level)?;
        if let Some(receiver) = receiver {
            self.bind_this(receiver)?;
        }
        if let Some(body) = &decl.body {
            for stmt in body {
                self.check_stmt(stmt)?;
            }
        }
        Ok(())
    }

    /// Parameters must have valid types and unique names within the
    /// function's scope.
    pub(crate) fn check_params(
        &mut self,
        params: &[ParamDecl],
        user_level: AccessLevel,
    ) -> Result<(), CompileError> {
        for param in params {
            if self.symbols.contains_in_current_scope(&param.name) {
                return Err(CompileError::name_resolution(
                    format!("redefinition of '{}'", param.name),
                    param.location,
                ));
            }
            let Some(ty) = &param.ty else {
                return Err(CompileError::conversion(
                    format!("parameter '{}' needs a type annotation", param.name),
                    param.location,
                ));
            };
            self.check_type(ty, user_level)?;
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
        }
        Ok(())
    }

    fn bind_this(&mut self, receiver: &Rc<TypeDecl>) -> Result<(), CompileError> {
        self.symbols.add(
            "this",
            Symbol::Var(Rc::new(VarSymbol {
                name: "this".to_string(),
                ty: receiver_this_type(receiver),
                access_level: AccessLevel::Default,
                location: receiver.location,
            })),
            false,
        )
    }

    /// Check an initializer: track which fields get assigned through
    /// `this.field = ...` and, unless the initializer delegates to another
    /// one, warn about every field never assigned.
    pub(crate) fn check_init(&mut self, decl: &InitDecl, receiver: &Rc<TypeDecl>) -> Result<(), CompileError> {
        self.symbols.push_scope();
        let saved_receiver = self.current_receiver.replace(Rc::clone(receiver));
        let saved_return = self.current_return_type.replace(Type::basic("void", decl.location));
        let saved_in_init = std::mem::replace(&mut self.in_initializer, true);
        let saved_delegated = std::mem::replace(&mut self.delegated_init, false);
        let saved_fields = std::mem::take(&mut self.initialized_fields);

        let result = (|| -> Result<(), CompileError> {
            self.check_params(&decl.params, decl.access_level)?;
            self.bind_this(receiver)?;
            for stmt in &decl.body {
                self.check_stmt(stmt)?;
                self.record_initialized_field(stmt);
            }
            Ok(())
        })();

        let initialized = std::mem::replace(&mut self.initialized_fields, saved_fields);
        let delegated = std::mem::replace(&mut self.delegated_init, saved_delegated);
        self.in_initializer = saved_in_init;
        self.current_return_type = saved_return;
        self.current_receiver = saved_receiver;
        self.symbols.pop_scope();
        result?;

        if !delegated {
            for field in &receiver.fields {
                if !initialized.contains(&field.name) {
                    self.warn(
                        format!("initializer doesn't initialize member variable '{}'", field.name),
                        decl.location,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn record_initialized_field(&mut self, stmt: &Stmt) {
        if let Stmt::Expr(Expr::Binary(binary)) = stmt {
            if binary.op.is_assignment() {
                if let Expr::Member(member) = &*binary.lhs {
                    if matches!(&*member.operand, Expr::Var(v) if v.name == "this") {
                        self.initialized_fields.insert(member.member.clone());
                    }
                }
            }
        }
        if let Stmt::Expr(Expr::Call(call)) = stmt {
            if matches!(&*call.callee, Expr::Var(v) if v.name == "init") {
                self.delegated_init = true;
            }
        }
    }

    pub(crate) fn check_deinit(&mut self, decl: &DeinitDecl, receiver: &Rc<TypeDecl>) -> Result<(), CompileError> {
        self.symbols.push_scope();
        let saved_receiver = self.current_receiver.replace(Rc::clone(receiver));
        let saved_return = self.current_return_type.replace(Type::basic("void", decl.location));

        let result = (|| -> Result<(), CompileError> {
            self.bind_this(receiver)?;
            for stmt in &decl.body {
                self.check_stmt(stmt)?;
            }
            Ok(())
        })();

        self.current_return_type = saved_return;
        self.current_receiver = saved_receiver;
        self.symbols.pop_scope();
        result
    }

    // ========================================================================
    // Type declarations and interface conformance
    // ========================================================================

    pub(crate) fn check_type_decl(&mut self, decl: &Rc<TypeDecl>) -> Result<(), CompileError> {
        // Idempotent per declaration; re-entry happens naturally for generic
        // instantiations and interface default bodies.
        if !self.checked_decls.insert(format!("type {}", decl.name)) {
            return Ok(());
        }
        let decl = Rc::clone(decl);
        let this_ty = Type::basic(decl.name.clone(), decl.location);

        // For each interface the type claims to implement, every requirement
        // must be satisfied structurally; requirements with default bodies
        // are materialized (with `This` substituted) when not overridden.
        let mut default_copies: Vec<FunctionDecl> = Vec::new();
        for interface_ty in &decl.interfaces {
            self.check_type(interface_ty, decl.access_level)?;
            let interface_decl = self
                .resolve_type_decl(interface_ty)
                .filter(|d| d.is_interface())
                .ok_or_else(|| {
                    CompileError::conformance(
                        format!("'{interface_ty}' is not an interface"),
                        interface_ty.location,
                    )
                })?;

            for requirement in interface_decl.methods() {
                if find_matching_method(&decl, requirement, &this_ty).is_some() {
                    continue;
                }
                match &requirement.body {
                    Some(_) => {
                        let map = instantiate::single_substitution("This", &this_ty);
                        let mut copy = requirement.clone();
                        instantiate::substitute_in_function(&mut copy, &map);
                        default_copies.push(copy);
                    }
                    None => {
                        return Err(CompileError::conformance(
                            format!(
                                "'{}' doesn't provide member function '{}' required by interface '{}'",
                                decl.name, requirement.name, interface_decl.name
                            ),
                            decl.location,
                        )
                        .with_note("requirement declared here", Some(requirement.location)));
                    }
                }
            }
        }

        // Interfaces check their own members with `This` resolved to the
        // interface type itself.
        let real: Rc<TypeDecl> = if decl.is_interface() {
            let map = instantiate::single_substitution("This", &this_ty);
            let mut resolved = (*decl).clone();
            instantiate::substitute_in_type_decl(&mut resolved, &map);
            Rc::new(resolved)
        } else {
            Rc::clone(&decl)
        };

        for field in &real.fields {
            let user_level = field.access_level.min(real.access_level);
            self.check_type(&field.ty, user_level)?;
        }

        for member in &real.members {
            match member {
                MemberDecl::Method(method) => self.check_function(method, Some(&real))?,
                MemberDecl::Init(init) => self.check_init(init, &real)?,
                MemberDecl::Deinit(deinit) => self.check_deinit(deinit, &real)?,
                MemberDecl::MethodTemplate(template) => {
                    self.check_generic_params(&template.generic_params, template.access_level)?;
                }
            }
        }

        for copy in &default_copies {
            self.check_function(copy, Some(&real))?;
        }
        Ok(())
    }

    // ========================================================================
    // Enums, globals, imports
    // ========================================================================

    pub(crate) fn check_enum_decl(&mut self, decl: &EnumDecl) -> Result<(), CompileError> {
        // Canonical sort-and-scan finds duplicate case names regardless of
        // declaration order.
        let mut cases: Vec<&EnumCase> = decl.cases.iter().collect();
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in cases.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(CompileError::name_resolution(
                    format!("duplicate enum case '{}'", pair[1].name),
                    pair[1].location,
                ));
            }
        }

        for case in &decl.cases {
            if let Some(ty) = &case.associated_type {
                self.check_type(ty, decl.access_level)?;
            }
        }
        Ok(())
    }

    /// Check a variable declaration; returns its resolved type. The declared
    /// type must accept the initializer, or the type is inferred from it.
    pub(crate) fn check_var_decl(&mut self, decl: &VarDecl, is_global: bool) -> Result<Type, CompileError> {
        if !is_global && self.symbols.contains(&decl.name) {
            return Err(CompileError::name_resolution(
                format!("redefinition of '{}'", decl.name),
                decl.location,
            ));
        }

        let Some(initializer) = &decl.initializer else {
            return Err(CompileError::conversion(
                format!("'{}' has no initializer", decl.name),
                decl.location,
            ));
        };
        if is_global && matches!(initializer, Expr::UndefinedLiteral { .. }) {
            return Err(CompileError::conversion(
                "global variables cannot be uninitialized".to_string(),
                decl.location,
            ));
        }

        let initializer_ty = self.check_expr(initializer)?;

        let ty = match &decl.declared_type {
            Some(declared) => {
                let user_level = if is_global { decl.access_level } else { AccessLevel::Private };
                self.check_type(declared, user_level)?;
                if !self.convert(&initializer_ty, declared) {
                    let hint = if initializer_ty.is_null() && !declared.is_optional() {
                        " (add '?' to the type to make it nullable)"
                    } else {
                        ""
                    };
                    return Err(CompileError::conversion(
                        format!(
                            "cannot initialize variable of type '{declared}' with '{initializer_ty}'{hint}"
                        ),
                        initializer.location(),
                    ));
                }
                declared.clone()
            }
            None => {
                if initializer_ty.is_null() {
                    return Err(CompileError::conversion(
                        format!("couldn't infer type of '{}', add a type annotation", decl.name),
                        decl.location,
                    ));
                }
                initializer_ty.clone().with_mutability(decl.mutability)
            }
        };

        let symbol = Symbol::Var(Rc::new(VarSymbol {
            name: decl.name.clone(),
            ty: ty.clone(),
            access_level: decl.access_level,
            location: decl.location,
        }));
        if is_global {
            // Replace the placeholder registered during collection.
            self.symbols.add_global(&decl.name, symbol, true)?;
        } else {
            self.symbols.add(&decl.name, symbol, false)?;
        }

        if !self.is_implicitly_copyable(&ty) {
            self.mark_moved(initializer);
        }
        Ok(ty)
    }

    /// Resolve an import: first as a Vela module, then as a foreign header.
    pub(crate) fn check_import_decl(&mut self, decl: &ImportDecl) -> Result<(), CompileError> {
        let options = self.options;
        if let Some(importer) = self.module_importer.as_deref_mut() {
            if importer.import_module(&decl.target) == ImportOutcome::Resolved {
                return Ok(());
            }
        }
        if let Some(importer) = self.header_importer.as_deref_mut() {
            if importer.import_header(&decl.target, options) == ImportOutcome::Resolved {
                return Ok(());
            }
        }
        Err(CompileError::unresolved_import(
            format!("couldn't find module or header '{}'", decl.target),
            decl.location,
        ))
    }
}

// ============================================================================
// Control-flow completeness
// ============================================================================

/// A block returns on every path iff its last statement is a return, an `if`
/// whose branches both do, or a `switch` whose every case does and which has
/// a `default`.
pub(crate) fn all_paths_return(block: &[Stmt]) -> bool {
    match block.last() {
        None => false,
        Some(Stmt::Return(_)) => true,
        Some(Stmt::If(if_stmt)) => {
            all_paths_return(&if_stmt.then_body) && all_paths_return(&if_stmt.else_body)
        }
        Some(Stmt::Switch(switch)) => {
            switch.cases.iter().all(|case| all_paths_return(&case.stmts))
                && switch.default_stmts().is_some()
        }
        Some(_) => false,
    }
}

/// Find a method of `decl` whose signature matches `requirement` with `This`
/// substituted by the conforming type.
fn find_matching_method<'d>(
    decl: &'d TypeDecl,
    requirement: &FunctionDecl,
    this_ty: &Type,
) -> Option<&'d FunctionDecl> {
    let map: HashMap<String, Type> = instantiate::single_substitution("This", this_ty);
    decl.methods().find(|method| {
        if method.name != requirement.name || method.params.len() != requirement.params.len() {
            return false;
        }

        let mut expected_return = requirement.return_type.clone();
        instantiate::substitute_in_type(&mut expected_return, &map);
        if expected_return != method.return_type {
            return false;
        }

        method.params.iter().zip(&requirement.params).all(|(have, want)| {
            match (&have.ty, &want.ty) {
                (Some(have), Some(want)) => {
                    let mut want = want.clone();
                    instantiate::substitute_in_type(&mut want, &map);
                    want == *have
                }
                _ => false,
            }
        })
    })
}
