//! Semantic analysis for the Vela compiler.
//!
//! Validates types, resolves identifiers through the scoped [`SymbolTable`],
//! instantiates generic templates on demand, checks interface conformance,
//! and enforces control-flow completeness for a parsed
//! [`Module`](vela_syntax::ast::Module).
//!
//! ## Notes
//!
//! - **Two-pass model**: the first pass registers every top-level declaration
//!   (rejecting redefinitions of non-overloadable names); the second pass
//!   checks declaration bodies in order.
//! - **Immutable AST**: the checker never writes back into the tree. Results
//!   that later stages need (moved expressions, instantiated declarations)
//!   live in checker-owned side state, and idempotence is guaranteed by a
//!   per-run set of already-checked qualified names.
//! - **Fatality**: the first error terminates the run as `Err`; structural
//!   warnings accumulate and are fetched with
//!   [`take_warnings`](Typechecker::take_warnings), unless policy escalates
//!   them.
//!
//! ## Examples
//!
//! ```
//! use vela_syntax::{CompileOptions, SourceMap, parser};
//! use vela_syntax::ast::Module;
//! use vela::sema::Typechecker;
//!
//! let options = CompileOptions::default();
//! let mut map = SourceMap::new();
//! let (file, _) = parser::parse_source(
//!     "demo.vela",
//!     "int square(int x) {\n    return x * x\n}\n",
//!     &options,
//!     &mut map,
//! )
//! .unwrap();
//! let mut module = Module::new();
//! module.add_source_file(file);
//! Typechecker::new(&options).check_module(&module).unwrap();
//! ```

pub mod imports;
pub mod instantiate;
pub mod symbols;

mod check_decl;
mod check_expr;
mod check_stmt;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::rc::Rc;

use vela_syntax::ast::*;
use vela_syntax::diagnostics::{CompileError, Diagnostic, report_warning};
use vela_syntax::location::SourceLocation;
use vela_syntax::options::CompileOptions;

use imports::{HeaderImporter, ModuleImporter};
use instantiate::Instantiator;
use symbols::{Symbol, SymbolTable};

/// Type checker state for one compilation run.
pub struct Typechecker<'a> {
    pub(crate) options: &'a CompileOptions,
    pub(crate) symbols: SymbolTable,
    pub(crate) instantiator: Instantiator,
    pub(crate) module_importer: Option<&'a mut dyn ModuleImporter>,
    pub(crate) header_importer: Option<&'a mut dyn HeaderImporter>,
    pub(crate) warnings: Vec<Diagnostic>,
    /// Return type of the function currently being checked.
    pub(crate) current_return_type: Option<Type>,
    /// Receiver type of the method/init/deinit currently being checked.
    pub(crate) current_receiver: Option<Rc<TypeDecl>>,
    /// True while checking an initializer body.
    pub(crate) in_initializer: bool,
    /// Set when the current initializer delegates to another one.
    pub(crate) delegated_init: bool,
    /// Fields assigned via `this.field = ...` in the current initializer.
    pub(crate) initialized_fields: HashSet<String>,
    /// Source locations of expressions whose values were moved.
    pub(crate) moved_values: HashSet<SourceLocation>,
    /// Qualified names of declarations already checked this run.
    pub(crate) checked_decls: HashSet<String>,
}

impl<'a> Typechecker<'a> {
    pub fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            symbols: SymbolTable::new(),
            instantiator: Instantiator::new(),
            module_importer: None,
            header_importer: None,
            warnings: Vec::new(),
            current_return_type: None,
            current_receiver: None,
            in_initializer: false,
            delegated_init: false,
            initialized_fields: HashSet::new(),
            moved_values: HashSet::new(),
            checked_decls: HashSet::new(),
        }
    }

    pub fn with_module_importer(mut self, importer: &'a mut dyn ModuleImporter) -> Self {
        self.module_importer = Some(importer);
        self
    }

    pub fn with_header_importer(mut self, importer: &'a mut dyn HeaderImporter) -> Self {
        self.header_importer = Some(importer);
        self
    }

    /// Check a whole module. Invoked once per compilation run; the first
    /// error terminates it.
    #[tracing::instrument(skip_all, fields(file_count = module.source_files.len()))]
    pub fn check_module(&mut self, module: &Module) -> Result<(), CompileError> {
        for decl in module.decls() {
            self.collect_decl(decl)?;
        }
        for decl in module.decls() {
            self.check_top_level_decl(decl)?;
        }
        Ok(())
    }

    /// Warnings accumulated so far, leaving the buffer empty.
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }

    /// True if the expression at `location` had its value moved out
    /// (ownership transfer to a non-copyable binding).
    pub fn is_moved(&self, location: SourceLocation) -> bool {
        self.moved_values.contains(&location)
    }

    pub(crate) fn warn(&mut self, message: String, location: SourceLocation) -> Result<(), CompileError> {
        report_warning(self.options.warning_mode, &mut self.warnings, message, location)
    }

    pub(crate) fn mark_moved(&mut self, expr: &Expr) {
        self.moved_values.insert(expr.location());
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Validate a type reference: every named type must resolve to exactly
    /// one visible declaration, generic references instantiate their
    /// template lazily, and access levels propagate from the referencing
    /// context.
    pub(crate) fn check_type(&mut self, ty: &Type, user_level: AccessLevel) -> Result<(), CompileError> {
        match &ty.kind {
            TypeKind::Basic { name, generic_args } => {
                if is_builtin_type_name(name) {
                    if !generic_args.is_empty() {
                        return Err(CompileError::arity(
                            format!("'{name}' takes no generic arguments"),
                            ty.location,
                        ));
                    }
                    return Ok(());
                }

                for arg in generic_args {
                    self.check_type(arg, user_level)?;
                }

                // Fully qualified name first (finds cached instantiations),
                // then the bare name.
                let qualified = if generic_args.is_empty() {
                    name.clone()
                } else {
                    instantiate::qualified_name(name, generic_args)
                };
                let symbol = match self.symbols.find(&qualified).first().cloned() {
                    Some(symbol) => symbol,
                    None => match self.symbols.find(name).first().cloned() {
                        Some(symbol) => symbol,
                        None => {
                            return Err(CompileError::name_resolution(
                                format!("unknown type '{ty}'"),
                                ty.location,
                            ));
                        }
                    },
                };

                match symbol {
                    Symbol::Type(decl) => {
                        // A concrete (non-instantiated) type referenced with
                        // generic arguments has the wrong arity.
                        if !generic_args.is_empty() && decl.name == *name {
                            return Err(CompileError::arity(
                                format!("'{name}' takes no generic arguments"),
                                ty.location,
                            ));
                        }
                        self.check_has_access(decl.access_level, name, ty.location, user_level)
                    }
                    Symbol::Enum(decl) => {
                        if !generic_args.is_empty() {
                            return Err(CompileError::arity(
                                format!("'{name}' takes no generic arguments"),
                                ty.location,
                            ));
                        }
                        self.check_has_access(decl.access_level, name, ty.location, user_level)
                    }
                    Symbol::TypeTemplate(template) => {
                        self.check_has_access(template.access_level, name, ty.location, user_level)?;
                        self.instantiate_type_reference(&template, generic_args, ty.location)?;
                        Ok(())
                    }
                    _ => Err(CompileError::name_resolution(
                        format!("'{name}' is not a type"),
                        ty.location,
                    )),
                }
            }
            TypeKind::Pointer(pointee) => self.check_type(pointee, user_level),
            TypeKind::Optional(wrapped) => self.check_type(wrapped, user_level),
            TypeKind::Array { element, .. } => self.check_type(element, user_level),
            TypeKind::Tuple(elements) => {
                for element in elements {
                    self.check_type(&element.ty, user_level)?;
                }
                Ok(())
            }
            TypeKind::Function {
                return_type,
                param_types,
            } => {
                for param in param_types {
                    self.check_type(param, user_level)?;
                }
                self.check_type(return_type, user_level)
            }
        }
    }

    /// Instantiate a type template reference, register the instantiation in
    /// the global scope, and type-check it (memoized).
    pub(crate) fn instantiate_type_reference(
        &mut self,
        template: &Rc<TypeTemplate>,
        generic_args: &[Type],
        location: SourceLocation,
    ) -> Result<Rc<TypeDecl>, CompileError> {
        let decl = self.instantiator.instantiate_type(template, generic_args, location)?;
        if !self.symbols.contains(&decl.name) {
            self.symbols
                .add_global(&decl.name, Symbol::Type(Rc::clone(&decl)), false)?;
        }
        self.check_type_decl(&decl)?;
        Ok(decl)
    }

    /// The struct/interface declaration a basic type resolves to, if any.
    pub(crate) fn resolve_type_decl(&self, ty: &Type) -> Option<Rc<TypeDecl>> {
        let TypeKind::Basic { name, generic_args } = &ty.kind else {
            return None;
        };
        let qualified = if generic_args.is_empty() {
            name.clone()
        } else {
            instantiate::qualified_name(name, generic_args)
        };
        for candidate in [qualified.as_str(), name.as_str()] {
            if let Some(Symbol::Type(decl)) = self.symbols.find(candidate).first() {
                return Some(Rc::clone(decl));
            }
        }
        None
    }

    pub(crate) fn resolve_enum_decl(&self, name: &str) -> Option<Rc<EnumDecl>> {
        match self.symbols.find(name).first() {
            Some(Symbol::Enum(decl)) => Some(Rc::clone(decl)),
            _ => None,
        }
    }

    /// A user at access level `user_level` may only reference declarations
    /// at least as permissive.
    pub(crate) fn check_has_access(
        &self,
        access: AccessLevel,
        name: &str,
        location: SourceLocation,
        user_level: AccessLevel,
    ) -> Result<(), CompileError> {
        if access < user_level {
            return Err(CompileError::name_resolution(format!("'{name}' is private"), location));
        }
        Ok(())
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Implicit conversion check: structural equality (ignoring top-level
    /// mutability), `null` into optionals, `undefined` into anything, value
    /// wrapping into optionals, and literal numeric widening.
    pub(crate) fn convert(&self, from: &Type, to: &Type) -> bool {
        if from.kind == to.kind {
            return true;
        }
        if from.is_undefined() {
            return true;
        }
        if from.is_null() && to.is_optional() {
            return true;
        }
        if let TypeKind::Optional(wrapped) = &to.kind {
            if self.convert(from, wrapped) {
                return true;
            }
        }
        if let (TypeKind::Basic { name: from_name, .. }, TypeKind::Basic { name: to_name, .. }) =
            (&from.kind, &to.kind)
        {
            // Untyped literals carry the 'int'/'float' pseudo-width until a
            // context gives them one.
            if from_name == "int" && is_integer_type_name(to_name) {
                return true;
            }
            if from_name == "float" && is_float_type_name(to_name) {
                return true;
            }
        }
        false
    }

    /// Builtins, pointers, enums, and function values copy; arrays, tuples,
    /// and struct values move.
    pub(crate) fn is_implicitly_copyable(&self, ty: &Type) -> bool {
        match &ty.kind {
            TypeKind::Basic { name, .. } => {
                if is_builtin_type_name(name) || self.resolve_enum_decl(name).is_some() {
                    return true;
                }
                self.resolve_type_decl(ty).is_none()
            }
            TypeKind::Pointer(_) | TypeKind::Function { .. } => true,
            TypeKind::Optional(wrapped) => self.is_implicitly_copyable(wrapped),
            TypeKind::Array { .. } | TypeKind::Tuple(_) => false,
        }
    }
}

// ============================================================================
// Builtin type names
// ============================================================================

pub(crate) fn is_builtin_type_name(name: &str) -> bool {
    matches!(
        name,
        "void"
            | "bool"
            | "char"
            | "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "float"
            | "float32"
            | "float64"
            | "string"
            | "null"
            | "undefined"
    )
}

pub(crate) fn is_integer_type_name(name: &str) -> bool {
    matches!(
        name,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32" | "uint64"
    )
}

pub(crate) fn is_float_type_name(name: &str) -> bool {
    matches!(name, "float" | "float32" | "float64")
}

pub(crate) fn is_numeric_type_name(name: &str) -> bool {
    is_integer_type_name(name) || is_float_type_name(name) || name == "char"
}

/// The type `this` binds to inside members of `decl`.
pub(crate) fn receiver_this_type(decl: &TypeDecl) -> Type {
    Type::new(
        TypeKind::Pointer(Box::new(Type::basic(decl.name.clone(), decl.location))),
        Mutability::Mutable,
        decl.location,
    )
}
