//! Scoped symbol table for semantic analysis.
//!
//! A stack of scopes, each mapping a name to an overload set. Scopes are
//! pushed on entering a function, type, or block and popped on exit; lookup
//! walks outward from the innermost scope. Within one scope a
//! non-overloadable name is unique; only functions (and function templates)
//! form overload sets.
//!
//! Symbols carry resolved semantic records. The heavyweight ones (type,
//! enum, and template declarations) are shared via `Rc` so generic
//! instantiations can be compared by identity, not just structure.

use std::collections::HashMap;
use std::rc::Rc;

use vela_syntax::ast::{
    AccessLevel, EnumDecl, FunctionDecl, FunctionTemplate, Type, TypeDecl, TypeTemplate,
};
use vela_syntax::diagnostics::CompileError;
use vela_syntax::location::SourceLocation;

/// A variable, parameter, or `this` binding with its resolved type.
#[derive(Debug)]
pub struct VarSymbol {
    pub name: String,
    pub ty: Type,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

/// Resolved information about one named entity.
#[derive(Debug, Clone)]
pub enum Symbol {
    Var(Rc<VarSymbol>),
    Function(Rc<FunctionDecl>),
    FunctionTemplate(Rc<FunctionTemplate>),
    Type(Rc<TypeDecl>),
    TypeTemplate(Rc<TypeTemplate>),
    Enum(Rc<EnumDecl>),
}

impl Symbol {
    pub fn access_level(&self) -> AccessLevel {
        match self {
            Symbol::Var(v) => v.access_level,
            Symbol::Function(f) => f.access_level,
            Symbol::FunctionTemplate(t) => t.access_level,
            Symbol::Type(t) => t.access_level,
            Symbol::TypeTemplate(t) => t.access_level,
            Symbol::Enum(e) => e.access_level,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Symbol::Var(v) => v.location,
            Symbol::Function(f) => f.location,
            Symbol::FunctionTemplate(t) => t.function.location,
            Symbol::Type(t) => t.location,
            Symbol::TypeTemplate(t) => t.type_decl.location,
            Symbol::Enum(e) => e.location,
        }
    }

    /// Functions and function templates overload; everything else is unique
    /// within its scope.
    fn is_overloadable(&self) -> bool {
        matches!(self, Symbol::Function(_) | Symbol::FunctionTemplate(_))
    }
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Vec<Symbol>>,
}

/// Stack of scopes with innermost-first lookup.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table with only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Add `symbol` to the current scope.
    ///
    /// Redefining a non-overloadable name in the same scope is an error
    /// unless `allow_redefinition` is set, in which case the new symbol
    /// replaces the old one (used when a global's inferred type is filled
    /// in).
    pub fn add(&mut self, name: &str, symbol: Symbol, allow_redefinition: bool) -> Result<(), CompileError> {
        let scope = self.scopes.last_mut().expect("at least the global scope exists");
        Self::add_to_scope(scope, name, symbol, allow_redefinition)
    }

    /// Add `symbol` to the global scope regardless of the current nesting,
    /// used to register generic instantiations discovered mid-check.
    pub fn add_global(&mut self, name: &str, symbol: Symbol, allow_redefinition: bool) -> Result<(), CompileError> {
        let scope = self.scopes.first_mut().expect("the global scope exists");
        Self::add_to_scope(scope, name, symbol, allow_redefinition)
    }

    fn add_to_scope(
        scope: &mut Scope,
        name: &str,
        symbol: Symbol,
        allow_redefinition: bool,
    ) -> Result<(), CompileError> {
        match scope.symbols.get_mut(name) {
            None => {
                scope.symbols.insert(name.to_string(), vec![symbol]);
                Ok(())
            }
            Some(set) => {
                if allow_redefinition {
                    *set = vec![symbol];
                    Ok(())
                } else if symbol.is_overloadable() && set.iter().all(Symbol::is_overloadable) {
                    set.push(symbol);
                    Ok(())
                } else {
                    Err(CompileError::name_resolution(
                        format!("redefinition of '{name}'"),
                        symbol.location(),
                    ))
                }
            }
        }
    }

    /// True if `name` is visible from the current scope.
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.symbols.contains_key(name))
    }

    pub fn contains_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .expect("at least the global scope exists")
            .symbols
            .contains_key(name)
    }

    /// The overload set for `name` from the innermost scope that defines it
    /// (a singleton for everything but functions), or an empty slice.
    pub fn find(&self, name: &str) -> &[Symbol] {
        for scope in self.scopes.iter().rev() {
            if let Some(set) = scope.symbols.get(name) {
                return set;
            }
        }
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_syntax::location::FileId;

    fn var(name: &str) -> Symbol {
        Symbol::Var(Rc::new(VarSymbol {
            name: name.to_string(),
            ty: Type::basic("int", SourceLocation::new(FileId(0), 1, 1)),
            access_level: AccessLevel::Default,
            location: SourceLocation::new(FileId(0), 1, 1),
        }))
    }

    fn function(name: &str) -> Symbol {
        Symbol::Function(Rc::new(FunctionDecl {
            name: name.to_string(),
            return_type: Type::basic("void", SourceLocation::new(FileId(0), 1, 1)),
            params: Vec::new(),
            body: Some(Vec::new()),
            is_extern: false,
            is_variadic: false,
            access_level: AccessLevel::Default,
            location: SourceLocation::new(FileId(0), 1, 1),
        }))
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut table = SymbolTable::new();
        table.add("x", var("x"), false).unwrap();
        table.push_scope();
        table.add("x", var("x"), false).unwrap();
        assert_eq!(table.find("x").len(), 1);
        table.pop_scope();
        assert!(table.contains("x"));
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected() {
        let mut table = SymbolTable::new();
        table.add("x", var("x"), false).unwrap();
        let err = table.add("x", var("x"), false).unwrap_err();
        assert!(err.message.contains("redefinition"));
    }

    #[test]
    fn functions_form_overload_sets() {
        let mut table = SymbolTable::new();
        table.add("f", function("f"), false).unwrap();
        table.add("f", function("f"), false).unwrap();
        assert_eq!(table.find("f").len(), 2);

        // A variable cannot join a function overload set.
        let err = table.add("f", var("f"), false).unwrap_err();
        assert!(err.message.contains("redefinition"));
    }

    #[test]
    fn lookup_walks_outward() {
        let mut table = SymbolTable::new();
        table.add("outer", var("outer"), false).unwrap();
        table.push_scope();
        assert!(table.contains("outer"));
        assert!(!table.contains_in_current_scope("outer"));
        assert_eq!(table.find("outer").len(), 1);
        assert!(table.find("missing").is_empty());
    }

    #[test]
    fn add_global_registers_through_nested_scopes() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.push_scope();
        table.add_global("Box<int>", var("Box<int>"), false).unwrap();
        table.pop_scope();
        table.pop_scope();
        assert!(table.contains("Box<int>"));
    }
}
