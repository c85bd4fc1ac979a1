//! Statement checking: blocks, control flow, for-in iteration, and switch
//! statements (including the single-`default` rule and case bindings).

use std::rc::Rc;

use vela_syntax::ast::*;
use vela_syntax::diagnostics::CompileError;

use super::symbols::{Symbol, VarSymbol};
use super::Typechecker;

impl Typechecker<'_> {
    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Var(decl) => self.check_var_decl(decl, false).map(|_| ()),
            Stmt::Return(ret) => self.check_return_stmt(ret),
            Stmt::Expr(expr) | Stmt::Defer(expr) => self.check_expr(expr).map(|_| ()),
            Stmt::If(if_stmt) => {
                self.check_condition(&if_stmt.condition)?;
                self.check_block(&if_stmt.then_body)?;
                self.check_block(&if_stmt.else_body)
            }
            Stmt::While(while_stmt) => {
                self.check_condition(&while_stmt.condition)?;
                self.check_block(&while_stmt.body)
            }
            Stmt::For(for_stmt) => self.check_for_stmt(for_stmt),
            Stmt::Switch(switch) => self.check_switch_stmt(switch),
            Stmt::Break(_) | Stmt::Continue(_) => Ok(()),
        }
    }

    fn check_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        self.symbols.push_scope();
        let result = stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
        self.symbols.pop_scope();
        result
    }

    fn check_condition(&mut self, condition: &Expr) -> Result<(), CompileError> {
        let ty = self.check_expr(condition)?;
        let bool_ty = Type::basic("bool", condition.location());
        if !self.convert(&ty, &bool_ty) {
            return Err(CompileError::conversion(
                format!("condition must have type 'bool', got '{ty}'"),
                condition.location(),
            ));
        }
        Ok(())
    }

    fn check_return_stmt(&mut self, ret: &ReturnStmt) -> Result<(), CompileError> {
        let expected = self.current_return_type.clone();
        match (&ret.value, expected) {
            (Some(value), Some(expected)) => {
                let ty = self.check_expr(value)?;
                if expected.is_void() {
                    return Err(CompileError::conversion(
                        "void function cannot return a value".to_string(),
                        ret.location,
                    ));
                }
                if !self.convert(&ty, &expected) {
                    return Err(CompileError::conversion(
                        format!("cannot convert return value of type '{ty}' to '{expected}'"),
                        value.location(),
                    ));
                }
                Ok(())
            }
            (Some(value), None) => self.check_expr(value).map(|_| ()),
            (None, Some(expected)) if !expected.is_void() => Err(CompileError::conversion(
                format!("non-void function must return a value of type '{expected}'"),
                ret.location,
            )),
            _ => Ok(()),
        }
    }

    fn check_for_stmt(&mut self, stmt: &ForStmt) -> Result<(), CompileError> {
        let range_ty = self.check_expr(&stmt.range)?;
        let element_ty = iterable_element_type(&range_ty).ok_or_else(|| {
            CompileError::conversion(
                format!("'{range_ty}' is not an iterable type"),
                stmt.range.location(),
            )
        })?;

        let variable_ty = match &stmt.variable.declared_type {
            Some(declared) => {
                self.check_type(declared, AccessLevel::Private)?;
                if !self.convert(&element_ty, declared) {
                    return Err(CompileError::conversion(
                        format!("cannot iterate over '{range_ty}' with a variable of type '{declared}'"),
                        stmt.variable.location,
                    ));
                }
                declared.clone()
            }
            None => element_ty,
        };

        self.symbols.push_scope();
        let result = self
            .symbols
            .add(
                &stmt.variable.name,
                Symbol::Var(Rc::new(VarSymbol {
                    name: stmt.variable.name.clone(),
                    ty: variable_ty.with_mutability(stmt.variable.mutability),
                    access_level: AccessLevel::Default,
                    location: stmt.variable.location,
                })),
                false,
            )
            .and_then(|_| stmt.body.iter().try_for_each(|s| self.check_stmt(s)));
        self.symbols.pop_scope();
        result
    }

    fn check_switch_stmt(&mut self, stmt: &SwitchStmt) -> Result<(), CompileError> {
        let condition_ty = self.check_expr(&stmt.condition)?;
        let mut default_seen = false;

        for case in &stmt.cases {
            let binding_ty = match &case.pattern {
                CasePattern::Default => {
                    if default_seen {
                        return Err(CompileError::control_flow(
                            "switch statement may only contain one 'default' case".to_string(),
                            case.location,
                        ));
                    }
                    default_seen = true;
                    None
                }
                CasePattern::Expr(value) => {
                    let value_ty = self.check_expr(value)?;
                    if !self.convert(&value_ty, &condition_ty) && !self.convert(&condition_ty, &value_ty) {
                        return Err(CompileError::conversion(
                            format!(
                                "case value of type '{value_ty}' doesn't match switched value of type '{condition_ty}'"
                            ),
                            value.location(),
                        ));
                    }
                    match &case.binding {
                        Some(_) => Some(self.associated_value_type(value)?),
                        None => None,
                    }
                }
            };

            self.symbols.push_scope();
            let result = (|| -> Result<(), CompileError> {
                if let Some(binding) = &case.binding {
                    let ty = binding_ty
                        .clone()
                        .expect("INVARIANT: a case binding implies an associated value type");
                    self.symbols.add(
                        &binding.name,
                        Symbol::Var(Rc::new(VarSymbol {
                            name: binding.name.clone(),
                            ty,
                            access_level: AccessLevel::Default,
                            location: binding.location,
                        })),
                        false,
                    )?;
                }
                case.stmts.iter().try_for_each(|s| self.check_stmt(s))
            })();
            self.symbols.pop_scope();
            result?;
        }
        Ok(())
    }
}

fn iterable_element_type(ty: &Type) -> Option<Type> {
    match &ty.kind {
        TypeKind::Array { element, .. } => Some((**element).clone()),
        TypeKind::Pointer(pointee) => match &pointee.kind {
            TypeKind::Array { element, .. } => Some((**element).clone()),
            _ => None,
        },
        _ => None,
    }
}
