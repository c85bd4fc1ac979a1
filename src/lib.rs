#![forbid(unsafe_code)]
//! Vela programming language compiler
//!
//! Vela is a statically typed, ahead-of-time-compiled language. This crate
//! provides the front end of the compiler: the lexer → parser pipeline from
//! [`vela_syntax`] plus semantic analysis (scoped symbol resolution, generic
//! template instantiation, interface conformance checking, and type
//! checking), and the `vela` CLI driver.
//!
//! Machine-code generation and linking consume the fully type-checked
//! [`Module`](vela_syntax::Module) this crate produces; they live in an
//! external backend.
//!
//! ## Panic policy
//!
//! Production code propagates failures as `Result` with `?`. `.unwrap()` and
//! `.expect()` are acceptable in tests; an `.expect("...")` in non-test code
//! marks a compiler-internal invariant, never a user-facing condition.

pub mod cli;
pub mod sema;

pub use sema::Typechecker;
pub use vela_syntax::{ast, diagnostics, lexer, location, options, parser, stream, token};
