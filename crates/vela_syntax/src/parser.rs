//! Recursive-descent parser for the Vela programming language.
//!
//! Consumes the token stream and produces one [`SourceFile`] per input file.
//! Binary expressions are parsed by precedence climbing; a handful of
//! ambiguities (generic argument list vs. less-than, lambda vs. tuple
//! literal vs. parenthesized expression, chained assignment) are resolved by
//! bounded lookahead and cursor backtracking over the token buffer.
//!
//! Parsing is fatal on the first syntax error. The type checker that runs
//! afterwards assumes a structurally valid tree, so no error recovery or
//! resynchronization is attempted.
//!
//! ## Examples
//!
//! ```
//! use vela_syntax::{CompileOptions, SourceMap, parser};
//!
//! let options = CompileOptions::default();
//! let mut map = SourceMap::new();
//! let (file, warnings) =
//!     parser::parse_source("demo.vela", "int answer = 42\n", &options, &mut map).unwrap();
//! assert_eq!(file.decls.len(), 1);
//! assert!(warnings.is_empty());
//! ```

use std::path::{Path, PathBuf};

use crate::ast::*;
use crate::diagnostics::{CompileError, Diagnostic, ErrorKind, report_warning};
use crate::lexer::Lexer;
use crate::location::{FileId, SourceLocation, SourceMap};
use crate::options::CompileOptions;
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};

// NOTE: This module is split across multiple files using `include!` to keep
// all parser methods in the same Rust module (preserving privacy + call
// patterns) while avoiding a single large source file.

include!("parser/core.rs");
include!("parser/types.rs");
include!("parser/exprs.rs");
include!("parser/stmts.rs");
include!("parser/decls.rs");
include!("parser/tests.rs");
