//! CLI driver for the Vela compiler.
//!
//! The driver is a thin composition root: it turns command-line flags into a
//! [`CompileOptions`] bundle, feeds input files through the lexer → parser →
//! type checker pipeline, and renders structured diagnostics to stderr with
//! source context. Code generation is handled by an external backend that
//! consumes the checked module.
//!
//! ## Flags
//!
//! - `--parse` / `--typecheck` - stop after the named stage
//! - `--print-ast` - dump the parsed AST to stdout
//! - `-D <flag>` - define a flag for `#if` conditional compilation
//! - `-I <dir>` - add a header/import search path
//! - `--warnings <default|suppress|error>` - structural warning policy

use std::path::PathBuf;

use vela_syntax::ast::Module;
use vela_syntax::diagnostics::{CompileError, Diagnostic, Severity, WarningMode};
use vela_syntax::location::{SourceLocation, SourceMap};
use vela_syntax::options::CompileOptions;
use vela_syntax::parser;

use crate::sema::imports::HeaderSearchImporter;
use crate::sema::Typechecker;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, clap::Parser)]
#[command(name = "vela", version, about = "The Vela programming language compiler")]
struct Cli {
    /// Input source files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Perform parsing only
    #[arg(long)]
    parse: bool,

    /// Perform parsing and type checking only
    #[arg(long)]
    typecheck: bool,

    /// Print the abstract syntax tree to stdout
    #[arg(long = "print-ast")]
    print_ast: bool,

    /// Define a flag for '#if' conditional compilation
    #[arg(short = 'D', value_name = "FLAG")]
    defines: Vec<String>,

    /// Add a header search path for foreign imports
    #[arg(short = 'I', value_name = "DIR")]
    import_search_paths: Vec<PathBuf>,

    /// How to treat structural warnings
    #[arg(long, value_enum, default_value = "default")]
    warnings: WarningsFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum WarningsFlag {
    /// Print warnings and continue
    Default,
    /// Drop warnings entirely
    Suppress,
    /// Treat warnings as fatal errors
    Error,
}

impl From<WarningsFlag> for WarningMode {
    fn from(flag: WarningsFlag) -> Self {
        match flag {
            WarningsFlag::Default => WarningMode::Default,
            WarningsFlag::Suppress => WarningMode::Suppress,
            WarningsFlag::Error => WarningMode::TreatAsErrors,
        }
    }
}

/// Run the compiler; returns the process exit code.
pub fn run() -> i32 {
    let cli = <Cli as clap::Parser>::parse();
    match run_compiler(cli) {
        Ok(()) => 0,
        Err(code) => code,
    }
}

fn run_compiler(cli: Cli) -> Result<(), i32> {
    let mut options = CompileOptions {
        defines: cli.defines.clone(),
        import_search_paths: cli.import_search_paths.clone(),
        warning_mode: cli.warnings.into(),
    };
    options.import_search_paths.push(PathBuf::from("."));
    for input in &cli.inputs {
        if let Some(parent) = input.parent().filter(|p| !p.as_os_str().is_empty()) {
            options.import_search_paths.push(parent.to_path_buf());
        }
    }

    let mut map = SourceMap::new();
    let mut module = Module::new();

    for input in &cli.inputs {
        match parser::parse_file(input, &options, &mut map) {
            Ok((file, warnings)) => {
                for warning in &warnings {
                    render_diagnostic(&map, warning);
                }
                module.add_source_file(file);
            }
            Err(err) => {
                render_error(&map, &err);
                return Err(1);
            }
        }
    }

    if cli.print_ast {
        println!("{module:#?}");
        return Ok(());
    }
    if cli.parse {
        return Ok(());
    }

    let mut header_importer = HeaderSearchImporter;
    let mut checker = Typechecker::new(&options).with_header_importer(&mut header_importer);
    let result = checker.check_module(&module);
    for warning in checker.take_warnings() {
        render_diagnostic(&map, &warning);
    }
    if let Err(err) = result {
        render_error(&map, &err);
        return Err(1);
    }

    if cli.typecheck {
        return Ok(());
    }

    // The checked module is handed to the external code generation backend
    // from here; this front end's work is done.
    tracing::debug!("front end finished; code generation is external");
    Ok(())
}

// ============================================================================
// Diagnostic rendering
// ============================================================================

fn render_error(map: &SourceMap, error: &CompileError) {
    print_diagnostic(map, "error", RED, &error.message, error.location);
    for note in &error.notes {
        print_diagnostic(map, "note", CYAN, &note.message, note.location);
    }
}

fn render_diagnostic(map: &SourceMap, diagnostic: &Diagnostic) {
    let (label, color) = match diagnostic.severity {
        Severity::Warning => ("warning", YELLOW),
        Severity::Note => ("note", CYAN),
    };
    print_diagnostic(map, label, color, &diagnostic.message, Some(diagnostic.location));
}

/// `file:line:column: severity: message`, followed by the source line with a
/// caret under the offending column.
fn print_diagnostic(
    map: &SourceMap,
    label: &str,
    color: &str,
    message: &str,
    location: Option<SourceLocation>,
) {
    match location {
        Some(location) => {
            eprintln!(
                "{BOLD}{}:{}:{}: {color}{label}:{RESET}{BOLD} {message}{RESET}",
                map.path(location.file).display(),
                location.line,
                location.column,
            );
            if let Some(line) = map.line_text(location.file, location.line) {
                eprintln!("{line}");
                let mut caret_pad = String::new();
                for ch in line.chars().take(location.column.saturating_sub(1) as usize) {
                    // Keep tabs so the caret lines up under tab-indented code.
                    caret_pad.push(if ch == '\t' { '\t' } else { ' ' });
                }
                eprintln!("{caret_pad}{color}^{RESET}");
            }
        }
        None => {
            eprintln!("{color}{label}:{RESET}{BOLD} {message}{RESET}");
        }
    }
}
