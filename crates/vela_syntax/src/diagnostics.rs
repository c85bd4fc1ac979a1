//! Structured diagnostics for the Vela front end.
//!
//! Errors are fatal: the first [`CompileError`] terminates the compilation
//! run. Warnings accumulate as [`Diagnostic`] records and never halt the
//! pipeline unless the configured [`WarningMode`] escalates them. Rendering
//! (colors, caret lines) is the driver's concern; this module only defines
//! the structured records.

use crate::location::SourceLocation;
use thiserror::Error;

/// Category of a fatal compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file could not be opened or read.
    Io,
    /// Malformed literal, unknown character, unterminated string.
    Lex,
    /// Unexpected or missing token.
    Parse,
    /// Unknown name, redefinition, ambiguous lookup.
    NameResolution,
    /// Wrong generic argument count.
    Arity,
    /// Interface requirement unmet.
    Conformance,
    /// Initializer/assignment type mismatch.
    Conversion,
    /// Missing return on some control path.
    ControlFlow,
    /// Import target not found as a module or foreign header.
    UnresolvedImport,
    /// A structural warning escalated to an error by policy.
    Structural,
}

/// An explanatory note attached to an error, usually at another location.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// A fatal compile error with location information.
///
/// Exactly one of these terminates a compilation run; it may carry notes
/// pointing at other locations (for example, the interface requirement a
/// conformance check failed against).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub notes: Vec<Note>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Some(location),
            notes: Vec::new(),
        }
    }

    /// An I/O failure with no source location.
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            message: message.into(),
            location: None,
            notes: Vec::new(),
        }
    }

    pub fn lex(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Lex, message, location)
    }

    pub fn parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Parse, message, location)
    }

    pub fn name_resolution(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::NameResolution, message, location)
    }

    pub fn arity(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Arity, message, location)
    }

    pub fn conformance(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Conformance, message, location)
    }

    pub fn conversion(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Conversion, message, location)
    }

    pub fn control_flow(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::ControlFlow, message, location)
    }

    pub fn unresolved_import(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::UnresolvedImport, message, location)
    }

    pub fn with_note(mut self, message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        self.notes.push(Note {
            message: message.into(),
            location,
        });
        self
    }
}

/// Severity of a non-fatal diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Note,
}

/// A non-fatal diagnostic produced while compiling.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }
}

/// How structural warnings are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningMode {
    /// Record the warning; the run continues.
    #[default]
    Default,
    /// Drop the warning entirely.
    Suppress,
    /// Promote the warning to a fatal error.
    TreatAsErrors,
}

/// Route a structural warning according to policy.
///
/// Returns `Err` only when the mode escalates warnings to errors.
pub fn report_warning(
    mode: WarningMode,
    sink: &mut Vec<Diagnostic>,
    message: String,
    location: SourceLocation,
) -> Result<(), CompileError> {
    match mode {
        WarningMode::Default => {
            sink.push(Diagnostic::warning(message, location));
            Ok(())
        }
        WarningMode::Suppress => Ok(()),
        WarningMode::TreatAsErrors => Err(CompileError::new(ErrorKind::Structural, message, location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FileId;

    fn loc() -> SourceLocation {
        SourceLocation::new(FileId(0), 1, 1)
    }

    #[test]
    fn warning_modes() {
        let mut sink = Vec::new();

        report_warning(WarningMode::Default, &mut sink, "styles differ".into(), loc()).unwrap();
        assert_eq!(sink.len(), 1);

        report_warning(WarningMode::Suppress, &mut sink, "styles differ".into(), loc()).unwrap();
        assert_eq!(sink.len(), 1, "suppressed warnings are dropped");

        let err = report_warning(WarningMode::TreatAsErrors, &mut sink, "styles differ".into(), loc())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structural);
    }

    #[test]
    fn notes_attach_to_errors() {
        let err = CompileError::conformance("'Point' doesn't satisfy 'Comparable'", loc())
            .with_note("requirement declared here", Some(loc()));
        assert_eq!(err.notes.len(), 1);
    }
}
