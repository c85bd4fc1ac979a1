//! Source locations and the per-run source map.
//!
//! Every token, AST node, and diagnostic carries a [`SourceLocation`]. The
//! [`SourceMap`] owns the path and contents of every file read during a
//! compilation run so diagnostics can be rendered with source context.

use std::path::{Path, PathBuf};

/// Identifier of a source file registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

/// A position in a source file.
///
/// Lines are 1-based. Columns count from 0 at the start of a line, so the
/// first character of a line sits at column 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// The location one column to the right.
    ///
    /// Used when a `>>` token is split into two `>` tokens while parsing
    /// nested generic argument lists.
    pub fn next_column(self) -> Self {
        Self {
            column: self.column + 1,
            ..self
        }
    }
}

#[derive(Debug)]
struct SourceEntry {
    path: PathBuf,
    source: String,
}

/// Paths and contents of every file seen during a compilation run.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceEntry>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add(&mut self, path: impl Into<PathBuf>, source: String) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceEntry {
            path: path.into(),
            source,
        });
        id
    }

    pub fn path(&self, id: FileId) -> &Path {
        &self.files[id.0 as usize].path
    }

    pub fn source(&self, id: FileId) -> &str {
        &self.files[id.0 as usize].source
    }

    /// The text of the given 1-based line, without its terminator.
    pub fn line_text(&self, id: FileId, line: u32) -> Option<&str> {
        self.source(id)
            .lines()
            .nth(line.checked_sub(1)? as usize)
    }
}
