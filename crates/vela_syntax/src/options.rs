//! Compilation options supplied by the driver.

use std::path::PathBuf;

use crate::diagnostics::WarningMode;

/// Configuration bundle passed from the driver into the front end.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Flags defined for `#if` conditional compilation.
    pub defines: Vec<String>,
    /// Search paths consulted by `hasInclude(...)` and the header importer.
    pub import_search_paths: Vec<PathBuf>,
    /// Policy for structural warnings.
    pub warning_mode: WarningMode,
}

impl CompileOptions {
    /// True if `flag` was defined on the command line.
    pub fn is_defined(&self, flag: &str) -> bool {
        self.defines.iter().any(|d| d == flag)
    }

    /// True if `relative_path` names a regular file under any search path.
    pub fn has_include(&self, relative_path: &str) -> bool {
        self.import_search_paths
            .iter()
            .any(|dir| dir.join(relative_path).is_file())
    }
}
