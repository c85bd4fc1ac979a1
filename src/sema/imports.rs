//! Import resolution collaborators.
//!
//! An `import` target is resolved first as a Vela module, then as a foreign
//! header; both resolvers are external collaborators behind traits. The
//! checker only cares about resolved-vs-not-found; merging the target's
//! declarations into the symbol table is the collaborator's business.

use vela_syntax::options::CompileOptions;

/// Result of asking a collaborator to resolve an import target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Resolved,
    NotFound,
}

/// Resolves `import foo` against the package's own modules.
pub trait ModuleImporter {
    fn import_module(&mut self, target: &str) -> ImportOutcome;
}

/// Fallback resolver for foreign (C) headers, consulted when module import
/// fails.
pub trait HeaderImporter {
    fn import_header(&mut self, target: &str, options: &CompileOptions) -> ImportOutcome;
}

/// Importer that resolves nothing. Useful for tests and single-module runs.
#[derive(Debug, Default)]
pub struct NoImports;

impl ModuleImporter for NoImports {
    fn import_module(&mut self, _target: &str) -> ImportOutcome {
        ImportOutcome::NotFound
    }
}

impl HeaderImporter for NoImports {
    fn import_header(&mut self, _target: &str, _options: &CompileOptions) -> ImportOutcome {
        ImportOutcome::NotFound
    }
}

/// Header importer that accepts a target when it names a regular file under
/// any configured search path. Declaration import itself happens in the
/// external foreign-interface layer; the front end only needs existence.
#[derive(Debug, Default)]
pub struct HeaderSearchImporter;

impl HeaderImporter for HeaderSearchImporter {
    fn import_header(&mut self, target: &str, options: &CompileOptions) -> ImportOutcome {
        if options.has_include(target) {
            ImportOutcome::Resolved
        } else {
            ImportOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_imports_resolves_nothing() {
        let options = CompileOptions::default();
        assert_eq!(NoImports.import_module("math"), ImportOutcome::NotFound);
        assert_eq!(NoImports.import_header("stdio.h", &options), ImportOutcome::NotFound);
    }

    #[test]
    fn header_search_consults_search_paths() {
        let dir = std::env::temp_dir().join("vela_header_search_test");
        std::fs::create_dir_all(&dir).unwrap();
        let header = dir.join("present.h");
        std::fs::write(&header, "// header\n").unwrap();

        let options = CompileOptions {
            import_search_paths: vec![dir.clone()],
            ..Default::default()
        };
        assert_eq!(
            HeaderSearchImporter.import_header("present.h", &options),
            ImportOutcome::Resolved
        );
        assert_eq!(
            HeaderSearchImporter.import_header("absent.h", &options),
            ImportOutcome::NotFound
        );

        std::fs::remove_file(header).ok();
    }
}
