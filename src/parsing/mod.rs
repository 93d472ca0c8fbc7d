//! Language detection and the `LanguageParser` contract.

mod language;
mod python;
mod registry;
mod stub;

pub use language::{is_binary_extension, Language, ALL};
pub use registry::ParserRegistry;

use crate::error::ParseError;
use crate::model::CodeFile;

/// How a language's imports are spelled, consumed by the codebase-wide
/// import resolution phase of the dependency resolver so it stays
/// language-agnostic across re-exports through package index files and
/// relative imports with leading dots.
#[derive(Debug, Clone)]
pub struct ImportPathConvention {
    /// Filenames that act as a package's index/init module, compressed
    /// to their containing directory when computing a default target id.
    pub index_filenames: Vec<&'static str>,
    /// Whether this language spells relative imports with leading dots
    /// (`from . import x`, `from ..pkg import y`).
    pub uses_leading_dots: bool,
}

impl Default for ImportPathConvention {
    fn default() -> Self {
        Self {
            index_filenames: Vec::new(),
            uses_leading_dots: false,
        }
    }
}

/// Common interface every language parser implements.
///
/// `resolve_inter_files_dependencies` is deliberately absent from this
/// trait: re-export chain following and index/init compression operate
/// over the whole codebase and are language-agnostic given a parser's
/// `import_path_convention()`, so that phase lives once in
/// [`crate::resolver`] rather than being duplicated per language.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    /// Parse one file's bytes into a `CodeFile`. Implementations must
    /// preserve `raw` for every element byte-for-byte, including leading
    /// indentation when the element's first column is non-zero.
    fn parse_file(&self, file_path: &str, source: &str) -> Result<CodeFile, ParseError>;

    /// Attach intra-file `CodeReference`s to every non-import element.
    /// The default implementation delegates to the shared word-boundary
    /// counting algorithm in [`crate::resolver`] since this step has no
    /// language-specific component beyond the candidate name set already
    /// captured in the parsed `CodeFile`.
    fn resolve_intra_file_dependencies(&self, file: &mut CodeFile) {
        crate::resolver::resolve_intra_file(file);
    }

    fn import_path_convention(&self) -> ImportPathConvention {
        ImportPathConvention::default()
    }
}
