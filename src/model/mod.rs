//! The code model: the canonical data shape every parser emits and every
//! consumer indexes against.
//!
//! Ownership is strictly hierarchical — `CodeBase` owns `CodeFile`s, a
//! `CodeFile` owns its elements, and a class owns its methods and
//! attributes. Cross-element references never hold a direct handle; they
//! carry a `unique_id` string resolved through `CodeBase`'s cached map,
//! which keeps reference cycles representable without ownership cycles.

mod codebase;
mod element;
mod file;

pub use codebase::{CodeBase, ElementHandle, TreeViewOptions};
pub use element::{
    ClassAttribute, ClassDefinition, CodeElement, CodeReference, Element, ElementKind,
    FunctionDefinition, FunctionSignature, ImportStatement, ImportType, MethodDefinition,
    Parameter, ReferenceType, VariableDeclaration, Visibility,
};
pub use file::CodeFile;

/// Fold CRLF/CR into LF so `raw` text is newline-normalized.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Forward-slash-normalize a path and strip any leading `./`.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced.strip_prefix("./").unwrap_or(&replaced).to_string()
}

/// Strip a file's extension and replace remaining path separators with
/// dots, giving the module-path prefix used to compute default unique ids
/// (`<file_path_without_extension_with_dots>`).
pub fn file_path_to_module_path(file_path: &str) -> String {
    let normalized = normalize_path(file_path);
    let without_ext = match normalized.rfind('.') {
        // Only strip if the dot is in the final path segment (an extension,
        // not a directory name containing a dot).
        Some(idx) if !normalized[idx..].contains('/') => &normalized[..idx],
        _ => normalized.as_str(),
    };
    without_ext.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_lone_cr() {
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_newlines("no newlines"), "no newlines");
    }

    #[test]
    fn module_path_strips_extension_and_dots_separators() {
        assert_eq!(file_path_to_module_path("pkg/a.py"), "pkg.a");
        assert_eq!(file_path_to_module_path("pkg/__init__.py"), "pkg.__init__");
        assert_eq!(file_path_to_module_path("./pkg/a.py"), "pkg.a");
        assert_eq!(file_path_to_module_path("src\\a.rs"), "src.a");
    }
}
