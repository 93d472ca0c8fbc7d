//! `CodeFile`: one parsed source file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::element::{ClassDefinition, CodeElement, FunctionDefinition, ImportStatement, VariableDeclaration};
use super::normalize_newlines;

/// A reference to a top-level element within a [`CodeFile`], recording
/// the order elements appeared in the source (element order in
/// `CodeFile` always matches source order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementRef {
    Import(usize),
    Variable(usize),
    Function(usize),
    Class(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFile {
    pub file_path: String,
    pub imports: Vec<ImportStatement>,
    pub variables: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub classes: Vec<ClassDefinition>,
    pub raw: String,
    /// Source-appearance order of top-level elements, recorded as they
    /// were pushed during parsing.
    pub layout: Vec<ElementRef>,
    /// SHA-256 over `raw`'s bytes, used by persistence to detect
    /// staleness without re-parsing. Not part of the data model's public
    /// identifier scheme.
    pub content_hash: [u8; 32],
}

impl CodeFile {
    pub fn new(file_path: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = normalize_newlines(&raw.into());
        let content_hash = hash_content(&raw);
        Self {
            file_path: file_path.into(),
            imports: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            raw,
            layout: Vec::new(),
            content_hash,
        }
    }

    pub fn push_import(&mut self, import: ImportStatement) {
        self.imports.push(import);
        self.layout.push(ElementRef::Import(self.imports.len() - 1));
    }

    pub fn push_variable(&mut self, variable: VariableDeclaration) {
        self.variables.push(variable);
        self.layout.push(ElementRef::Variable(self.variables.len() - 1));
    }

    pub fn push_function(&mut self, function: FunctionDefinition) {
        self.functions.push(function);
        self.layout.push(ElementRef::Function(self.functions.len() - 1));
    }

    pub fn push_class(&mut self, class: ClassDefinition) {
        self.classes.push(class);
        self.layout.push(ElementRef::Class(self.classes.len() - 1));
    }

    /// Recompute `content_hash` from the current `raw` text. Used by
    /// persistence after a file is reparsed in-place.
    pub fn refresh_content_hash(&mut self) {
        self.content_hash = hash_content(&self.raw);
    }

    /// Top-level elements (not class members) in source order.
    pub fn top_level_elements(&self) -> impl Iterator<Item = CodeElement<'_>> {
        self.layout.iter().map(move |r| match r {
            ElementRef::Import(i) => CodeElement::Import(&self.imports[*i]),
            ElementRef::Variable(i) => CodeElement::Variable(&self.variables[*i]),
            ElementRef::Function(i) => CodeElement::Function(&self.functions[*i]),
            ElementRef::Class(i) => CodeElement::Class(&self.classes[*i]),
        })
    }

    /// Non-import top-level elements in source order — the candidate
    /// pool for intra-file reference counting.
    pub fn non_import_elements(&self) -> impl Iterator<Item = CodeElement<'_>> {
        self.top_level_elements()
            .filter(|e| !matches!(e, CodeElement::Import(_)))
    }

    /// The file's cached id list: the union of import ids, class ids,
    /// method ids, attribute ids, function ids, variable ids, in that
    /// order.
    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for import in &self.imports {
            ids.push(crate::model::Element::unique_id(import));
        }
        for class in &self.classes {
            ids.push(crate::model::Element::unique_id(class));
        }
        for class in &self.classes {
            for method in &class.methods {
                ids.push(crate::model::Element::unique_id(method));
            }
        }
        for class in &self.classes {
            for attribute in &class.attributes {
                ids.push(crate::model::Element::unique_id(attribute));
            }
        }
        for function in &self.functions {
            ids.push(crate::model::Element::unique_id(function));
        }
        for variable in &self.variables {
            ids.push(crate::model::Element::unique_id(variable));
        }
        ids
    }
}

fn hash_content(raw: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImportType};

    #[test]
    fn layout_preserves_push_order_across_kinds() {
        let mut file = CodeFile::new("pkg/a.py", "");
        file.push_import(ImportStatement::new("pkg/a.py", "os", ImportType::Absolute));
        file.push_function(FunctionDefinition::new("pkg/a.py", "f"));
        file.push_class(ClassDefinition::new("pkg/a.py", "A"));
        file.push_variable(VariableDeclaration::new("pkg/a.py", "x"));

        let names: Vec<&str> = file.top_level_elements().map(|e| e.name()).collect();
        assert_eq!(names, vec!["os", "f", "A", "x"]);
    }

    #[test]
    fn cached_ids_follow_push_order() {
        let mut file = CodeFile::new("pkg/a.py", "");
        file.push_variable(VariableDeclaration::new("pkg/a.py", "x"));
        file.push_function(FunctionDefinition::new("pkg/a.py", "f"));
        file.push_import(ImportStatement::new("pkg/a.py", "os", ImportType::Absolute));
        let mut class = ClassDefinition::new("pkg/a.py", "A");
        class.add_method(crate::model::MethodDefinition::new("m"));
        class.add_attribute(crate::model::ClassAttribute::new("attr"));
        file.push_class(class);

        let ids = file.cached_ids();
        assert_eq!(
            ids,
            vec!["pkg.a.os", "pkg.a.A", "pkg.a.A.m", "pkg.a.A.attr", "pkg.a.f", "pkg.a.x"]
        );
    }

    #[test]
    fn content_hash_changes_with_raw() {
        let a = CodeFile::new("pkg/a.py", "x = 1\n");
        let b = CodeFile::new("pkg/a.py", "x = 2\n");
        assert_ne!(a.content_hash, b.content_hash);
    }
}
