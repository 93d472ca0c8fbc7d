//! Element variants of the code model.
//!
//! Every variant shares a base shape (`file_path`, `name`, an optional
//! `stored_unique_id` override, `raw` source text, and an ordered
//! `references` list) but carries its own extra fields. Rather than a
//! single struct with optional fields for every variant, each kind gets
//! its own struct and the base behaviour lives behind the [`Element`]
//! trait — the same "tagged-variant sum type" shape the design notes call
//! for, with container-specific methods (attributes on classes, signature
//! on functions) living on the concrete type, not the trait.

use serde::{Deserialize, Serialize};

use super::file_path_to_module_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Import,
    Variable,
    Function,
    Class,
    Method,
    Inheritance,
}

/// A reference from one element to another, by target `unique_id`.
/// `unique_id` is `None` until resolution attaches a target; references
/// between elements are weak, never owning handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReference {
    pub unique_id: Option<String>,
    pub name: String,
    pub reference_type: ReferenceType,
}

impl CodeReference {
    pub fn new(name: impl Into<String>, reference_type: ReferenceType) -> Self {
        Self {
            unique_id: None,
            name: name.into(),
            reference_type,
        }
    }

    pub fn with_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportType {
    Absolute,
    Relative,
    SideEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Common interface exposed by every element variant. Container-specific
/// behaviour (a class's attributes, a function's signature) is not part
/// of this trait — callers downcast via the [`CodeElement`] enum instead.
pub trait Element {
    fn file_path(&self) -> &str;
    fn name(&self) -> &str;
    fn raw(&self) -> &str;
    fn references(&self) -> &[CodeReference];
    fn references_mut(&mut self) -> &mut Vec<CodeReference>;
    fn stored_unique_id(&self) -> Option<&str>;
    /// The element's unique id: the stored override if present, else the
    /// computed default for this variant.
    fn unique_id(&self) -> String;
}

fn default_toplevel_id(file_path: &str, name: &str) -> String {
    format!("{}.{}", file_path_to_module_path(file_path), name)
}

// ---------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatement {
    pub file_path: String,
    /// Local name this import binds, if any (`from pkg import x` -> `x`;
    /// `import pkg` -> `None`, with `source` carrying the module path).
    pub name: Option<String>,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub source: String,
    pub alias: Option<String>,
    pub import_type: ImportType,
    /// Resolved target id, filled in by the dependency resolver.
    pub definition_id: Option<String>,
}

impl ImportStatement {
    pub fn new(file_path: impl Into<String>, source: impl Into<String>, import_type: ImportType) -> Self {
        Self {
            file_path: file_path.into(),
            name: None,
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            source: source.into(),
            alias: None,
            import_type,
            definition_id: None,
        }
    }

    /// The name the import is referenced by in source code: alias, else
    /// name, else the raw source path.
    pub fn as_dependency(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.source)
    }

    /// `<source>.<name>`, or bare `<source>` for side-effect/name-less
    /// imports, with index/init path segments compressed to their
    /// directory.
    pub fn default_target_id(&self, index_filenames: &[&str]) -> String {
        let source = compress_index_path(&self.source, index_filenames);
        match &self.name {
            Some(name) => format!("{source}.{name}"),
            None => source,
        }
    }
}

impl Element for ImportStatement {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.as_dependency())
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| self.default_target_id(&[]))
    }
}

/// Strip a trailing index/init segment so `pkg/components/index` and
/// `pkg.components.__init__` both resolve to `pkg/components` /
/// `pkg.components`.
pub fn compress_index_path(source: &str, index_filenames: &[&str]) -> String {
    let sep = if source.contains('/') { '/' } else { '.' };
    let mut segments: Vec<&str> = source.split(sep).collect();
    if let Some(last) = segments.last() {
        if index_filenames.contains(last) {
            segments.pop();
        }
    }
    segments.join(&sep.to_string())
}

// ---------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub file_path: String,
    pub name: String,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub type_hint: Option<String>,
    pub value: Option<String>,
    pub modifiers: Vec<String>,
}

impl VariableDeclaration {
    pub fn new(file_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            type_hint: None,
            value: None,
            modifiers: Vec::new(),
        }
    }
}

impl Element for VariableDeclaration {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| default_toplevel_id(&self.file_path, &self.name))
    }
}

// ---------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub default_value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default_value: None,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default_value.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub file_path: String,
    pub name: String,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub signature: Option<FunctionSignature>,
    pub modifiers: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
}

impl FunctionDefinition {
    pub fn new(file_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            signature: None,
            modifiers: Vec::new(),
            decorators: Vec::new(),
            docstring: None,
        }
    }
}

impl Element for FunctionDefinition {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| default_toplevel_id(&self.file_path, &self.name))
    }
}

// ---------------------------------------------------------------------
// Class members: methods and attributes
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub file_path: String,
    pub name: String,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub signature: Option<FunctionSignature>,
    pub modifiers: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    /// The owning class's unique id. Set (and any prior id discarded)
    /// whenever the method is attached to a class.
    pub class_id: String,
}

impl MethodDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            file_path: String::new(),
            name: name.into(),
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            signature: None,
            modifiers: Vec::new(),
            decorators: Vec::new(),
            docstring: None,
            class_id: String::new(),
        }
    }
}

impl Element for MethodDefinition {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.class_id, self.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAttribute {
    pub file_path: String,
    pub name: String,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub type_hint: Option<String>,
    pub value: Option<String>,
    pub modifiers: Vec<String>,
    pub visibility: Visibility,
    pub class_id: String,
}

impl ClassAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            file_path: String::new(),
            name: name.into(),
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            type_hint: None,
            value: None,
            modifiers: Vec::new(),
            visibility: Visibility::Public,
            class_id: String::new(),
        }
    }
}

impl Element for ClassAttribute {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.class_id, self.name))
    }
}

// ---------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub file_path: String,
    pub name: String,
    pub stored_unique_id: Option<String>,
    pub raw: String,
    pub references: Vec<CodeReference>,
    pub bases: Vec<String>,
    pub bases_references: Vec<CodeReference>,
    pub attributes: Vec<ClassAttribute>,
    pub methods: Vec<MethodDefinition>,
}

impl ClassDefinition {
    pub fn new(file_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            stored_unique_id: None,
            raw: String::new(),
            references: Vec::new(),
            bases: Vec::new(),
            bases_references: Vec::new(),
            attributes: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn own_unique_id(&self) -> String {
        self.stored_unique_id
            .clone()
            .unwrap_or_else(|| default_toplevel_id(&self.file_path, &self.name))
    }

    /// Attach a method to this class, overwriting its `file_path`,
    /// `class_id`, and discarding any previously stored id.
    pub fn add_method(&mut self, mut method: MethodDefinition) {
        method.file_path = self.file_path.clone();
        method.class_id = self.own_unique_id();
        method.stored_unique_id = None;
        self.methods.push(method);
    }

    /// Attach an attribute to this class, same overwrite rule as methods.
    pub fn add_attribute(&mut self, mut attribute: ClassAttribute) {
        attribute.file_path = self.file_path.clone();
        attribute.class_id = self.own_unique_id();
        attribute.stored_unique_id = None;
        self.attributes.push(attribute);
    }

    /// The computed union of the class's own references, its members'
    /// references, and its base-class references. This is always derived;
    /// callers never mutate it directly.
    pub fn computed_references(&self) -> Vec<CodeReference> {
        let mut all = self.references.clone();
        all.extend(self.bases_references.iter().cloned());
        for attribute in &self.attributes {
            all.extend(attribute.references.iter().cloned());
        }
        for method in &self.methods {
            all.extend(method.references.iter().cloned());
        }
        all
    }
}

impl Element for ClassDefinition {
    fn file_path(&self) -> &str {
        &self.file_path
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn raw(&self) -> &str {
        &self.raw
    }
    fn references(&self) -> &[CodeReference] {
        &self.references
    }
    fn references_mut(&mut self) -> &mut Vec<CodeReference> {
        &mut self.references
    }
    fn stored_unique_id(&self) -> Option<&str> {
        self.stored_unique_id.as_deref()
    }
    fn unique_id(&self) -> String {
        self.own_unique_id()
    }
}

// ---------------------------------------------------------------------
// Tagged-variant sum type over every element kind
// ---------------------------------------------------------------------

/// A handle-free, owned view over any single element kind. Used where
/// code needs to treat elements uniformly (caches, context bundles)
/// without cloning the element itself; see [`super::CodeBase`] for the
/// borrowing counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Import,
    Variable,
    Function,
    Class,
    Method,
    Attribute,
}

/// Enum wrapper used by call sites that need to pattern-match across
/// variants while borrowing from a [`super::CodeFile`] (e.g. rendering).
pub enum CodeElement<'a> {
    Import(&'a ImportStatement),
    Variable(&'a VariableDeclaration),
    Function(&'a FunctionDefinition),
    Class(&'a ClassDefinition),
    Method(&'a MethodDefinition),
    Attribute(&'a ClassAttribute),
}

impl<'a> CodeElement<'a> {
    pub fn unique_id(&self) -> String {
        match self {
            CodeElement::Import(e) => e.unique_id(),
            CodeElement::Variable(e) => e.unique_id(),
            CodeElement::Function(e) => e.unique_id(),
            CodeElement::Class(e) => e.unique_id(),
            CodeElement::Method(e) => e.unique_id(),
            CodeElement::Attribute(e) => e.unique_id(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            CodeElement::Import(e) => e.name(),
            CodeElement::Variable(e) => e.name(),
            CodeElement::Function(e) => e.name(),
            CodeElement::Class(e) => e.name(),
            CodeElement::Method(e) => e.name(),
            CodeElement::Attribute(e) => e.name(),
        }
    }

    pub fn raw(&self) -> &'a str {
        match self {
            CodeElement::Import(e) => e.raw(),
            CodeElement::Variable(e) => e.raw(),
            CodeElement::Function(e) => e.raw(),
            CodeElement::Class(e) => e.raw(),
            CodeElement::Method(e) => e.raw(),
            CodeElement::Attribute(e) => e.raw(),
        }
    }

    pub fn file_path(&self) -> &'a str {
        match self {
            CodeElement::Import(e) => e.file_path(),
            CodeElement::Variable(e) => e.file_path(),
            CodeElement::Function(e) => e.file_path(),
            CodeElement::Class(e) => e.file_path(),
            CodeElement::Method(e) => e.file_path(),
            CodeElement::Attribute(e) => e.file_path(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            CodeElement::Import(_) => ElementKind::Import,
            CodeElement::Variable(_) => ElementKind::Variable,
            CodeElement::Function(_) => ElementKind::Function,
            CodeElement::Class(_) => ElementKind::Class,
            CodeElement::Method(_) => ElementKind::Method,
            CodeElement::Attribute(_) => ElementKind::Attribute,
        }
    }
}
