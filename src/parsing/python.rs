//! The Python reference parser.
//!
//! This is the one fully-implemented `LanguageParser`; every other
//! supported language gets the structural stub in [`super::stub`]. Uses
//! `tree-sitter` + `tree-sitter-python` to build a concrete syntax tree
//! and walks it directly — no intermediate AST layer, matching the
//! teacher's `RustParser` idiom of working straight off `tree_sitter::Node`.

use std::sync::Mutex;

use tree_sitter::{Node, Parser};

use super::{ImportPathConvention, Language, LanguageParser};
use crate::error::ParseError;
use crate::model::{
    ClassAttribute, ClassDefinition, CodeFile, FunctionDefinition, FunctionSignature,
    ImportStatement, ImportType, MethodDefinition, Parameter, VariableDeclaration, Visibility,
};

pub struct PythonParser {
    parser: Mutex<Parser>,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParseError::Grammar {
                path: std::path::PathBuf::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { parser: Mutex::new(parser) })
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse_file(&self, file_path: &str, source: &str) -> Result<CodeFile, ParseError> {
        let tree = {
            let mut parser = self.parser.lock().unwrap_or_else(|e| e.into_inner());
            parser.parse(source, None).ok_or_else(|| {
                ParseError::SyntaxTreeUnavailable(std::path::PathBuf::from(file_path))
            })?
        };

        let mut file = CodeFile::new(file_path, source);
        // `file.raw` is newline-normalized; the tree was parsed against
        // the original `source`, so byte ranges from the tree must be
        // read back out of `source`, not `file.raw`.
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            walk_top_level(&mut file, child, source, file_path, &[]);
        }
        Ok(file)
    }

    fn import_path_convention(&self) -> ImportPathConvention {
        ImportPathConvention {
            index_filenames: vec!["__init__"],
            uses_leading_dots: true,
        }
    }
}

/// Slice `source` for `node`, extending the start backward over leading
/// whitespace on its line so indentation is preserved in `raw`
/// byte-for-byte, including original indentation where the element's
/// first column is non-zero.
fn raw_text(source: &str, node: Node) -> String {
    let bytes = source.as_bytes();
    let mut start = node.start_byte();
    while start > 0 {
        let c = bytes[start - 1];
        if c == b' ' || c == b'\t' {
            start -= 1;
        } else {
            break;
        }
    }
    crate::model::normalize_newlines(&source[start..node.end_byte()])
}

fn node_text<'a>(source: &'a str, node: Node) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn walk_top_level(
    file: &mut CodeFile,
    node: Node,
    source: &str,
    file_path: &str,
    decorators: &[String],
) {
    match node.kind() {
        "import_statement" => {
            for import in extract_import_statement(node, source, file_path) {
                file.push_import(import);
            }
        }
        "import_from_statement" => {
            for import in extract_import_from_statement(node, source, file_path) {
                file.push_import(import);
            }
        }
        "decorated_definition" => {
            let mut decs = Vec::new();
            let mut cursor = node.walk();
            let mut inner = None;
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "decorator" => decs.push(decorator_text(child, source)),
                    "function_definition" | "class_definition" => inner = Some(child),
                    _ => {}
                }
            }
            if let Some(inner) = inner {
                walk_top_level_with_wrapper(file, inner, node, source, file_path, &decs);
            }
        }
        "function_definition" => {
            let function = extract_function(node, node, source, file_path, decorators);
            file.push_function(function);
        }
        "class_definition" => {
            let class = extract_class(node, node, source, file_path);
            file.push_class(class);
        }
        "expression_statement" => {
            if let Some(assignment) = find_child_kind(node, "assignment") {
                if let Some(variable) = extract_variable(assignment, node, source, file_path) {
                    file.push_variable(variable);
                }
            }
        }
        _ => {}
    }
}

/// Like `walk_top_level` but the element's `raw` must span the outer
/// `decorated_definition` node (decorators included), not just the
/// inner function/class node.
fn walk_top_level_with_wrapper(
    file: &mut CodeFile,
    inner: Node,
    wrapper: Node,
    source: &str,
    file_path: &str,
    decorators: &[String],
) {
    match inner.kind() {
        "function_definition" => {
            let function = extract_function(inner, wrapper, source, file_path, decorators);
            file.push_function(function);
        }
        "class_definition" => {
            let mut class = extract_class(inner, wrapper, source, file_path);
            class.raw = raw_text(source, wrapper);
            file.push_class(class);
        }
        _ => {}
    }
}

fn decorator_text(node: Node, source: &str) -> String {
    // Skip the leading '@'.
    node_text(source, node).trim_start_matches('@').trim().to_string()
}

fn find_child_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

// ---------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------

fn extract_import_statement(node: Node, source: &str, file_path: &str) -> Vec<ImportStatement> {
    let mut out = Vec::new();
    let raw = raw_text(source, node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let dotted = node_text(source, child).to_string();
                let mut import = ImportStatement::new(file_path, dotted, ImportType::Absolute);
                import.raw = raw.clone();
                out.push(import);
            }
            "aliased_import" => {
                if let (Some(name_node), Some(alias_node)) =
                    (child.child_by_field_name("name"), child.child_by_field_name("alias"))
                {
                    let dotted = node_text(source, name_node).to_string();
                    let mut import = ImportStatement::new(file_path, dotted, ImportType::Absolute);
                    import.alias = Some(node_text(source, alias_node).to_string());
                    import.raw = raw.clone();
                    out.push(import);
                }
            }
            _ => {}
        }
    }
    out
}

fn extract_import_from_statement(node: Node, source: &str, file_path: &str) -> Vec<ImportStatement> {
    let mut out = Vec::new();
    let raw = raw_text(source, node);

    let module_node = node
        .child_by_field_name("module_name")
        .or_else(|| find_child_kind(node, "dotted_name"))
        .or_else(|| find_child_kind(node, "relative_import"));

    let (source_path, import_type, leading_dots) = match module_node {
        Some(n) if n.kind() == "relative_import" => {
            let text = node_text(source, n);
            let dots = text.chars().take_while(|c| *c == '.').count();
            let rest = text.trim_start_matches('.').to_string();
            (rest, ImportType::Relative, dots)
        }
        Some(n) => (node_text(source, n).to_string(), ImportType::Absolute, 0),
        None => (String::new(), ImportType::Absolute, 0),
    };

    let mut saw_name = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" if Some(child) != module_node => {
                saw_name = true;
                let name = node_text(source, child).to_string();
                let mut import =
                    ImportStatement::new(file_path, prefix_dots(&source_path, leading_dots), import_type);
                import.name = Some(name);
                import.raw = raw.clone();
                out.push(import);
            }
            "aliased_import" => {
                saw_name = true;
                if let (Some(name_node), Some(alias_node)) =
                    (child.child_by_field_name("name"), child.child_by_field_name("alias"))
                {
                    let name = node_text(source, name_node).to_string();
                    let mut import = ImportStatement::new(
                        file_path,
                        prefix_dots(&source_path, leading_dots),
                        import_type,
                    );
                    import.name = Some(name);
                    import.alias = Some(node_text(source, alias_node).to_string());
                    import.raw = raw.clone();
                    out.push(import);
                }
            }
            "wildcard_import" => {
                saw_name = true;
                let mut import =
                    ImportStatement::new(file_path, prefix_dots(&source_path, leading_dots), import_type);
                import.name = Some("*".to_string());
                import.raw = raw.clone();
                out.push(import);
            }
            _ => {}
        }
    }

    if !saw_name {
        // `from pkg import` with nothing else parsed — side-effect style.
        let mut import =
            ImportStatement::new(file_path, prefix_dots(&source_path, leading_dots), ImportType::SideEffect);
        import.raw = raw.clone();
        out.push(import);
    }

    out
}

/// Preserve leading-dot relative notation in `source` so the dependency
/// resolver can later resolve it against the importing file's package
/// path.
fn prefix_dots(source: &str, dots: usize) -> String {
    if dots == 0 {
        source.to_string()
    } else {
        format!("{}{}", ".".repeat(dots), source)
    }
}

// ---------------------------------------------------------------------
// Functions / methods
// ---------------------------------------------------------------------

fn extract_signature(node: Node, source: &str) -> FunctionSignature {
    let mut signature = FunctionSignature::default();
    if let Some(return_type) = node.child_by_field_name("return_type") {
        signature.return_type = Some(node_text(source, return_type).to_string());
    }
    let Some(params_node) = node.child_by_field_name("parameters") else {
        return signature;
    };
    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "identifier" => signature.parameters.push(Parameter::new(node_text(source, child))),
            "typed_parameter" => {
                let name = child
                    .child(0)
                    .map(|n| node_text(source, n).to_string())
                    .unwrap_or_default();
                let mut param = Parameter::new(name);
                if let Some(type_node) = child.child_by_field_name("type") {
                    param.type_hint = Some(node_text(source, type_node).to_string());
                }
                signature.parameters.push(param);
            }
            "default_parameter" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let mut param = Parameter::new(node_text(source, name_node));
                    if let Some(value_node) = child.child_by_field_name("value") {
                        param.default_value = Some(node_text(source, value_node).to_string());
                    }
                    signature.parameters.push(param);
                }
            }
            "typed_default_parameter" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let mut param = Parameter::new(node_text(source, name_node));
                    if let Some(type_node) = child.child_by_field_name("type") {
                        param.type_hint = Some(node_text(source, type_node).to_string());
                    }
                    if let Some(value_node) = child.child_by_field_name("value") {
                        param.default_value = Some(node_text(source, value_node).to_string());
                    }
                    signature.parameters.push(param);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                signature.parameters.push(Parameter::new(node_text(source, child)));
            }
            _ => {}
        }
    }
    signature
}

fn extract_docstring(body: Node, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = find_child_kind(first, "string")?;
    let text = node_text(source, string_node);
    let stripped = strip_python_string_quotes(text);
    Some(crate::model::normalize_newlines(&stripped))
}

fn strip_python_string_quotes(text: &str) -> String {
    let without_prefix = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if without_prefix.starts_with(quote) && without_prefix.ends_with(quote) && without_prefix.len() >= 2 * quote.len()
        {
            return without_prefix[quote.len()..without_prefix.len() - quote.len()].to_string();
        }
    }
    without_prefix.to_string()
}

fn extract_function(
    node: Node,
    raw_node: Node,
    source: &str,
    file_path: &str,
    decorators: &[String],
) -> FunctionDefinition {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(source, n).to_string())
        .unwrap_or_default();
    let mut function = FunctionDefinition::new(file_path, name);
    function.raw = raw_text(source, raw_node);
    function.signature = Some(extract_signature(node, source));
    function.decorators = decorators.to_vec();
    if is_async(node, source) {
        function.modifiers.push("async".to_string());
    }
    if let Some(body) = node.child_by_field_name("body") {
        function.docstring = extract_docstring(body, source);
    }
    function
}

fn is_async(node: Node, source: &str) -> bool {
    node.child(0)
        .map(|n| node_text(source, n) == "async")
        .unwrap_or(false)
}

// ---------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------

fn extract_class(node: Node, raw_node: Node, source: &str, file_path: &str) -> ClassDefinition {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(source, n).to_string())
        .unwrap_or_default();
    let mut class = ClassDefinition::new(file_path, name);
    class.raw = raw_text(source, raw_node);

    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for child in superclasses.named_children(&mut cursor) {
            class.bases.push(node_text(source, child).to_string());
        }
    }

    let Some(body) = node.child_by_field_name("body") else {
        return class;
    };

    let mut cursor = body.walk();
    let mut pending_decorators: Vec<String> = Vec::new();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "decorated_definition" => {
                let mut decs = Vec::new();
                let mut inner = None;
                let mut inner_cursor = child.walk();
                for grandchild in child.children(&mut inner_cursor) {
                    match grandchild.kind() {
                        "decorator" => decs.push(decorator_text(grandchild, source)),
                        "function_definition" => inner = Some(grandchild),
                        _ => {}
                    }
                }
                if let Some(inner) = inner {
                    let method = extract_method(inner, child, source, &decs);
                    class.add_method(method);
                }
            }
            "function_definition" => {
                let method = extract_method(child, child, source, &pending_decorators);
                pending_decorators.clear();
                class.add_method(method);
            }
            "expression_statement" => {
                if let Some(assignment) = find_child_kind(child, "assignment") {
                    if let Some(attribute) = extract_class_attribute(assignment, child, source) {
                        class.add_attribute(attribute);
                    }
                }
            }
            _ => {}
        }
    }

    collect_self_attributes(&mut class, body, source);
    class
}

fn extract_method(node: Node, raw_node: Node, source: &str, decorators: &[String]) -> MethodDefinition {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(source, n).to_string())
        .unwrap_or_default();
    let mut method = MethodDefinition::new(name);
    method.raw = raw_text(source, raw_node);
    method.signature = Some(extract_signature(node, source));
    method.decorators = decorators.to_vec();
    if is_async(node, source) {
        method.modifiers.push("async".to_string());
    }
    if let Some(body) = node.child_by_field_name("body") {
        method.docstring = extract_docstring(body, source);
    }
    method
}

fn extract_class_attribute(assignment: Node, raw_node: Node, source: &str) -> Option<ClassAttribute> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(source, left).to_string();
    let mut attribute = ClassAttribute::new(name.clone());
    attribute.raw = raw_text(source, raw_node);
    attribute.visibility = visibility_from_name(&name);
    if let Some(type_node) = assignment.child_by_field_name("type") {
        attribute.type_hint = Some(node_text(source, type_node).to_string());
    }
    if let Some(right) = assignment.child_by_field_name("right") {
        attribute.value = Some(node_text(source, right).to_string());
    }
    Some(attribute)
}

fn visibility_from_name(name: &str) -> Visibility {
    if name.starts_with("__") && !name.ends_with("__") {
        Visibility::Private
    } else if name.starts_with('_') {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

/// Walk every method body for `self.<name> = ...` assignments and record
/// them as class attributes not already declared at class-body scope —
/// the common Python pattern of declaring instance attributes inside
/// `__init__` (and other methods) rather than in the class body.
fn collect_self_attributes(class: &mut ClassDefinition, class_body: Node, source: &str) {
    let existing: std::collections::HashSet<String> =
        class.attributes.iter().map(|a| a.name.clone()).collect();
    let mut seen = existing;

    let mut cursor = class_body.walk();
    for child in class_body.children(&mut cursor) {
        let function_node = match child.kind() {
            "function_definition" => Some(child),
            "decorated_definition" => find_child_kind(child, "function_definition"),
            _ => None,
        };
        let Some(function_node) = function_node else { continue };
        let Some(body) = function_node.child_by_field_name("body") else { continue };
        find_self_assignments(body, source, class, &mut seen);
    }
}

fn find_self_assignments(
    node: Node,
    source: &str,
    class: &mut ClassDefinition,
    seen: &mut std::collections::HashSet<String>,
) {
    if node.kind() == "assignment" {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "attribute" {
                if let (Some(object), Some(attr)) =
                    (left.child_by_field_name("object"), left.child_by_field_name("attribute"))
                {
                    if node_text(source, object) == "self" {
                        let name = node_text(source, attr).to_string();
                        if seen.insert(name.clone()) {
                            let mut attribute = ClassAttribute::new(name.clone());
                            attribute.raw = raw_text(source, node);
                            attribute.visibility = visibility_from_name(&name);
                            if let Some(right) = node.child_by_field_name("right") {
                                attribute.value = Some(node_text(source, right).to_string());
                            }
                            class.add_attribute(attribute);
                        }
                    }
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        find_self_assignments(child, source, class, seen);
    }
}

// ---------------------------------------------------------------------
// Module-level variables
// ---------------------------------------------------------------------

fn extract_variable(assignment: Node, raw_node: Node, source: &str, file_path: &str) -> Option<VariableDeclaration> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(source, left).to_string();
    let mut variable = VariableDeclaration::new(file_path, name);
    variable.raw = raw_text(source, raw_node);
    if let Some(type_node) = assignment.child_by_field_name("type") {
        variable.type_hint = Some(node_text(source, type_node).to_string());
    }
    if let Some(right) = assignment.child_by_field_name("right") {
        variable.value = Some(node_text(source, right).to_string());
    }
    Some(variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CodeFile {
        let parser = PythonParser::new().unwrap();
        parser.parse_file("pkg/a.py", source).unwrap()
    }

    #[test]
    fn parses_class_with_method() {
        let file = parse("class A:\n    def m(self):\n        return 1\n");
        assert_eq!(file.classes.len(), 1);
        assert_eq!(file.classes[0].name, "A");
        assert_eq!(file.classes[0].methods.len(), 1);
        assert_eq!(file.classes[0].methods[0].name, "m");
    }

    #[test]
    fn parses_absolute_and_from_imports() {
        let file = parse("import os\nfrom pkg.a import A\n");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].source, "os");
        assert_eq!(file.imports[0].name, None);
        assert_eq!(file.imports[1].source, "pkg.a");
        assert_eq!(file.imports[1].name.as_deref(), Some("A"));
    }

    #[test]
    fn parses_relative_import_with_leading_dots() {
        let file = parse("from ..pkg import y\n");
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].source, "..pkg");
        assert!(matches!(file.imports[0].import_type, ImportType::Relative));
    }

    #[test]
    fn parses_aliased_import() {
        let file = parse("import numpy as np\n");
        assert_eq!(file.imports[0].alias.as_deref(), Some("np"));
        assert_eq!(file.imports[0].as_dependency(), "np");
    }

    #[test]
    fn collects_decorators_and_docstring() {
        let file = parse("@staticmethod\ndef f():\n    \"\"\"Docs.\"\"\"\n    return 1\n");
        assert_eq!(file.functions[0].decorators, vec!["staticmethod"]);
        assert_eq!(file.functions[0].docstring.as_deref(), Some("Docs."));
    }

    #[test]
    fn collects_self_attributes_from_init() {
        let file = parse("class A:\n    def __init__(self):\n        self.x = 1\n        self._y = 2\n");
        let class = &file.classes[0];
        let names: Vec<&str> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"x"));
        assert!(names.contains(&"_y"));
        assert_eq!(class.attributes.iter().find(|a| a.name == "_y").unwrap().visibility, Visibility::Protected);
    }

    #[test]
    fn module_level_variable_gets_type_hint_and_value() {
        let file = parse("count: int = 0\n");
        assert_eq!(file.variables.len(), 1);
        assert_eq!(file.variables[0].type_hint.as_deref(), Some("int"));
        assert_eq!(file.variables[0].value.as_deref(), Some("0"));
    }

    #[test]
    fn preserves_indentation_in_method_raw() {
        let file = parse("class A:\n    def m(self):\n        return 1\n");
        assert!(file.classes[0].methods[0].raw.starts_with("    def m"));
    }
}
