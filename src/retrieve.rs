//! Targeted context retrieval: given a set of unique identifiers and a
//! transitive-reference depth, collect a minimal typed bundle of code
//! elements and render it as text.

use std::collections::HashSet;

use crate::error::ContextError;
use crate::model::{CodeBase, CodeElement, CodeReference, Element, ElementKind};

/// Whether [`ContextRetriever::get`] joins its rendered blocks into one
/// string or returns them as a list for the caller to join itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    AsString,
    AsStringList,
}

/// The elements collected by a [`ContextRetriever::get`] call, classified
/// by kind. `class_methods`/`class_attributes` hold members whose owning
/// class is not itself present in `classes` — members pulled in by a
/// reference without their whole class following along.
#[derive(Debug, Default, Clone)]
pub struct CodeContextStructure {
    pub requested_elements: Vec<String>,
    pub imports: Vec<String>,
    pub variables: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub class_methods: Vec<String>,
    pub class_attributes: Vec<String>,
}

/// The rendered result of a [`ContextRetriever::get`] call: the requested
/// elements' own text, kept separate from the context pulled in around
/// them, so a caller can concatenate or present them independently.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub target: Vec<String>,
    pub context: Vec<String>,
    pub structure: CodeContextStructure,
}

impl RetrievedContext {
    /// Target and context blocks joined with a blank line between them.
    pub fn joined(&self) -> String {
        self.target.iter().chain(self.context.iter()).cloned().collect::<Vec<_>>().join("\n\n")
    }
}

pub struct ContextRetriever<'a> {
    codebase: &'a CodeBase,
}

impl<'a> ContextRetriever<'a> {
    pub fn new(codebase: &'a CodeBase) -> Self {
        Self { codebase }
    }

    /// Resolve `requested_ids`, walk their references out to `depth`, and
    /// render the result. `max_depth` bounds the requested depth; a
    /// deeper request is rejected rather than silently clamped.
    pub fn get(&self, requested_ids: &[String], depth: usize, max_depth: usize, shape: OutputShape) -> Result<RetrievedContext, ContextError> {
        if depth > max_depth {
            return Err(ContextError::DepthExceeded(depth));
        }

        let requested: Vec<String> = dedupe_non_empty(requested_ids);
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = Vec::new();

        for id in &requested {
            if visited.insert(id.clone()) {
                frontier.push(id.clone());
            }
        }

        let mut collected: Vec<String> = frontier.clone();
        let mut current = frontier;
        for _ in 0..depth {
            let mut next = Vec::new();
            for id in &current {
                let Some(element) = self.codebase.get(id) else { continue };
                for reference in references_of(&element) {
                    let Some(target_id) = reference.unique_id else { continue };
                    if visited.insert(target_id.clone()) {
                        next.push(target_id.clone());
                        collected.push(target_id);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            current = next;
        }

        let structure = self.classify(&requested, &collected);
        let target = self.render_ids(&requested, &requested);
        let context_ids: Vec<String> = collected.iter().filter(|id| !requested.contains(id)).cloned().collect();
        let context = self.render_context(&structure, &context_ids);

        let (target, context) = match shape {
            OutputShape::AsString => (vec![target.join("\n\n")], vec![context.join("\n\n")]),
            OutputShape::AsStringList => (target, context),
        };

        Ok(RetrievedContext { target, context, structure })
    }

    fn classify(&self, requested: &[String], collected: &[String]) -> CodeContextStructure {
        let mut structure = CodeContextStructure {
            requested_elements: requested.to_vec(),
            ..Default::default()
        };

        let present_classes: HashSet<&str> = collected
            .iter()
            .filter(|id| self.codebase.get(id).map(|e| e.kind() == ElementKind::Class).unwrap_or(false))
            .map(|s| s.as_str())
            .collect();

        for id in collected {
            let Some(element) = self.codebase.get(id) else { continue };
            match element {
                CodeElement::Import(_) => structure.imports.push(id.clone()),
                CodeElement::Variable(_) => structure.variables.push(id.clone()),
                CodeElement::Function(_) => structure.functions.push(id.clone()),
                CodeElement::Class(_) => structure.classes.push(id.clone()),
                CodeElement::Method(m) => {
                    if !present_classes.contains(m.class_id.as_str()) {
                        structure.class_methods.push(id.clone());
                    }
                }
                CodeElement::Attribute(a) => {
                    if !present_classes.contains(a.class_id.as_str()) {
                        structure.class_attributes.push(id.clone());
                    }
                }
            }
        }
        structure
    }

    /// Render a set of ids, one `<FILE_START::..>`/`<FILE_END::..>` block
    /// per file, with import-only blocks folded into a synthetic
    /// `PACKAGES` block and elements kept in source order within a block.
    fn render_ids(&self, order: &[String], ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
        let mut package_lines = Vec::new();
        let mut by_file: Vec<(String, Vec<String>)> = Vec::new();

        for id in order {
            if !wanted.contains(id.as_str()) {
                continue;
            }
            let Some(element) = self.codebase.get(id) else { continue };
            if let CodeElement::Import(import) = element {
                package_lines.push(import.raw().to_string());
                continue;
            }
            let file_path = element.file_path().to_string();
            let entry = by_file.iter_mut().find(|(path, _)| *path == file_path);
            match entry {
                Some((_, lines)) => lines.push(element.raw().to_string()),
                None => by_file.push((file_path, vec![element.raw().to_string()])),
            }
        }

        let mut blocks = Vec::new();
        if !package_lines.is_empty() {
            blocks.push(wrap_block("PACKAGES", &package_lines.join("\n")));
        }
        for (path, lines) in by_file {
            blocks.push(wrap_block(&sanitize_path(&path), &lines.join("\n\n")));
        }
        blocks
    }

    fn render_context(&self, structure: &CodeContextStructure, context_ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = context_ids.iter().map(|s| s.as_str()).collect();
        let mut order: Vec<String> = Vec::new();
        order.extend(structure.imports.iter().filter(|id| wanted.contains(id.as_str())).cloned());
        order.extend(structure.classes.iter().filter(|id| wanted.contains(id.as_str())).cloned());
        order.extend(structure.functions.iter().filter(|id| wanted.contains(id.as_str())).cloned());
        order.extend(structure.variables.iter().filter(|id| wanted.contains(id.as_str())).cloned());

        let mut blocks = self.render_ids(&order, &order);

        let partial = self.render_partial_classes(&structure.class_methods, &structure.class_attributes);
        blocks.extend(partial);
        blocks
    }

    /// Members whose owning class wasn't pulled in whole get reconstructed
    /// as a partial class: a synthesized header line from the class's
    /// first source line, followed by only the contributing members, in
    /// source order.
    fn render_partial_classes(&self, methods: &[String], attributes: &[String]) -> Vec<String> {
        let mut by_class: Vec<(String, Vec<String>)> = Vec::new();

        let push_member = |class_id: &str, file_path: &str, raw: &str, by_class: &mut Vec<(String, Vec<String>)>| {
            let entry = by_class.iter_mut().find(|(id, _)| id == class_id);
            match entry {
                Some((_, members)) => members.push(raw.to_string()),
                None => by_class.push((class_id.to_string(), vec![raw.to_string()])),
            }
            let _ = file_path;
        };

        for id in methods {
            if let Some(CodeElement::Method(m)) = self.codebase.get(id) {
                push_member(&m.class_id, m.file_path(), m.raw(), &mut by_class);
            }
        }
        for id in attributes {
            if let Some(CodeElement::Attribute(a)) = self.codebase.get(id) {
                push_member(&a.class_id, a.file_path(), a.raw(), &mut by_class);
            }
        }

        let mut blocks = Vec::new();
        for (class_id, members) in by_class {
            let Some(CodeElement::Class(class)) = self.codebase.get(&class_id) else { continue };
            let header = class.raw.lines().next().unwrap_or(&class.raw).to_string();
            let body = std::iter::once(header).chain(members).collect::<Vec<_>>().join("\n\n");
            blocks.push(wrap_block(&sanitize_path(class.file_path()), &body));
        }
        blocks
    }
}

fn references_of(element: &CodeElement<'_>) -> Vec<CodeReference> {
    match element {
        CodeElement::Class(class) => class.computed_references(),
        _ => element_references(element),
    }
}

fn element_references(element: &CodeElement<'_>) -> Vec<CodeReference> {
    use crate::model::Element;
    match element {
        CodeElement::Import(e) => e.references().to_vec(),
        CodeElement::Variable(e) => e.references().to_vec(),
        CodeElement::Function(e) => e.references().to_vec(),
        CodeElement::Class(e) => e.references().to_vec(),
        CodeElement::Method(e) => e.references().to_vec(),
        CodeElement::Attribute(e) => e.references().to_vec(),
    }
}

fn dedupe_non_empty(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| !id.is_empty() && seen.insert((*id).clone())).cloned().collect()
}

fn sanitize_path(path: &str) -> String {
    path.replace(['/', '\\'], "__")
}

fn wrap_block(tag: &str, content: &str) -> String {
    format!("<FILE_START::{tag}>\n{content}\n</FILE_END::{tag}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDefinition, CodeFile, FunctionDefinition, MethodDefinition, ReferenceType};

    fn sample_codebase() -> CodeBase {
        let mut file = CodeFile::new(
            "pkg/a.py",
            "class Widget:\n    def use(self):\n        return 1\n\ndef caller():\n    return Widget().use()\n",
        );

        let mut class = ClassDefinition::new("pkg/a.py", "Widget");
        let mut method = MethodDefinition::new("use");
        method.raw = "def use(self):\n        return 1".to_string();
        class.add_method(method);
        class.raw = "class Widget:".to_string();
        file.push_class(class);

        let mut caller = FunctionDefinition::new("pkg/a.py", "caller");
        caller.raw = "def caller():\n    return Widget().use()".to_string();
        caller.references.push(CodeReference::new("use", ReferenceType::Function).with_id("pkg.a.Widget.use"));
        file.push_function(caller);

        CodeBase::from_files(vec![file])
    }

    #[test]
    fn depth_zero_returns_only_requested() {
        let codebase = sample_codebase();
        let retriever = ContextRetriever::new(&codebase);
        let result = retriever.get(&["pkg.a.caller".to_string()], 0, 8, OutputShape::AsStringList).unwrap();
        assert_eq!(result.structure.requested_elements, vec!["pkg.a.caller".to_string()]);
        assert!(result.context.is_empty());
    }

    #[test]
    fn depth_exceeding_max_errors() {
        let codebase = sample_codebase();
        let retriever = ContextRetriever::new(&codebase);
        let err = retriever.get(&["pkg.a.caller".to_string()], 9, 8, OutputShape::AsString);
        assert!(matches!(err, Err(ContextError::DepthExceeded(9))));
    }

    #[test]
    fn partial_class_includes_header_and_contributing_method_only() {
        let codebase = sample_codebase();
        let retriever = ContextRetriever::new(&codebase);
        let result = retriever.get(&["pkg.a.caller".to_string()], 1, 8, OutputShape::AsStringList).unwrap();
        assert!(result.structure.class_methods.iter().any(|id| id.ends_with(".use")));
        assert!(result.context.iter().any(|b| b.contains("class Widget")));
    }
}
