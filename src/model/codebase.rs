//! `CodeBase`: the in-memory representation of a parsed repository.
//!
//! `CodeBase` exclusively owns its `CodeFile`s. Identifier lookup and the
//! various `all_*` accessors go through a process-local cache
//! (`_cached_elements` / `_cached_ids`) that is rebuilt on demand and
//! never serialized.

use std::collections::{BTreeMap, HashMap};

use super::element::{CodeElement, ElementKind};
use super::file::CodeFile;
use crate::model::Element;

/// A cheap, copyable locator for an element inside `CodeBase::root`.
/// Storing this (rather than a borrowed reference) in the cache lets the
/// cache outlive any particular borrow of `root`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHandle {
    file_index: usize,
    locator: Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locator {
    Import(usize),
    Variable(usize),
    Function(usize),
    Class(usize),
    Method { class_index: usize, member_index: usize },
    Attribute { class_index: usize, member_index: usize },
}

#[derive(Debug, Default)]
pub struct CodeBase {
    pub root: Vec<CodeFile>,
    _cached_elements: HashMap<String, ElementHandle>,
    _cached_ids: Vec<String>,
}

impl CodeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(root: Vec<CodeFile>) -> Self {
        let mut codebase = Self {
            root,
            _cached_elements: HashMap::new(),
            _cached_ids: Vec::new(),
        };
        codebase.rebuild_caches();
        codebase
    }

    pub fn push_file(&mut self, file: CodeFile) {
        self.root.push(file);
    }

    /// Remove a file (and everything it owns) from the codebase, e.g.
    /// because it was deleted on disk.
    pub fn remove_file(&mut self, file_path: &str) -> bool {
        let before = self.root.len();
        self.root.retain(|f| f.file_path != file_path);
        let removed = self.root.len() != before;
        if removed {
            self.rebuild_caches();
        }
        removed
    }

    pub fn file(&self, file_path: &str) -> Option<&CodeFile> {
        self.root.iter().find(|f| f.file_path == file_path)
    }

    pub fn file_mut(&mut self, file_path: &str) -> Option<&mut CodeFile> {
        self.root.iter_mut().find(|f| f.file_path == file_path)
    }

    /// Rebuild `_cached_elements` and `_cached_ids` from `root`. Files are
    /// visited in a stable (file-path-sorted) order so the cached id list
    /// is deterministic across runs despite `root` itself carrying no
    /// ordering guarantee.
    pub fn rebuild_caches(&mut self) {
        self._cached_elements.clear();
        self._cached_ids.clear();

        let mut file_indices: Vec<usize> = (0..self.root.len()).collect();
        file_indices.sort_by(|&a, &b| self.root[a].file_path.cmp(&self.root[b].file_path));

        for file_index in file_indices {
            let file = &self.root[file_index];
            let mut entries: Vec<(String, ElementHandle)> = Vec::new();

            for (i, import) in file.imports.iter().enumerate() {
                entries.push((import.unique_id(), ElementHandle { file_index, locator: Locator::Import(i) }));
            }
            for (ci, class) in file.classes.iter().enumerate() {
                entries.push((class.unique_id(), ElementHandle { file_index, locator: Locator::Class(ci) }));
            }
            for (ci, class) in file.classes.iter().enumerate() {
                for (mi, method) in class.methods.iter().enumerate() {
                    entries.push((
                        method.unique_id(),
                        ElementHandle { file_index, locator: Locator::Method { class_index: ci, member_index: mi } },
                    ));
                }
            }
            for (ci, class) in file.classes.iter().enumerate() {
                for (ai, attribute) in class.attributes.iter().enumerate() {
                    entries.push((
                        attribute.unique_id(),
                        ElementHandle { file_index, locator: Locator::Attribute { class_index: ci, member_index: ai } },
                    ));
                }
            }
            for (i, function) in file.functions.iter().enumerate() {
                entries.push((function.unique_id(), ElementHandle { file_index, locator: Locator::Function(i) }));
            }
            for (i, variable) in file.variables.iter().enumerate() {
                entries.push((variable.unique_id(), ElementHandle { file_index, locator: Locator::Variable(i) }));
            }

            for (id, handle) in entries {
                self.insert(id, handle);
            }
        }
    }

    fn insert(&mut self, id: String, handle: ElementHandle) {
        if !self._cached_elements.contains_key(&id) {
            self._cached_ids.push(id.clone());
        }
        self._cached_elements.insert(id, handle);
    }

    fn resolve(&self, handle: ElementHandle) -> CodeElement<'_> {
        let file = &self.root[handle.file_index];
        match handle.locator {
            Locator::Import(i) => CodeElement::Import(&file.imports[i]),
            Locator::Variable(i) => CodeElement::Variable(&file.variables[i]),
            Locator::Function(i) => CodeElement::Function(&file.functions[i]),
            Locator::Class(i) => CodeElement::Class(&file.classes[i]),
            Locator::Method { class_index, member_index } => {
                CodeElement::Method(&file.classes[class_index].methods[member_index])
            }
            Locator::Attribute { class_index, member_index } => {
                CodeElement::Attribute(&file.classes[class_index].attributes[member_index])
            }
        }
    }

    /// Resolve an identifier via the cache; O(1) once caches are built.
    pub fn get(&self, unique_id: &str) -> Option<CodeElement<'_>> {
        self._cached_elements.get(unique_id).map(|&h| self.resolve(h))
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self._cached_elements.contains_key(unique_id)
    }

    /// All ids known to the cache, in build order.
    pub fn cached_ids(&self) -> &[String] {
        &self._cached_ids
    }

    fn ids_of_kind(&self, kind: ElementKind) -> Vec<String> {
        self._cached_ids
            .iter()
            .filter(|id| self._cached_elements.get(*id).map(|h| self.resolve(*h).kind()) == Some(kind))
            .cloned()
            .collect()
    }

    pub fn all_imports(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Import)
    }
    pub fn all_classes(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Class)
    }
    pub fn all_methods(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Method)
    }
    pub fn all_attributes(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Attribute)
    }
    pub fn all_functions(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Function)
    }
    pub fn all_variables(&self) -> Vec<String> {
        self.ids_of_kind(ElementKind::Variable)
    }

    /// Same as `all_*`, but returning the resolved elements keyed by id
    /// rather than bare id strings.
    pub fn all_imports_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Import)
    }
    pub fn all_classes_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Class)
    }
    pub fn all_methods_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Method)
    }
    pub fn all_attributes_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Attribute)
    }
    pub fn all_functions_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Function)
    }
    pub fn all_variables_dict(&self) -> HashMap<String, CodeElement<'_>> {
        self.dict_of_kind(ElementKind::Variable)
    }

    fn dict_of_kind(&self, kind: ElementKind) -> HashMap<String, CodeElement<'_>> {
        self._cached_elements
            .iter()
            .filter_map(|(id, &h)| {
                let element = self.resolve(h);
                (element.kind() == kind).then(|| (id.clone(), element))
            })
            .collect()
    }

    // -------------------------------------------------------------
    // Tree views
    // -------------------------------------------------------------

    /// Build a nested directory dictionary with a file list at every
    /// directory level, optionally restricted to `filter_paths` and
    /// optionally "slimmed" (runs of single-child directories collapsed
    /// into one combined label, like `pkg/sub` instead of nesting `pkg`
    /// then `sub`).
    pub fn build_tree_dict(&self, filter_paths: Option<&[String]>, slim: bool) -> TreeNode {
        let mut root = TreeNode::default();
        for file in &self.root {
            if let Some(filter) = filter_paths {
                if !filter.iter().any(|p| p == &file.file_path) {
                    continue;
                }
            }
            insert_path(&mut root, &file.file_path);
        }
        if slim {
            collapse_single_children(&mut root);
        }
        root
    }

    /// Render the directory tree as ASCII, optionally listing each
    /// file's top-level element names (and, if `include_types`, a
    /// one-letter type prefix: F/V/C/A/M).
    pub fn get_tree_view(&self, include_modules: bool, include_types: bool) -> String {
        let tree = self.build_tree_dict(None, false);
        let mut lines = Vec::new();
        render_tree(&tree, "", &mut lines);
        if include_modules {
            let mut with_modules = Vec::new();
            for line in lines {
                with_modules.push(line.clone());
                if let Some(path) = extract_file_path(&line) {
                    if let Some(file) = self.file(&path) {
                        for element in file.top_level_elements() {
                            with_modules.push(module_line(&element, include_types));
                        }
                    }
                }
            }
            lines = with_modules;
        }
        lines.join("\n")
    }

    /// A textual per-file outline (one line per top-level/member name)
    /// suitable for indexing into the lexical search engine.
    pub fn compile_tree_nodes_dict(&self) -> HashMap<String, Vec<String>> {
        let mut out = HashMap::new();
        for file in &self.root {
            let mut lines = Vec::new();
            for element in file.top_level_elements() {
                match element {
                    CodeElement::Import(i) => lines.push(format!("import {}", i.as_dependency())),
                    CodeElement::Variable(v) => lines.push(format!("var {}", v.name)),
                    CodeElement::Function(f) => lines.push(format!("fn {}", f.name)),
                    CodeElement::Class(c) => {
                        lines.push(format!("class {}", c.name));
                        for attribute in &c.attributes {
                            lines.push(format!("  attr {}", attribute.name));
                        }
                        for method in &c.methods {
                            lines.push(format!("  method {}", method.name));
                        }
                    }
                    CodeElement::Method(_) | CodeElement::Attribute(_) => unreachable!("not top-level"),
                }
            }
            out.insert(file.file_path.clone(), lines);
        }
        out
    }
}

/// The natural return type for `build_tree_dict`: a directory node
/// carrying its own subdirectories and the files directly inside it.
#[derive(Debug, Default, Clone)]
pub struct TreeNode {
    pub dirs: BTreeMap<String, TreeNode>,
    pub files: Vec<String>,
}

fn insert_path(root: &mut TreeNode, file_path: &str) {
    let mut parts: Vec<&str> = file_path.split('/').collect();
    let file_name = parts.pop().unwrap_or(file_path);
    let mut node = root;
    for dir in parts {
        node = node.dirs.entry(dir.to_string()).or_default();
    }
    node.files.push(file_name.to_string());
}

fn collapse_single_children(node: &mut TreeNode) {
    let keys: Vec<String> = node.dirs.keys().cloned().collect();
    let mut collapsed = BTreeMap::new();
    for key in keys {
        let mut child = node.dirs.remove(&key).unwrap();
        collapse_single_children(&mut child);
        let mut label = key;
        while child.files.is_empty() && child.dirs.len() == 1 {
            let (sub_key, sub_child) = child.dirs.into_iter().next().unwrap();
            label = format!("{label}/{sub_key}");
            child = sub_child;
        }
        collapsed.insert(label, child);
    }
    node.dirs = collapsed;
}

fn render_tree(node: &TreeNode, prefix: &str, lines: &mut Vec<String>) {
    let dir_count = node.dirs.len();
    for (i, (name, child)) in node.dirs.iter().enumerate() {
        let is_last = i == dir_count - 1 && node.files.is_empty();
        let connector = if is_last { "└── " } else { "├── " };
        lines.push(format!("{prefix}{connector}{name}/"));
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        render_tree(child, &child_prefix, lines);
    }
    let file_count = node.files.len();
    for (i, file) in node.files.iter().enumerate() {
        let is_last = i == file_count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        lines.push(format!("{prefix}{connector}{file}"));
    }
}

/// Best-effort recovery of the full repo-relative path a rendered tree
/// line refers to, by walking the accumulated prefix structure. Since
/// `render_tree` emits lines without embedding the full path, callers
/// that need it (module annotation) track directory context themselves;
/// this helper handles the common case of a leaf line with no nested
/// directory prefix ambiguity by reconstructing from connector markers.
fn extract_file_path(line: &str) -> Option<String> {
    // A line like "├── a.py" or "└── a.py" with no trailing slash is a file.
    let trimmed = line.trim_start_matches(['│', ' ']).trim_start_matches("├── ").trim_start_matches("└── ");
    if trimmed.ends_with('/') || trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn module_line(element: &CodeElement<'_>, include_types: bool) -> String {
    let prefix = if include_types {
        match element.kind() {
            ElementKind::Function => "F ",
            ElementKind::Variable => "V ",
            ElementKind::Class => "C ",
            ElementKind::Attribute => "A ",
            ElementKind::Method => "M ",
            ElementKind::Import => "I ",
        }
    } else {
        ""
    };
    format!("    {prefix}{}", element.name())
}

pub struct TreeViewOptions {
    pub include_modules: bool,
    pub include_types: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDefinition, FunctionDefinition, ImportStatement, ImportType, MethodDefinition};

    fn sample_codebase() -> CodeBase {
        let mut a = CodeFile::new("pkg/a.py", "class A:\n    def m(self): return 1\n");
        let mut class = ClassDefinition::new("pkg/a.py", "A");
        class.add_method(MethodDefinition::new("m"));
        a.push_class(class);

        let mut b = CodeFile::new("pkg/b.py", "from pkg.a import A\n\ndef f():\n    return A().m()\n");
        let mut import = ImportStatement::new("pkg/b.py", "pkg.a", ImportType::Absolute);
        import.name = Some("A".to_string());
        import.definition_id = Some("pkg.a.A".to_string());
        b.push_import(import);
        b.push_function(FunctionDefinition::new("pkg/b.py", "f"));

        CodeBase::from_files(vec![a, b])
    }

    #[test]
    fn get_resolves_every_cached_id() {
        let codebase = sample_codebase();
        for id in codebase.cached_ids() {
            let element = codebase.get(id).expect("cached id should resolve");
            assert_eq!(&element.unique_id(), id);
        }
    }

    #[test]
    fn all_classes_contains_expected_id() {
        let codebase = sample_codebase();
        assert!(codebase.all_classes().contains(&"pkg.a.A".to_string()));
        assert!(codebase.all_methods().contains(&"pkg.a.A.m".to_string()));
        assert!(codebase.all_functions().contains(&"pkg.b.f".to_string()));
    }

    #[test]
    fn remove_file_drops_its_ids_from_cache() {
        let mut codebase = sample_codebase();
        assert!(codebase.get("pkg.a.A").is_some());
        codebase.remove_file("pkg/a.py");
        assert!(codebase.get("pkg.a.A").is_none());
        assert!(codebase.get("pkg.a.A.m").is_none());
    }

    #[test]
    fn tree_view_with_modules_does_not_change_on_file_internal_edit() {
        let codebase = sample_codebase();
        let before = codebase.get_tree_view(false, false);
        let mut codebase2 = sample_codebase();
        // Adding an element should not change a tree view that excludes modules.
        codebase2
            .file_mut("pkg/a.py")
            .unwrap()
            .push_variable(crate::model::VariableDeclaration::new("pkg/a.py", "extra"));
        codebase2.rebuild_caches();
        let after = codebase2.get_tree_view(false, false);
        assert_eq!(before, after);
    }

    #[test]
    fn compile_tree_nodes_dict_has_entry_per_file() {
        let codebase = sample_codebase();
        let dict = codebase.compile_tree_nodes_dict();
        assert!(dict.contains_key("pkg/a.py"));
        assert!(dict.contains_key("pkg/b.py"));
        assert!(dict["pkg/a.py"].iter().any(|l| l.contains("class A")));
    }
}
