//! Dependency Resolver: attaches `CodeReference`s within a single file,
//! then resolves import targets across the whole codebase.
//!
//! Intra-file resolution runs once per file, right after parsing, driven
//! by [`crate::parsing::LanguageParser::resolve_intra_file_dependencies`]'s
//! default implementation. Inter-file resolution runs once per ingest
//! pass over the assembled `CodeBase`, since it needs every file's
//! element ids available at once.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::model::{CodeBase, CodeElement, CodeFile, CodeReference, Element, ReferenceType};
use crate::parsing::{ImportPathConvention, Language};

struct Candidate {
    unique_id: String,
    reference_type: ReferenceType,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Count non-overlapping, word-bounded occurrences of `needle` in
/// `haystack`. Deliberately not regex-based: candidate names are counted
/// per-element, so a hand-rolled boundary check avoids compiling one
/// throwaway pattern per name.
fn count_word_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut cursor = 0;
    while let Some(pos) = haystack[cursor..].find(needle) {
        let idx = cursor + pos;
        let before_ok = haystack[..idx].chars().next_back().map(|c| !is_word_char(c)).unwrap_or(true);
        let after = idx + needle.len();
        let after_ok = haystack[after..].chars().next().map(|c| !is_word_char(c)).unwrap_or(true);
        if before_ok && after_ok {
            count += 1;
        }
        cursor = idx + needle.len();
    }
    count
}

fn scan_references(text: &str, candidates: &HashMap<String, Candidate>, own_id: &str) -> Vec<CodeReference> {
    let mut refs: Vec<CodeReference> = candidates
        .iter()
        .filter(|(_, candidate)| candidate.unique_id != own_id)
        .filter(|(name, _)| count_word_occurrences(text, name) > 0)
        .map(|(name, candidate)| {
            CodeReference::new(name.clone(), candidate.reference_type).with_id(candidate.unique_id.clone())
        })
        .collect();
    refs.sort_by(|a, b| a.name.cmp(&b.name));
    refs
}

fn top_level_candidates(file: &CodeFile) -> HashMap<String, Candidate> {
    let mut candidates = HashMap::new();
    for element in file.non_import_elements() {
        let reference_type = match &element {
            CodeElement::Class(_) => ReferenceType::Class,
            CodeElement::Function(_) => ReferenceType::Function,
            CodeElement::Variable(_) => ReferenceType::Variable,
            _ => continue,
        };
        // First occurrence in file order wins on a name clash.
        candidates.entry(element.name().to_string()).or_insert(Candidate {
            unique_id: element.unique_id(),
            reference_type,
        });
    }
    for import in &file.imports {
        candidates.entry(import.as_dependency().to_string()).or_insert(Candidate {
            unique_id: Element::unique_id(import),
            reference_type: ReferenceType::Import,
        });
    }
    candidates
}

/// Attach `CodeReference`s to every non-import element in `file` by
/// counting word-bounded occurrences of sibling element names in each
/// element's source text. Class bases are matched against top-level
/// classes and recorded in `bases_references`; methods and attributes are
/// additionally matched against their own class's other members (so
/// `self.other_method()` resolves without special-casing the `self.`
/// prefix — the boundary check alone keeps it a separate word).
pub fn resolve_intra_file(file: &mut CodeFile) {
    let top_level = top_level_candidates(file);

    for function in &mut file.functions {
        let own_id = Element::unique_id(&*function);
        function.references = scan_references(&function.raw, &top_level, &own_id);
    }
    for variable in &mut file.variables {
        let own_id = Element::unique_id(&*variable);
        let text = variable.value.clone().unwrap_or_default();
        variable.references = scan_references(&text, &top_level, &own_id);
    }

    for class in &mut file.classes {
        for base_name in class.bases.clone() {
            if let Some(candidate) = top_level.get(&base_name) {
                if matches!(candidate.reference_type, ReferenceType::Class) {
                    class
                        .bases_references
                        .push(CodeReference::new(base_name, ReferenceType::Inheritance).with_id(candidate.unique_id.clone()));
                }
            }
        }

        let mut local = HashMap::new();
        for method in &class.methods {
            local.entry(method.name.clone()).or_insert(Candidate {
                unique_id: Element::unique_id(method),
                reference_type: ReferenceType::Method,
            });
        }
        for attribute in &class.attributes {
            local.entry(attribute.name.clone()).or_insert(Candidate {
                unique_id: Element::unique_id(attribute),
                reference_type: ReferenceType::Variable,
            });
        }

        for method in &mut class.methods {
            let own_id = Element::unique_id(&*method);
            let mut refs = scan_references(&method.raw, &top_level, &own_id);
            refs.extend(scan_references(&method.raw, &local, &own_id));
            dedup_by_id(&mut refs);
            method.references = refs;
        }
        for attribute in &mut class.attributes {
            let own_id = Element::unique_id(&*attribute);
            let text = attribute.value.clone().unwrap_or_default();
            let mut refs = scan_references(&text, &top_level, &own_id);
            refs.extend(scan_references(&text, &local, &own_id));
            dedup_by_id(&mut refs);
            attribute.references = refs;
        }
    }
}

fn dedup_by_id(refs: &mut Vec<CodeReference>) {
    let mut seen = HashSet::new();
    refs.retain(|r| seen.insert(r.unique_id.clone()));
}

// ---------------------------------------------------------------------
// Codebase-wide import resolution
// ---------------------------------------------------------------------

fn default_target_for(file_path: &str, convention: &ImportPathConvention, import: &crate::model::ImportStatement) -> String {
    if convention.uses_leading_dots && import.source.starts_with('.') {
        let dots = import.source.chars().take_while(|c| *c == '.').count();
        let rest = import.source.trim_start_matches('.');
        let mut base = resolve_relative_base(file_path, dots);
        if !rest.is_empty() {
            if !base.is_empty() {
                base.push('.');
            }
            base.push_str(rest);
        }
        match &import.name {
            Some(name) => {
                if base.is_empty() {
                    name.clone()
                } else {
                    format!("{base}.{name}")
                }
            }
            None => base,
        }
    } else {
        import.default_target_id(&convention.index_filenames)
    }
}

/// The module path a relative import's dots resolve to, given the
/// importing file's own path. One dot stays in the file's own package;
/// each additional dot climbs one package level. The file's own trailing
/// module segment is always dropped first to land on its containing
/// directory — that holds whether the file is a plain module or a
/// package index file, since a configured index filename names the file
/// itself, not a directory component.
fn resolve_relative_base(file_path: &str, dots: usize) -> String {
    let module_path = crate::model::file_path_to_module_path(file_path);
    let mut segments: Vec<&str> = module_path.split('.').collect();
    segments.pop();
    for _ in 1..dots.max(1) {
        segments.pop();
    }
    segments.join(".")
}

/// Resolve every import's `definition_id` against the codebase's known
/// element ids, following at most one re-export hop through a package's
/// index file: a name imported into a package's `__init__.py` and
/// re-exported resolves one hop, not transitively.
pub fn resolve_inter_files_dependencies(codebase: &mut CodeBase, conventions: &HashMap<Language, ImportPathConvention>) {
    let known: HashSet<String> = codebase.cached_ids().iter().cloned().collect();
    let all_index_filenames: Vec<&'static str> =
        conventions.values().flat_map(|c| c.index_filenames.iter().copied()).collect();

    let mut module_to_file: HashMap<String, usize> = HashMap::new();
    for (i, file) in codebase.root.iter().enumerate() {
        let module_path = crate::model::file_path_to_module_path(&file.file_path);
        module_to_file.entry(module_path.clone()).or_insert(i);
        let segments: Vec<&str> = module_path.split('.').collect();
        if segments.last().map(|s| all_index_filenames.contains(s)).unwrap_or(false) {
            let package = segments[..segments.len() - 1].join(".");
            module_to_file.entry(package).or_insert(i);
        }
    }

    // Pass 1: direct resolution.
    let mut targets: Vec<Vec<String>> = Vec::with_capacity(codebase.root.len());
    for file in &codebase.root {
        let convention = Language::from_path(Path::new(&file.file_path))
            .and_then(|l| conventions.get(&l))
            .cloned()
            .unwrap_or_default();
        targets.push(file.imports.iter().map(|import| default_target_for(&file.file_path, &convention, import)).collect());
    }

    let mut resolved: Vec<Vec<Option<String>>> = targets
        .iter()
        .map(|file_targets| file_targets.iter().map(|t| known.contains(t).then(|| t.clone())).collect())
        .collect();

    // Pass 2: one-hop re-export following for names still unresolved.
    for (file_index, file_targets) in targets.iter().enumerate() {
        for (import_index, target) in file_targets.iter().enumerate() {
            if resolved[file_index][import_index].is_some() {
                continue;
            }
            let Some((package, name)) = target.rsplit_once('.') else { continue };
            let Some(&source_file_index) = module_to_file.get(package) else { continue };
            let source_file = &codebase.root[source_file_index];
            let hop = source_file
                .imports
                .iter()
                .enumerate()
                .find(|(_, candidate)| candidate.as_dependency() == name)
                .and_then(|(candidate_index, _)| resolved[source_file_index][candidate_index].clone());
            if let Some(hop) = hop {
                resolved[file_index][import_index] = Some(hop);
            }
        }
    }

    for (file_index, file) in codebase.root.iter_mut().enumerate() {
        for (import_index, import) in file.imports.iter_mut().enumerate() {
            import.definition_id = resolved[file_index][import_index].take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDefinition, FunctionDefinition, ImportStatement, ImportType, MethodDefinition, VariableDeclaration};

    #[test]
    fn function_references_sibling_function_and_class() {
        let mut file = CodeFile::new("pkg/a.py", "");
        file.push_class(ClassDefinition::new("pkg/a.py", "Widget"));
        let mut function = FunctionDefinition::new("pkg/a.py", "helper");
        function.raw = "def helper():\n    return 1\n".to_string();
        file.push_function(function);
        let mut caller = FunctionDefinition::new("pkg/a.py", "main");
        caller.raw = "def main():\n    return Widget(), helper()\n".to_string();
        file.push_function(caller);

        resolve_intra_file(&mut file);

        let main = &file.functions[1];
        let names: Vec<&str> = main.references.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Widget"));
        assert!(names.contains(&"helper"));
    }

    #[test]
    fn method_self_reference_resolves_sibling_method() {
        let mut file = CodeFile::new("pkg/a.py", "");
        let mut class = ClassDefinition::new("pkg/a.py", "A");
        let mut helper = MethodDefinition::new("helper");
        helper.raw = "    def helper(self):\n        return 1\n".to_string();
        class.add_method(helper);
        let mut caller = MethodDefinition::new("run");
        caller.raw = "    def run(self):\n        return self.helper()\n".to_string();
        class.add_method(caller);
        file.push_class(class);

        resolve_intra_file(&mut file);

        let run = &file.classes[0].methods[1];
        assert!(run.references.iter().any(|r| r.name == "helper"));
    }

    #[test]
    fn class_base_matches_top_level_class() {
        let mut file = CodeFile::new("pkg/a.py", "");
        file.push_class(ClassDefinition::new("pkg/a.py", "Base"));
        let mut child = ClassDefinition::new("pkg/a.py", "Child");
        child.bases.push("Base".to_string());
        file.push_class(child);

        resolve_intra_file(&mut file);

        let child = &file.classes[1];
        assert_eq!(child.bases_references.len(), 1);
        assert_eq!(child.bases_references[0].unique_id.as_deref(), Some("pkg.a.Base"));
    }

    #[test]
    fn variable_value_reference_is_counted() {
        let mut file = CodeFile::new("pkg/a.py", "");
        file.push_function(FunctionDefinition::new("pkg/a.py", "make"));
        let mut variable = VariableDeclaration::new("pkg/a.py", "instance");
        variable.value = Some("make()".to_string());
        file.push_variable(variable);

        resolve_intra_file(&mut file);

        assert!(file.variables[0].references.iter().any(|r| r.name == "make"));
    }

    #[test]
    fn function_references_imported_name() {
        let mut file = CodeFile::new("pkg/b.py", "");
        let mut import = ImportStatement::new("pkg/b.py", "pkg.a", ImportType::Absolute);
        import.name = Some("Widget".to_string());
        file.push_import(import);
        let mut make = FunctionDefinition::new("pkg/b.py", "make");
        make.raw = "def make():\n    return Widget()\n".to_string();
        file.push_function(make);

        resolve_intra_file(&mut file);

        let make = &file.functions[0];
        let widget_ref = make.references.iter().find(|r| r.name == "Widget").expect("Widget reference");
        assert_eq!(widget_ref.reference_type, ReferenceType::Import);
        assert_eq!(widget_ref.unique_id.as_deref(), Some("pkg.a.Widget"));
    }

    fn convention() -> HashMap<Language, ImportPathConvention> {
        let mut map = HashMap::new();
        map.insert(
            Language::Python,
            ImportPathConvention { index_filenames: vec!["__init__"], uses_leading_dots: true },
        );
        map
    }

    #[test]
    fn absolute_import_resolves_to_known_id() {
        let mut a = CodeFile::new("pkg/a.py", "");
        a.push_class(ClassDefinition::new("pkg/a.py", "Widget"));
        let mut b = CodeFile::new("pkg/b.py", "");
        let mut import = ImportStatement::new("pkg/b.py", "pkg.a", ImportType::Absolute);
        import.name = Some("Widget".to_string());
        b.push_import(import);

        let mut codebase = CodeBase::from_files(vec![a, b]);
        resolve_inter_files_dependencies(&mut codebase, &convention());

        assert_eq!(codebase.file("pkg/b.py").unwrap().imports[0].definition_id.as_deref(), Some("pkg.a.Widget"));
    }

    #[test]
    fn relative_import_resolves_within_package() {
        let mut a = CodeFile::new("pkg/a.py", "");
        a.push_function(FunctionDefinition::new("pkg/a.py", "helper"));
        let mut b = CodeFile::new("pkg/b.py", "");
        let mut import = ImportStatement::new("pkg/b.py", ".a", ImportType::Relative);
        import.name = Some("helper".to_string());
        b.push_import(import);

        let mut codebase = CodeBase::from_files(vec![a, b]);
        resolve_inter_files_dependencies(&mut codebase, &convention());

        assert_eq!(codebase.file("pkg/b.py").unwrap().imports[0].definition_id.as_deref(), Some("pkg.a.helper"));
    }

    #[test]
    fn reexport_through_package_index_resolves_one_hop() {
        let mut a = CodeFile::new("pkg/a.py", "");
        a.push_class(ClassDefinition::new("pkg/a.py", "Widget"));

        let mut init = CodeFile::new("pkg/__init__.py", "");
        let mut reexport = ImportStatement::new("pkg/__init__.py", ".a", ImportType::Relative);
        reexport.name = Some("Widget".to_string());
        init.push_import(reexport);

        let mut c = CodeFile::new("app.py", "");
        let mut import = ImportStatement::new("app.py", "pkg", ImportType::Absolute);
        import.name = Some("Widget".to_string());
        c.push_import(import);

        let mut codebase = CodeBase::from_files(vec![a, init, c]);
        resolve_inter_files_dependencies(&mut codebase, &convention());

        assert_eq!(codebase.file("app.py").unwrap().imports[0].definition_id.as_deref(), Some("pkg.a.Widget"));
    }

    #[test]
    fn unresolved_import_leaves_definition_id_none() {
        let b = CodeFile::new("pkg/b.py", "");
        let mut codebase = CodeBase::from_files(vec![b]);
        codebase.file_mut("pkg/b.py").unwrap().push_import(ImportStatement::new("pkg/b.py", "nope", ImportType::Absolute));
        codebase.rebuild_caches();
        resolve_inter_files_dependencies(&mut codebase, &convention());
        assert_eq!(codebase.file("pkg/b.py").unwrap().imports[0].definition_id, None);
    }
}
