//! Lightweight parsers for languages other than Python.
//!
//! Python is the one fully-structural parser (see [`super::python`]);
//! every other recognized language gets a regex-based import extractor
//! here. These never fail on malformed input — a line that doesn't match
//! the import pattern is simply skipped, so `parse_file` always returns a
//! `CodeFile`, even an empty one.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ImportPathConvention, Language, LanguageParser};
use crate::error::ParseError;
use crate::model::{CodeFile, ImportStatement, ImportType};

/// One stub per language, parametrized by the regexes and conventions
/// that differ between them.
pub struct StubParser {
    language: Language,
    import_patterns: &'static [&'static Lazy<Regex>],
    convention: ImportPathConvention,
}

impl StubParser {
    pub fn javascript() -> Self {
        Self {
            language: Language::JavaScript,
            import_patterns: JS_PATTERNS,
            convention: ImportPathConvention {
                index_filenames: vec!["index"],
                uses_leading_dots: false,
            },
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
            import_patterns: JS_PATTERNS,
            convention: ImportPathConvention {
                index_filenames: vec!["index"],
                uses_leading_dots: false,
            },
        }
    }

    pub fn go() -> Self {
        Self {
            language: Language::Go,
            import_patterns: GO_PATTERNS,
            convention: ImportPathConvention::default(),
        }
    }

    pub fn rust() -> Self {
        Self {
            language: Language::Rust,
            import_patterns: RUST_PATTERNS,
            convention: ImportPathConvention {
                index_filenames: vec!["mod"],
                uses_leading_dots: false,
            },
        }
    }

    pub fn java() -> Self {
        Self {
            language: Language::Java,
            import_patterns: JAVA_PATTERNS,
            convention: ImportPathConvention::default(),
        }
    }
}

impl LanguageParser for StubParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse_file(&self, file_path: &str, source: &str) -> Result<CodeFile, ParseError> {
        let mut file = CodeFile::new(file_path, source);
        for (line_no, line) in file.raw.clone().lines().enumerate() {
            for pattern in self.import_patterns {
                if let Some(captures) = pattern.captures(line) {
                    if let Some(source_path) = captures.name("path") {
                        let mut import = ImportStatement::new(
                            file_path,
                            source_path.as_str().to_string(),
                            ImportType::Absolute,
                        );
                        import.raw = line.to_string();
                        if let Some(name) = captures.name("name") {
                            import.name = Some(name.as_str().to_string());
                        }
                        if let Some(alias) = captures.name("alias") {
                            import.alias = Some(alias.as_str().to_string());
                        }
                        let _ = line_no;
                        file.push_import(import);
                    }
                }
            }
        }
        Ok(file)
    }

    fn import_path_convention(&self) -> ImportPathConvention {
        self.convention.clone()
    }
}

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+(?:(?P<name>[\w{}, *]+)\s+from\s+)?['"](?P<path>[^'"]+)['"]"#).unwrap()
});
static JS_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\(\s*['"](?P<path>[^'"]+)['"]\s*\)"#).unwrap()
});
static GO_IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:(?P<alias>\w+)\s+)?"(?P<path>[^"]+)"\s*$"#).unwrap()
});
static RUST_USE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:pub\s+)?use\s+(?P<path>[\w:]+)(?:\s+as\s+(?P<alias>\w+))?\s*;"#).unwrap()
});
static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+(?:static\s+)?(?P<path>[\w.]+)\s*;"#).unwrap()
});

static JS_PATTERNS: &[&Lazy<Regex>] = &[&JS_IMPORT, &JS_REQUIRE];
static GO_PATTERNS: &[&Lazy<Regex>] = &[&GO_IMPORT_LINE];
static RUST_PATTERNS: &[&Lazy<Regex>] = &[&RUST_USE];
static JAVA_PATTERNS: &[&Lazy<Regex>] = &[&JAVA_IMPORT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_stub_extracts_named_import() {
        let parser = StubParser::javascript();
        let file = parser.parse_file("pkg/a.js", "import { x } from \"./util\";\n").unwrap();
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].source, "./util");
    }

    #[test]
    fn rust_stub_extracts_use_with_alias() {
        let parser = StubParser::rust();
        let file = parser.parse_file("pkg/a.rs", "use std::io::Result as IoResult;\n").unwrap();
        assert_eq!(file.imports[0].source, "std::io::Result");
        assert_eq!(file.imports[0].alias.as_deref(), Some("IoResult"));
    }

    #[test]
    fn java_stub_extracts_dotted_import() {
        let parser = StubParser::java();
        let file = parser.parse_file("pkg/A.java", "import java.util.List;\n").unwrap();
        assert_eq!(file.imports[0].source, "java.util.List");
    }

    #[test]
    fn malformed_lines_never_error() {
        let parser = StubParser::go();
        let file = parser.parse_file("pkg/a.go", "func main() {\n\t// not an import\n}\n").unwrap();
        assert!(file.imports.is_empty());
    }
}
