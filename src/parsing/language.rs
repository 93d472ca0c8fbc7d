//! Language enumeration and extension→language classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    Ruby,
    Go,
    Rust,
    Swift,
    Php,
    CSharp,
    Kotlin,
    Scala,
    Html,
    Css,
    Xml,
    Yaml,
    Json,
    Markdown,
    Jinja,
    Config,
    Documentation,
    Container,
}

/// Every recognized language tag, for reverse lookups and fleet-wide
/// iteration (discovery summaries, config validation).
pub const ALL: &[Language] = &[
    Language::Python,
    Language::JavaScript,
    Language::TypeScript,
    Language::Java,
    Language::C,
    Language::Cpp,
    Language::Ruby,
    Language::Go,
    Language::Rust,
    Language::Swift,
    Language::Php,
    Language::CSharp,
    Language::Kotlin,
    Language::Scala,
    Language::Html,
    Language::Css,
    Language::Xml,
    Language::Yaml,
    Language::Json,
    Language::Markdown,
    Language::Jinja,
    Language::Config,
    Language::Documentation,
    Language::Container,
];

impl Language {
    /// Stable lowercase key used in configuration (`[languages.python]`).
    pub fn config_key(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Swift => "swift",
            Language::Php => "php",
            Language::CSharp => "csharp",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Html => "html",
            Language::Css => "css",
            Language::Xml => "xml",
            Language::Yaml => "yaml",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::Jinja => "jinja",
            Language::Config => "config",
            Language::Documentation => "documentation",
            Language::Container => "container",
        }
    }

    /// Whether this tag denotes a language a structural parser can run
    /// over. Markup, data, and doc formats are recognized for
    /// discovery/grouping purposes but never handed to a `LanguageParser`.
    pub fn is_parseable(&self) -> bool {
        !matches!(
            self,
            Language::Html
                | Language::Css
                | Language::Xml
                | Language::Yaml
                | Language::Json
                | Language::Markdown
                | Language::Jinja
                | Language::Config
                | Language::Documentation
                | Language::Container
        )
    }

    /// Classify a path by extension.
    pub fn from_path(path: &std::path::Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::from_extension(&ext)
    }

    /// Reverse of [`Language::config_key`], used to map `[languages.*]`
    /// table keys from configuration back to a `Language`.
    pub fn from_config_key(key: &str) -> Option<Language> {
        ALL.iter().copied().find(|l| l.config_key() == key)
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        use Language::*;
        Some(match ext {
            "py" | "pyi" => Python,
            "js" | "jsx" | "mjs" | "cjs" => JavaScript,
            "ts" | "tsx" | "mts" | "cts" => TypeScript,
            "java" => Java,
            "c" | "h" => C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Cpp,
            "rb" => Ruby,
            "go" => Go,
            "rs" => Rust,
            "swift" => Swift,
            "php" => Php,
            "cs" => CSharp,
            "kt" | "kts" => Kotlin,
            "scala" | "sc" => Scala,
            "html" | "htm" => Html,
            "css" | "scss" | "sass" | "less" => Css,
            "xml" => Xml,
            "yaml" | "yml" => Yaml,
            "json" | "json5" => Json,
            "md" | "markdown" => Markdown,
            "jinja" | "jinja2" | "j2" => Jinja,
            "toml" | "ini" | "cfg" | "conf" | "env" => Config,
            "rst" | "txt" => Documentation,
            "dockerfile" => Container,
            _ => return None,
        })
    }
}

/// File extensions treated as binary/media and always skipped by
/// discovery, regardless of language filtering.
pub const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "svg",
    // audio
    "mp3", "wav", "flac", "ogg", "m4a",
    // video
    "mp4", "mov", "avi", "mkv", "webm",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // archives
    "zip", "tar", "gz", "bz2", "7z", "rar", "xz",
    // executables / libraries
    "exe", "dll", "so", "dylib", "bin", "o", "a",
    // docs binaries
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // databases
    "db", "sqlite", "sqlite3",
    // 3D / CAD
    "obj", "fbx", "stl", "blend", "dwg", "step",
];

pub fn is_binary_extension(ext: &str) -> bool {
    BINARY_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn classifies_common_extensions() {
        assert_eq!(Language::from_path(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("a/b.ts")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("a/b.unknown")), None);
    }

    #[test]
    fn markup_languages_are_not_parseable() {
        assert!(!Language::Json.is_parseable());
        assert!(!Language::Markdown.is_parseable());
        assert!(Language::Python.is_parseable());
    }

    #[test]
    fn binary_extensions_are_flagged() {
        assert!(is_binary_extension("PNG"));
        assert!(is_binary_extension("zip"));
        assert!(!is_binary_extension("py"));
    }
}
