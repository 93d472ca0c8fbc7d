//! File discovery: walk a root directory, apply ignore rules, and
//! classify the surviving files by language.
//!
//! Deliberately hand-rolled rather than built on the `ignore` crate's
//! gitignore engine: the matching rules below (directory-anchored
//! patterns, `**` globs, negation) are exactly the subset `walkdir` needs
//! driven externally, and keeping the translation explicit makes the
//! edge cases (a leading `/`, a trailing `/`, `!`-negation) easy to test
//! in isolation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::DiscoveryError;
use crate::parsing::{is_binary_extension, Language};

#[derive(Debug, Clone)]
struct IgnoreRule {
    pattern: Pattern,
    negated: bool,
    directory_only: bool,
    anchored: bool,
}

/// Compiled ignore rules for one root, built once and reused across an
/// entire walk.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreSet {
    pub fn from_lines(lines: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let rules = lines.into_iter().filter_map(|line| translate_gitignore_line(line.as_ref())).collect();
        Self { rules }
    }

    pub fn load(root: &Path, ignore_file: &str) -> Result<Self, DiscoveryError> {
        let path = root.join(ignore_file);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| DiscoveryError::IgnoreFileRead { path: path.clone(), source: e })?;
        Ok(Self::from_lines(contents.lines()))
    }

    pub fn extend_with_patterns(&mut self, patterns: &[String]) {
        self.rules.extend(patterns.iter().filter_map(|p| translate_gitignore_line(p)));
    }

    /// Whether `relative_path` (forward-slash, root-relative) is ignored.
    /// Later rules override earlier ones, and a negated rule can
    /// un-ignore a path matched by an earlier rule — standard gitignore
    /// precedence.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.directory_only && !is_dir {
                continue;
            }
            let matched = if rule.anchored {
                rule.pattern.matches(relative_path)
            } else {
                rule.pattern.matches(relative_path)
                    || relative_path.split('/').next_back().map(|last| rule.pattern.matches(last)).unwrap_or(false)
            };
            if matched {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}

/// Translate one `.gitignore` line into a glob [`Pattern`] plus the
/// modifiers (`!` negation, trailing-`/` directory-only, leading-`/`
/// anchoring) gitignore attaches to it. Blank lines and `#` comments
/// translate to `None`.
fn translate_gitignore_line(line: &str) -> Option<IgnoreRule> {
    let trimmed = line.trim_end();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let mut rest = trimmed;
    let negated = rest.starts_with('!');
    if negated {
        rest = &rest[1..];
    }
    let directory_only = rest.ends_with('/');
    if directory_only {
        rest = &rest[..rest.len() - 1];
    }
    let anchored = rest.starts_with('/');
    if anchored {
        rest = &rest[1..];
    }
    let glob_source = if rest.contains('/') || anchored {
        rest.to_string()
    } else {
        format!("**/{rest}")
    };
    let pattern = Pattern::new(&glob_source).ok()?;
    Some(IgnoreRule { pattern, negated, directory_only, anchored })
}

/// The result of a discovery pass: every parseable file found, grouped
/// by language, plus the count of files skipped as binary/ignored for
/// logging.
#[derive(Debug, Default)]
pub struct DiscoveryResult {
    pub by_language: HashMap<Language, Vec<PathBuf>>,
    pub skipped_binary: usize,
    pub skipped_ignored: usize,
}

impl DiscoveryResult {
    pub fn total_files(&self) -> usize {
        self.by_language.values().map(|v| v.len()).sum()
    }
}

/// Walk `root`, applying `ignore` and an optional language allow-list,
/// and classify surviving files by [`Language`]. Binary/media extensions
/// and files `Language::from_path` can't classify are skipped outright.
pub fn discover(root: &Path, ignore: &IgnoreSet, languages: Option<&[Language]>) -> Result<DiscoveryResult, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::InvalidRoot(root.to_path_buf()));
    }

    let mut result = DiscoveryResult::default();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let Ok(relative) = entry.path().strip_prefix(root) else { return true };
        if relative.as_os_str().is_empty() {
            return true;
        }
        let relative_str = normalize_for_match(relative);
        !ignore.is_ignored(&relative_str, entry.file_type().is_dir())
    });

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else { continue };
        if is_binary_extension(ext) {
            result.skipped_binary += 1;
            continue;
        }
        let Some(language) = Language::from_path(path) else { continue };
        if !language.is_parseable() {
            continue;
        }
        if let Some(allowed) = languages {
            if !allowed.contains(&language) {
                continue;
            }
        }
        result.by_language.entry(language).or_default().push(path.to_path_buf());
    }

    Ok(result)
}

fn normalize_for_match(path: &Path) -> String {
    path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn translates_negation_and_directory_rules() {
        let ignore = IgnoreSet::from_lines(["*.log", "!keep.log", "build/"]);
        assert!(ignore.is_ignored("a.log", false));
        assert!(!ignore.is_ignored("keep.log", false));
        assert!(ignore.is_ignored("build", true));
        assert!(!ignore.is_ignored("build", false));
    }

    #[test]
    fn anchored_pattern_only_matches_from_root() {
        let ignore = IgnoreSet::from_lines(["/only_root.py"]);
        assert!(ignore.is_ignored("only_root.py", false));
        assert!(!ignore.is_ignored("pkg/only_root.py", false));
    }

    #[test]
    fn discover_classifies_and_skips_binary_and_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/a.py", "x = 1\n");
        write(dir.path(), "pkg/logo.png", "binary");
        write(dir.path(), ".gitignore", "build/\n");
        write(dir.path(), "build/skip.py", "x = 1\n");

        let ignore = IgnoreSet::load(dir.path(), ".gitignore").unwrap();
        let result = discover(dir.path(), &ignore, None).unwrap();

        assert_eq!(result.total_files(), 1);
        assert_eq!(result.skipped_binary, 1);
        assert!(result.by_language.get(&Language::Python).unwrap().iter().any(|p| p.ends_with("a.py")));
    }

    #[test]
    fn language_filter_restricts_results() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        write(dir.path(), "a.rs", "fn main() {}\n");
        let ignore = IgnoreSet::default();
        let result = discover(dir.path(), &ignore, Some(&[Language::Python])).unwrap();
        assert_eq!(result.total_files(), 1);
        assert!(result.by_language.contains_key(&Language::Python));
        assert!(!result.by_language.contains_key(&Language::Rust));
    }

    #[test]
    fn invalid_root_errors() {
        let err = discover(Path::new("/nonexistent/path/xyz"), &IgnoreSet::default(), None);
        assert!(matches!(err, Err(DiscoveryError::InvalidRoot(_))));
    }
}
