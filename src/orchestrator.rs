//! Parser Registry & Orchestrator: the public [`ingest`] entry point that
//! ties file discovery, per-language parsing, and dependency resolution
//! together into one `CodeBase`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Settings;
use crate::discovery::{discover, IgnoreSet};
use crate::error::CodetraceResult;
use crate::model::CodeBase;
use crate::parsing::{Language, LanguageParser, ParserRegistry};
use crate::{debug_event, log_event};

/// Walk `root`, parse every enabled-language file found, resolve
/// intra-file and inter-file references, and return the assembled
/// `CodeBase`. A single file's read or parse failure is logged and that
/// file is dropped from the result; only discovery- and configuration-
/// level failures (a missing root, an unreadable ignore file) are fatal.
pub async fn ingest(root: impl AsRef<Path>, settings: &Settings) -> CodetraceResult<CodeBase> {
    let root = root.as_ref().to_path_buf();

    let mut ignore = IgnoreSet::load(&root, &settings.indexing.ignore_file)?;
    ignore.extend_with_patterns(&settings.indexing.extra_ignore_patterns);

    let enabled = enabled_languages(settings);
    let discovery = discover(&root, &ignore, Some(&enabled))?;
    log_event!(
        "orchestrator",
        "discovery",
        "{} file(s) across {} language(s), skipped {} binary / {} ignored",
        discovery.total_files(),
        discovery.by_language.len(),
        discovery.skipped_binary,
        discovery.skipped_ignored
    );

    let (files, conventions) = parse_grouped(&root, discovery.by_language, settings).await;

    let mut codebase = CodeBase::from_files(files);
    crate::resolver::resolve_inter_files_dependencies(&mut codebase, &conventions);

    log_event!(
        "orchestrator",
        "ingest-complete",
        "{} file(s), {} element id(s) cached",
        codebase.root.len(),
        codebase.cached_ids().len()
    );
    Ok(codebase)
}

/// Parse every file in `by_language` under bounded concurrency, returning
/// the parsed `CodeFile`s alongside each language's import convention.
/// Shared by [`ingest`] and [`crate::storage::check_for_updates`] so both
/// code paths attach references the same way.
pub(crate) async fn parse_grouped(
    root: &Path,
    by_language: HashMap<Language, Vec<std::path::PathBuf>>,
    settings: &Settings,
) -> (Vec<crate::model::CodeFile>, HashMap<Language, crate::parsing::ImportPathConvention>) {
    let registry = Arc::new(ParserRegistry::new());
    let semaphore = Arc::new(Semaphore::new(settings.indexing.max_concurrent_tasks.max(1)));
    let batch_size = settings.indexing.batch_size.max(1);

    let mut files = Vec::new();
    let mut conventions: HashMap<Language, crate::parsing::ImportPathConvention> = HashMap::new();

    for (language, paths) in by_language {
        let parser = match registry.get(language) {
            Ok(Some(parser)) => parser,
            Ok(None) => continue,
            Err(e) => {
                debug_event!("orchestrator", "parser-unavailable", "{:?}: {e}", language);
                continue;
            }
        };
        conventions.insert(language, parser.import_path_convention());

        for chunk in paths.chunks(batch_size) {
            let mut handles = Vec::with_capacity(chunk.len());
            for path in chunk {
                let semaphore = semaphore.clone();
                let parser = parser.clone();
                let root = root.to_path_buf();
                let path = path.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore never closed during ingest");
                    tokio::task::spawn_blocking(move || parse_one(&root, &path, parser.as_ref())).await
                }));
            }
            for handle in handles {
                match handle.await {
                    Ok(Ok(Some(file))) => files.push(file),
                    Ok(Ok(None)) => {}
                    Ok(Err(join_err)) => debug_event!("orchestrator", "parse-task-panic", "{join_err}"),
                    Err(join_err) => debug_event!("orchestrator", "task-join-failed", "{join_err}"),
                }
            }
        }
    }

    (files, conventions)
}

pub(crate) fn enabled_languages(settings: &Settings) -> Vec<Language> {
    crate::parsing::ALL
        .iter()
        .copied()
        .filter(|l| l.is_parseable())
        .filter(|l| {
            settings
                .languages
                .get(l.config_key())
                .map(|cfg| cfg.enabled)
                .unwrap_or(false)
        })
        .collect()
}

fn parse_one(root: &Path, path: &Path, parser: &dyn LanguageParser) -> Option<crate::model::CodeFile> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let file_path = crate::model::normalize_path(&relative.to_string_lossy());

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug_event!("orchestrator", "read-failed", "'{}': {e}", path.display());
            return None;
        }
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(_) => {
            debug_event!("orchestrator", "invalid-utf8", "'{}'", path.display());
            return None;
        }
    };

    let mut file = match parser.parse_file(&file_path, &source) {
        Ok(file) => file,
        Err(e) => {
            debug_event!("orchestrator", "parse-failed", "'{}': {e}", path.display());
            return None;
        }
    };
    parser.resolve_intra_file_dependencies(&mut file);
    Some(file)
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

    #[tokio::test]
    async fn ingest_parses_python_and_resolves_import() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/a.py", "class Widget:\n    pass\n");
        write(dir.path(), "pkg/b.py", "from pkg.a import Widget\n\ndef make():\n    return Widget()\n");

        let settings = Settings::default();
        let codebase = ingest(dir.path(), &settings).await.unwrap();

        assert!(codebase.get("pkg.a.Widget").is_some());
        let b = codebase.file("pkg/b.py").unwrap();
        assert_eq!(b.imports[0].definition_id.as_deref(), Some("pkg.a.Widget"));
        assert!(b.functions[0].references.iter().any(|r| r.name == "Widget"));
    }

    #[tokio::test]
    async fn ingest_skips_disabled_languages() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        write(dir.path(), "a.rs", "fn main() {}\n");

        let mut settings = Settings::default();
        settings.languages.remove("rust");

        let codebase = ingest(dir.path(), &settings).await.unwrap();
        assert!(codebase.file("a.py").is_some());
        assert!(codebase.file("a.rs").is_none());
    }
}
