//! On-disk persistence for an ingested codebase, plus the incremental
//! update path that re-parses only files that changed since the last
//! save.
//!
//! `CodeBase` itself is never serialized: its `_cached_elements` and
//! `_cached_ids` fields are process-local caches, rebuilt from `root` on
//! load via [`crate::model::CodeBase::from_files`]. Only the
//! `Vec<CodeFile>` and a content-hash fingerprint per file are written to
//! disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{CodetraceResult, PersistenceError};
use crate::model::CodeBase;
use crate::parsing::Language;

const DUMP_FILE: &str = "codebase.bin";
const FINGERPRINT_FILE: &str = "fingerprints.bin";

#[derive(Debug, Serialize, Deserialize)]
struct Fingerprints {
    by_path: HashMap<String, [u8; 32]>,
}

/// Reads and writes a `CodeBase` dump under a storage directory, using an
/// atomic write-then-rename so a crash mid-save can never leave a
/// half-written dump in place.
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    fn dump_path(&self) -> PathBuf {
        self.base_path.join(DUMP_FILE)
    }

    fn fingerprint_path(&self) -> PathBuf {
        self.base_path.join(FINGERPRINT_FILE)
    }

    pub fn exists(&self) -> bool {
        self.dump_path().is_file()
    }

    /// Serialize `codebase.root` and a fingerprint of each file's content
    /// hash, atomically replacing whatever was there before.
    pub fn save(&self, codebase: &CodeBase) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.base_path).map_err(|e| PersistenceError::Write {
            path: self.base_path.clone(),
            source: e,
        })?;

        let fingerprints = Fingerprints {
            by_path: codebase.root.iter().map(|f| (f.file_path.clone(), f.content_hash)).collect(),
        };

        atomic_write(&self.dump_path(), &codebase.root)?;
        atomic_write(&self.fingerprint_path(), &fingerprints)?;
        Ok(())
    }

    /// Load a previously saved `CodeBase`, rebuilding its caches.
    pub fn load(&self) -> Result<CodeBase, PersistenceError> {
        let files = read_dump(&self.dump_path())?;
        Ok(CodeBase::from_files(files))
    }

    fn load_fingerprints(&self) -> Result<Fingerprints, PersistenceError> {
        let path = self.fingerprint_path();
        if !path.is_file() {
            return Ok(Fingerprints { by_path: HashMap::new() });
        }
        let bytes = std::fs::read(&path).map_err(|e| PersistenceError::Read { path: path.clone(), source: e })?;
        bincode::deserialize(&bytes).map_err(|e| PersistenceError::Decode { path, source: e })
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        if self.base_path.is_dir() {
            std::fs::remove_dir_all(&self.base_path).map_err(|e| PersistenceError::Write {
                path: self.base_path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn atomic_write<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let bytes = bincode::serialize(value).map_err(PersistenceError::Encode)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &bytes).map_err(|e| PersistenceError::Write { path: tmp_path.clone(), source: e })?;
    std::fs::rename(&tmp_path, path).map_err(|e| PersistenceError::Write { path: path.to_path_buf(), source: e })?;
    Ok(())
}

fn read_dump(path: &Path) -> Result<Vec<crate::model::CodeFile>, PersistenceError> {
    if !path.is_file() {
        return Err(PersistenceError::Corrupted(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| PersistenceError::Read { path: path.to_path_buf(), source: e })?;
    bincode::deserialize(&bytes).map_err(|e| PersistenceError::Decode { path: path.to_path_buf(), source: e })
}

/// The result of comparing a fresh directory walk against a saved
/// fingerprint set: which files are new or changed, and which were
/// removed from disk since the last save.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub added_or_modified: Vec<PathBuf>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added_or_modified.is_empty() && self.removed.is_empty()
    }
}

/// Re-ingest only what changed on disk since the last save, instead of
/// reparsing the whole tree: hash every currently-discovered file,
/// compare against the saved fingerprints, reparse the added/modified
/// subset, drop files that disappeared, and re-run cross-file resolution
/// over the merged result.
pub async fn check_for_updates(root: impl AsRef<Path>, settings: &Settings, persistence: &IndexPersistence) -> CodetraceResult<CodeBase> {
    let root = root.as_ref();

    if !persistence.exists() {
        let codebase = crate::orchestrator::ingest(root, settings).await?;
        persistence.save(&codebase)?;
        return Ok(codebase);
    }

    let mut codebase = persistence.load()?;
    let saved_fingerprints = persistence.load_fingerprints()?;

    let mut ignore = crate::discovery::IgnoreSet::load(root, &settings.indexing.ignore_file)?;
    ignore.extend_with_patterns(&settings.indexing.extra_ignore_patterns);
    let enabled = crate::orchestrator::enabled_languages(settings);
    let discovery = crate::discovery::discover(root, &ignore, Some(&enabled))?;

    let change_set = detect_changes(root, &discovery, &saved_fingerprints)?;
    crate::log_event!(
        "storage",
        "change-detection",
        "{} added/modified, {} removed",
        change_set.added_or_modified.len(),
        change_set.removed.len()
    );
    if change_set.is_empty() {
        return Ok(codebase);
    }

    for file_path in &change_set.removed {
        codebase.remove_file(file_path);
    }

    let mut by_language: HashMap<Language, Vec<PathBuf>> = HashMap::new();
    for path in change_set.added_or_modified {
        if let Some(language) = Language::from_path(&path) {
            by_language.entry(language).or_default().push(path);
        }
    }

    let (changed_files, conventions) = crate::orchestrator::parse_grouped(root, by_language, settings).await;
    for file in changed_files {
        codebase.push_file(file);
    }

    crate::resolver::resolve_inter_files_dependencies(&mut codebase, &conventions);
    persistence.save(&codebase)?;
    Ok(codebase)
}

fn detect_changes(root: &Path, discovery: &crate::discovery::DiscoveryResult, saved: &Fingerprints) -> Result<ChangeSet, PersistenceError> {
    let mut seen = std::collections::HashSet::new();
    let mut change_set = ChangeSet::default();

    for paths in discovery.by_language.values() {
        for path in paths {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let file_path = crate::model::normalize_path(&relative.to_string_lossy());
            seen.insert(file_path.clone());

            let Ok(bytes) = std::fs::read(path) else { continue };
            let Ok(source) = String::from_utf8(bytes) else { continue };
            let hash = crate::model::CodeFile::new(&file_path, &source).content_hash;

            match saved.by_path.get(&file_path) {
                Some(existing_hash) if *existing_hash == hash => {}
                _ => change_set.added_or_modified.push(path.clone()),
            }
        }
    }

    for file_path in saved.by_path.keys() {
        if !seen.contains(file_path) {
            change_set.removed.push(file_path.clone());
        }
    }

    Ok(change_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeFile;
    use tempfile::TempDir;

    fn sample_codebase() -> CodeBase {
        let files = vec![CodeFile::new("a.py", "x = 1\n"), CodeFile::new("b.py", "y = 2\n")];
        CodeBase::from_files(files)
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(dir.path().join(".codetrace"));
        let codebase = sample_codebase();

        persistence.save(&codebase).unwrap();
        assert!(persistence.exists());

        let loaded = persistence.load().unwrap();
        assert!(loaded.file("a.py").is_some());
        assert!(loaded.file("b.py").is_some());
        assert!(loaded.get("a.x").is_some());
    }

    #[test]
    fn clear_removes_the_storage_directory() {
        let dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(dir.path().join(".codetrace"));
        persistence.save(&sample_codebase()).unwrap();
        assert!(persistence.exists());

        persistence.clear().unwrap();
        assert!(!persistence.exists());
    }

    #[test]
    fn detect_changes_flags_modified_and_removed_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("b.py"), "y = 2\n").unwrap();

        let ignore = crate::discovery::IgnoreSet::default();
        let discovery = crate::discovery::discover(dir.path(), &ignore, None).unwrap();

        let mut saved = Fingerprints { by_path: HashMap::new() };
        saved.by_path.insert("a.py".to_string(), CodeFile::new("a.py", "x = 0\n").content_hash);
        saved.by_path.insert("c.py".to_string(), [0u8; 32]);

        let change_set = detect_changes(dir.path(), &discovery, &saved).unwrap();
        assert_eq!(change_set.added_or_modified.len(), 2);
        assert_eq!(change_set.removed, vec!["c.py".to_string()]);
    }
}
