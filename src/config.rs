//! Layered configuration for the code intelligence pipeline.
//!
//! - Default values
//! - Optional `codetrace.toml` file
//! - Environment variable overrides, prefixed `CT_`, `__` separating
//!   nested levels (e.g. `CT_INDEXING__MAX_CONCURRENT_TASKS=16`)

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for file discovery and the parsing orchestrator.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Maximum number of files being parsed concurrently.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Number of parse results drained per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Name of the ignore file to load at the repo root.
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,

    /// Extra ignore patterns layered on top of the ignore file.
    #[serde(default)]
    pub extra_ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Settings for context retrieval.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_context_depth")]
    pub default_depth: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Settings for the lexical search index.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_k1")]
    pub k1: f64,

    #[serde(default = "default_b")]
    pub b: f64,

    /// Candidate-set size above which query scoring switches to parallel chunks.
    #[serde(default = "default_candidate_threshold")]
    pub candidate_threshold: usize,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Weight applied to the exact-substring score in smart search fusion.
    #[serde(default = "default_exact_match_boost")]
    pub exact_match_boost: f64,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

/// Settings for persistence.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "default_true")]
    pub include_cached_ids: bool,
}

/// Logging level configuration, consumed by [`crate::logging`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_max_concurrent_tasks() -> usize {
    50
}
fn default_batch_size() -> usize {
    128
}
fn default_ignore_file() -> String {
    ".gitignore".to_string()
}
fn default_context_depth() -> usize {
    1
}
fn default_max_depth() -> usize {
    8
}
fn default_k1() -> f64 {
    1.5
}
fn default_b() -> f64 {
    0.75
}
fn default_candidate_threshold() -> usize {
    20
}
fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}
fn default_exact_match_boost() -> f64 {
    0.5
}
fn default_top_k() -> usize {
    10
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from(".codetrace")
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            context: ContextConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            batch_size: default_batch_size(),
            ignore_file: default_ignore_file(),
            extra_ignore_patterns: Vec::new(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_depth: default_context_depth(),
            max_depth: default_max_depth(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            candidate_threshold: default_candidate_threshold(),
            worker_count: default_worker_count(),
            exact_match_boost: default_exact_match_boost(),
            default_top_k: default_top_k(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            include_cached_ids: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    langs.insert(
        "python".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["py".to_string(), "pyi".to_string()],
        },
    );
    langs.insert(
        "javascript".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["js".to_string(), "jsx".to_string(), "mjs".to_string()],
        },
    );
    langs.insert(
        "typescript".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["ts".to_string(), "tsx".to_string()],
        },
    );
    langs
}

impl Settings {
    /// Load configuration from all sources: defaults, `codetrace.toml`
    /// (searched from the current directory upward), then `CT_`-prefixed
    /// environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path =
            Self::find_config().unwrap_or_else(|| PathBuf::from("codetrace.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(
                Env::prefixed("CT_").map(|key| {
                    key.as_str().to_lowercase().replace("__", ".").into()
                }),
            )
            .extract()
    }

    /// Load configuration from a specific file, still layered over defaults
    /// and environment variables.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CT_").split("__"))
            .extract()
    }

    fn find_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let candidate = ancestor.join("codetrace.toml");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Write the current settings to a TOML file, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.indexing.max_concurrent_tasks, 50);
        assert_eq!(settings.indexing.batch_size, 128);
        assert_eq!(settings.context.default_depth, 1);
        assert_eq!(settings.search.k1, 1.5);
        assert_eq!(settings.search.b, 0.75);
        assert!(settings.languages.contains_key("python"));
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codetrace.toml");
        std::fs::write(
            &path,
            r#"
[indexing]
max_concurrent_tasks = 4
batch_size = 16

[search]
k1 = 1.2
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.indexing.max_concurrent_tasks, 4);
        assert_eq!(settings.indexing.batch_size, 16);
        assert_eq!(settings.search.k1, 1.2);
        // untouched defaults survive
        assert_eq!(settings.search.b, 0.75);
        assert_eq!(settings.context.default_depth, 1);
    }

    #[test]
    fn save_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codetrace.toml");
        let mut settings = Settings::default();
        settings.indexing.max_concurrent_tasks = 7;
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.indexing.max_concurrent_tasks, 7);
    }
}
