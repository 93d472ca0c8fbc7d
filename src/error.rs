//! Error types for the code intelligence pipeline.
//!
//! One `thiserror` enum per subsystem boundary, folded into a crate-wide
//! [`CodetraceError`] at the top-level entry points. File-local failures
//! (a single file's parse or resolve step) are logged and do not
//! propagate; only configuration and corrupt-state errors do.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from file discovery.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("root path '{0}' does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("failed to read ignore file '{path}': {source}")]
    IgnoreFileRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from a single file's parse. Always caught locally by the
/// orchestrator and logged; never propagated to the caller of `ingest`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },

    #[error("no parser registered for language '{0}'")]
    UnsupportedLanguage(String),

    #[error("tree-sitter failed to produce a syntax tree for '{0}'")]
    SyntaxTreeUnavailable(PathBuf),

    #[error("grammar error in '{path}': {reason}")]
    Grammar { path: PathBuf, reason: String },
}

/// Errors from dependency resolution. Best-effort: never fatal, but
/// surfaced so the orchestrator can log a summary.
#[derive(Error, Debug)]
pub enum DependencyResolutionError {
    #[error("file '{0}' referenced in import resolution was not found in the codebase")]
    MissingFile(String),
}

/// Errors from context retrieval.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("context depth {0} exceeds configured maximum")]
    DepthExceeded(usize),
}

/// Errors from the lexical search index.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search index has not been built yet")]
    IndexNotReady,

    #[error("failed to flush index batch to disk: {reason}")]
    IndexWrite { reason: String },

    #[error("query contained no usable tokens")]
    EmptyQuery,
}

/// Errors from persistence.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode codebase dump at '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: Box<bincode::ErrorKind>,
    },

    #[error("failed to encode codebase dump: {0}")]
    Encode(Box<bincode::ErrorKind>),

    #[error("dump at '{0}' is corrupted")]
    Corrupted(PathBuf),
}

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),

    #[error("bad root path in configuration: {0}")]
    BadRoot(PathBuf),
}

/// Crate-wide error type returned by top-level entry points
/// (`ingest`, `check_for_updates`, `serialize`/`deserialize`).
#[derive(Error, Debug)]
pub enum CodetraceError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    DependencyResolution(#[from] DependencyResolutionError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("operation was cancelled")]
    Cancelled,
}

/// Result alias for crate-wide operations.
pub type CodetraceResult<T> = Result<T, CodetraceError>;

/// Result alias for per-file parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result alias for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistenceError>;
