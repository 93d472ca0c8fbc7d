//! On-disk persistence for an ingested [`crate::model::CodeBase`] and the
//! incremental update path built on top of it.

mod persistence;

pub use persistence::{check_for_updates, ChangeSet, IndexPersistence};
