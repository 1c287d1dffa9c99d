//! Hashstate Storage Layer
//!
//! Associates a navigation token with the state envelope a caller pushed
//! for it. Two interchangeable backends:
//! - `SessionStore`: session-scoped SQLite text store, survives reloads
//! - `MemoryStore`: in-process map, lost with the process

mod backend;
mod database;
mod envelope;
mod error;
mod memory_store;
mod migrations;
mod session_store;

pub use backend::{StateStore, StorageKind};
pub use database::Database;
pub use envelope::StateEnvelope;
pub use error::StorageError;
pub use memory_store::MemoryStore;
pub use session_store::{SessionStore, DEFAULT_QUOTA_BYTES};

pub type Result<T> = std::result::Result<T, StorageError>;
