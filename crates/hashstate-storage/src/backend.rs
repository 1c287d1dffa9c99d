//! Storage backend contract

use serde::{Deserialize, Serialize};

use crate::envelope::StateEnvelope;
use crate::Result;

/// Whether stored state outlives the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Persistent,
    Volatile,
}

impl StorageKind {
    pub fn is_persistent(&self) -> bool {
        matches!(self, StorageKind::Persistent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Persistent => "persistent",
            StorageKind::Volatile => "volatile",
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token -> envelope association.
///
/// `set` overwrites any previous entry for the token. `get` returns `None`
/// for tokens never set and always for the empty token. Entries are never
/// removed by the engine.
pub trait StateStore: Send + Sync {
    fn set(&self, token: &str, envelope: &StateEnvelope) -> Result<()>;

    fn get(&self, token: &str) -> Result<Option<StateEnvelope>>;

    fn kind(&self) -> StorageKind;
}
