//! State envelope stored per navigation token

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `{state, title}` pair a caller associated with a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Arbitrary payload; `Value::Null` when the caller pushed no state
    #[serde(default)]
    pub state: Value,
    /// Advisory only, never read back by the engine
    #[serde(default)]
    pub title: Option<String>,
}

impl StateEnvelope {
    pub fn new(state: Value, title: Option<String>) -> Self {
        Self { state, title }
    }
}
