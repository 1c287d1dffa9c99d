//! Volatile backend, kept for hosts without session storage

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::backend::{StateStore, StorageKind};
use crate::envelope::StateEnvelope;
use crate::Result;

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StateEnvelope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn set(&self, token: &str, envelope: &StateEnvelope) -> Result<()> {
        self.entries
            .write()
            .insert(token.to_string(), envelope.clone());
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<StateEnvelope>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.entries.read().get(token).cloned())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Volatile
    }
}
