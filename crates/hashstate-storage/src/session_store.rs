//! Persistent backend
//!
//! Envelopes are written as JSON text into a scope of the
//! `session_storage` table, one row per token. A scope plays the role of a
//! browsing session: reopening the same database with the same scope id
//! restores every envelope pushed before.

use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::backend::{StateStore, StorageKind};
use crate::database::Database;
use crate::envelope::StateEnvelope;
use crate::error::StorageError;
use crate::Result;

/// Per-scope byte budget, matching the usual session storage limit.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub struct SessionStore {
    db: Database,
    scope: String,
    quota_bytes: usize,
}

impl SessionStore {
    /// Open a store under a freshly generated scope.
    pub fn new(db: Database) -> Self {
        Self::with_scope(db, uuid::Uuid::new_v4().to_string())
    }

    /// Open a store under an existing scope id.
    pub fn with_scope(db: Database, scope: String) -> Self {
        Self {
            db,
            scope,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    /// Bytes currently used by this scope (keys plus values).
    pub fn used_bytes(&self) -> Result<usize> {
        self.db.with_connection(|conn| {
            let used: i64 = conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
                 FROM session_storage WHERE scope = ?1",
                [&self.scope],
                |row| row.get(0),
            )?;
            Ok(used as usize)
        })
    }
}

impl StateStore for SessionStore {
    fn set(&self, token: &str, envelope: &StateEnvelope) -> Result<()> {
        let value = serde_json::to_string(envelope)?;
        let updated_at = Utc::now().to_rfc3339();

        self.db.transaction(|conn| {
            let others: i64 = conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
                 FROM session_storage WHERE scope = ?1 AND key != ?2",
                rusqlite::params![self.scope, token],
                |row| row.get(0),
            )?;

            let needed = others as usize + token.len() + value.len();
            if needed > self.quota_bytes {
                return Err(StorageError::QuotaExceeded {
                    scope: self.scope.clone(),
                    needed,
                    quota: self.quota_bytes,
                });
            }

            conn.execute(
                "INSERT OR REPLACE INTO session_storage (scope, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![self.scope, token, value, updated_at],
            )?;
            Ok(())
        })?;

        tracing::trace!(scope = %self.scope, token = %token, bytes = value.len(), "Stored envelope");
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<StateEnvelope>> {
        if token.is_empty() {
            return Ok(None);
        }

        let value: Option<String> = self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM session_storage WHERE scope = ?1 AND key = ?2",
                    rusqlite::params![self.scope, token],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match value {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Persistent
    }
}
