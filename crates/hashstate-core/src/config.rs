//! Emulation configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use hashstate_navigation::{Marker, DEFAULT_MARKER, DEFAULT_POLL_INTERVAL};
use hashstate_storage::DEFAULT_QUOTA_BYTES;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Polling interval in milliseconds, only used in polling mode
    pub poll_interval_ms: u64,
    /// Character that prefixes the token in the location fragment
    pub marker: char,
    /// Byte budget of the persistent store's scope
    pub storage_quota_bytes: usize,
    /// Database file for the persistent store; in-memory when unset
    pub database_path: Option<PathBuf>,
    /// Scope to resume in the persistent store; a fresh one when unset
    pub session_scope: Option<String>,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: Some(data_dir.join("hashstate.db")),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.storage_quota_bytes == 0 {
            return Err(CoreError::Config(
                "storage_quota_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn marker(&self) -> Marker {
        Marker::new(self.marker)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            marker: DEFAULT_MARKER,
            storage_quota_bytes: DEFAULT_QUOTA_BYTES,
            database_path: None,
            session_scope: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.marker(), Marker::default());
        assert!(config.database_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = Config::from_json(r#"{"poll_interval_ms": 250}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.marker, '#');
        assert_eq!(config.storage_quota_bytes, DEFAULT_QUOTA_BYTES);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Config::from_json(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_data_dir() {
        let config = Config::new(PathBuf::from("/tmp/app"));
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/app/hashstate.db"))
        );
    }
}
