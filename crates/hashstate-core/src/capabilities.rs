//! Host capabilities
//!
//! Supplied by whoever probes the host. Read once at install time and
//! never re-evaluated.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Host already implements push/replace state; emulation is skipped
    pub native_history: bool,
    /// Host fires an event when the fragment changes
    pub native_change_events: bool,
    /// Host offers a session-scoped key/value text store
    pub session_storage: bool,
    /// Host can serialize state to JSON text
    pub json: bool,
    /// Host advertises capabilities it does not actually honour
    pub broken_legacy_mode: bool,
}

impl Capabilities {
    /// A host with everything except native history.
    pub fn fragment_only() -> Self {
        Self {
            native_history: false,
            native_change_events: true,
            session_storage: true,
            json: true,
            broken_legacy_mode: false,
        }
    }

    pub fn use_native_events(&self) -> bool {
        self.native_change_events && !self.broken_legacy_mode
    }

    pub fn use_persistent_storage(&self) -> bool {
        self.session_storage && self.json && !self.broken_legacy_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_legacy_mode_disables_everything() {
        let caps = Capabilities {
            broken_legacy_mode: true,
            ..Capabilities::fragment_only()
        };
        assert!(!caps.use_native_events());
        assert!(!caps.use_persistent_storage());
    }

    #[test]
    fn test_persistent_storage_needs_json() {
        let caps = Capabilities {
            json: false,
            ..Capabilities::fragment_only()
        };
        assert!(caps.use_native_events());
        assert!(!caps.use_persistent_storage());
    }

    #[test]
    fn test_default_is_bare_host() {
        let caps = Capabilities::default();
        assert!(!caps.native_history);
        assert!(!caps.use_native_events());
        assert!(!caps.use_persistent_storage());
    }
}
