//! State engine
//!
//! Owns the last known token. Mutations set it before touching the
//! location, so the change they cause is recognised as self-caused when the
//! detector reports it. The dispatcher updates it on every genuine change
//! and notifies the handler exactly once per transition.
//!
//! A mutation and a dispatcher check never interleave: both run under the
//! sequencing lock, so a poll tick on another worker thread sees either the
//! old token with the old location or the new token with the new location.
//! The lock is reentrant because native listeners fire from inside the
//! location write, on the mutating thread.

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};

use hashstate_storage::{StateEnvelope, StateStore, StorageKind};

use crate::detector::PollHandle;
use crate::location::Location;
use crate::token::Marker;
use crate::Result;

/// Argument of the `onpopstate` handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopStateEvent {
    pub state: Value,
}

pub type PopStateHandler = Arc<dyn Fn(&PopStateEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Push,
    Replace,
}

#[derive(Default)]
struct EngineState {
    last_token: String,
    poll: Option<PollHandle>,
}

struct EngineInner {
    sequence: ReentrantMutex<()>,
    state: Mutex<EngineState>,
    store: Arc<dyn StateStore>,
    location: Arc<dyn Location>,
    marker: Marker,
    handler: RwLock<Option<PopStateHandler>>,
}

/// Cloneable handle; clones share one engine state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Handle held by listeners and the polling task so they never keep the
/// engine alive on their own.
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(|inner| Engine { inner })
    }
}

impl Engine {
    /// The last known token starts empty: a location without a fragment is
    /// the home position and produces no event.
    pub fn new(store: Arc<dyn StateStore>, location: Arc<dyn Location>, marker: Marker) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                sequence: ReentrantMutex::new(()),
                state: Mutex::new(EngineState::default()),
                store,
                location,
                marker,
                handler: RwLock::new(None),
            }),
        }
    }

    /// Store `data` under `token` and add a history entry for it.
    pub fn push_state<S>(&self, data: &S, title: Option<&str>, token: &str) -> Result<()>
    where
        S: Serialize + ?Sized,
    {
        self.change_state(serde_json::to_value(data)?, title, token, ChangeKind::Push)
    }

    /// Store `data` under `token` and overwrite the current history entry.
    pub fn replace_state<S>(&self, data: &S, title: Option<&str>, token: &str) -> Result<()>
    where
        S: Serialize + ?Sized,
    {
        self.change_state(serde_json::to_value(data)?, title, token, ChangeKind::Replace)
    }

    fn change_state(
        &self,
        state: Value,
        title: Option<&str>,
        token: &str,
        kind: ChangeKind,
    ) -> Result<()> {
        let envelope = StateEnvelope::new(state, title.map(str::to_string));
        let _sequence = self.inner.sequence.lock();

        // Committed before the location changes
        self.inner.store.set(token, &envelope)?;

        self.inner.state.lock().last_token = token.to_string();

        let fragment = self.inner.marker.encode(token);
        match kind {
            ChangeKind::Push => self.inner.location.push_fragment(&fragment),
            ChangeKind::Replace => self.inner.location.replace_fragment(&fragment),
        }

        tracing::debug!(token = %token, kind = ?kind, "State changed");
        Ok(())
    }

    /// Dispatcher entry point, shared by native events and polling.
    pub fn on_location_signal(&self) {
        let new_token = {
            let _sequence = self.inner.sequence.lock();
            let new_token = self.current_token();
            let mut state = self.inner.state.lock();
            if state.last_token == new_token {
                tracing::trace!(token = %new_token, "False alarm, token unchanged");
                return;
            }
            state.last_token = new_token.clone();
            new_token
        };

        let envelope = if new_token.is_empty() {
            None
        } else {
            match self.inner.store.get(&new_token) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(token = %new_token, error = %e, "Failed to load state envelope");
                    None
                }
            }
        };

        tracing::debug!(token = %new_token, found = envelope.is_some(), "New token");

        let event = PopStateEvent {
            state: envelope.map(|e| e.state).unwrap_or(Value::Null),
        };

        // Cloned out so the handler may replace itself or push state
        let handler = self.inner.handler.read().clone();
        match handler {
            Some(handler) => handler(&event),
            None => tracing::debug!(token = %new_token, "State changed, but no handler"),
        }
    }

    /// One polling check: dispatch only when the token moved.
    pub fn poll(&self) {
        if self.has_pending_change() {
            self.on_location_signal();
        }
    }

    pub fn has_pending_change(&self) -> bool {
        let current = self.current_token();
        self.inner.state.lock().last_token != current
    }

    /// Token encoded by the location right now.
    pub fn current_token(&self) -> String {
        let raw = self.inner.location.fragment();
        self.inner.marker.normalize(&raw).to_string()
    }

    pub fn last_token(&self) -> String {
        self.inner.state.lock().last_token.clone()
    }

    pub fn set_onpopstate<F>(&self, handler: F)
    where
        F: Fn(&PopStateEvent) + Send + Sync + 'static,
    {
        self.set_onpopstate_handler(Arc::new(handler));
    }

    pub fn set_onpopstate_handler(&self, handler: PopStateHandler) {
        *self.inner.handler.write() = Some(handler);
    }

    pub fn clear_onpopstate(&self) {
        *self.inner.handler.write() = None;
    }

    pub fn has_onpopstate(&self) -> bool {
        self.inner.handler.read().is_some()
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.inner.store.kind()
    }

    pub fn location(&self) -> &Arc<dyn Location> {
        &self.inner.location
    }

    pub fn marker(&self) -> Marker {
        self.inner.marker
    }

    /// Stop the polling task, if one is running. Returns whether one was.
    pub fn stop_polling(&self) -> bool {
        match self.inner.state.lock().poll.take() {
            Some(handle) => {
                handle.cancel();
                tracing::debug!("Polling stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .state
            .lock()
            .poll
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub(crate) fn set_poll_handle(&self, handle: PollHandle) {
        if let Some(previous) = self.inner.state.lock().poll.replace(handle) {
            previous.cancel();
        }
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::MemoryLocation;
    use hashstate_storage::{Database, MemoryStore, SessionStore, StorageError};
    use serde_json::json;
    use std::collections::HashMap;

    struct Fixture {
        engine: Engine,
        location: Arc<MemoryLocation>,
        events: Arc<Mutex<Vec<Value>>>,
    }

    /// Engine driven by explicit `poll` calls, like a polling host.
    fn fixture(store: Arc<dyn StateStore>) -> Fixture {
        let location = Arc::new(
            MemoryLocation::new("https://example.com/")
                .unwrap()
                .without_native_events(),
        );
        let engine = Engine::new(store, location.clone(), Marker::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.set_onpopstate(move |event| sink.lock().push(event.state.clone()));

        Fixture {
            engine,
            location,
            events,
        }
    }

    fn memory_fixture() -> Fixture {
        fixture(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_push_does_not_notify_itself() {
        let f = memory_fixture();
        f.engine.push_state(&json!({"x": 1}), Some("T1"), "page1").unwrap();

        assert_eq!(f.location.fragment(), "#page1");
        assert_eq!(f.engine.last_token(), "page1");

        f.engine.poll();
        f.engine.on_location_signal();
        assert!(f.events.lock().is_empty());
    }

    #[test]
    fn test_back_and_forward_scenario() {
        let f = memory_fixture();
        f.engine.push_state(&json!({"x": 1}), Some("T1"), "page1").unwrap();

        f.location.back();
        f.engine.poll();
        assert_eq!(*f.events.lock(), vec![Value::Null]);

        f.location.forward();
        f.engine.poll();
        assert_eq!(*f.events.lock(), vec![Value::Null, json!({"x": 1})]);
    }

    #[test]
    fn test_round_trip_through_persistent_store() {
        let store = SessionStore::new(Database::open_in_memory().unwrap());
        let f = fixture(Arc::new(store));
        let payload = json!({"list": [1, 2.5, "three"], "flag": true, "none": null});

        f.engine.push_state(&payload, None, "t").unwrap();
        f.engine.push_state(&json!("other"), None, "u").unwrap();

        f.location.back();
        f.engine.poll();
        assert_eq!(*f.events.lock(), vec![payload]);
    }

    #[test]
    fn test_repeated_detection_notifies_once() {
        let f = memory_fixture();
        f.engine.push_state(&json!(1), None, "a").unwrap();
        f.location.navigate("#b");

        for _ in 0..5 {
            f.engine.poll();
            f.engine.on_location_signal();
        }
        assert_eq!(*f.events.lock(), vec![Value::Null]);
    }

    #[test]
    fn test_empty_token_ignores_storage() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("", &StateEnvelope::new(json!("home"), None))
            .unwrap();
        let f = fixture(store);

        f.engine.push_state(&json!(1), None, "a").unwrap();
        f.location.back();
        f.engine.poll();

        assert_eq!(*f.events.lock(), vec![Value::Null]);
    }

    #[test]
    fn test_replace_does_not_add_entry() {
        let f = memory_fixture();
        f.engine.push_state(&json!(1), None, "a").unwrap();
        let len = f.location.len();

        f.engine.replace_state(&json!(2), None, "b").unwrap();
        f.engine.poll();

        assert_eq!(f.location.len(), len);
        assert_eq!(f.location.fragment(), "#b");
        assert!(f.events.lock().is_empty());

        // Back skips the replaced entry entirely
        f.location.back();
        f.engine.poll();
        assert_eq!(*f.events.lock(), vec![Value::Null]);
    }

    #[test]
    fn test_unknown_token_dispatches_null() {
        let f = memory_fixture();
        f.location.navigate("#never-pushed");
        f.engine.poll();

        assert_eq!(*f.events.lock(), vec![Value::Null]);
        assert_eq!(f.engine.last_token(), "never-pushed");
    }

    #[test]
    fn test_missing_handler_is_silent() {
        let f = memory_fixture();
        f.engine.clear_onpopstate();
        assert!(!f.engine.has_onpopstate());

        f.location.navigate("#a");
        f.engine.poll();
        assert_eq!(f.engine.last_token(), "a");
        assert!(!f.engine.has_pending_change());
    }

    #[test]
    fn test_serialization_failure_propagates() {
        let f = memory_fixture();
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = f.engine.push_state(&bad, None, "bad").unwrap_err();
        assert!(matches!(err, crate::NavigationError::Serialization(_)));
        assert_eq!(f.location.fragment(), "");
        assert_eq!(f.engine.last_token(), "");
    }

    #[test]
    fn test_quota_failure_leaves_location_untouched() {
        let store = SessionStore::new(Database::open_in_memory().unwrap()).with_quota(16);
        let f = fixture(Arc::new(store));

        let err = f
            .engine
            .push_state(&json!("x".repeat(64)), None, "big")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::NavigationError::Storage(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(f.location.len(), 1);
        assert_eq!(f.engine.last_token(), "");
    }

    #[test]
    fn test_same_token_last_write_wins() {
        let f = memory_fixture();
        f.engine.push_state(&json!("first"), None, "a").unwrap();
        f.engine.push_state(&json!("second"), None, "a").unwrap();
        f.engine.push_state(&json!(null), None, "b").unwrap();

        f.location.back();
        f.engine.poll();
        assert_eq!(*f.events.lock(), vec![json!("second")]);
    }

    #[test]
    fn test_handler_may_push_state() {
        let f = memory_fixture();
        let engine = f.engine.clone();
        f.engine.set_onpopstate(move |event| {
            if event.state.is_null() {
                engine.replace_state(&json!("redirected"), None, "home").unwrap();
            }
        });

        f.location.navigate("#somewhere");
        f.engine.poll();

        assert_eq!(f.location.fragment(), "#home");
        assert!(!f.engine.has_pending_change());
    }
}
