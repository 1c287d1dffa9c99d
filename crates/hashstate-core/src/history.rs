//! History emulation installer
//!
//! Decides once, from the host's capabilities, whether to emulate at all,
//! which storage backend to use and how fragment changes are detected.

use serde::Serialize;
use std::sync::Arc;

use hashstate_navigation::{
    ChangeDetector, DetectionMode, Engine, Location, PopStateEvent, PopStateHandler,
};
use hashstate_storage::{Database, MemoryStore, SessionStore, StateStore, StorageKind};

use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::Result;

/// Outcome of an install.
pub enum Installation {
    /// The host has its own implementation; nothing was set up.
    Native,
    Emulated(History),
}

impl Installation {
    pub fn is_native(&self) -> bool {
        matches!(self, Installation::Native)
    }

    pub fn history(&self) -> Option<&History> {
        match self {
            Installation::Native => None,
            Installation::Emulated(history) => Some(history),
        }
    }

    pub fn into_history(self) -> Option<History> {
        match self {
            Installation::Native => None,
            Installation::Emulated(history) => Some(history),
        }
    }
}

pub struct HistoryBuilder {
    location: Arc<dyn Location>,
    capabilities: Capabilities,
    config: Config,
    database: Option<Database>,
    handler: Option<PopStateHandler>,
}

impl HistoryBuilder {
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use an already open database for the persistent store instead of
    /// the one named in the config.
    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Handler registered before the initial check, so a page loaded with
    /// a fragment sees its state.
    pub fn onpopstate<F>(mut self, handler: F) -> Self
    where
        F: Fn(&PopStateEvent) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn install(self) -> Result<Installation> {
        if self.capabilities.native_history {
            tracing::info!("pushState already implemented, skipping");
            return Ok(Installation::Native);
        }

        self.config.validate()?;

        let store = self.open_store()?;
        let engine = Engine::new(store, self.location, self.config.marker());
        if let Some(handler) = self.handler {
            engine.set_onpopstate_handler(handler);
        }

        let mode = ChangeDetector::new(engine.clone())
            .with_poll_interval(self.config.poll_interval())
            .start(self.capabilities.use_native_events())?;

        // Loaded mid-navigation: recover that state right away
        if !engine.current_token().is_empty() {
            engine.on_location_signal();
        }

        tracing::info!(
            storage = %engine.storage_kind(),
            detection = %mode,
            "History emulation installed"
        );

        Ok(Installation::Emulated(History { engine, mode }))
    }

    fn open_store(&self) -> Result<Arc<dyn StateStore>> {
        if !self.capabilities.use_persistent_storage() {
            tracing::info!("Using non-persistent storage");
            return Ok(Arc::new(MemoryStore::new()));
        }

        let db = match (&self.database, &self.config.database_path) {
            (Some(db), _) => db.clone(),
            (None, Some(path)) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Database::open(path)?
            }
            (None, None) => Database::open_in_memory()?,
        };

        let store = match &self.config.session_scope {
            Some(scope) => SessionStore::with_scope(db, scope.clone()),
            None => SessionStore::new(db),
        }
        .with_quota(self.config.storage_quota_bytes);

        tracing::info!(scope = %store.scope(), "Using persistent storage");
        Ok(Arc::new(store))
    }
}

/// Emulated history bound to one location.
pub struct History {
    engine: Engine,
    mode: DetectionMode,
}

impl History {
    /// Capabilities default to a bare host: volatile storage and polling,
    /// which needs a tokio runtime at `install`. Pass the host's real
    /// capabilities with `HistoryBuilder::capabilities`.
    pub fn builder(location: Arc<dyn Location>) -> HistoryBuilder {
        HistoryBuilder {
            location,
            capabilities: Capabilities::default(),
            config: Config::default(),
            database: None,
            handler: None,
        }
    }

    pub fn push_state<S>(&self, data: &S, title: Option<&str>, token: &str) -> Result<()>
    where
        S: Serialize + ?Sized,
    {
        Ok(self.engine.push_state(data, title, token)?)
    }

    pub fn replace_state<S>(&self, data: &S, title: Option<&str>, token: &str) -> Result<()>
    where
        S: Serialize + ?Sized,
    {
        Ok(self.engine.replace_state(data, title, token)?)
    }

    pub fn set_onpopstate<F>(&self, handler: F)
    where
        F: Fn(&PopStateEvent) + Send + Sync + 'static,
    {
        self.engine.set_onpopstate(handler);
    }

    pub fn clear_onpopstate(&self) {
        self.engine.clear_onpopstate();
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.engine.storage_kind()
    }

    /// Whether pushed state survives a reload.
    pub fn is_persistent(&self) -> bool {
        self.storage_kind().is_persistent()
    }

    pub fn token(&self) -> String {
        self.engine.last_token()
    }

    pub fn stop_polling(&self) -> bool {
        self.engine.stop_polling()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
