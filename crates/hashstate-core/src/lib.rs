//! Hashstate Core
//!
//! Installs `pushState` / `replaceState` / `onpopstate` emulation on a host
//! whose navigation history only understands location fragments. The host
//! describes itself through `Capabilities`; everything else is decided once
//! at install time.

mod capabilities;
mod config;
mod error;
mod history;

pub use capabilities::Capabilities;
pub use config::Config;
pub use error::CoreError;
pub use history::{History, HistoryBuilder, Installation};

// Re-export core components
pub use hashstate_navigation::{
    normalize, ChangeDetector, ChangeListener, DetectionMode, Engine, Location, Marker,
    MemoryLocation, NavigationError, PollHandle, PopStateEvent, PopStateHandler,
};
pub use hashstate_storage::{
    Database, MemoryStore, SessionStore, StateEnvelope, StateStore, StorageError, StorageKind,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
