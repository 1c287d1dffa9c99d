//! Hashstate Navigation
//!
//! `push_state` / `replace_state` and a single `onpopstate` handler,
//! emulated on top of the location fragment:
//! 1. Mutations store the state envelope, mark the token as self-caused,
//!    then write `#token` to the location
//! 2. Fragment changes are detected by a native listener or by polling
//! 3. Genuine changes are dispatched once to the registered handler

mod detector;
mod engine;
mod error;
mod location;
mod token;

pub use detector::{ChangeDetector, DetectionMode, PollHandle, DEFAULT_POLL_INTERVAL};
pub use engine::{Engine, PopStateEvent, PopStateHandler};
pub use error::NavigationError;
pub use location::{ChangeListener, Location, MemoryLocation};
pub use token::{normalize, Marker, DEFAULT_MARKER};

pub type Result<T> = std::result::Result<T, NavigationError>;
