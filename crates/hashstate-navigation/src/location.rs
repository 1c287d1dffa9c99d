//! Visible location
//!
//! The location fragment is the only channel to the host's navigation
//! history. `MemoryLocation` is a complete in-process host: an entry list
//! with a cursor, back/forward traversal and optional native change events.

use parking_lot::{Mutex, RwLock};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use url::Url;

use crate::error::NavigationError;
use crate::Result;

/// Called after the host's fragment changed. Takes no arguments: receivers
/// re-read the location themselves.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

pub trait Location: Send + Sync {
    /// Raw fragment, including the leading marker when one is present.
    fn fragment(&self) -> String;

    /// Navigate to `fragment`, adding a history entry.
    fn push_fragment(&self, fragment: &str);

    /// Overwrite the current history entry with `fragment`.
    fn replace_fragment(&self, fragment: &str);

    /// Register for native change notifications. Returns `false` when the
    /// host cannot deliver them.
    fn listen(&self, listener: ChangeListener) -> bool;
}

struct Entries {
    base: Url,
    list: Vec<String>,
    index: usize,
}

impl Entries {
    fn current(&self) -> &str {
        &self.list[self.index]
    }
}

pub struct MemoryLocation {
    entries: Mutex<Entries>,
    listeners: RwLock<Vec<ChangeListener>>,
    native_events: bool,
}

impl MemoryLocation {
    /// Start at `address`. Its fragment, if any, becomes the first entry,
    /// percent-decoded so it matches what was written before `href`.
    pub fn new(address: &str) -> Result<Self> {
        let mut base =
            Url::parse(address).map_err(|e| NavigationError::InvalidUrl(format!("{address}: {e}")))?;

        let first = match base.fragment() {
            Some(fragment) if !fragment.is_empty() => {
                let decoded = percent_decode_str(fragment)
                    .decode_utf8()
                    .map_err(|e| NavigationError::InvalidUrl(format!("{address}: {e}")))?;
                format!("#{decoded}")
            }
            _ => String::new(),
        };
        base.set_fragment(None);

        Ok(Self {
            entries: Mutex::new(Entries {
                base,
                list: vec![first],
                index: 0,
            }),
            listeners: RwLock::new(Vec::new()),
            native_events: true,
        })
    }

    /// A host that never fires change events; only polling can see changes.
    pub fn without_native_events(mut self) -> Self {
        self.native_events = false;
        self
    }

    pub fn has_native_events(&self) -> bool {
        self.native_events
    }

    /// Number of history entries.
    pub fn len(&self) -> usize {
        self.entries.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the current entry.
    pub fn index(&self) -> usize {
        self.entries.lock().index
    }

    /// Full address of the current entry.
    pub fn href(&self) -> String {
        let entries = self.entries.lock();
        let mut url = entries.base.clone();
        let fragment = entries.current();
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        if !fragment.is_empty() {
            url.set_fragment(Some(fragment));
        }
        url.to_string()
    }

    /// Navigation the user made outside the engine (typing a fragment,
    /// following a link).
    pub fn navigate(&self, fragment: &str) {
        self.push_fragment(fragment);
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move the cursor by `delta` entries. Out-of-range moves do nothing.
    pub fn go(&self, delta: isize) -> bool {
        let changed = {
            let mut entries = self.entries.lock();
            let Some(target) = entries.index.checked_add_signed(delta) else {
                return false;
            };
            if target >= entries.list.len() || target == entries.index {
                return false;
            }
            let before = entries.current().to_string();
            entries.index = target;
            before != entries.current()
        };

        if changed {
            self.notify();
        }
        true
    }

    fn notify(&self) {
        if !self.native_events {
            return;
        }
        // Listeners read the location again, so no lock may be held here
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> String {
        self.entries.lock().current().to_string()
    }

    fn push_fragment(&self, fragment: &str) {
        {
            let mut entries = self.entries.lock();
            // Assigning the current fragment again is not a navigation
            if entries.current() == fragment {
                return;
            }
            let next = entries.index + 1;
            entries.list.truncate(next);
            entries.list.push(fragment.to_string());
            entries.index = next;
        }
        self.notify();
    }

    fn replace_fragment(&self, fragment: &str) {
        {
            let mut entries = self.entries.lock();
            if entries.current() == fragment {
                return;
            }
            let index = entries.index;
            entries.list[index] = fragment.to_string();
        }
        self.notify();
    }

    fn listen(&self, listener: ChangeListener) -> bool {
        if !self.native_events {
            return false;
        }
        self.listeners.write().push(listener);
        true
    }
}
