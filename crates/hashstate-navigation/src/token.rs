//! Navigation tokens
//!
//! A token is the location fragment with one leading marker removed.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKER: char = '#';

/// The character that introduces the fragment in a raw location value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker(char);

impl Marker {
    pub fn new(marker: char) -> Self {
        Self(marker)
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// Strip exactly one leading marker, if present.
    pub fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        raw.strip_prefix(self.0).unwrap_or(raw)
    }

    /// The raw fragment that encodes `token`.
    pub fn encode(&self, token: &str) -> String {
        let mut fragment = String::with_capacity(token.len() + self.0.len_utf8());
        fragment.push(self.0);
        fragment.push_str(token);
        fragment
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self(DEFAULT_MARKER)
    }
}

/// Normalize with the default `#` marker.
pub fn normalize(raw: &str) -> &str {
    Marker::default().normalize(raw)
}
