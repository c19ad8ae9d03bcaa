//! Terminal session identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for session ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a terminal session.
///
/// IDs come from a process-wide atomic counter and are displayed as
/// `term-XXXXXXXX` (hexadecimal). They are the handle an automation
/// client uses to poll a terminal's output later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new unique session ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Create a SessionId from a raw u64 value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term-{:08x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = crate::error::ShellBridgeError;

    /// Accepts `term-<hex>` as displayed, or a bare decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix("term-")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .or_else(|| s.parse::<u64>().ok())
            .map(SessionId)
            .ok_or_else(|| crate::error::ShellBridgeError::SessionNotFound(s.into()))
    }
}
