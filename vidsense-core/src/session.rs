//! Session identity and session tokens
//!
//! Two different notions of "session" exist in the client:
//!
//! - [`SessionId`] names the client's signaling channel on the relay. Detection events
//!   carry it so a client can ignore traffic meant for other clients on the same relay.
//! - [`SessionToken`] names one start/stop cycle of the connection lifecycle. Every
//!   awaited operation remembers the token it was issued under; when it resumes after a
//!   newer token has been minted its result is stale and must be discarded.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned to a client's signaling channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a tag received on the wire names this session
    pub fn matches(&self, tag: &str) -> bool {
        self.0 == tag
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic token identifying one lifecycle cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Token that no live session ever holds
    pub const NONE: SessionToken = SessionToken(0);

    /// Raw token value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints strictly increasing session tokens
#[derive(Debug, Default)]
pub struct TokenGenerator {
    last: u64,
}

impl TokenGenerator {
    /// Create a generator whose first token is `#1`
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next token, invalidating every earlier one
    pub fn bump(&mut self) -> SessionToken {
        self.last += 1;
        SessionToken(self.last)
    }

    /// Most recently minted token
    pub fn current(&self) -> SessionToken {
        SessionToken(self.last)
    }

    /// Check whether `token` is still the most recent one
    pub fn is_current(&self, token: SessionToken) -> bool {
        token.0 != 0 && token.0 == self.last
    }
}
