//! Request identifiers for correlating replies with their callers.
//!
//! IDs are short random base-36 strings. Uniqueness against the live pending
//! set is enforced by the pending table, not by the generator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque request identifier carried in the `requestID` envelope field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Source of candidate request IDs.
pub trait IdGenerator: Send + Sync {
    /// Produce the next candidate. May repeat; callers retry on collision.
    fn next_id(&self) -> RequestId;
}

/// Random base-36 generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> RequestId {
        let value: u64 = rand::thread_rng().gen();
        RequestId(to_base36(value))
    }
}

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
