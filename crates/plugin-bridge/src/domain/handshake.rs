//! Handshake states and bootstrap payload interpretation.
//!
//! ```text
//! Connecting ──(reply carrying a token)──▶ Ready
//! ```
//!
//! `Ready` is terminal. There is no disconnected or retry state.

use crate::domain::envelope::InboundEnvelope;
use crate::domain::token::TokenRecord;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    Ready,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Connecting => f.write_str("connecting"),
            HandshakeState::Ready => f.write_str("ready"),
        }
    }
}

/// What a bootstrap payload means for the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapDecision {
    /// Not a structured envelope; ignore.
    Malformed,
    /// Well-formed but carries no usable token; stay `Connecting`.
    MissingToken,
    /// Handshake completes with this token.
    Complete(TokenRecord),
}

/// Decide what an inbound payload seen during bootstrap means.
pub fn interpret_bootstrap(payload: &str) -> BootstrapDecision {
    match InboundEnvelope::<Option<TokenRecord>>::decode(payload) {
        Ok(envelope) => match envelope.response.data {
            Some(record) => BootstrapDecision::Complete(record),
            None => BootstrapDecision::MissingToken,
        },
        Err(_) => BootstrapDecision::Malformed,
    }
}

/// Outcome of a ready transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced,
    /// Already `Ready`; nothing changed.
    AlreadyReady,
}

/// Monotonic ready flag. Flips from false to true at most once.
#[derive(Debug, Default)]
pub struct ReadyFlag {
    ready: AtomicBool,
    transitions: AtomicU64,
}

impl ReadyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> HandshakeState {
        if self.is_ready() {
            HandshakeState::Ready
        } else {
            HandshakeState::Connecting
        }
    }

    pub fn try_mark_ready(&self) -> Transition {
        match self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.transitions.fetch_add(1, Ordering::Relaxed);
                Transition::Advanced
            }
            Err(_) => Transition::AlreadyReady,
        }
    }

    /// Number of successful transitions (0 or 1).
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }
}
