//! Inbound listener with a single active-subscriber slot.
//!
//! One task consumes the inbound stream and routes every payload to whichever
//! slot is active. The slot is swapped from `Bootstrap` to `SteadyState`
//! between two reads, right after the payload that completed the handshake,
//! so the bootstrap handler never sees a later payload and the correlator
//! never sees an earlier one.

use crate::ports::outbound::InboundStream;
use crate::service::correlator::RequestCorrelator;
use crate::service::handshake::{BootstrapOutcome, HandshakeMachine};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerSlot {
    Bootstrap,
    SteadyState,
}

/// Per-slot message counters.
#[derive(Debug, Default)]
pub struct ListenerStats {
    pub bootstrap_messages: AtomicU64,
    pub steady_messages: AtomicU64,
    pub handoffs: AtomicU64,
    steady: AtomicBool,
}

impl ListenerStats {
    pub fn active_slot(&self) -> ListenerSlot {
        if self.steady.load(Ordering::Acquire) {
            ListenerSlot::SteadyState
        } else {
            ListenerSlot::Bootstrap
        }
    }

    /// Total payloads handled by either slot.
    pub fn total_messages(&self) -> u64 {
        self.bootstrap_messages.load(Ordering::Relaxed)
            + self.steady_messages.load(Ordering::Relaxed)
    }
}

pub(crate) struct InboundListener {
    handshake: Arc<HandshakeMachine>,
    correlator: Arc<RequestCorrelator>,
    stats: Arc<ListenerStats>,
    slot: ListenerSlot,
}

impl InboundListener {
    pub(crate) fn new(
        handshake: Arc<HandshakeMachine>,
        correlator: Arc<RequestCorrelator>,
        stats: Arc<ListenerStats>,
    ) -> Self {
        // A bridge re-initialized after the handshake goes straight to
        // steady state.
        let slot = if handshake.is_ready() {
            ListenerSlot::SteadyState
        } else {
            ListenerSlot::Bootstrap
        };
        stats
            .steady
            .store(slot == ListenerSlot::SteadyState, Ordering::Release);

        Self {
            handshake,
            correlator,
            stats,
            slot,
        }
    }

    /// Run until shutdown is signalled or the inbound stream ends.
    pub(crate) async fn run(mut self, mut inbound: InboundStream, mut shutdown: oneshot::Receiver<()>) {
        debug!(slot = ?self.slot, "Inbound listener started");
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("Inbound listener shutting down");
                    break;
                }
                next = inbound.next() => match next {
                    Some(payload) => self.dispatch(&payload).await,
                    None => {
                        warn!("Inbound channel closed, stopping listener");
                        break;
                    }
                },
            }
        }
    }

    async fn dispatch(&mut self, payload: &str) {
        match self.slot {
            ListenerSlot::Bootstrap => {
                self.stats.bootstrap_messages.fetch_add(1, Ordering::Relaxed);
                if self.handshake.on_bootstrap_message(payload).await == BootstrapOutcome::Completed {
                    self.slot = ListenerSlot::SteadyState;
                    self.stats.steady.store(true, Ordering::Release);
                    self.stats.handoffs.fetch_add(1, Ordering::Relaxed);
                    debug!("Listener handed off to steady-state dispatch");
                }
            }
            ListenerSlot::SteadyState => {
                self.stats.steady_messages.fetch_add(1, Ordering::Relaxed);
                self.correlator.on_message(payload).await;
            }
        }
    }
}
