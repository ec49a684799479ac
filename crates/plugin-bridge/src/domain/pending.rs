//! Pending request table.
//!
//! Maps request IDs to callers waiting for the host's reply.
//!
//! Flow:
//! 1. Caller calls `register()`, which allocates a collision-free ID and
//!    stores the completion in one step
//! 2. Caller sends the outbound envelope carrying that ID
//! 3. Inbound dispatch calls `complete()` with the matching reply
//! 4. Caller awaits the receiver (optionally with a deadline, `cancel()` on expiry)

use crate::domain::envelope::RequestResponse;
use crate::domain::request_id::{IdGenerator, RequestId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// Reply delivered to a pending caller.
pub type Reply = RequestResponse<Value>;

/// A caller waiting for its reply.
struct PendingRequest {
    /// Single-shot completion
    sender: oneshot::Sender<Reply>,
    /// When the request was registered
    created_at: Instant,
    /// Event name (for logging)
    event: String,
}

/// Counters for the pending table.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Requests registered
    pub total_registered: AtomicU64,
    /// Replies delivered to a waiting caller
    pub total_completed: AtomicU64,
    /// Requests withdrawn or whose caller went away
    pub total_cancelled: AtomicU64,
    /// Generated IDs rejected because they were already pending
    pub id_collisions: AtomicU64,
}

#[derive(Default)]
pub struct PendingRequestTable {
    pending: DashMap<RequestId, PendingRequest>,
    stats: PendingStats,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an ID that is not currently pending and register a caller
    /// under it.
    ///
    /// The uniqueness check and the insert happen under the same shard lock,
    /// so two concurrent registrations can never end up with the same ID.
    pub fn register(
        &self,
        event: &str,
        generator: &dyn IdGenerator,
    ) -> (RequestId, oneshot::Receiver<Reply>) {
        loop {
            let candidate = generator.next_id();
            match self.pending.entry(candidate) {
                Entry::Occupied(occupied) => {
                    self.stats.id_collisions.fetch_add(1, Ordering::Relaxed);
                    debug!(request_id = %occupied.key(), "Request ID collision, regenerating");
                }
                Entry::Vacant(vacant) => {
                    let request_id = vacant.key().clone();
                    let (tx, rx) = oneshot::channel();
                    vacant.insert(PendingRequest {
                        sender: tx,
                        created_at: Instant::now(),
                        event: event.to_string(),
                    });
                    self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

                    debug!(request_id = %request_id, event = event, "Registered pending request");
                    return (request_id, rx);
                }
            }
        }
    }

    /// Deliver a reply to the caller registered under `request_id`.
    ///
    /// Returns true if a caller was found and received the reply. The entry
    /// is removed either way, so a duplicate reply finds nothing.
    pub fn complete(&self, request_id: &RequestId, reply: Reply) -> bool {
        let Some((_, pending)) = self.pending.remove(request_id) else {
            debug!(request_id = %request_id, "Reply for unknown request ID dropped");
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    event = %pending.event,
                    response_time_ms = elapsed.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                // Caller stopped waiting
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    event = %pending.event,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Withdraw a pending request.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        if self.pending.remove(request_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// IDs currently awaiting a reply.
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.pending.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
