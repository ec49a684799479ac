//! Request correlator.
//!
//! Pairs every outbound request with exactly one inbound reply, and watches
//! the same inbound stream for host-pushed token refreshes. The two concerns
//! are independent: a refresh is applied whether or not its `requestID`
//! matched a pending request.

use crate::domain::envelope::{InboundEnvelope, OutboundEnvelope};
use crate::domain::handshake::ReadyFlag;
use crate::domain::pending::{PendingRequestTable, PendingStats, Reply};
use crate::domain::request_id::{IdGenerator, RequestId};
use crate::domain::token::TokenRecord;
use crate::error::{BridgeError, BridgeResult};
use crate::ports::outbound::ChannelSender;
use crate::service::backoff::poll_until;
use crate::service::token_cache::TokenCache;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Result of dispatching one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Not a structured envelope; dropped
    pub malformed: bool,
    /// A pending caller received this reply
    pub delivered: bool,
    /// The payload carried a token refresh that was applied
    pub refreshed: bool,
}

/// Counters for inbound dispatch.
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    pub malformed: AtomicU64,
    /// Replies with no live pending request (stale, duplicate, or pushes)
    pub unmatched: AtomicU64,
    pub refreshes: AtomicU64,
}

pub struct RequestCorrelator {
    pending: PendingRequestTable,
    ids: Arc<dyn IdGenerator>,
    ready: Arc<ReadyFlag>,
    sender: Arc<dyn ChannelSender>,
    tokens: Arc<TokenCache>,
    poll_interval: Duration,
    stats: CorrelatorStats,
}

impl RequestCorrelator {
    pub fn new(
        ids: Arc<dyn IdGenerator>,
        ready: Arc<ReadyFlag>,
        sender: Arc<dyn ChannelSender>,
        tokens: Arc<TokenCache>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pending: PendingRequestTable::new(),
            ids,
            ready,
            sender,
            tokens,
            poll_interval,
            stats: CorrelatorStats::default(),
        }
    }

    /// Send a request and wait for its reply.
    ///
    /// Waits for the handshake first (bounded by `ready_deadline`), then
    /// allocates an ID and registers the caller *before* sending, so a reply
    /// that arrives immediately always finds its entry. With a
    /// `reply_deadline`, an unanswered request is withdrawn on expiry.
    pub async fn send(
        &self,
        event: &str,
        body: Value,
        ready_deadline: Option<Duration>,
        reply_deadline: Option<Duration>,
    ) -> BridgeResult<Reply> {
        if !self.ready.is_ready() {
            debug!(event = event, "Request queued until handshake completes");
            poll_until(
                || self.ready.is_ready().then_some(()),
                self.poll_interval,
                ready_deadline,
                "handshake",
            )
            .await?;
        }

        let (request_id, rx) = self.pending.register(event, self.ids.as_ref());

        let payload = match OutboundEnvelope::new(request_id.clone(), event, body).encode() {
            Ok(payload) => payload,
            Err(e) => {
                self.pending.cancel(&request_id);
                return Err(e.into());
            }
        };

        if let Err(e) = self.sender.send(payload).await {
            self.pending.cancel(&request_id);
            warn!(request_id = %request_id, event = event, error = %e, "Failed to send request");
            return Err(e.into());
        }

        debug!(request_id = %request_id, event = event, "Sent request");

        self.await_reply(request_id, rx, reply_deadline).await
    }

    async fn await_reply(
        &self,
        request_id: RequestId,
        rx: oneshot::Receiver<Reply>,
        deadline: Option<Duration>,
    ) -> BridgeResult<Reply> {
        let Some(limit) = deadline else {
            return rx.await.map_err(|_| BridgeError::ReplyDropped);
        };

        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BridgeError::ReplyDropped),
            Err(_) => {
                self.pending.cancel(&request_id);
                warn!(
                    request_id = %request_id,
                    timeout_ms = limit.as_millis(),
                    "Request timed out, withdrawn"
                );
                Err(BridgeError::Timeout {
                    what: "reply",
                    waited: limit,
                })
            }
        }
    }

    /// Steady-state handling of one inbound payload.
    ///
    /// Correlation runs first, then the token refresh check. Both complete
    /// before this returns, so nothing interleaves with the next payload.
    pub async fn on_message(&self, payload: &str) -> DispatchOutcome {
        let envelope = match InboundEnvelope::<Value>::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "Dropping malformed inbound payload");
                return DispatchOutcome {
                    malformed: true,
                    ..DispatchOutcome::default()
                };
            }
        };

        let refresh = if envelope.is_token_refresh() {
            TokenRecord::from_refresh_data(&envelope.response.data)
        } else {
            None
        };

        let delivered = match &envelope.request_id {
            Some(request_id) => self.pending.complete(request_id, envelope.response),
            None => false,
        };
        if !delivered {
            self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
        }

        let refreshed = match refresh {
            Some(record) => {
                self.stats.refreshes.fetch_add(1, Ordering::Relaxed);
                info!(expires_at_ms = record.expires_at_ms, "Refreshed token");
                if let Err(e) = self.tokens.set(record).await {
                    warn!(error = %e, "Failed to persist refreshed token");
                }
                true
            }
            None => false,
        };

        DispatchOutcome {
            malformed: false,
            delivered,
            refreshed,
        }
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.is_pending(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.pending.pending_ids()
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.pending.stats()
    }

    pub fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }
}
