//! In-memory channel adapter.
//!
//! Plugin side implements `ChannelSender` + `ChannelSource`; the host side is
//! a `HostEnd` handle that reads what the plugin sent and delivers payloads to
//! every current subscriber. Payloads delivered while nobody is subscribed are
//! dropped, like messages posted to a window with no listener.

use crate::error::ChannelError;
use crate::ports::outbound::{ChannelSender, ChannelSource, InboundStream};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<String>>>>;

/// Plugin end of an in-memory channel.
pub struct MemoryChannel {
    /// `None` when there is no host to address
    outbound: Option<mpsc::UnboundedSender<String>>,
    subscribers: Subscribers,
}

/// Host end of an in-memory channel.
pub struct HostEnd {
    sent: mpsc::UnboundedReceiver<String>,
    subscribers: Subscribers,
}

impl MemoryChannel {
    /// Create a connected plugin/host pair.
    pub fn pair() -> (Arc<MemoryChannel>, HostEnd) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

        let plugin = Arc::new(MemoryChannel {
            outbound: Some(tx),
            subscribers: subscribers.clone(),
        });
        let host = HostEnd {
            sent: rx,
            subscribers,
        };
        (plugin, host)
    }

    /// A channel with no host behind it. Every send fails with
    /// `ChannelError::HostUnavailable`; subscribing still works.
    pub fn detached() -> Arc<MemoryChannel> {
        Arc::new(MemoryChannel {
            outbound: None,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

#[async_trait]
impl ChannelSender for MemoryChannel {
    async fn send(&self, payload: String) -> Result<(), ChannelError> {
        let Some(outbound) = &self.outbound else {
            return Err(ChannelError::HostUnavailable);
        };
        outbound.send(payload).map_err(|_| ChannelError::Closed)
    }
}

impl ChannelSource for MemoryChannel {
    fn subscribe(&self) -> Result<InboundStream, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

impl HostEnd {
    /// Next payload the plugin sent, or `None` once the plugin end is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Next payload the plugin sent, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Deliver a payload to every live subscriber.
    ///
    /// Returns the number of subscribers reached.
    pub fn deliver(&self, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
        debug!(receivers = subscribers.len(), "Host delivered payload");
        subscribers.len()
    }

    /// Number of subscribers whose stream is still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}
