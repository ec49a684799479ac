//! Handshake state machine.
//!
//! Establishes, exactly once, that the host is present and has supplied an
//! initial token. Drives the `connect` signal and interprets payloads seen
//! by the bootstrap listener.

use crate::domain::envelope::ConnectSignal;
use crate::domain::handshake::{
    interpret_bootstrap, BootstrapDecision, HandshakeState, ReadyFlag, Transition,
};
use crate::error::{BridgeResult, ChannelError};
use crate::ports::outbound::ChannelSender;
use crate::service::backoff::poll_until;
use crate::service::token_cache::TokenCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What the bootstrap listener should do after a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Handshake finished with this payload; hand off to steady state.
    Completed,
    /// Not parseable as an envelope.
    Malformed,
    /// Envelope without a usable token; still connecting.
    MissingToken,
    /// Already ready; diagnostic only.
    AlreadyReady,
}

pub struct HandshakeMachine {
    ready: Arc<ReadyFlag>,
    sender: Arc<dyn ChannelSender>,
    tokens: Arc<TokenCache>,
    poll_interval: Duration,
}

impl HandshakeMachine {
    pub fn new(
        ready: Arc<ReadyFlag>,
        sender: Arc<dyn ChannelSender>,
        tokens: Arc<TokenCache>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ready,
            sender,
            tokens,
            poll_interval,
        }
    }

    /// Send the `connect` signal.
    ///
    /// A missing host is a fatal configuration error: it is logged and the
    /// handshake will never complete, but the bootstrap listener stays
    /// attached.
    pub async fn start(&self) -> Result<(), ChannelError> {
        let signal = ConnectSignal::default()
            .encode()
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        match self.sender.send(signal).await {
            Ok(()) => {
                info!("Sent connect signal to host");
                Ok(())
            }
            Err(ChannelError::HostUnavailable) => {
                error!("No host reference available; handshake cannot complete");
                Err(ChannelError::HostUnavailable)
            }
            Err(e) => {
                error!(error = %e, "Failed to send connect signal");
                Err(e)
            }
        }
    }

    /// Handle one payload delivered to the bootstrap listener.
    pub async fn on_bootstrap_message(&self, payload: &str) -> BootstrapOutcome {
        if self.ready.is_ready() {
            error!("Handshake payload received but already ready");
            return BootstrapOutcome::AlreadyReady;
        }

        let record = match interpret_bootstrap(payload) {
            BootstrapDecision::Malformed => {
                debug!("Ignoring unparseable payload during handshake");
                return BootstrapOutcome::Malformed;
            }
            BootstrapDecision::MissingToken => {
                warn!("Handshake reply carried no token; still connecting");
                return BootstrapOutcome::MissingToken;
            }
            BootstrapDecision::Complete(record) => record,
        };

        if let Err(e) = self.tokens.set(record).await {
            warn!(error = %e, "Failed to persist handshake token");
        }

        match self.ready.try_mark_ready() {
            Transition::Advanced => {
                info!("Handshake complete, bridge ready");
                BootstrapOutcome::Completed
            }
            Transition::AlreadyReady => {
                error!("Handshake completed twice; second completion ignored");
                BootstrapOutcome::AlreadyReady
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    pub fn state(&self) -> HandshakeState {
        self.ready.state()
    }

    /// Number of ready transitions so far (0 or 1).
    pub fn transitions(&self) -> u64 {
        self.ready.transitions()
    }

    pub async fn wait_until_ready(&self, deadline: Option<Duration>) -> BridgeResult<()> {
        poll_until(
            || self.ready.is_ready().then_some(()),
            self.poll_interval,
            deadline,
            "handshake",
        )
        .await
    }
}
