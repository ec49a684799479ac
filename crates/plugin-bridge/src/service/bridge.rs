//! The bridge context object.
//!
//! Explicitly constructed and passed around; owns the handshake machine, the
//! correlator and the token cache, and attaches / detaches the inbound
//! listener in `init()` / `dispose()`.

use crate::adapters::http_api::HttpRemoteApi;
use crate::adapters::token_store::InMemoryTokenStore;
use crate::domain::config::BridgeConfig;
use crate::domain::envelope::RequestResponse;
use crate::domain::handshake::{HandshakeState, ReadyFlag};
use crate::domain::intent::{IntentsRequest, PluginIntent};
use crate::domain::pending::PendingStats;
use crate::domain::request_id::{IdGenerator, RandomIdGenerator, RequestId};
use crate::domain::token::TokenRecord;
use crate::domain::types::{Community, LmsLinkedUser, PublicUser, Toast, User};
use crate::error::{BridgeError, BridgeResult, FetchError, FetchResult};
use crate::ports::inbound::PluginApi;
use crate::ports::outbound::{
    ChannelSender, ChannelSource, RemoteApi, SystemTimeSource, TimeSource, TokenStore,
};
use crate::service::correlator::{CorrelatorStats, RequestCorrelator};
use crate::service::handshake::HandshakeMachine;
use crate::service::listener::{InboundListener, ListenerStats};
use crate::service::token_cache::TokenCache;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Builder for `PluginBridge`.
///
/// Only the channel is required; the token store defaults to in-memory, the
/// remote API to `reqwest`, the clock to system time and IDs to random
/// base-36 strings.
pub struct BridgeBuilder {
    config: BridgeConfig,
    sender: Arc<dyn ChannelSender>,
    source: Arc<dyn ChannelSource>,
    store: Option<Arc<dyn TokenStore>>,
    remote: Option<Arc<dyn RemoteApi>>,
    clock: Option<Arc<dyn TimeSource>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl BridgeBuilder {
    pub fn new(
        config: BridgeConfig,
        sender: Arc<dyn ChannelSender>,
        source: Arc<dyn ChannelSource>,
    ) -> Self {
        Self {
            config,
            sender,
            source,
            store: None,
            remote: None,
            clock: None,
            ids: None,
        }
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn remote_api(mut self, remote: Arc<dyn RemoteApi>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> BridgeResult<PluginBridge> {
        self.config.validate()?;

        let remote = match self.remote {
            Some(remote) => remote,
            None => Arc::new(HttpRemoteApi::new(self.config.http_timeout)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTokenStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemTimeSource));
        let ids = self.ids.unwrap_or_else(|| Arc::new(RandomIdGenerator));

        let ready = Arc::new(ReadyFlag::new());
        let tokens = Arc::new(TokenCache::new(
            store,
            clock.clone(),
            self.config.token_storage_key.clone(),
            self.config.poll_interval,
        ));
        let handshake = Arc::new(HandshakeMachine::new(
            ready.clone(),
            self.sender.clone(),
            tokens.clone(),
            self.config.poll_interval,
        ));
        let correlator = Arc::new(RequestCorrelator::new(
            ids,
            ready,
            self.sender,
            tokens.clone(),
            self.config.poll_interval,
        ));

        Ok(PluginBridge {
            config: self.config,
            handshake,
            correlator,
            tokens,
            source: self.source,
            remote,
            clock,
            listener_stats: Arc::new(ListenerStats::default()),
            listener: Mutex::new(None),
        })
    }
}

struct ListenerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct PluginBridge {
    config: BridgeConfig,
    handshake: Arc<HandshakeMachine>,
    correlator: Arc<RequestCorrelator>,
    tokens: Arc<TokenCache>,
    source: Arc<dyn ChannelSource>,
    remote: Arc<dyn RemoteApi>,
    clock: Arc<dyn TimeSource>,
    listener_stats: Arc<ListenerStats>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl PluginBridge {
    pub fn builder(
        config: BridgeConfig,
        sender: Arc<dyn ChannelSender>,
        source: Arc<dyn ChannelSource>,
    ) -> BridgeBuilder {
        BridgeBuilder::new(config, sender, source)
    }

    /// Builder for a channel that is both the sender and the source.
    pub fn with_channel<C>(config: BridgeConfig, channel: Arc<C>) -> BridgeBuilder
    where
        C: ChannelSender + ChannelSource + 'static,
    {
        BridgeBuilder::new(config, channel.clone(), channel)
    }

    /// Attach to the channel and start the handshake.
    ///
    /// Loads the stored token, subscribes to inbound traffic, starts the
    /// listener in its bootstrap slot and sends `connect`. The subscription
    /// exists before `connect` goes out, so the host's reply cannot be missed.
    /// Must be called from within a tokio runtime.
    pub async fn init(&self) -> BridgeResult<()> {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return Err(BridgeError::AlreadyInitialized);
        }

        info!("Initializing plugin bridge");

        if let Err(e) = self.tokens.load_from_storage().await {
            warn!(error = %e, "Failed to load stored token");
        }

        let inbound = self.source.subscribe()?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(
            InboundListener::new(
                self.handshake.clone(),
                self.correlator.clone(),
                self.listener_stats.clone(),
            )
            .run(inbound, shutdown_rx),
        );
        *listener = Some(ListenerHandle { shutdown, task });
        drop(listener);

        if !self.handshake.is_ready() {
            // Failure is logged by the handshake machine; the listener stays
            // attached.
            let _ = self.handshake.start().await;
        }

        Ok(())
    }

    /// Detach the inbound listener. Pending requests stay registered.
    pub async fn dispose(&self) -> BridgeResult<()> {
        let Some(handle) = self.listener.lock().await.take() else {
            return Err(BridgeError::NotInitialized);
        };

        // The listener may already have stopped on its own
        let _ = handle.shutdown.send(());
        if let Err(e) = handle.task.await {
            error!(error = %e, "Inbound listener task failed");
        }

        info!("Plugin bridge disposed");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.handshake.is_ready()
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn ready_transitions(&self) -> u64 {
        self.handshake.transitions()
    }

    pub async fn wait_until_ready(&self, deadline: Option<Duration>) -> BridgeResult<()> {
        self.handshake.wait_until_ready(deadline).await
    }

    pub fn current_token(&self) -> Option<TokenRecord> {
        self.tokens.current()
    }

    pub async fn wait_for_token(&self, deadline: Option<Duration>) -> BridgeResult<TokenRecord> {
        self.tokens.wait_for_token(deadline).await
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.correlator.is_pending(request_id)
    }

    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.correlator.pending_ids()
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.correlator.pending_stats()
    }

    pub fn correlator_stats(&self) -> &CorrelatorStats {
        self.correlator.stats()
    }

    pub fn listener_stats(&self) -> &ListenerStats {
        &self.listener_stats
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        authorized: bool,
    ) -> FetchResult<T> {
        let authorization = if authorized {
            let record = self
                .tokens
                .wait_for_token(self.config.token_timeout)
                .await
                .map_err(|e| FetchError::Unauthorized(e.to_string()))?;
            if !record.is_live(self.clock.now_ms()) {
                warn!(
                    expires_at_ms = record.expires_at_ms,
                    "Cached token has expired; using it anyway"
                );
            }
            Some(record.authorization_header())
        } else {
            None
        };

        let url = self
            .config
            .api_url(segments)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let value = self.remote.get_json(&url, authorization.as_deref()).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Collapse a direct-call outcome to the silent façade contract.
fn absent_on_error<T>(result: FetchResult<T>, resource: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(resource = resource, error = %e, "Direct call failed, resolving to absent");
            None
        }
    }
}

#[async_trait]
impl PluginApi for PluginBridge {
    async fn send_request(&self, event: &str, body: Value) -> BridgeResult<RequestResponse<Value>> {
        self.correlator
            .send(
                event,
                body,
                self.config.ready_timeout,
                self.config.request_timeout,
            )
            .await
    }

    async fn request_intents(&self, intents: &[PluginIntent]) -> bool {
        let body = match serde_json::to_value(IntentsRequest {
            intents: intents.to_vec(),
        }) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to encode intents request");
                return false;
            }
        };

        let response = match self.send_request("requestIntents", body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "RequestIntents failed");
                return false;
            }
        };

        if !response.success {
            error!(event = %response.event, "RequestIntents rejected by host");
            return false;
        }

        match serde_json::from_value::<TokenRecord>(response.data) {
            Ok(record) => {
                if let Err(e) = self.tokens.set(record).await {
                    warn!(error = %e, "Failed to persist granted token");
                }
            }
            Err(e) => warn!(error = %e, "RequestIntents succeeded without a usable token"),
        }
        true
    }

    async fn send_toast(&self, toast: &Toast) -> bool {
        let body = match serde_json::to_value(toast) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to encode toast");
                return false;
            }
        };

        match self.send_request("sendToast", body).await {
            Ok(response) => response.success,
            Err(e) => {
                warn!(error = %e, "sendToast failed");
                false
            }
        }
    }

    async fn get_user(&self, user_id: &str) -> Option<PublicUser> {
        absent_on_error(self.fetch(&["user", user_id], false).await, "user")
    }

    async fn get_self(&self) -> Option<User> {
        absent_on_error(self.fetch(&["user", "@me"], true).await, "self")
    }

    async fn get_community(&self, community_id: &str) -> Option<Community> {
        absent_on_error(
            self.fetch(&["community", community_id], false).await,
            "community",
        )
    }

    async fn get_lms_self(&self, community_id: &str) -> Option<LmsLinkedUser> {
        absent_on_error(
            self.fetch(&["community", community_id, "LMS", "@me"], true)
                .await,
            "lms_self",
        )
    }
}

impl Drop for PluginBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.task.abort();
        }
    }
}
