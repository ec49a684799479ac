//! Token cache: the single current `TokenRecord`, persisted on every change.

use crate::domain::token::TokenRecord;
use crate::error::BridgeResult;
use crate::ports::outbound::{TimeSource, TokenStore};
use crate::service::backoff::poll_until;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct TokenCache {
    current: RwLock<Option<TokenRecord>>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn TimeSource>,
    storage_key: String,
    poll_interval: Duration,
    /// Number of times `set` replaced the record
    updates: AtomicU64,
}

impl TokenCache {
    pub fn new(
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn TimeSource>,
        storage_key: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            current: RwLock::new(None),
            store,
            clock,
            storage_key: storage_key.into(),
            poll_interval,
            updates: AtomicU64::new(0),
        }
    }

    /// Adopt the persisted record if it has not expired yet.
    ///
    /// An expired record is treated as absent. A record already held in
    /// memory is never replaced by the stored one.
    pub async fn load_from_storage(&self) -> BridgeResult<Option<TokenRecord>> {
        let Some(stored) = self.store.get(&self.storage_key).await? else {
            debug!(key = %self.storage_key, "No stored token");
            return Ok(None);
        };

        let now = self.clock.now_ms();
        if !stored.is_live(now) {
            debug!(
                expires_at_ms = stored.expires_at_ms,
                now_ms = now,
                "Stored token expired, ignoring"
            );
            return Ok(None);
        }

        let mut current = self.current.write();
        if current.is_none() {
            info!(expires_at_ms = stored.expires_at_ms, "Loaded stored token");
            *current = Some(stored.clone());
        }
        Ok(Some(stored))
    }

    /// Replace the record and persist it.
    ///
    /// The in-memory record is replaced before persisting, so a storage
    /// failure still leaves the fresh token usable; the error is returned
    /// for the caller to log.
    pub async fn set(&self, record: TokenRecord) -> BridgeResult<()> {
        *self.current.write() = Some(record.clone());
        self.updates.fetch_add(1, Ordering::Relaxed);
        debug!(expires_at_ms = record.expires_at_ms, "Token updated");

        self.store.set(&self.storage_key, &record).await?;
        Ok(())
    }

    pub fn current(&self) -> Option<TokenRecord> {
        self.current.read().clone()
    }

    pub fn has_token(&self) -> bool {
        self.current.read().is_some()
    }

    /// True when a token is cached and has not expired.
    pub fn is_live(&self) -> bool {
        let now = self.clock.now_ms();
        self.current
            .read()
            .as_ref()
            .is_some_and(|record| record.is_live(now))
    }

    /// Wait until a record exists and return it.
    pub async fn wait_for_token(&self, deadline: Option<Duration>) -> BridgeResult<TokenRecord> {
        if let Some(record) = self.current() {
            return Ok(record);
        }
        debug!("Waiting for token");
        let record = poll_until(|| self.current(), self.poll_interval, deadline, "token").await?;
        debug!(expires_at_ms = record.expires_at_ms, "Got token");
        Ok(record)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}
