//! Direct HTTP calls to the host API.

use crate::error::FetchError;
use crate::ports::outbound::RemoteApi;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// `RemoteApi` over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
}

impl HttpRemoteApi {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn get_json(
        &self,
        url: &str,
        authorization: Option<&str>,
    ) -> Result<serde_json::Value, FetchError> {
        let mut request = self.client.get(url);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!(url = url, bytes = body.len(), "Fetched remote resource");
        Ok(serde_json::from_slice(&body)?)
    }
}
