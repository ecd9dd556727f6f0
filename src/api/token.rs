//! Access token management
//!
//! The provider exposes no reliable token lifetime, so expiry is detected at
//! request time: a transfer fails with a rejected-token response, and the
//! caller asks for a refresh. The token cell is guarded by an async mutex
//! held across the refresh network call, which gives single-flight
//! semantics - concurrent workers observing the same stale token collapse
//! into one `POST /token` exchange.

use crate::api::{ApiResult, DataApi};
use crate::Credentials;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Owns the process-wide access token and its refresh path.
pub struct TokenManager {
    api: Arc<dyn DataApi>,
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl TokenManager {
    /// Create a manager for the given credential pair. No token is acquired
    /// until the first call to [`TokenManager::current`].
    pub fn new(api: Arc<dyn DataApi>, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Return the current token, acquiring one on first use.
    pub async fn current(&self) -> ApiResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        debug!("No cached token, acquiring");
        let token = self.api.request_token(&self.credentials).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Refresh reactively after a request failed with `observed` as its
    /// token. If another worker already replaced `observed`, the replacement
    /// is returned without a network call, so a burst of concurrent auth
    /// failures performs exactly one token exchange.
    pub async fn refresh_if_stale(&self, observed: &str) -> ApiResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(current) = guard.as_ref() {
            if current != observed {
                debug!("Token already refreshed by another worker");
                return Ok(current.clone());
            }
        }

        info!("Access token rejected by the provider, refreshing");
        let token = self.api.request_token(&self.credentials).await?;
        *guard = Some(token.clone());
        Ok(token)
    }
}
