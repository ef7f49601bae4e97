use crate::services::phonepe_client::{ClientError, PhonePeClient};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Seconds before `expires_at` at which a cached token is considered stale.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Unix seconds.
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl AccessToken {
    pub const DEFAULT_TYPE: &'static str = "O-Bearer";

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Tokens without an expiry are never reused.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - EXPIRY_MARGIN_SECS > now)
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, ClientError>;

    /// Drops any cached token so the next call fetches a new one.
    fn invalidate(&self) {}
}

pub struct CachedTokenProvider {
    client: Arc<PhonePeClient>,
    cache: Mutex<Option<AccessToken>>,
    enabled: bool,
}

impl CachedTokenProvider {
    pub fn new(client: Arc<PhonePeClient>, enabled: bool) -> Self {
        Self {
            client,
            cache: Mutex::new(None),
            enabled,
        }
    }

    fn cached(&self) -> Option<AccessToken> {
        let now = Utc::now().timestamp();
        let cache = self.cache.lock();
        cache.as_ref().filter(|token| token.is_fresh_at(now)).cloned()
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, ClientError> {
        if self.enabled {
            if let Some(token) = self.cached() {
                debug!("Reusing cached PhonePe access token");
                return Ok(token);
            }
        }

        let token = self.client.fetch_token().await?;

        if self.enabled && token.expires_at.is_some() {
            *self.cache.lock() = Some(token.clone());
        }
        Ok(token)
    }

    fn invalidate(&self) {
        if self.cache.lock().take().is_some() {
            debug!("Dropped cached PhonePe access token");
        }
    }
}
