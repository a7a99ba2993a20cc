//! IAM bearer token acquisition with optional expiry-aware caching.

use std::time::{Duration, Instant};

use reqwest::{header, Client};
use tokio::sync::RwLock;

use super::types::TokenResponse;
use crate::config::{ApiKey, WatsonConfig};
use crate::error::{Error, Result};

/// Grant type for exchanging an IBM Cloud API key.
pub const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Cached tokens are dropped this long before their stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Short-lived token presented as `Authorization: Bearer ...`.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken([REDACTED])")
    }
}

struct CachedToken {
    token: BearerToken,
    fetched_at: Instant,
    ttl: Duration,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() >= self.ttl
    }
}

/// Exchanges the configured API key for bearer tokens.
///
/// Without caching every call hits the IAM endpoint once.
pub struct TokenProvider {
    http_client: Client,
    iam_url: String,
    api_key: ApiKey,
    cache: Option<RwLock<Option<CachedToken>>>,
}

impl TokenProvider {
    pub fn new(http_client: Client, config: &WatsonConfig) -> Self {
        Self {
            http_client,
            iam_url: config.iam_url.clone(),
            api_key: config.api_key.clone(),
            cache: config.cache_token.then(|| RwLock::new(None)),
        }
    }

    /// Return a usable bearer token, fetching a new one when needed.
    pub async fn get_token(&self) -> Result<BearerToken> {
        let Some(cache) = &self.cache else {
            return self.fetch_token().await.map(|(token, _)| token);
        };

        {
            let cached = cache.read().await;
            if let Some(entry) = cached.as_ref().filter(|c| !c.is_expired()) {
                tracing::debug!("Reusing cached IAM token");
                return Ok(entry.token.clone());
            }
        }

        // Held across the fetch so concurrent misses share one IAM call.
        let mut cached = cache.write().await;
        if let Some(entry) = cached.as_ref().filter(|c| !c.is_expired()) {
            return Ok(entry.token.clone());
        }

        let (token, expires_in) = self.fetch_token().await?;

        let ttl = expires_in
            .map(|secs| Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN))
            .unwrap_or_default();
        *cached = (!ttl.is_zero()).then(|| CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
            ttl,
        });

        Ok(token)
    }

    async fn fetch_token(&self) -> Result<(BearerToken, Option<u64>)> {
        tracing::debug!(url = %self.iam_url, "Requesting IAM token");

        let response = self
            .http_client
            .post(&self.iam_url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("apikey", self.api_key.expose_secret()),
                ("grant_type", GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach IAM endpoint");
                Error::Auth(format!("failed to reach {}: {}", self.iam_url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "IAM endpoint returned error");
            return Err(Error::Auth(format!(
                "{} returned {}: {}",
                self.iam_url, status, body
            )));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse IAM token response");
            Error::Auth(format!("malformed token response: {}", e))
        })?;

        Ok((BearerToken(parsed.access_token), parsed.expires_in))
    }
}
