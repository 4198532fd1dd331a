//! Read-through proxy orchestration: cache first, upstream on miss.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::infra::{error::InfraError, reddit::RedditClient};

use super::cache::CacheService;

/// What the proxy resolved for a logical path.
#[derive(Debug, Clone)]
pub enum ProxyOutcome {
    /// Payload served from the cache or a successful upstream fetch.
    Payload(Value),
    /// Upstream refused; relay its status and body, uncached.
    UpstreamError { status: u16, body: Value },
}

#[derive(Debug, Clone)]
pub struct ProxyService {
    cache: CacheService,
    reddit: Arc<RedditClient>,
}

impl ProxyService {
    pub fn new(cache: CacheService, reddit: Arc<RedditClient>) -> Self {
        Self { cache, reddit }
    }

    /// Resolve `path` for a caller presenting `authorization`.
    ///
    /// Cached payloads are trusted indefinitely; there is no freshness check.
    /// Successful upstream responses are cached best-effort before being
    /// returned; non-success responses are relayed and never cached.
    pub async fn fetch(
        &self,
        path: &str,
        authorization: &str,
    ) -> Result<ProxyOutcome, InfraError> {
        if let Some(payload) = self.cache.lookup(path).await {
            return Ok(ProxyOutcome::Payload(payload));
        }

        info!(target = "snooproxy::proxy", path, "fetching from upstream");
        let response = self.reddit.fetch(path, authorization).await?;

        if !response.is_success() {
            return Ok(ProxyOutcome::UpstreamError {
                status: response.status,
                body: response.body,
            });
        }

        self.cache.store(path, &response.body).await;
        Ok(ProxyOutcome::Payload(response.body))
    }
}
