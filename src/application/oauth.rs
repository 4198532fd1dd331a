//! OAuth authorization-code exchange.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::infra::{error::InfraError, reddit::RedditClient};

/// Token fields relayed to the browser after a successful exchange.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Outcome of an exchange attempt against the upstream token endpoint.
#[derive(Debug, Clone)]
pub enum TokenExchange {
    Granted(TokenGrant),
    Refused { details: Value },
}

#[derive(Debug, Clone)]
pub struct TokenService {
    reddit: Arc<RedditClient>,
}

impl TokenService {
    pub fn new(reddit: Arc<RedditClient>) -> Self {
        Self { reddit }
    }

    /// Exchange an authorization code for tokens, relaying upstream refusals
    /// to the caller untouched.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenExchange, InfraError> {
        let response = self.reddit.exchange_code(code, redirect_uri).await?;

        if !response.is_success() {
            warn!(
                target = "snooproxy::oauth",
                status = response.status,
                "token exchange refused by upstream"
            );
            return Ok(TokenExchange::Refused {
                details: response.body,
            });
        }

        let grant: TokenGrant = serde_json::from_value(response.body)
            .map_err(|err| InfraError::upstream(format!("malformed token response: {err}")))?;

        info!(target = "snooproxy::oauth", "token exchange successful");
        Ok(TokenExchange::Granted(grant))
    }
}
