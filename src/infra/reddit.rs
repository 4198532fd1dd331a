//! Outbound Reddit API client.

use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::RedditSettings;

use super::error::InfraError;

/// A relayed upstream response: the status code plus the decoded JSON body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Thin wrapper over `reqwest` carrying the OAuth credentials and User-Agent.
#[derive(Debug)]
pub struct RedditClient {
    http: reqwest::Client,
    settings: RedditSettings,
}

impl RedditClient {
    pub fn new(settings: RedditSettings) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| InfraError::upstream(format!("failed to build client: {err}")))?;
        Ok(Self { http, settings })
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The confidential client secret is attached here via HTTP Basic auth and
    /// never leaves the server otherwise.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<UpstreamResponse, InfraError> {
        let redirect_uri = redirect_uri.unwrap_or(self.settings.redirect_uri.as_str());
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http
            .post(&self.settings.token_url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|err| InfraError::upstream(format!("token exchange failed: {err}")))?;

        decode(response, "token endpoint").await
    }

    /// Fetch a resource from the authenticated API, relaying the caller's
    /// bearer credential verbatim.
    pub async fn fetch(
        &self,
        path: &str,
        authorization: &str,
    ) -> Result<UpstreamResponse, InfraError> {
        let url = format!(
            "{}/{}",
            self.settings.api_base_url,
            path.trim_start_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| InfraError::upstream(format!("request to `{url}` failed: {err}")))?;

        decode(response, "api").await
    }
}

async fn decode(
    response: reqwest::Response,
    context: &'static str,
) -> Result<UpstreamResponse, InfraError> {
    let status = response.status().as_u16();
    let body = response
        .json::<Value>()
        .await
        .map_err(|err| InfraError::upstream(format!("{context} returned non-JSON body: {err}")))?;
    Ok(UpstreamResponse { status, body })
}
