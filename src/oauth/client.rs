//! OAuth 1.0a client for the catalog provider.
//!
//! Handles the two token endpoint interactions (request token, access token)
//! and signed GETs against the catalog API. Token endpoints answer with
//! `application/x-www-form-urlencoded` bodies.

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CatalogError, ProtocolKind, Result};
use crate::oauth::endpoints::ProviderEndpoints;
use crate::oauth::signer::{authorization_header, OAuthParams};
use crate::utils::HttpClient;

/// Longest slice of a provider error body kept in error messages
const BODY_SNIPPET_LEN: usize = 200;

/// Application key and secret issued by the provider
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerCredentials {
    pub key: String,
    pub secret: String,
}

impl ConsumerCredentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A token and its secret, as returned by either token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

/// Speaks OAuth 1.0a (HMAC-SHA1) to the provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: HttpClient,
    consumer: ConsumerCredentials,
    endpoints: ProviderEndpoints,
}

impl OAuthClient {
    pub fn new(http: HttpClient, consumer: ConsumerCredentials, endpoints: ProviderEndpoints) -> Self {
        Self {
            http,
            consumer,
            endpoints,
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer.key
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Obtain a temporary request token with `callback_url` embedded.
    ///
    /// Any failure (transport, non-2xx, malformed body) is a protocol error.
    pub async fn begin_handshake(&self, callback_url: &str) -> Result<TokenPair> {
        let params = OAuthParams::new(&self.consumer.key).callback(callback_url);
        self.token_request(&self.endpoints.request_token(), params, "")
            .await
    }

    /// Where to send the user to authorize `request_token`. No I/O.
    pub fn build_authorize_url(&self, request_token: &str, callback_url: &str) -> String {
        self.endpoints.authorize(request_token, callback_url)
    }

    /// Exchange a verified request token for a long-lived access token
    pub async fn complete_handshake(
        &self,
        request_token: &str,
        request_token_secret: &str,
        verifier: &str,
    ) -> Result<TokenPair> {
        let params = OAuthParams::new(&self.consumer.key)
            .token(request_token)
            .verifier(verifier);
        self.token_request(&self.endpoints.access_token(), params, request_token_secret)
            .await
    }

    /// Issue a signed GET and return the raw body.
    ///
    /// Transport failures are [`CatalogError::Network`]; a 401 is a protocol
    /// error of kind [`ProtocolKind::Unauthenticated`]; other non-2xx answers
    /// are [`ProtocolKind::Rejected`].
    pub async fn signed_get(&self, url: &str, token: &str, token_secret: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| CatalogError::InvalidArgument(format!("invalid request URL: {}", e)))?;
        let params = OAuthParams::new(&self.consumer.key).token(token);
        let header =
            authorization_header("GET", &parsed, &params, &self.consumer.secret, token_secret);

        debug!(path = parsed.path(), "signed GET");

        let response = self
            .http
            .client()
            .get(parsed)
            .header(AUTHORIZATION, header)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(%status, body = snippet(&body), "provider rejected access token");
            return Err(CatalogError::Protocol {
                kind: ProtocolKind::Unauthenticated,
                message: format!("provider returned {}", status),
            });
        }
        if !status.is_success() {
            warn!(%status, body = snippet(&body), "provider rejected signed request");
            return Err(CatalogError::rejected(format!(
                "provider returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        Ok(body)
    }

    async fn token_request(
        &self,
        endpoint: &str,
        params: OAuthParams,
        token_secret: &str,
    ) -> Result<TokenPair> {
        let url = Url::parse(endpoint)
            .map_err(|e| CatalogError::Configuration(format!("invalid token endpoint: {}", e)))?;
        let header =
            authorization_header("POST", &url, &params, &self.consumer.secret, token_secret);

        let response = self
            .http
            .client()
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| CatalogError::rejected(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::rejected(format!("reading token response failed: {}", e)))?;

        if !status.is_success() {
            return Err(CatalogError::rejected(format!(
                "token endpoint returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        parse_token_response(&body)
    }
}

/// Parse `oauth_token=...&oauth_token_secret=...`
pub fn parse_token_response(body: &str) -> Result<TokenPair> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }

    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
            Ok(TokenPair { token, secret })
        }
        _ => Err(CatalogError::rejected(
            "token response missing oauth_token or oauth_token_secret",
        )),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
