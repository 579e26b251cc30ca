//! Catalog gateway: the per-caller authorization state machine in front of
//! the provider's search and detail endpoints.
//!
//! ```text
//! Unauthenticated --init_oauth--> Pending --handle_callback--> Authorized
//! ```
//!
//! `search` and `get_book_by_id` require `Authorized`. Nothing in here revokes
//! a credential.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::adapter;
use crate::config::{Config, StorageBackend};
use crate::error::{CatalogError, Result};
use crate::models::{
    CallerIdentity, ConnectionStatus, Credential, NormalizedBookDetail, SearchResultPage,
};
use crate::oauth::signer::percent_encode;
use crate::oauth::{
    completion_mode, CompletionMode, ConsumerCredentials, OAuthClient, ProviderEndpoints,
};
use crate::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenStore};
use crate::utils::HttpClient;
use crate::xml;

/// Path prefix of the callback entrypoint, relative to the backend URL
pub const CALLBACK_PATH: &str = "/goodreads/oauth/return";

/// What `handle_callback` does when the durable write fails after the
/// provider handshake succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceFailurePolicy {
    /// Log and report success; the in-memory authorization still serves this process
    #[default]
    Warn,
    /// Return the storage error to the caller
    Fail,
}

/// Orchestrates OAuth, token storage and response normalization
#[derive(Debug, Clone)]
pub struct CatalogGateway {
    oauth: Option<Arc<OAuthClient>>,
    tokens: TokenStore,
    backend_url: String,
    on_persistence_failure: PersistenceFailurePolicy,
}

impl CatalogGateway {
    /// `oauth` is `None` when no provider key/secret is configured
    pub fn new(oauth: Option<OAuthClient>, tokens: TokenStore, backend_url: impl Into<String>) -> Self {
        Self {
            oauth: oauth.map(Arc::new),
            tokens,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            on_persistence_failure: PersistenceFailurePolicy::default(),
        }
    }

    /// Wire up HTTP, OAuth and credential storage from configuration.
    ///
    /// Missing provider credentials are not an error here; OAuth-dependent
    /// operations fail with [`CatalogError::Configuration`] instead.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::with_timeouts(config.http.timeout(), config.http.connect_timeout())?;

        let oauth = match config.provider.credentials() {
            Some((key, secret)) => Some(OAuthClient::new(
                http,
                ConsumerCredentials::new(key, secret),
                ProviderEndpoints::new(&config.provider.base_url)?,
            )),
            None => {
                warn!("catalog API key or secret not configured, OAuth operations are disabled");
                None
            }
        };

        let durable: Arc<dyn CredentialStore> = match config.storage.backend {
            StorageBackend::File => Arc::new(
                FileCredentialStore::load(config.storage.credentials_path()).await?,
            ),
            StorageBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };

        Ok(
            Self::new(oauth, TokenStore::new(durable), config.server.backend_url.clone())
                .with_persistence_policy(config.persistence.on_failure),
        )
    }

    pub fn with_persistence_policy(mut self, policy: PersistenceFailurePolicy) -> Self {
        self.on_persistence_failure = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.oauth.is_some()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Callback URL that correlates the provider redirect with `caller`
    pub fn callback_url(&self, caller: &CallerIdentity) -> String {
        format!(
            "{}{}/{}",
            self.backend_url,
            CALLBACK_PATH,
            percent_encode(caller.as_str())
        )
    }

    fn oauth(&self) -> Result<&OAuthClient> {
        self.oauth.as_deref().ok_or_else(|| {
            CatalogError::Configuration("catalog API key and secret are not configured".to_string())
        })
    }

    /// Start a handshake and return the URL the user must visit.
    ///
    /// Replaces any handshake already pending for `caller`.
    pub async fn init_oauth(&self, caller: &CallerIdentity) -> Result<String> {
        let oauth = self.oauth()?;
        let callback = self.callback_url(caller);

        let request = oauth.begin_handshake(&callback).await.map_err(|e| {
            error!(caller = %caller, error = %e, "failed to obtain request token");
            e
        })?;

        self.tokens
            .begin_pending(caller, request.token.clone(), request.secret);
        info!(caller = %caller, "started OAuth handshake");

        Ok(oauth.build_authorize_url(&request.token, &callback))
    }

    /// Complete a handshake from the provider redirect.
    ///
    /// A verifier of `"1"` or equal to the pending request token promotes the
    /// request token without calling the provider. Any other verifier is
    /// exchanged at the access-token endpoint.
    pub async fn handle_callback(
        &self,
        caller: &CallerIdentity,
        oauth_token: &str,
        verifier: &str,
    ) -> Result<()> {
        let pending = self
            .tokens
            .pending(caller)
            .ok_or_else(|| CatalogError::NoPendingAuthorization(caller.to_string()))?;

        let verifier = verifier.trim();
        if verifier.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "callback is missing the verifier".to_string(),
            ));
        }

        if !oauth_token.is_empty() && oauth_token != pending.request_token {
            warn!(caller = %caller, "callback token does not match the pending request token");
        }

        let (access_token, access_token_secret) =
            match completion_mode(verifier, &pending.request_token) {
                CompletionMode::Simplified => {
                    debug!(caller = %caller, "simplified callback, promoting request token");
                    (pending.request_token, pending.request_token_secret)
                }
                CompletionMode::Traditional => {
                    let access = self
                        .oauth()?
                        .complete_handshake(
                            &pending.request_token,
                            &pending.request_token_secret,
                            verifier,
                        )
                        .await
                        .map_err(|e| {
                            error!(caller = %caller, error = %e, "access token exchange failed");
                            e
                        })?;
                    (access.token, access.secret)
                }
            };

        match self
            .tokens
            .mark_authorized(caller, access_token, access_token_secret)
            .await
        {
            Ok(_) => {
                info!(caller = %caller, "catalog authorization complete");
                Ok(())
            }
            Err(e @ CatalogError::Storage(_)) => match self.on_persistence_failure {
                PersistenceFailurePolicy::Warn => {
                    warn!(
                        caller = %caller,
                        error = %e,
                        "authorized for this process only, durable write failed"
                    );
                    Ok(())
                }
                PersistenceFailurePolicy::Fail => {
                    error!(caller = %caller, error = %e, "durable write failed");
                    Err(e)
                }
            },
            Err(e) => Err(e),
        }
    }

    /// Search the catalog. `page` is 1-based.
    pub async fn search(
        &self,
        caller: &CallerIdentity,
        query: &str,
        page: i64,
    ) -> Result<SearchResultPage> {
        if page < 1 {
            return Err(CatalogError::InvalidArgument(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| CatalogError::InvalidArgument(format!("page {} is too large", page)))?;
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }

        let credential = self.require_credential(caller).await?;
        let oauth = self.oauth()?;

        debug!(caller = %caller, query, page, "searching catalog");
        let url = oauth.endpoints().search(oauth.consumer_key(), query, page);
        let node = self
            .fetch(oauth, &url, &credential, "search")
            .await
            .map_err(|e| coarsen(caller, "search", e))?;

        let result = adapter::to_search_page(&node, page);
        debug!(
            caller = %caller,
            items = result.items.len(),
            total = result.total_results,
            "search complete"
        );
        Ok(result)
    }

    /// Fetch one book. A response without a book node is `NotFound`.
    pub async fn get_book_by_id(
        &self,
        caller: &CallerIdentity,
        id: &str,
    ) -> Result<NormalizedBookDetail> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "book id must not be empty".to_string(),
            ));
        }

        let credential = self.require_credential(caller).await?;
        let oauth = self.oauth()?;

        debug!(caller = %caller, id, "fetching book");
        let url = oauth.endpoints().book(oauth.consumer_key(), id);
        let detail = match self.fetch(oauth, &url, &credential, "book").await {
            Ok(node) => adapter::to_book_detail(&node),
            Err(e) => Err(e),
        };

        detail.map_err(|e| match e {
            CatalogError::NotFound(_) => {
                debug!(caller = %caller, id, "book not found");
                CatalogError::NotFound(format!("book {}", id))
            }
            other => coarsen(caller, "book", other),
        })
    }

    /// Whether `caller` holds a usable credential
    pub async fn connection_status(&self, caller: &CallerIdentity) -> ConnectionStatus {
        let provider_user_id = match self.tokens.durable(caller).await {
            Ok(durable) => durable.and_then(|d| d.provider_user_id),
            Err(e) => {
                warn!(caller = %caller, error = %e, "durable credential lookup failed");
                None
            }
        };
        let connected = self.tokens.resolve_active_credential(caller).await.is_some();

        ConnectionStatus {
            connected,
            provider_user_id,
        }
    }

    async fn require_credential(&self, caller: &CallerIdentity) -> Result<Credential> {
        self.tokens
            .resolve_active_credential(caller)
            .await
            .ok_or_else(|| {
                debug!(caller = %caller, "no active catalog credential");
                CatalogError::Unauthorized
            })
    }

    async fn fetch(
        &self,
        oauth: &OAuthClient,
        url: &str,
        credential: &Credential,
        wanted: &str,
    ) -> Result<xml::XmlElement> {
        let body = oauth
            .signed_get(url, &credential.token, &credential.token_secret)
            .await?;
        xml::normalize_for(&body, wanted)
    }
}

/// Log the full provider failure, then hand back only its classification
fn coarsen(caller: &CallerIdentity, operation: &str, err: CatalogError) -> CatalogError {
    match err {
        CatalogError::Network(_)
        | CatalogError::Protocol { .. }
        | CatalogError::Decode(_)
        | CatalogError::Storage(_) => {
            error!(caller = %caller, operation, error = %err, "catalog request failed");
            err.into_upstream()
        }
        other => other,
    }
}
