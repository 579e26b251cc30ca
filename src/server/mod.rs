//! HTTP surface over [`CatalogGateway`].
//!
//! The caller id is expected in the `x-caller-id` header, set by whatever
//! access-control layer sits in front of this service.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::CatalogError;
use crate::gateway::CatalogGateway;
use crate::models::{AnonymousPolicy, CallerIdentity};
use crate::oauth::signer::percent_encode;

/// Header carrying the resolved caller id
pub const CALLER_HEADER: &str = "x-caller-id";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: CatalogGateway,
    pub anonymous: AnonymousPolicy,
    pub frontend_url: String,
}

impl AppState {
    pub fn new(
        gateway: CatalogGateway,
        anonymous: AnonymousPolicy,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            anonymous,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Result<CallerIdentity, ApiError> {
        let raw = headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(CallerIdentity::resolve(raw, &self.anonymous)?)
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A [`CatalogError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            CatalogError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            CatalogError::NoPendingAuthorization(_) => {
                (StatusCode::BAD_REQUEST, "NO_PENDING_AUTHORIZATION")
            }
            CatalogError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CatalogError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            CatalogError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            CatalogError::Network(_)
            | CatalogError::Protocol { .. }
            | CatalogError::Decode(_)
            | CatalogError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: code.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
    /// Simplified-flow flag sent instead of a verifier
    pub authorize: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeUrlResponse {
    pub authorize_url: String,
}

/// All catalog routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/goodreads/search", get(search_handler))
        .route("/goodreads/books/{id}", get(book_handler))
        .route("/goodreads/auth/init", get(init_handler))
        .route("/goodreads/oauth/return/{user_id}", get(callback_handler))
        .route("/goodreads/status", get(status_handler))
        .with_state(state)
}

async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| CatalogError::InvalidArgument("query parameter q is required".to_string()))?;
    let page = match params.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            CatalogError::InvalidArgument("page must be a positive number".to_string())
        })?,
    };

    let caller = state.caller(&headers)?;
    let result = state.gateway.search(&caller, &query, page).await?;
    Ok(Json(result))
}

async fn book_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.caller(&headers)?;
    let book = state.gateway.get_book_by_id(&caller, &id).await?;
    Ok(Json(book))
}

async fn init_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.caller(&headers)?;
    let authorize_url = state.gateway.init_oauth(&caller).await?;
    Ok(Json(AuthorizeUrlResponse { authorize_url }))
}

async fn status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.caller(&headers)?;
    Ok(Json(state.gateway.connection_status(&caller).await))
}

/// Provider redirect target. Always answers with a redirect to the frontend.
async fn callback_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let outcome = async {
        let caller = CallerIdentity::new(user_id)?;
        let verifier = params
            .oauth_verifier
            .or(params.authorize)
            .unwrap_or_default();
        let token = params.oauth_token.unwrap_or_default();
        state.gateway.handle_callback(&caller, &token, &verifier).await
    }
    .await;

    match outcome {
        Ok(()) => Redirect::to(&format!("{}/all-set.html", state.frontend_url)),
        Err(e) => {
            warn!(error = %e, "OAuth callback failed");
            Redirect::to(&format!(
                "{}/error.html?message={}",
                state.frontend_url,
                percent_encode(&e.to_string())
            ))
        }
    }
}

/// Bind `addr` and serve until SIGINT or SIGTERM
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResultPage;
    use crate::oauth::{ConsumerCredentials, OAuthClient, ProviderEndpoints};
    use crate::store::TokenStore;
    use crate::utils::HttpClient;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const SEARCH_TWO: &str = "<GoodreadsResponse><Request/><search>\
        <total-results>45</total-results><results>\
        <work><id>1</id><best_book><id>10</id><title>A</title></best_book></work>\
        <work><id>2</id><best_book><id>20</id><title>B</title></best_book></work>\
        </results></search></GoodreadsResponse>";

    fn state_for(base: &str, anonymous: AnonymousPolicy) -> AppState {
        let oauth = OAuthClient::new(
            HttpClient::new().unwrap(),
            ConsumerCredentials::new("ckey", "csecret"),
            ProviderEndpoints::new(base).unwrap(),
        );
        let gateway = CatalogGateway::new(Some(oauth), TokenStore::in_memory(), "https://api.example");
        AppState::new(gateway, anonymous, "https://app.example/")
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, caller: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = caller {
            builder = builder.header(CALLER_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_request_rejected() {
        let app = build_router(state_for("http://127.0.0.1:9", AnonymousPolicy::Reject));
        let response = app.oneshot(get("/goodreads/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_anonymous_placeholder_status() {
        let app = build_router(state_for(
            "http://127.0.0.1:9",
            AnonymousPolicy::Placeholder("anonymous-user".to_string()),
        ));
        let response = app.oneshot(get("/goodreads/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn test_search_validation_errors() {
        let state = state_for("http://127.0.0.1:9", AnonymousPolicy::Reject);

        for uri in [
            "/goodreads/search",
            "/goodreads/search?q=dune&page=0",
            "/goodreads/search?q=dune&page=abc",
        ] {
            let response = build_router(state.clone())
                .oneshot(get(uri, Some("u1")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: ErrorBody = body_json(response).await;
            assert_eq!(body.error, "INVALID_ARGUMENT");
        }

        let response = build_router(state)
            .oneshot(get("/goodreads/search?q=dune", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_init_then_callback_then_search() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/request_token")
            .with_status(200)
            .with_body("oauth_token=rt&oauth_token_secret=rts")
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/search/index.xml")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(SEARCH_TWO)
            .create_async()
            .await;
        let state = state_for(&server.url(), AnonymousPolicy::Reject);

        let response = build_router(state.clone())
            .oneshot(get("/goodreads/auth/init", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: AuthorizeUrlResponse = body_json(response).await;
        assert!(body.authorize_url.contains("/oauth/authorize?oauth_token=rt"));

        let response = build_router(state.clone())
            .oneshot(get(
                "/goodreads/oauth/return/u1?oauth_token=rt&authorize=1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://app.example/all-set.html"
        );

        let response = build_router(state)
            .oneshot(get("/goodreads/search?q=dune&page=3", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page: SearchResultPage = body_json(response).await;
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[tokio::test]
    async fn test_callback_with_verifier_exchanges_token() {
        let mut server = mockito::Server::new_async().await;
        let exchange = server
            .mock("POST", "/oauth/access_token")
            .match_header(
                "authorization",
                mockito::Matcher::Regex("oauth_verifier=\"xyz\"".to_string()),
            )
            .with_status(200)
            .with_body("oauth_token=at&oauth_token_secret=ats")
            .expect(1)
            .create_async()
            .await;
        let state = state_for(&server.url(), AnonymousPolicy::Reject);
        let u1 = CallerIdentity::new("u1").unwrap();
        state.gateway.tokens().begin_pending(&u1, "rt", "rts");

        let response = build_router(state.clone())
            .oneshot(get(
                "/goodreads/oauth/return/u1?oauth_token=rt&oauth_verifier=xyz",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://app.example/all-set.html"
        );
        exchange.assert_async().await;
        let stored = state.gateway.tokens().durable(&u1).await.unwrap().unwrap();
        assert_eq!(stored.token, "at");
    }

    #[tokio::test]
    async fn test_callback_without_handshake_redirects_to_error() {
        let app = build_router(state_for("http://127.0.0.1:9", AnonymousPolicy::Reject));
        let response = app
            .oneshot(get("/goodreads/oauth/return/u9?oauth_token=x&authorize=1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://app.example/error.html?message=No%20OAuth%20session"));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (CatalogError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (CatalogError::Unauthorized, StatusCode::UNAUTHORIZED),
            (CatalogError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CatalogError::Configuration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                CatalogError::Upstream {
                    kind: crate::error::UpstreamKind::Network,
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_and_code().0, status);
        }
    }
}
