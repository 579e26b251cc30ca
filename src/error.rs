//! Error taxonomy shared by every layer of the catalog core.
//!
//! Inner layers (XML normalization, OAuth signing, token storage) return these
//! variants unchanged; [`crate::gateway::CatalogGateway`] coarsens provider
//! failures into [`CatalogError::Upstream`] so callers see a small, stable
//! surface.

use std::fmt;

/// Sub-kind of a [`CatalogError::Protocol`] failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// The provider rejected the signed request (non-2xx, malformed token response)
    Rejected,
    /// The provider signalled an invalid or expired token
    Unauthenticated,
}

/// Diagnostic kind carried by [`CatalogError::Upstream`]
///
/// Only the classification survives the gateway boundary; raw provider text
/// is logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    Network,
    Protocol,
    Unauthenticated,
    Decode,
    Other,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpstreamKind::Network => "network",
            UpstreamKind::Protocol => "protocol",
            UpstreamKind::Unauthenticated => "unauthenticated",
            UpstreamKind::Decode => "decode",
            UpstreamKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors that can occur anywhere in the catalog core
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Bad caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No active credential for the caller
    #[error("Not authorized with the catalog provider")]
    Unauthorized,

    /// Callback arrived without a matching handshake
    #[error("No OAuth session found for caller {0}")]
    NoPendingAuthorization(String),

    /// Provider credentials (or other required settings) are absent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed provider XML
    #[error("Decode error: {0}")]
    Decode(String),

    /// Entity absent in an otherwise well-formed response
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure (timeout, connection refused)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected a signed request
    #[error("Protocol error ({kind:?}): {message}")]
    Protocol { kind: ProtocolKind, message: String },

    /// Provider-side failure, coarsened at the gateway boundary
    #[error("Upstream catalog request failed ({kind})")]
    Upstream { kind: UpstreamKind },

    /// Durable credential persistence failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Shorthand for a [`ProtocolKind::Rejected`] protocol error
    pub fn rejected(message: impl Into<String>) -> Self {
        CatalogError::Protocol {
            kind: ProtocolKind::Rejected,
            message: message.into(),
        }
    }

    /// Coarsen a provider-side failure into [`CatalogError::Upstream`].
    ///
    /// Caller-facing kinds (`NotFound`, `Unauthorized`, ...) pass through.
    pub fn into_upstream(self) -> Self {
        let kind = match self {
            CatalogError::Network(_) => UpstreamKind::Network,
            CatalogError::Protocol {
                kind: ProtocolKind::Unauthenticated,
                ..
            } => UpstreamKind::Unauthenticated,
            CatalogError::Protocol { .. } => UpstreamKind::Protocol,
            CatalogError::Decode(_) => UpstreamKind::Decode,
            CatalogError::Storage(_) => UpstreamKind::Other,
            other => return other,
        };
        CatalogError::Upstream { kind }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

impl From<quick_xml::Error> for CatalogError {
    fn from(err: quick_xml::Error) -> Self {
        CatalogError::Decode(format!("XML: {}", err))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Storage(format!("JSON: {}", err))
    }
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
