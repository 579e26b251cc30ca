//! Caller identity and the three-phase OAuth credential lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CatalogError;

/// Opaque, stable identifier for a user session.
///
/// Resolved by the access-control layer before the core is invoked and used as
/// the key for all per-caller state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Create an identity from a non-empty string
    pub fn new(id: impl Into<String>) -> Result<Self, CatalogError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CatalogError::InvalidArgument(
                "caller identity must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Resolve an inbound identity through the configured anonymous policy.
    ///
    /// `raw` is whatever the access-control layer forwarded; `None` or a blank
    /// value means the request carried no authenticated session.
    pub fn resolve(raw: Option<&str>, policy: &AnonymousPolicy) -> Result<Self, CatalogError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::new(id),
            None => match policy {
                AnonymousPolicy::Reject => Err(CatalogError::Unauthorized),
                AnonymousPolicy::Placeholder(id) => Self::new(id.clone()),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to do with a request that arrives without a caller identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnonymousPolicy {
    /// Fail with [`CatalogError::Unauthorized`]
    #[default]
    Reject,
    /// Map every anonymous request onto one fixed identity
    Placeholder(String),
}

/// Volatile handshake state for one caller.
///
/// Created by `init_oauth`, mutated in place as the handshake advances and
/// superseded by a [`DurableCredential`] once authorization succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub request_token: String,
    pub request_token_secret: String,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub is_authorized: bool,
}

impl PendingAuthorization {
    pub fn new(request_token: impl Into<String>, request_token_secret: impl Into<String>) -> Self {
        Self {
            request_token: request_token.into(),
            request_token_secret: request_token_secret.into(),
            access_token: None,
            access_token_secret: None,
            is_authorized: false,
        }
    }

    /// The credential this record can sign with, if the handshake finished.
    ///
    /// Falls back to the request token pair when no access token was stored.
    pub fn active_credential(&self) -> Option<Credential> {
        if !self.is_authorized {
            return None;
        }
        Some(Credential {
            token: self
                .access_token
                .clone()
                .unwrap_or_else(|| self.request_token.clone()),
            token_secret: self
                .access_token_secret
                .clone()
                .unwrap_or_else(|| self.request_token_secret.clone()),
            source: CredentialSource::Pending,
        })
    }
}

/// Long-lived access token pair persisted beyond process lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableCredential {
    pub token: String,
    pub token_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
}

impl DurableCredential {
    pub fn new(token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_secret: token_secret.into(),
            provider_user_id: None,
        }
    }

    /// A stored record with a blank token or secret cannot sign anything
    pub fn is_usable(&self) -> bool {
        !self.token.is_empty() && !self.token_secret.is_empty()
    }
}

/// Where an active credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Durable,
    Pending,
}

/// The token pair used to sign an authenticated API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub token_secret: String,
    pub source: CredentialSource,
}

impl From<DurableCredential> for Credential {
    fn from(durable: DurableCredential) -> Self {
        Self {
            token: durable.token,
            token_secret: durable.token_secret,
            source: CredentialSource::Durable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_identity_rejects_blank() {
        assert!(CallerIdentity::new("").is_err());
        assert!(CallerIdentity::new("   ").is_err());
        assert_eq!(CallerIdentity::new("u1").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_resolve_with_reject_policy() {
        let policy = AnonymousPolicy::default();
        assert_eq!(policy, AnonymousPolicy::Reject);
        assert!(matches!(
            CallerIdentity::resolve(None, &policy),
            Err(CatalogError::Unauthorized)
        ));
        assert!(matches!(
            CallerIdentity::resolve(Some("  "), &policy),
            Err(CatalogError::Unauthorized)
        ));
        assert_eq!(
            CallerIdentity::resolve(Some("42"), &policy).unwrap().as_str(),
            "42"
        );
    }

    #[test]
    fn test_resolve_with_placeholder_policy() {
        let policy = AnonymousPolicy::Placeholder("anonymous-user".to_string());
        assert_eq!(
            CallerIdentity::resolve(None, &policy).unwrap().as_str(),
            "anonymous-user"
        );
        assert_eq!(
            CallerIdentity::resolve(Some("7"), &policy).unwrap().as_str(),
            "7"
        );
    }

    #[test]
    fn test_pending_without_authorization_has_no_credential() {
        let pending = PendingAuthorization::new("rt", "rts");
        assert!(pending.active_credential().is_none());
    }

    #[test]
    fn test_pending_prefers_access_token() {
        let mut pending = PendingAuthorization::new("rt", "rts");
        pending.is_authorized = true;
        let credential = pending.active_credential().unwrap();
        assert_eq!(credential.token, "rt");

        pending.access_token = Some("at".to_string());
        pending.access_token_secret = Some("ats".to_string());
        let credential = pending.active_credential().unwrap();
        assert_eq!(credential.token, "at");
        assert_eq!(credential.token_secret, "ats");
        assert_eq!(credential.source, CredentialSource::Pending);
    }

    #[test]
    fn test_durable_credential_json_shape() {
        let durable = DurableCredential::new("t", "s");
        let json = serde_json::to_string(&durable).unwrap();
        assert_eq!(json, r#"{"token":"t","token_secret":"s"}"#);
        assert!(durable.is_usable());
        assert!(!DurableCredential::new("", "s").is_usable());
    }
}
