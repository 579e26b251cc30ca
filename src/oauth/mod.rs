//! OAuth 1.0a protocol support: request signing, token exchange and the
//! provider's dual-mode handshake completion.

mod client;
mod endpoints;
mod handshake;
pub mod signer;

pub use client::{parse_token_response, ConsumerCredentials, OAuthClient, TokenPair};
pub use endpoints::{ProviderEndpoints, DEFAULT_BASE_URL};
pub use handshake::{completion_mode, CompletionMode, SIMPLIFIED_VERIFIER};
