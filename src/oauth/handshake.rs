//! Dual-mode handshake completion.
//!
//! The provider sometimes skips the verifier step: it redirects back with the
//! verifier set to `"1"` or to the request token itself. Those callbacks are
//! completed locally by promoting the request token; anything else goes
//! through the real access-token exchange.

/// Verifier value the provider sends when it short-circuits the handshake
pub const SIMPLIFIED_VERIFIER: &str = "1";

/// How a callback completes the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Promote the request token pair to the access token pair, no network call
    Simplified,
    /// Exchange the verified request token at the access-token endpoint
    Traditional,
}

/// Decide the completion mode for a callback.
///
/// | verifier               | mode        |
/// |------------------------|-------------|
/// | `"1"`                  | Simplified  |
/// | equal to request token | Simplified  |
/// | anything else          | Traditional |
pub fn completion_mode(verifier: &str, request_token: &str) -> CompletionMode {
    if verifier == SIMPLIFIED_VERIFIER || verifier == request_token {
        CompletionMode::Simplified
    } else {
        CompletionMode::Traditional
    }
}
