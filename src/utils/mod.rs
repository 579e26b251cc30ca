//! Utility modules supporting catalog operations.
//!
//! - [`HttpClient`]: shared reqwest client with bounded timeouts

mod http;

pub use http::{HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
