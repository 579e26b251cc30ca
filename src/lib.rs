//! # readsgood
//!
//! Search a bibliographic catalog and fetch book details, gated behind
//! per-user OAuth 1.0a authorization against the catalog's API.
//!
//! ## Architecture
//!
//! The library is organized into several modules, leaf-first:
//!
//! - [`xml`]: Decodes provider XML and repairs single-vs-list ambiguity
//! - [`adapter`]: Maps normalized trees into search pages and book details
//! - [`store`]: Per-caller token lifecycle (pending handshakes, durable credentials)
//! - [`oauth`]: OAuth 1.0a signing, token exchange and handshake completion
//! - [`gateway`]: The authorization state machine in front of search and detail
//! - [`server`]: Thin axum surface over the gateway
//! - [`config`]: Configuration management
//! - [`utils`]: Shared HTTP client

pub mod adapter;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod oauth;
pub mod server;
pub mod store;
pub mod utils;
pub mod xml;

// Re-export commonly used types
pub use error::{CatalogError, Result};
pub use gateway::{CatalogGateway, PersistenceFailurePolicy};
pub use models::{CallerIdentity, NormalizedBookDetail, SearchResultPage};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
