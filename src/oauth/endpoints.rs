//! Provider endpoint URLs.

use url::Url;

use crate::error::{CatalogError, Result};
use crate::oauth::signer::percent_encode;

/// Default catalog host
pub const DEFAULT_BASE_URL: &str = "https://www.goodreads.com";

/// All provider URLs derived from one base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    base: String,
}

impl ProviderEndpoints {
    /// Validate `base_url` and strip any trailing slash
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            CatalogError::Configuration(format!("invalid provider base URL '{}': {}", base_url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(CatalogError::Configuration(format!(
                "provider base URL '{}' cannot be a base",
                base_url
            )));
        }
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn request_token(&self) -> String {
        format!("{}/oauth/request_token", self.base)
    }

    pub fn access_token(&self) -> String {
        format!("{}/oauth/access_token", self.base)
    }

    /// Redirect target for the user; this system never calls it
    pub fn authorize(&self, request_token: &str, callback_url: &str) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}&oauth_callback={}",
            self.base,
            percent_encode(request_token),
            percent_encode(callback_url)
        )
    }

    pub fn search(&self, api_key: &str, query: &str, page: u32) -> String {
        format!(
            "{}/search/index.xml?key={}&q={}&page={}",
            self.base,
            percent_encode(api_key),
            percent_encode(query),
            page
        )
    }

    pub fn book(&self, api_key: &str, book_id: &str) -> String {
        format!(
            "{}/book/show/{}.xml?key={}",
            self.base,
            percent_encode(book_id),
            percent_encode(api_key)
        )
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_base() {
        let endpoints = ProviderEndpoints::new("http://127.0.0.1:1234/").unwrap();
        assert_eq!(
            endpoints.request_token(),
            "http://127.0.0.1:1234/oauth/request_token"
        );
        assert_eq!(
            endpoints.access_token(),
            "http://127.0.0.1:1234/oauth/access_token"
        );
    }

    #[test]
    fn test_authorize_url_encodes_callback() {
        let endpoints = ProviderEndpoints::default();
        let url = endpoints.authorize("abc", "https://api.example/goodreads/oauth/return/u1");
        assert_eq!(
            url,
            "https://www.goodreads.com/oauth/authorize?oauth_token=abc&oauth_callback=\
             https%3A%2F%2Fapi.example%2Fgoodreads%2Foauth%2Freturn%2Fu1"
        );
    }

    #[test]
    fn test_search_and_book_urls() {
        let endpoints = ProviderEndpoints::default();
        assert_eq!(
            endpoints.search("k", "lord of the rings", 2),
            "https://www.goodreads.com/search/index.xml?key=k&q=lord%20of%20the%20rings&page=2"
        );
        assert_eq!(
            endpoints.book("k", "50"),
            "https://www.goodreads.com/book/show/50.xml?key=k"
        );
    }

    #[test]
    fn test_invalid_base_is_configuration_error() {
        assert!(matches!(
            ProviderEndpoints::new("not a url"),
            Err(CatalogError::Configuration(_))
        ));
    }
}
