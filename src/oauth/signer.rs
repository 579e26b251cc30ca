//! OAuth 1.0a HMAC-SHA1 request signing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 percent-encoding: everything outside `A-Za-z0-9-._~` is escaped
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Protocol parameters for one signed request
#[derive(Debug, Clone)]
pub struct OAuthParams {
    pub consumer_key: String,
    pub token: Option<String>,
    pub callback: Option<String>,
    pub verifier: Option<String>,
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuthParams {
    /// Fresh parameters with a random nonce and the current timestamp
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            token: None,
            callback: None,
            verifier: None,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn verifier(mut self, verifier: impl Into<String>) -> Self {
        self.verifier = Some(verifier.into());
        self
    }

    /// Fix nonce and timestamp (deterministic signatures)
    pub fn fixed(mut self, nonce: impl Into<String>, timestamp: i64) -> Self {
        self.nonce = nonce.into();
        self.timestamp = timestamp;
        self
    }

    /// All `oauth_*` parameters except the signature, unencoded
    fn protocol_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", self.nonce.clone()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", self.timestamp.to_string()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            pairs.push(("oauth_token", token.clone()));
        }
        if let Some(callback) = &self.callback {
            pairs.push(("oauth_callback", callback.clone()));
        }
        if let Some(verifier) = &self.verifier {
            pairs.push(("oauth_verifier", verifier.clone()));
        }
        pairs
    }
}

/// Scheme, authority and path, without query or fragment.
///
/// `Url` already lowercases scheme and host and drops default ports.
pub fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

/// Build the signature base string for `method` on `url`
pub fn signature_base_string(method: &str, url: &Url, params: &OAuthParams) -> String {
    let mut encoded: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            params
                .protocol_pairs()
                .into_iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(&v))),
        )
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized)
    )
}

/// HMAC-SHA1 over `base_string`, base64-encoded
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Compute the `Authorization: OAuth ...` header value for a request
pub fn authorization_header(
    method: &str,
    url: &Url,
    params: &OAuthParams,
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let base = signature_base_string(method, url, params);
    let signature = sign(&base, consumer_secret, token_secret);

    let mut pairs = params.protocol_pairs();
    pairs.push(("oauth_signature", signature));
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let fields = pairs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos_request() -> (Url, OAuthParams) {
        let url =
            Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original").unwrap();
        let params = OAuthParams::new("dpf43f3p2l4k3l03")
            .token("nnch734d00sl2jdk")
            .fixed("kllo9940pd9333jh", 1191242096);
        (url, params)
    }

    #[test]
    fn test_percent_encode_unreserved_set() {
        assert_eq!(percent_encode("abcXYZ019-._~"), "abcXYZ019-._~");
        assert_eq!(percent_encode("a b&c=d/e+f"), "a%20b%26c%3Dd%2Fe%2Bf");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_base_string_uri_drops_query_and_default_port() {
        let url = Url::parse("HTTP://Example.COM:80/r%20v/X?id=123").unwrap();
        assert_eq!(base_string_uri(&url), "http://example.com/r%20v/X");

        let url = Url::parse("https://www.example.net:8080/?q=1").unwrap();
        assert_eq!(base_string_uri(&url), "https://www.example.net:8080/");
    }

    #[test]
    fn test_signature_base_string_reference_example() {
        let (url, params) = photos_request();
        let base = signature_base_string("GET", &url, &params);
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn test_sign_reference_example() {
        let (url, params) = photos_request();
        let base = signature_base_string("GET", &url, &params);
        assert_eq!(
            sign(&base, "kd94hf93k423kf44", "pfkkdhi9sl3r4s00"),
            "tR3+Ty81lMeYAr/Fid0kMTYa/WM="
        );
    }

    #[test]
    fn test_authorization_header_contains_encoded_signature() {
        let (url, params) = photos_request();
        let header =
            authorization_header("GET", &url, &params, "kd94hf93k423kf44", "pfkkdhi9sl3r4s00");
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""));
        assert!(header.contains("oauth_token=\"nnch734d00sl2jdk\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
    }

    #[test]
    fn test_callback_is_signed_and_encoded() {
        let url = Url::parse("https://www.goodreads.com/oauth/request_token").unwrap();
        let params = OAuthParams::new("key")
            .callback("https://app.example/api/goodreads/oauth/return/u1")
            .fixed("n", 1);
        let base = signature_base_string("POST", &url, &params);
        assert!(base.starts_with("POST&https%3A%2F%2Fwww.goodreads.com%2Foauth%2Frequest_token&"));
        assert!(base.contains(
            "oauth_callback%3Dhttps%253A%252F%252Fapp.example%252Fapi%252Fgoodreads%252Foauth%252Freturn%252Fu1"
        ));
    }

    #[test]
    fn test_fresh_params_differ() {
        let a = OAuthParams::new("key");
        let b = OAuthParams::new("key");
        assert_ne!(a.nonce, b.nonce);
        assert!(a.timestamp > 0);
    }
}
