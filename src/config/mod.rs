//! Configuration management.

mod file_config;

pub use file_config::{redacted, ConfigFileError, DEFAULT_CONFIG_TEMPLATE};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::PersistenceFailurePolicy;
use crate::models::AnonymousPolicy;
use crate::oauth::DEFAULT_BASE_URL;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog provider credentials and host
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Public URLs and bind address of the HTTP surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Anonymous caller handling
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Durable write failure handling
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Where durable credentials live
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// The identity policy as a domain value
    pub fn anonymous_policy(&self) -> AnonymousPolicy {
        match self.identity.anonymous {
            AnonymousMode::Reject => AnonymousPolicy::Reject,
            AnonymousMode::Placeholder => {
                AnonymousPolicy::Placeholder(self.identity.placeholder_id.clone())
            }
        }
    }
}

/// Provider credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Consumer key (`GOODREADS_API_KEY`)
    #[serde(default = "env_api_key")]
    pub api_key: Option<String>,

    /// Consumer secret (`GOODREADS_API_SECRET`)
    #[serde(default = "env_api_secret")]
    pub api_secret: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: env_api_key(),
            api_secret: env_api_secret(),
            base_url: default_base_url(),
        }
    }
}

impl ProviderConfig {
    /// Key and secret, when both are set and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let secret = self.api_secret.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((key, secret))
    }
}

fn env_api_key() -> Option<String> {
    std::env::var("GOODREADS_API_KEY").ok()
}

fn env_api_secret() -> Option<String> {
    std::env::var("GOODREADS_API_SECRET").ok()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public URL of this backend; the OAuth callback is built from it (`BACKEND_URL`)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Where callback redirects land (`FRONTEND_APP_URL`)
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            frontend_url: default_frontend_url(),
            bind: default_bind(),
        }
    }
}

fn default_backend_url() -> String {
    std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn default_frontend_url() -> String {
    std::env::var("FRONTEND_APP_URL").unwrap_or_else(|_| "http://localhost:5173".to_string())
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

/// How requests without a caller id are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousMode {
    #[default]
    Reject,
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub anonymous: AnonymousMode,

    /// Identity used for every anonymous request in placeholder mode
    #[serde(default = "default_placeholder_id")]
    pub placeholder_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            anonymous: AnonymousMode::default(),
            placeholder_id: default_placeholder_id(),
        }
    }
}

fn default_placeholder_id() -> String {
    "anonymous-user".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub on_failure: PersistenceFailurePolicy,
}

/// Credential store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// JSON credential file, defaults to `<data dir>/readsgood/credentials.json`
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("readsgood")
                .join("credentials.json")
        })
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a file, with `READSGOOD__SECTION__KEY` overrides
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(
            config::Environment::with_prefix("READSGOOD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

/// `./readsgood.toml`, then `<config dir>/readsgood/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("readsgood.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("readsgood").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert_eq!(config.identity.anonymous, AnonymousMode::Reject);
        assert_eq!(config.anonymous_policy(), AnonymousPolicy::Reject);
        assert_eq!(config.persistence.on_failure, PersistenceFailurePolicy::Warn);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readsgood.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"
[provider]
api_key = "key"
api_secret = "secret"
base_url = "http://127.0.0.1:9999"

[server]
backend_url = "https://rg.example/api"
frontend_url = "https://rg.example"

[http]
timeout_seconds = 3

[identity]
anonymous = "placeholder"

[persistence]
on_failure = "fail"

[storage]
backend = "memory"

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.credentials(), Some(("key", "secret")));
        assert_eq!(config.provider.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.server.backend_url, "https://rg.example/api");
        assert_eq!(config.http.timeout_seconds, 3);
        assert_eq!(config.http.connect_timeout_seconds, 5);
        assert_eq!(
            config.anonymous_policy(),
            AnonymousPolicy::Placeholder("anonymous-user".to_string())
        );
        assert_eq!(config.persistence.on_failure, PersistenceFailurePolicy::Fail);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readsgood.toml");
        std::fs::write(&path, "[persistence]\non_failure = \"explode\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_blank_credentials_are_absent() {
        let provider = ProviderConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("  ".to_string()),
            base_url: default_base_url(),
        };
        assert!(provider.credentials().is_none());
    }

    #[test]
    fn test_explicit_credentials_path() {
        let storage = StorageConfig {
            backend: StorageBackend::File,
            credentials_path: Some(PathBuf::from("/tmp/creds.json")),
        };
        assert_eq!(storage.credentials_path(), PathBuf::from("/tmp/creds.json"));
    }
}
