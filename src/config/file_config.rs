//! Configuration file support for readsgood.
//!
//! # Configuration File Format
//!
//! ```toml
//! [provider]
//! api_key = "your-consumer-key"
//! api_secret = "your-consumer-secret"
//! base_url = "https://www.goodreads.com"
//!
//! [server]
//! backend_url = "https://rg.example/api"
//! frontend_url = "https://rg.example"
//! bind = "127.0.0.1:3000"
//!
//! [http]
//! timeout_seconds = 10
//! connect_timeout_seconds = 5
//!
//! [identity]
//! anonymous = "reject"          # or "placeholder"
//! placeholder_id = "anonymous-user"
//!
//! [persistence]
//! on_failure = "warn"           # or "fail"
//!
//! [storage]
//! backend = "file"              # or "memory"
//! credentials_path = "/var/lib/readsgood/credentials.json"
//!
//! [logging]
//! level = "info"
//! format = "text"               # or "json"
//! ```

use std::path::Path;

use super::Config;

/// Commented starter file written by `readsgood config init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# readsgood configuration

[provider]
# api_key = ""
# api_secret = ""
base_url = "https://www.goodreads.com"

[server]
backend_url = "http://localhost:3000"
frontend_url = "http://localhost:5173"
bind = "127.0.0.1:3000"

[http]
timeout_seconds = 10
connect_timeout_seconds = 5

[identity]
anonymous = "reject"
placeholder_id = "anonymous-user"

[persistence]
on_failure = "warn"

[storage]
backend = "file"

[logging]
level = "info"
format = "text"
"#;

impl Config {
    /// Load configuration from a TOML file, without environment overrides
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }

    /// Write the starter template to `path`, refusing to overwrite
    pub fn write_template(path: &Path) -> Result<(), ConfigFileError> {
        if path.exists() {
            return Err(ConfigFileError::Exists(path.display().to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Copy of `config` safe to print
pub fn redacted(config: &Config) -> Config {
    let mut copy = config.clone();
    if copy.provider.api_secret.is_some() {
        copy.provider.api_secret = Some("[REDACTED]".to_string());
    }
    copy
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Refusing to overwrite existing file: {0}")]
    Exists(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnonymousMode, LogFormat};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.identity.anonymous, AnonymousMode::Reject);
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_write_template_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readsgood").join("config.toml");

        Config::write_template(&path).unwrap();
        let loaded = Config::from_toml_file(&path).unwrap();
        assert_eq!(loaded.server.bind, "127.0.0.1:3000");

        let again = Config::write_template(&path);
        assert!(matches!(again, Err(ConfigFileError::Exists(_))));
    }

    #[test]
    fn test_toml_round_trip_keeps_policies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.identity.anonymous = AnonymousMode::Placeholder;
        config.http.timeout_seconds = 4;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = Config::from_toml_file(&path).unwrap();
        assert_eq!(loaded.identity.anonymous, AnonymousMode::Placeholder);
        assert_eq!(loaded.http.timeout_seconds, 4);
    }

    #[test]
    fn test_redacted_hides_secret() {
        let mut config = Config::default();
        config.provider.api_secret = Some("hunter2".to_string());
        let shown = redacted(&config).to_toml().unwrap();
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/config.toml");
        assert!(matches!(
            Config::from_toml_file(&path),
            Err(ConfigFileError::Io(_))
        ));
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();
        assert!(matches!(
            Config::from_toml_file(&path),
            Err(ConfigFileError::Parse(_))
        ));
    }
}
