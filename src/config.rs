//! Client configuration.
//!
//! Configuration is stored as YAML in `$BIBKEEPER_CONFIG` or the platform
//! config directory (`~/.config/bibkeeper/config.yaml` on Linux) and includes:
//! - The base URL of the bibliography service
//! - Page size, timeouts and the search debounce window
//! - The bearer token handed over by the session layer

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BibError, Result};

pub const CONFIG_ENV: &str = "BIBKEEPER_CONFIG";
pub const URL_ENV: &str = "BIBKEEPER_URL";
pub const TOKEN_ENV: &str = "BIBKEEPER_TOKEN";

/// Keys accepted by `config get` / `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "base_url",
    "page_size",
    "request_timeout",
    "connect_timeout",
    "search_debounce_ms",
    "auth.token",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the bibliography service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records requested per page (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request/response timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Quiet period before a search/filter change is acted on (default: 300)
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            search_debounce_ms: default_search_debounce_ms(),
            auth: AuthConfig::default(),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        ProjectDirs::from("org", "bibkeeper", "bibkeeper")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from(".bibkeeper.yaml"))
    }

    /// Load configuration from the default path, or defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BibError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                BibError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            BibError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // The file may hold a token: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.page_size == 0 {
            return Err(BibError::Config("page_size must be at least 1".to_string()));
        }
        if self.request_timeout == 0 {
            return Err(BibError::Config(
                "request_timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Service base URL, `BIBKEEPER_URL` taking precedence over the file
    pub fn base_url(&self) -> Result<Url> {
        let raw = match env::var(URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => self.base_url.clone(),
        };
        let url = Url::parse(&raw)
            .map_err(|e| BibError::Config(format!("invalid base_url '{raw}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BibError::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Bearer token from the environment or the config file
    pub fn token(&self) -> Option<String> {
        if let Ok(token) = env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            return Some(token);
        }
        self.auth.token.clone().filter(|t| !t.is_empty())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Read a value by key. The token is never returned in clear.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "base_url" => self.base_url.clone(),
            "page_size" => self.page_size.to_string(),
            "request_timeout" => self.request_timeout.to_string(),
            "connect_timeout" => self.connect_timeout.to_string(),
            "search_debounce_ms" => self.search_debounce_ms.to_string(),
            "auth.token" => match self.auth.token.as_deref() {
                Some(token) => mask_sensitive_value(token),
                None => String::new(),
            },
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a value by key, validating it first.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "base_url" => {
                let previous = std::mem::replace(&mut self.base_url, value.to_string());
                if let Err(e) = Url::parse(value) {
                    self.base_url = previous;
                    return Err(BibError::Config(format!("invalid base_url '{value}': {e}")));
                }
            }
            "page_size" => {
                let size = parse_number::<u32>(key, value)?;
                if size == 0 {
                    return Err(BibError::Config("page_size must be at least 1".to_string()));
                }
                self.page_size = size;
            }
            "request_timeout" => self.request_timeout = parse_number(key, value)?,
            "connect_timeout" => self.connect_timeout = parse_number(key, value)?,
            "search_debounce_ms" => self.search_debounce_ms = parse_number(key, value)?,
            "auth.token" => {
                self.auth.token = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BibError::Config(format!("'{value}' is not a valid number for {key}")))
}

fn unknown_key(key: &str) -> BibError {
    BibError::Config(format!(
        "unknown config key '{key}'. Valid keys: {}",
        CONFIG_KEYS.join(", ")
    ))
}

/// Mask a sensitive value by showing only the first 2 and last 2 characters
pub fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}
