//! Configuration commands.
//!
//! - `config show`: Display the effective configuration
//! - `config get`: Print a single value
//! - `config set`: Change a single value and save

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::{Config, TOKEN_ENV, URL_ENV};
use crate::error::Result;

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let effective_url = config.base_url()?;
    let token_configured = config.token().is_some();
    let url_from_env = std::env::var(URL_ENV).is_ok_and(|v| !v.is_empty());
    let token_from_env = std::env::var(TOKEN_ENV).is_ok_and(|v| !v.is_empty());

    let json_output = json!({
        "base_url": effective_url.as_str(),
        "base_url_from_env": url_from_env,
        "page_size": config.page_size,
        "request_timeout": config.request_timeout,
        "connect_timeout": config.connect_timeout,
        "search_debounce_ms": config.search_debounce_ms,
        "auth": {
            "token_configured": token_configured,
            "token_from_env": token_from_env,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text = String::new();
    text.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    let source = if url_from_env {
        format!(" (from {URL_ENV})").dimmed().to_string()
    } else {
        String::new()
    };
    text.push_str(&format!(
        "{}: {}{}\n",
        "base_url".cyan(),
        effective_url,
        source
    ));
    for key in ["page_size", "request_timeout", "connect_timeout", "search_debounce_ms"] {
        text.push_str(&format!("{}: {}\n", key.cyan(), config.get(key)?));
    }

    text.push('\n');
    text.push_str(&format!("{}:\n", "auth".cyan()));
    let token_status = match (token_configured, token_from_env) {
        (true, true) => format!("configured (from {TOKEN_ENV})").green().to_string(),
        (true, false) => "configured".green().to_string(),
        (false, _) => "not configured".dimmed().to_string(),
    };
    text.push_str(&format!("  token: {token_status}\n"));

    text.push('\n');
    text.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output).with_text(text).print(output)
}

/// Get a specific configuration value
pub fn cmd_config_get(key: &str, output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let value = config.get(key)?;
    let masked = key == "auth.token";

    let text = if masked && !value.is_empty() {
        format!("{value} (masked - showing first 2 and last 2 characters)")
    } else {
        value.clone()
    };
    CommandOutput::new(json!({
        "key": key,
        "value": value,
        "configured": !value.is_empty(),
        "masked": masked,
    }))
    .with_text(text)
    .print(output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.validate()?;
    config.save()?;

    // Never echo the token back
    let shown = if key == "auth.token" {
        config.get(key)?
    } else {
        value.to_string()
    };
    tracing::debug!(key, path = %Config::config_path().display(), "config saved");

    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "value": shown,
        "success": true,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), shown))
    .print(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG_ENV, CONFIG_KEYS};
    use crate::test_guards::EnvGuard;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_config_set_persists_and_masks_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let _env = unsafe { EnvGuard::set(CONFIG_ENV, &path).and_remove(TOKEN_ENV) };

        cmd_config_set("page_size", "50", OutputOptions { json: true }).unwrap();
        cmd_config_set("auth.token", "secret-token", OutputOptions::default()).unwrap();

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.page_size, 50);
        assert_eq!(saved.auth.token.as_deref(), Some("secret-token"));
        assert_eq!(saved.get("auth.token").unwrap(), "se...en");
    }

    #[test]
    #[serial]
    fn test_config_set_rejects_unknown_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let _config = unsafe { EnvGuard::set(CONFIG_ENV, &path) };

        let err = cmd_config_set("colour", "blue", OutputOptions::default()).unwrap_err();
        assert!(err.to_string().contains(&CONFIG_KEYS.join(", ")));
        assert!(!path.exists());
    }
}
