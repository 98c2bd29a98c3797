// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Benekov FVE Monitor.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Host configuration
//!
//! Loaded from the add-on options (`/data/options.json`), then `config.toml`
//! in the working directory, then environment variables alone. `BENEKOV_*`
//! variables also override a single-entry file configuration.

use anyhow::{Context, Result, bail};
use benekov_core::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub const ADDON_OPTIONS_PATH: &str = "/data/options.json";
pub const DEV_CONFIG_PATH: &str = "config.toml";

const ENV_URL: &str = "BENEKOV_URL";
const ENV_CLIENT_ID: &str = "BENEKOV_CLIENT_ID";
const ENV_TOKEN: &str = "BENEKOV_TOKEN";
const ENV_SCAN_INTERVAL: &str = "BENEKOV_SCAN_INTERVAL";
const ENV_VERIFY_SSL: &str = "BENEKOV_VERIFY_SSL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// One entry per monitoring endpoint
    #[serde(default)]
    pub entries: Vec<EndpointConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(
            Path::new(ADDON_OPTIONS_PATH),
            Path::new(DEV_CONFIG_PATH),
            |name| std::env::var(name).ok(),
        )
    }

    fn load_from(
        options_path: &Path,
        dev_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = if let Ok(options_str) = std::fs::read_to_string(options_path) {
            let config: AppConfig = serde_json::from_str(&options_str)
                .with_context(|| format!("Failed to parse {}", options_path.display()))?;
            info!("✅ Loaded configuration from add-on options");
            config
        } else if let Ok(config_str) = std::fs::read_to_string(dev_path) {
            let config: AppConfig = toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", dev_path.display()))?;
            info!("✅ Loaded configuration from {}", dev_path.display());
            config
        } else {
            warn!("No configuration file found, using environment variables");
            AppConfig::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.entries.is_empty() {
            let Some(url) = env(ENV_URL) else {
                return Ok(());
            };
            self.entries.push(EndpointConfig::new(
                url,
                env(ENV_CLIENT_ID).unwrap_or_default(),
                env(ENV_TOKEN).unwrap_or_default(),
            ));
        } else if self.entries.len() == 1 {
            let entry = &mut self.entries[0];
            if let Some(url) = env(ENV_URL) {
                entry.url = url;
            }
            if let Some(client_id) = env(ENV_CLIENT_ID) {
                entry.client_id = client_id;
            }
            if let Some(token) = env(ENV_TOKEN) {
                entry.token = token;
            }
        } else {
            // multi-entry configs only take the numeric overrides below
            if env(ENV_URL).is_some() {
                warn!("{} ignored: configuration has {} entries", ENV_URL, self.entries.len());
            }
        }

        if let Some(interval) = env(ENV_SCAN_INTERVAL) {
            let secs = interval
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_SCAN_INTERVAL} must be a positive integer"))?;
            for entry in &mut self.entries {
                entry.scan_interval_secs = secs;
            }
        }

        if let Some(verify) = env(ENV_VERIFY_SSL) {
            let verify = parse_bool(&verify)
                .with_context(|| format!("{ENV_VERIFY_SSL} must be true or false"))?;
            for entry in &mut self.entries {
                entry.verify_ssl = verify;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            bail!(
                "Configuration must include at least one entry (set {} or provide {})",
                ENV_URL,
                DEV_CONFIG_PATH
            );
        }

        for (idx, entry) in self.entries.iter().enumerate() {
            entry
                .validate()
                .with_context(|| format!("entries[{idx}] ({})", entry.url))?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn write_file(contents: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn missing(dir: &TempDir, name: &str) -> std::path::PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn test_addon_options_take_precedence() {
        let options = write_file(
            r#"{"entries":[{"url":"https://monitor.example.cz/api","username":"c-1","password":"t-1","scan_interval":15}]}"#,
            ".json",
        );
        let toml = write_file(
            "[[entries]]\nurl = \"http://other\"\nclient_id = \"x\"\ntoken = \"y\"\n",
            ".toml",
        );

        let config = AppConfig::load_from(options.path(), toml.path(), no_env).unwrap();

        assert_eq!(config.entries.len(), 1);
        let entry = &config.entries[0];
        assert_eq!(entry.url, "https://monitor.example.cz/api");
        assert_eq!(entry.client_id, "c-1");
        assert_eq!(entry.token, "t-1");
        assert_eq!(entry.scan_interval_secs, 15);
        assert!(entry.verify_ssl);
    }

    #[test]
    fn test_toml_fallback_with_multiple_entries() {
        let dir = TempDir::new().unwrap();
        let toml = write_file(
            r#"
[[entries]]
url = "http://192.168.1.10/api"
client_id = "garage"
token = "a"
verify_ssl = false

[[entries]]
url = "https://monitor.example.cz/api"
client_id = "house"
token = "b"
client_field = "client_id"
token_field = "token"
"#,
            ".toml",
        );

        let config =
            AppConfig::load_from(&missing(&dir, "options.json"), toml.path(), no_env).unwrap();

        assert_eq!(config.entries.len(), 2);
        assert!(!config.entries[0].verify_ssl);
        assert_eq!(config.entries[0].client_field, "c_monitor");
        assert_eq!(config.entries[1].client_field, "client_id");
        assert_eq!(config.entries[1].scan_interval_secs, 5);
    }

    #[test]
    fn test_env_only_configuration() {
        let dir = TempDir::new().unwrap();
        let env = env_from(&[
            ("BENEKOV_URL", "http://monitor.local/api"),
            ("BENEKOV_CLIENT_ID", "c"),
            ("BENEKOV_TOKEN", "t"),
            ("BENEKOV_SCAN_INTERVAL", "30"),
            ("BENEKOV_VERIFY_SSL", "off"),
        ]);

        let config = AppConfig::load_from(
            &missing(&dir, "options.json"),
            &missing(&dir, "config.toml"),
            env,
        )
        .unwrap();

        assert_eq!(config.entries.len(), 1);
        assert_eq!(config.entries[0].scan_interval_secs, 30);
        assert!(!config.entries[0].verify_ssl);
    }

    #[test]
    fn test_env_overrides_single_entry() {
        let dir = TempDir::new().unwrap();
        let toml = write_file(
            "[[entries]]\nurl = \"http://a\"\nclient_id = \"c\"\ntoken = \"old\"\n",
            ".toml",
        );

        let config = AppConfig::load_from(
            &missing(&dir, "options.json"),
            toml.path(),
            env_from(&[("BENEKOV_TOKEN", "new")]),
        )
        .unwrap();

        assert_eq!(config.entries[0].token, "new");
        assert_eq!(config.entries[0].url, "http://a");
    }

    #[test]
    fn test_empty_configuration_is_error() {
        let dir = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            &missing(&dir, "options.json"),
            &missing(&dir, "config.toml"),
            no_env,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_entry_is_error() {
        let dir = TempDir::new().unwrap();
        let env = env_from(&[("BENEKOV_URL", "ftp://monitor.local"), ("BENEKOV_CLIENT_ID", "c")]);
        let result =
            AppConfig::load_from(&missing(&dir, "options.json"), &missing(&dir, "config.toml"), env);

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("entries[0]"), "{message}");
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let dir = TempDir::new().unwrap();
        let env = env_from(&[
            ("BENEKOV_URL", "http://monitor.local"),
            ("BENEKOV_CLIENT_ID", "c"),
            ("BENEKOV_TOKEN", "t"),
            ("BENEKOV_SCAN_INTERVAL", "soon"),
        ]);
        assert!(
            AppConfig::load_from(&missing(&dir, "options.json"), &missing(&dir, "config.toml"), env)
                .is_err()
        );
        assert!(parse_bool("maybe").is_err());
        assert!(parse_bool(" TRUE ").unwrap());
    }
}
