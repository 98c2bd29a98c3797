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

//! Endpoint configuration for one monitored system

use crate::errors::ConfigError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_client_field() -> String {
    "c_monitor".to_string()
}

fn default_token_field() -> String {
    "t_monitor".to_string()
}

/// Connection settings for one monitoring endpoint.
/// Immutable once an entry has been set up.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Monitoring API URL, e.g. https://monitor.example.cz/api/status
    pub url: String,

    /// Client identifier sent with every request
    #[serde(alias = "username")]
    pub client_id: String,

    /// Access token sent with every request
    #[serde(alias = "password")]
    pub token: String,

    /// Poll interval in seconds
    #[serde(default = "default_scan_interval", alias = "scan_interval")]
    pub scan_interval_secs: u64,

    /// Verify the server certificate for https URLs.
    /// Disable for monitors with self-signed certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Bound on one complete request (connect, TLS, send, receive)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Form field carrying the client identifier
    #[serde(default = "default_client_field")]
    pub client_field: String,

    /// Form field carrying the access token
    #[serde(default = "default_token_field")]
    pub token_field: String,
}

impl EndpointConfig {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            token: token.into(),
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            verify_ssl: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client_field: default_client_field(),
            token_field: default_token_field(),
        }
    }

    pub fn with_scan_interval(mut self, secs: u64) -> Self {
        self.scan_interval_secs = secs;
        self
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse the endpoint URL, accepting only http and https
    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| ConfigError::new("url", format!("'{}' is not a valid URL: {e}", self.url)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::new(
                    "url",
                    format!("unsupported scheme '{other}', expected http or https"),
                ));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::new("url", "URL has no host"));
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_url()?;

        if self.client_id.trim().is_empty() {
            return Err(ConfigError::new("client_id", "must not be empty"));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::new("token", "must not be empty"));
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::new(
                "scan_interval_secs",
                "must be a positive number of seconds",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::new(
                "timeout_secs",
                "must be a positive number of seconds",
            ));
        }
        if self.client_field.is_empty() || self.token_field.is_empty() {
            return Err(ConfigError::new("client_field", "form field names must not be empty"));
        }

        Ok(())
    }

    /// Copy safe to print or attach to diagnostics
    pub fn redacted(&self) -> Self {
        Self {
            token: "**REDACTED**".to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("token", &"<redacted>")
            .field("scan_interval_secs", &self.scan_interval_secs)
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .field("client_field", &self.client_field)
            .field("token_field", &self.token_field)
            .finish()
    }
}
