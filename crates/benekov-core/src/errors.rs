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

//! Error types for the monitor core
//!
//! Transport failures are errors in the usual sense. The payload errors are
//! expected outcomes of a poll and are carried as values, so every rejected
//! payload still has the uniform `{"error": <code>}` shape.

use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Failure of one HTTP exchange with the monitoring endpoint
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned error status {status}: {message}")]
    Status { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A response body that could not be turned into a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("response body is not valid JSON")]
    JsonDecodeFailed,

    #[error("response JSON is not an object")]
    InvalidPayload { payload: Value },

    #[error("failed to extract metrics: {exception}")]
    ParseFailed { exception: String },
}

impl PayloadError {
    /// Reason code carried in the error snapshot
    pub fn code(&self) -> &'static str {
        match self {
            Self::JsonDecodeFailed => "JSON_DECODE_FAILED",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::ParseFailed { .. } => "PARSE_FAILED",
        }
    }

    /// Render as an error snapshot: `{"error": <code>, ...}`
    pub fn to_error_snapshot(&self) -> Value {
        match self {
            Self::JsonDecodeFailed => json!({ "error": self.code() }),
            Self::InvalidPayload { payload } => json!({
                "error": self.code(),
                "payload": payload,
            }),
            Self::ParseFailed { exception } => json!({
                "error": self.code(),
                "exception": exception,
            }),
        }
    }
}

/// Why a refresh did not publish a new snapshot
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("transport error: {0}")]
    Transport(#[from] ClientError),

    #[error("payload error {code}: {0}", code = .0.code())]
    Payload(#[from] PayloadError),

    #[error("poll worker failed: {0}")]
    Worker(String),
}

impl RefreshError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Worker(_))
    }
}

/// Invalid endpoint configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration for '{field}': {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failure of the initial connectivity check or first refresh
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("cannot connect to monitor: {0}")]
    CannotConnect(String),

    #[error("monitor rejected the credentials (response was not JSON)")]
    InvalidAuth,

    #[error("monitor returned an unusable payload: {code}", code = .0.code())]
    Api(PayloadError),
}

impl SetupError {
    /// Error key shown by the host's setup form
    pub fn form_error_key(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_url",
            Self::InvalidAuth => "invalid_auth",
            Self::CannotConnect(_) | Self::Api(_) => "cannot_connect",
        }
    }
}

impl From<RefreshError> for SetupError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Transport(e) => Self::CannotConnect(e.to_string()),
            RefreshError::Worker(e) => Self::CannotConnect(e),
            RefreshError::Payload(PayloadError::JsonDecodeFailed) => Self::InvalidAuth,
            RefreshError::Payload(e) => Self::Api(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_snapshot_shapes() {
        assert_eq!(
            PayloadError::JsonDecodeFailed.to_error_snapshot(),
            json!({"error": "JSON_DECODE_FAILED"})
        );
        assert_eq!(
            PayloadError::InvalidPayload {
                payload: json!([1, 2, 3])
            }
            .to_error_snapshot(),
            json!({"error": "INVALID_PAYLOAD", "payload": [1, 2, 3]})
        );
        let snapshot = PayloadError::ParseFailed {
            exception: "boom".to_string(),
        }
        .to_error_snapshot();
        assert_eq!(snapshot["error"], "PARSE_FAILED");
        assert_eq!(snapshot["exception"], "boom");
    }

    #[test]
    fn test_setup_error_mapping() {
        let decode: SetupError = RefreshError::Payload(PayloadError::JsonDecodeFailed).into();
        assert!(matches!(decode, SetupError::InvalidAuth));
        assert_eq!(decode.form_error_key(), "invalid_auth");

        let invalid: SetupError = RefreshError::Payload(PayloadError::InvalidPayload {
            payload: json!(1),
        })
        .into();
        assert!(matches!(invalid, SetupError::Api(_)));
        assert_eq!(invalid.form_error_key(), "cannot_connect");

        let transport: SetupError = RefreshError::Transport(ClientError::Status {
            status: 500,
            message: "oops".to_string(),
        })
        .into();
        assert!(matches!(transport, SetupError::CannotConnect(_)));
        assert_eq!(transport.form_error_key(), "cannot_connect");

        let config: SetupError = ConfigError::new("url", "missing").into();
        assert_eq!(config.form_error_key(), "invalid_url");
    }

    #[test]
    fn test_refresh_error_classes() {
        assert!(RefreshError::Worker("panic".to_string()).is_transport());
        assert!(!RefreshError::Payload(PayloadError::JsonDecodeFailed).is_transport());
    }
}
