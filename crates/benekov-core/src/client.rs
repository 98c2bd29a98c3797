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

//! HTTP client for the monitoring endpoint
//!
//! One blocking form POST per poll. A fresh connection is opened for every
//! request and closed afterwards, so nothing is pooled between polls and an
//! abandoned request never leaves a connection behind.

use crate::config::EndpointConfig;
use crate::errors::{ClientError, ClientResult};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{CONNECTION, HeaderValue};
use std::ops::Range;
use tracing::{debug, error, trace};

const USER_AGENT: &str = concat!("benekov-fve/", env!("CARGO_PKG_VERSION"));

/// Accepted status codes; anything else is a client error
const SUCCESS_STATUS: Range<u16> = 200..299;

/// Longest error body kept in a status error
const MAX_ERROR_BODY: usize = 256;

/// Something that can produce one raw response body per call.
///
/// `fetch` blocks; callers run it on a blocking-capable thread.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self) -> ClientResult<String>;

    /// Short label for log lines
    fn describe(&self) -> String;
}

/// Blocking client for one monitoring endpoint
#[derive(Debug, Clone)]
pub struct MonitorClient {
    url: Url,
    config: EndpointConfig,
}

impl MonitorClient {
    pub fn new(config: &EndpointConfig) -> ClientResult<Self> {
        let url = config.parsed_url().map_err(|e| ClientError::InvalidUrl {
            url: config.url.clone(),
            reason: e.message,
        })?;

        Ok(Self {
            url,
            config: config.clone(),
        })
    }

    fn build_http_client(&self) -> ClientResult<Client> {
        let timeout = self.config.timeout();
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(!self.config.verify_ssl)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))
    }

    fn form(&self) -> [(&str, &str); 2] {
        [
            (self.config.client_field.as_str(), self.config.client_id.as_str()),
            (self.config.token_field.as_str(), self.config.token.as_str()),
        ]
    }

    /// POST the credentials and return the response body
    pub fn fetch(&self) -> ClientResult<String> {
        let client = self.build_http_client()?;

        debug!("📡 [FVE FETCH] POST {}", self.url);
        if !self.config.verify_ssl && self.url.scheme() == "https" {
            trace!("   Certificate verification disabled");
        }

        let response = client
            .post(self.url.clone())
            .header(CONNECTION, HeaderValue::from_static("close"))
            .form(&self.form())
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !SUCCESS_STATUS.contains(&status.as_u16()) {
            let mut message = response.text().unwrap_or_default();
            truncate_utf8(&mut message, MAX_ERROR_BODY);
            error!("❌ [FVE FETCH] Status {}: {}", status, message);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().map_err(|e| self.transport_error(e))?;
        debug!("✅ [FVE FETCH] Received {} bytes", body.len());
        trace!("   Body: {}", body);
        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            error!(
                "❌ [FVE FETCH] Request to {} timed out after {:?}",
                self.url,
                self.config.timeout()
            );
            ClientError::Timeout(self.config.timeout())
        } else if err.is_connect() {
            error!("❌ [FVE FETCH] Cannot connect to {}: {}", self.url, err);
            ClientError::Connect {
                url: self.url.to_string(),
                reason: err.to_string(),
            }
        } else {
            error!("❌ [FVE FETCH] Request failed: {}", err);
            ClientError::Http(err)
        }
    }
}

impl SnapshotSource for MonitorClient {
    fn fetch(&self) -> ClientResult<String> {
        MonitorClient::fetch(self)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

fn truncate_utf8(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn config_for(server: &Server) -> EndpointConfig {
        EndpointConfig::new(format!("{}/api/status", server.url()), "client-1", "secret")
    }

    #[test]
    fn test_fetch_posts_form_credentials() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/status")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_header("connection", "close")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("c_monitor".into(), "client-1".into()),
                Matcher::UrlEncoded("t_monitor".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jmeno":"Dum"}"#)
            .create();

        let client = MonitorClient::new(&config_for(&server)).unwrap();
        let body = client.fetch().unwrap();

        assert_eq!(body, r#"{"jmeno":"Dum"}"#);
        mock.assert();
    }

    #[test]
    fn test_fetch_uses_configured_field_names() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/status")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded("token".into(), "a b&c".into()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create();

        let mut config = config_for(&server);
        config.client_field = "client_id".to_string();
        config.token_field = "token".to_string();
        config.token = "a b&c".to_string();

        let client = MonitorClient::new(&config).unwrap();
        assert_eq!(client.fetch().unwrap(), "{}");
        mock.assert();
    }

    #[test]
    fn test_chunked_body_is_reassembled() {
        let chunks = [
            r#"{"jmeno":"#,
            r#""Dum","baterie":{"#,
            r#""soc":55,"napeti":51.2}"#,
            "}",
        ];
        let expected = chunks.concat();

        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/status")
            .with_status(200)
            .with_chunked_body(move |w| {
                for chunk in &chunks {
                    w.write_all(chunk.as_bytes())?;
                    w.flush()?;
                }
                Ok(())
            })
            .create();

        let client = MonitorClient::new(&config_for(&server)).unwrap();
        let body = client.fetch().unwrap();

        assert_eq!(body, expected);
        mock.assert();
    }

    #[test]
    fn test_chunked_non_ascii_body_split_inside_characters() {
        let expected = r#"{"jmeno":"Dům Žďár","nabijecka":{"nabijecka2":{"stavKonektoru":"odpojeno ✓"}}}"#;

        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/api/status")
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_chunked_body(move |w| {
                for chunk in expected.as_bytes().chunks(3) {
                    w.write_all(chunk)?;
                    w.flush()?;
                }
                Ok(())
            })
            .create();

        let client = MonitorClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.fetch().unwrap(), expected);
    }

    #[test]
    fn test_malformed_chunk_size_fails_fast() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (release, hold) = mpsc::channel::<()>();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nZZ\r\nhello\r\n")
                .unwrap();
            stream.flush().unwrap();
            // keep the connection open so only the bad framing can end the read
            let _ = hold.recv_timeout(Duration::from_secs(10));
        });

        let mut config = EndpointConfig::new(format!("http://{addr}/api/status"), "c", "t");
        config.timeout_secs = 5;
        let client = MonitorClient::new(&config).unwrap();

        let started = Instant::now();
        let result = client.fetch();
        let elapsed = started.elapsed();

        drop(release);
        server.join().unwrap();

        assert!(matches!(result, Err(ClientError::Http(_))), "unexpected result {result:?}");
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    }

    #[test]
    fn test_fetch_with_certificate_verification_disabled() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/status")
            .with_status(200)
            .with_body("{}")
            .create();

        let mut config = config_for(&server);
        config.verify_ssl = false;
        let client = MonitorClient::new(&config).unwrap();

        assert_eq!(client.fetch().unwrap(), "{}");
        mock.assert();
    }

    #[test]
    fn test_error_status_is_client_error() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/status")
            .with_status(500)
            .with_body("internal failure")
            .create();

        let client = MonitorClient::new(&config_for(&server)).unwrap();
        let err = client.fetch().unwrap_err();

        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal failure");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        mock.assert();
    }

    #[test]
    fn test_unauthorized_is_client_error() {
        let mut server = Server::new();
        let _mock = server.mock("POST", "/api/status").with_status(401).create();

        let client = MonitorClient::new(&config_for(&server)).unwrap();
        assert!(matches!(
            client.fetch(),
            Err(ClientError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn test_connection_refused() {
        // port 9 (discard) is closed on test machines
        let config = EndpointConfig::new("http://127.0.0.1:9/api", "c", "t");
        let client = MonitorClient::new(&config).unwrap();

        let err = client.fetch().unwrap_err();
        assert!(
            matches!(err, ClientError::Connect { .. } | ClientError::Http(_)),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn test_timeout() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/api/status")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(Duration::from_secs(3));
                b"{}".to_vec()
            })
            .create();

        let mut config = config_for(&server);
        config.timeout_secs = 1;
        let client = MonitorClient::new(&config).unwrap();

        assert!(matches!(
            client.fetch(),
            Err(ClientError::Timeout(d)) if d == Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = EndpointConfig::new("file:///etc/passwd", "c", "t");
        assert!(matches!(
            MonitorClient::new(&config),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_truncate_utf8() {
        let mut text = "ěščřžýáíé".to_string();
        truncate_utf8(&mut text, 3);
        assert_eq!(text, "ě");

        let mut short = "ok".to_string();
        truncate_utf8(&mut short, 10);
        assert_eq!(short, "ok");
    }
}
