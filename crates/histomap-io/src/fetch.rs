//! Feature layer retrieval.
//!
//! A selection issues exactly one GET for its feature path, resolved relative
//! to the page location. Any non-2xx status is a failure; there are no
//! retries at this layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use crate::settings::HostSettings;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot resolve feature path '{path}': {message}")]
    InvalidUrl { path: String, message: String },

    #[error("server responded with HTTP {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// HTTP status of a rejected response, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

// ── Source trait ──────────────────────────────────────────────────────

/// Something that can produce the raw JSON document for a feature path.
#[async_trait]
pub trait LayerSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError>;
}

// ── HTTP source ───────────────────────────────────────────────────────

/// Fetches feature layers over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpLayerSource {
    client: Client,
    base: Url,
}

impl HttpLayerSource {
    pub fn new(settings: &HostSettings) -> Result<Self, FetchError> {
        let base = Url::parse(&settings.base_url).map_err(|e| FetchError::InvalidUrl {
            path: settings.base_url.clone(),
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        log::debug!("Resolving feature paths against {}", base);
        Ok(Self { client, base })
    }

    /// Resolve a feature path against the base location.
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base.join(path).map_err(|e| FetchError::InvalidUrl {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl LayerSource for HttpLayerSource {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.resolve(path)?;
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned response; the request line is sent back through the
    /// returned receiver.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]);
            let _ = tx.send(head.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{}/app/", addr), rx)
    }

    fn source(base_url: &str) -> HttpLayerSource {
        let settings = HostSettings {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
            ..Default::default()
        };
        HttpLayerSource::new(&settings).unwrap()
    }

    #[test]
    fn test_resolve_relative_to_page() {
        let src = source("https://maps.example.org/app/index.html");
        let url = src.resolve("features/world_100.geojson").unwrap();
        assert_eq!(
            url.as_str(),
            "https://maps.example.org/app/features/world_100.geojson"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let settings = HostSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpLayerSource::new(&settings),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let (base, request) =
            serve_once("200 OK", r#"{"type":"FeatureCollection","features":[]}"#).await;
        let value = source(&base).fetch("features/world_100.geojson").await.unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(
            request.await.unwrap(),
            "GET /app/features/world_100.geojson HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let (base, _request) = serve_once("404 Not Found", "{}").await;
        let err = source(&base).fetch("features/missing.geojson").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body() {
        let (base, _request) = serve_once("200 OK", "<html></html>").await;
        let err = source(&base).fetch("features/world_100.geojson").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(err.status(), None);
    }
}
