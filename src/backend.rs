// Backend Module - HTTP access to the LED controller
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::snapshot::DeviceSnapshot;

/// Why a request to the controller produced nothing usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
}

/// The two calls the dashboard makes against the controller.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// GET /state, parsed into a snapshot.
    async fn fetch_state(&self) -> Result<DeviceSnapshot, FetchError>;

    /// GET an arbitrary path; the body of a 200 response is returned verbatim.
    async fn get(&self, path: &str) -> Result<String, FetchError>;
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpBackend {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn get_text(&self, path: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(self.url_for(path))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        // Only a plain 200 counts as success
        if resp.status() != StatusCode::OK {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl Backend for HttpBackend {
    async fn fetch_state(&self) -> Result<DeviceSnapshot, FetchError> {
        let body = self.get_text("/state").await?;
        DeviceSnapshot::from_json(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<String, FetchError> {
        self.get_text(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn client(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_state_parses_snapshot() {
        let app = Router::new().route(
            "/state",
            get(|| async {
                r##"{"mqtt_status": "connected", "modes": ["rainbow"],
                    "strands": {"0": {"strand_name": "Porch", "strand_info": {"pin": 18},
                    "led_info": {"0": {"name": "A", "color": "#ff0000", "animation_text": ""}}}}}"##
            }),
        );
        let backend = client(&spawn_backend(app).await);

        let snapshot = backend.fetch_state().await.unwrap();
        assert_eq!(snapshot.modes, vec!["rainbow"]);
        assert_eq!(snapshot.led_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_state_rejects_bad_body() {
        let app = Router::new().route("/state", get(|| async { "<html>booting</html>" }));
        let backend = client(&spawn_backend(app).await);

        match backend.fetch_state().await {
            Err(FetchError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_200_is_a_failure() {
        let app = Router::new()
            .route("/rainbow", get(|| async { "Rainbow process called, 2 strips total" }))
            .route(
                "/reboot",
                get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "no sudo") }),
            );
        let backend = client(&spawn_backend(app).await);

        assert_eq!(
            backend.get("/rainbow").await.unwrap(),
            "Rainbow process called, 2 strips total"
        );
        assert_eq!(backend.get("/reboot").await, Err(FetchError::Status(500)));
        assert_eq!(backend.get("/missing").await, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Bind then drop so the port is very likely closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = client(&format!("http://{}", addr));
        assert!(matches!(backend.fetch_state().await, Err(FetchError::Transport(_))));
    }

    #[test]
    fn test_url_joining() {
        let backend = client("http://ledpi.local:5000/");
        assert_eq!(backend.base_url(), "http://ledpi.local:5000");
        assert_eq!(backend.url_for("/state"), "http://ledpi.local:5000/state");
        assert_eq!(backend.url_for("rainbow"), "http://ledpi.local:5000/rainbow");
    }
}
