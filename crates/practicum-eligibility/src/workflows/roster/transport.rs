use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::RosterSourceConfig;

/// Failures talking to the remote file server. Callers retry by invoking the fetch again.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("roster server rejected the credentials (status {status})")]
    Unauthorized { status: u16 },
    #[error("roster server unreachable: {0}")]
    Connection(String),
    #[error("roster server answered {status} for '{path}'")]
    Status { path: String, status: u16 },
    #[error("roster server returned no usable modification time for '{path}'")]
    Metadata { path: String },
    #[error("invalid roster path '{path}'")]
    InvalidPath { path: String },
}

/// Opens authenticated sessions against the server holding the roster file.
#[async_trait]
pub trait RosterTransport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, TransportError>;
}

/// One authenticated session. Dropping the session releases it.
#[async_trait]
pub trait RemoteSession: Send {
    async fn modified_at(&mut self, path: &str) -> Result<DateTime<Utc>, TransportError>;
    async fn read(&mut self, path: &str) -> Result<Vec<u8>, TransportError>;
}

/// Roster transport over HTTP(S) with basic authentication.
#[derive(Clone)]
pub struct HttpRosterTransport {
    base_url: Url,
    username: String,
    secret: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpRosterTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRosterTransport")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpRosterTransport {
    pub fn new(config: &RosterSourceConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            secret: config.secret.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl RosterTransport for HttpRosterTransport {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, TransportError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| TransportError::Connection(err.to_string()))?;

        debug!(host = ?self.base_url.host_str(), "roster session opened");

        Ok(Box::new(HttpSession {
            client,
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            secret: self.secret.clone(),
        }))
    }
}

struct HttpSession {
    client: Client,
    base_url: Url,
    username: String,
    secret: String,
}

impl HttpSession {
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let directory = format!("{}/", base.path());
            base.set_path(&directory);
        }

        base.join(path.trim_start_matches('/'))
            .map_err(|_| TransportError::InvalidPath {
                path: path.to_string(),
            })
    }

    fn check(path: &str, response: Response) -> Result<Response, TransportError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::Unauthorized {
                status: response.status().as_u16(),
            }),
            status if !status.is_success() => Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response),
        }
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Connection(format!("timed out: {err}"))
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl RemoteSession for HttpSession {
    async fn modified_at(&mut self, path: &str) -> Result<DateTime<Utc>, TransportError> {
        let url = self.resolve(path)?;
        let response = self
            .client
            .head(url)
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(request_error)?;
        let response = Self::check(path, response)?;

        response
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| DateTime::parse_from_rfc2822(raw.trim()).ok())
            .map(|stamp| stamp.with_timezone(&Utc))
            .ok_or_else(|| TransportError::Metadata {
                path: path.to_string(),
            })
    }

    async fn read(&mut self, path: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.resolve(path)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .map_err(request_error)?;
        let response = Self::check(path, response)?;
        let body = response.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        debug!(host = ?self.base_url.host_str(), "roster session released");
    }
}
