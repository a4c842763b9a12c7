use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::api;
use super::api::Command;
use super::api::FppdStatus;
use super::error::FppError;

/// Trait for FPP REST API operations
///
/// This trait allows for mocking the device for testing purposes
#[async_trait]
pub trait FppClient: Send + Sync {
    /// Whether the device accepts TCP connections on its HTTP port
    async fn is_reachable(&self) -> bool;

    /// `GET /api/fppd/status`
    async fn status(&self) -> Result<FppdStatus, FppError>;

    /// `GET /api/playlists/playable`
    async fn playable_playlists(&self) -> Result<Vec<String>, FppError>;

    /// Issue a GET and discard the response body
    async fn get(&self, path: &str) -> Result<(), FppError>;

    /// `POST /api/command` and discard the response body
    async fn command(&self, command: &Command) -> Result<(), FppError>;
}

/// `host:port` for the reachability probe, defaulting to port 80
fn probe_address(host: &str) -> String {
    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if has_port {
        host.to_string()
    } else {
        format!("{}:80", host)
    }
}

/// Real FPP client implementation using reqwest
pub struct HttpFppClient {
    base_url: String,
    probe_addr: String,
    probe_timeout: Duration,
    http: reqwest::Client,
}

impl HttpFppClient {
    /// Create a client for the device at `host` (hostname or `host:port`)
    pub fn new(
        host: &str,
        probe_timeout: Duration,
        request_timeout: Option<Duration>,
    ) -> Result<Self, FppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(FppError::Client)?;

        Ok(Self {
            base_url: format!("http://{}", host),
            probe_addr: probe_address(host),
            probe_timeout,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_get(&self, path: &str) -> Result<reqwest::Response, FppError> {
        debug!("GET {}", path);
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| FppError::Http {
                path: path.to_string(),
                source,
            })?;
        check_status(path, resp)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, FppError> {
        self.send_get(path)
            .await?
            .json::<T>()
            .await
            .map_err(|source| FppError::Http {
                path: path.to_string(),
                source,
            })
    }
}

fn check_status(path: &str, resp: reqwest::Response) -> Result<reqwest::Response, FppError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FppError::Status {
            path: path.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl FppClient for HttpFppClient {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, TcpStream::connect(&self.probe_addr)).await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe of {} failed: {}", self.probe_addr, e);
                false
            }
            Err(_) => {
                debug!(
                    "Probe of {} timed out after {:?}",
                    self.probe_addr, self.probe_timeout
                );
                false
            }
        }
    }

    async fn status(&self) -> Result<FppdStatus, FppError> {
        self.get_json(api::STATUS_PATH).await
    }

    async fn playable_playlists(&self) -> Result<Vec<String>, FppError> {
        self.get_json(api::PLAYABLE_PLAYLISTS_PATH).await
    }

    async fn get(&self, path: &str) -> Result<(), FppError> {
        self.send_get(path).await.map(|_| ())
    }

    async fn command(&self, command: &Command) -> Result<(), FppError> {
        debug!("POST {} {:?}", api::COMMAND_PATH, command);
        let resp = self
            .http
            .post(self.url(api::COMMAND_PATH))
            .json(command)
            .send()
            .await
            .map_err(|source| FppError::Http {
                path: api::COMMAND_PATH.to_string(),
                source,
            })?;
        check_status(api::COMMAND_PATH, resp).map(|_| ())
    }
}

/// A request seen by [`MockFppClient`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum MockRequest {
    Get(String),
    Post(String, serde_json::Value),
}

#[cfg(test)]
#[derive(Debug)]
struct MockState {
    reachable: bool,
    status: serde_json::Value,
    playlists: Vec<String>,
    fail_status: Option<u16>,
    requests: Vec<MockRequest>,
}

/// Mock FPP device for testing
///
/// Clones share state, so a test can keep a handle after moving one into a player.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockFppClient {
    state: std::sync::Arc<std::sync::Mutex<MockState>>,
}

#[cfg(test)]
impl MockFppClient {
    /// A reachable, idle device with no playlists
    pub fn new() -> Self {
        Self {
            state: std::sync::Arc::new(std::sync::Mutex::new(MockState {
                reachable: true,
                status: serde_json::json!({"status_name": "idle", "volume": 0}),
                playlists: Vec::new(),
                fail_status: None,
                requests: Vec::new(),
            })),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    /// Status payload returned by `GET /api/fppd/status`
    pub fn set_status(&self, status: serde_json::Value) {
        self.state.lock().unwrap().status = status;
    }

    pub fn set_playlists(&self, playlists: &[&str]) {
        self.state.lock().unwrap().playlists = playlists.iter().map(|p| p.to_string()).collect();
    }

    /// Make every HTTP request fail with this status code
    pub fn fail_with(&self, status: Option<u16>) {
        self.state.lock().unwrap().fail_status = status;
    }

    /// HTTP requests issued so far (the probe is not an HTTP request)
    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    fn record(&self, request: MockRequest) -> Result<(), FppError> {
        let mut state = self.state.lock().unwrap();
        let path = match &request {
            MockRequest::Get(path) | MockRequest::Post(path, _) => path.clone(),
        };
        state.requests.push(request);
        match state.fail_status {
            Some(status) => Err(FppError::Status { path, status }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl FppClient for MockFppClient {
    async fn is_reachable(&self) -> bool {
        self.state.lock().unwrap().reachable
    }

    async fn status(&self) -> Result<FppdStatus, FppError> {
        self.record(MockRequest::Get(api::STATUS_PATH.to_string()))?;
        let status = self.state.lock().unwrap().status.clone();
        Ok(serde_json::from_value(status).expect("mock status must be a valid payload"))
    }

    async fn playable_playlists(&self) -> Result<Vec<String>, FppError> {
        self.record(MockRequest::Get(api::PLAYABLE_PLAYLISTS_PATH.to_string()))?;
        Ok(self.state.lock().unwrap().playlists.clone())
    }

    async fn get(&self, path: &str) -> Result<(), FppError> {
        self.record(MockRequest::Get(path.to_string()))
    }

    async fn command(&self, command: &Command) -> Result<(), FppError> {
        let body = serde_json::to_value(command).expect("command serializes");
        self.record(MockRequest::Post(api::COMMAND_PATH.to_string(), body))
    }
}
