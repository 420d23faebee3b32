//! Helpers for integration tests: spawning the binary, waiting for readiness, and a stub of the
//! Sendblue HTTP API that records every request it receives.

use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::TcpListener;
use std::process::Child;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status.
///
/// # Errors
///
/// Returns an error if the timeout elapses first.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

/// One request as seen by [`StubSendblue`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct StubState {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<HashMap<String, (StatusCode, Value)>>,
}

/// In-process stand-in for the Sendblue API.
///
/// Unconfigured paths answer `200` with `{"status": "OK", "path": <path>}`.
pub struct StubSendblue {
    base_url: String,
    state: Arc<StubState>,
}

impl StubSendblue {
    /// Bind on `127.0.0.1:0` and serve in the background for the lifetime of the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(record).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind stub listener")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
        })
    }

    /// Root of the stub, e.g. `http://127.0.0.1:40123`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answer requests to `path` with `status` and `body`.
    pub fn reply(&self, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state
            .replies
            .lock()
            .insert(path.to_string(), (status, body));
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

async fn record(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    let body = serde_json::from_slice(&body).ok();

    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query,
        headers,
        body,
    });

    let reply = state.replies.lock().get(&path).cloned();
    match reply {
        Some((status, body)) => (status, axum::Json(body)),
        None => (
            StatusCode::OK,
            axum::Json(json!({ "status": "OK", "path": path })),
        ),
    }
}
