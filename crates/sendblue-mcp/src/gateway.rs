//! Outbound HTTP gateway to the Sendblue API.
//!
//! Every tool goes through [`Gateway::call`], so authentication, routing, timeouts and error
//! normalization behave identically for all of them. The trait exists so tools can be exercised
//! against a recording stub.

use crate::config::{Config, Credentials};
use crate::error::{ConfigError, GatewayError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const HEADER_API_KEY_ID: &str = "sb-api-key-id";
pub const HEADER_API_SECRET_KEY: &str = "sb-api-secret-key";

/// Endpoints under this prefix are served from the accounts base URL.
const ACCOUNTS_PREFIX: &str = "/accounts";

/// One logical Sendblue API call.
///
/// GET requests carry `query`, POST requests carry `body`; never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub endpoint: &'static str,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
}

fn serialize_method<S: serde::Serializer>(m: &Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(m.as_str())
}

impl ApiRequest {
    #[must_use]
    pub fn get(endpoint: &'static str, query: Vec<(String, String)>) -> Self {
        Self {
            endpoint,
            method: Method::GET,
            body: None,
            query,
        }
    }

    #[must_use]
    pub fn post(endpoint: &'static str, body: Value) -> Self {
        Self {
            endpoint,
            method: Method::POST,
            body: Some(body),
            query: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Execute a single request and return the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on non-2xx status, transport failure, or an undecodable body.
    async fn call(&self, request: ApiRequest) -> Result<Value, GatewayError>;
}

/// `reqwest`-backed gateway. Cheap to clone; safe to share across tasks.
#[derive(Clone)]
pub struct SendblueGateway {
    inner: Arc<SendblueGatewayInner>,
}

struct SendblueGatewayInner {
    client: Client,
    credentials: Credentials,
    api_base_url: String,
    accounts_base_url: String,
    timeout: Duration,
}

impl SendblueGateway {
    /// Build the gateway. Requires credentials that already passed
    /// [`Config::check_credentials`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(sanitize_reqwest_error(&e)))?;
        Ok(Self {
            inner: Arc::new(SendblueGatewayInner {
                client,
                credentials,
                api_base_url: config.api_base_url.clone(),
                accounts_base_url: config.accounts_base_url.clone(),
                timeout: config.request_timeout,
            }),
        })
    }

    /// Map a logical endpoint onto a concrete URL.
    ///
    /// `/accounts/...` targets the accounts base with the prefix stripped; everything else
    /// targets the API base unchanged.
    #[must_use]
    pub fn resolve_url(&self, endpoint: &str) -> String {
        match endpoint.strip_prefix(ACCOUNTS_PREFIX) {
            Some(rest) => format!("{}{rest}", self.inner.accounts_base_url),
            None => format!("{}{endpoint}", self.inner.api_base_url),
        }
    }
}

#[async_trait]
impl Gateway for SendblueGateway {
    async fn call(&self, request: ApiRequest) -> Result<Value, GatewayError> {
        let url = self.resolve_url(request.endpoint);
        let inner = &self.inner;

        let builder = inner
            .client
            .request(request.method.clone(), &url)
            .header(HEADER_API_KEY_ID, &inner.credentials.key_id)
            .header(HEADER_API_SECRET_KEY, &inner.credentials.secret_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(inner.timeout);

        let builder = if request.method == Method::GET {
            builder.query(&request.query)
        } else if request.method == Method::POST {
            builder.json(request.body.as_ref().unwrap_or(&Value::Null))
        } else {
            return Err(GatewayError::UnsupportedMethod(request.method.to_string()));
        };

        let response = builder
            .send()
            .await
            .inspect_err(|e| {
                warn!(
                    endpoint = request.endpoint,
                    method = %request.method,
                    error = %sanitize_reqwest_error(e),
                    "sendblue request failed"
                );
            })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(
            endpoint = request.endpoint,
            method = %request.method,
            status = status.as_u16(),
            "sendblue response"
        );

        if !status.is_success() {
            let detail = error_detail(&bytes)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            warn!(
                endpoint = request.endpoint,
                status = status.as_u16(),
                detail = %detail,
                "sendblue returned an error status"
            );
            return Err(GatewayError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Transport(format!("invalid JSON response: {e}")))
    }
}

/// Provider-supplied `error_message` from an error body, if the body is JSON and has one.
fn error_detail(bytes: &[u8]) -> Option<String> {
    let v: Value = serde_json::from_slice(bytes).ok()?;
    v.get("error_message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Query strings carry phone numbers.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method as AxumMethod, StatusCode, Uri};
    use axum::routing::any;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn gateway_for(base: &str) -> SendblueGateway {
        let cfg = Config::with_credentials(None, None)
            .with_base_urls(&format!("{base}/api"), &format!("{base}/accounts"))
            .expect("valid urls");
        SendblueGateway::new(&cfg, Credentials::for_tests()).expect("gateway")
    }

    async fn spawn(app: Router) -> (String, tokio::sync::oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });
        (format!("http://{addr}"), tx)
    }

    #[test]
    fn resolve_url_routes_accounts_prefix() {
        let gw = gateway_for("http://127.0.0.1:1");
        assert_eq!(
            gw.resolve_url("/accounts/messages"),
            "http://127.0.0.1:1/accounts/messages"
        );
        assert_eq!(
            gw.resolve_url("/send-message"),
            "http://127.0.0.1:1/api/send-message"
        );
    }

    #[test]
    fn production_routing_matches_sendblue_hosts() {
        let cfg = Config::with_credentials(None, None);
        let gw = SendblueGateway::new(&cfg, Credentials::for_tests()).expect("gateway");
        assert_eq!(
            gw.resolve_url("/accounts/messages"),
            "https://api.sendblue.co/accounts/messages"
        );
        assert_eq!(
            gw.resolve_url("/evaluate-service"),
            "https://api.sendblue.co/api/evaluate-service"
        );
    }

    #[tokio::test]
    async fn call_sends_auth_headers_and_json_body() {
        async fn echo(
            method: AxumMethod,
            uri: Uri,
            headers: HeaderMap,
            body: Bytes,
        ) -> axum::Json<Value> {
            let h = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            axum::Json(json!({
                "method": method.as_str(),
                "path": uri.path(),
                "query": uri.query().unwrap_or(""),
                "key_id": h("sb-api-key-id"),
                "secret": h("sb-api-secret-key"),
                "content_type": h("content-type"),
                "body": String::from_utf8_lossy(&body),
            }))
        }

        let (base, shutdown) = spawn(Router::new().route("/{*path}", any(echo))).await;
        let gw = gateway_for(&base);

        let echoed = gw
            .call(ApiRequest::post(
                "/send-typing-indicator",
                json!({"number": "+19998887777"}),
            ))
            .await
            .expect("call");
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["path"], "/api/send-typing-indicator");
        assert_eq!(echoed["key_id"], "test_api_key_id");
        assert_eq!(echoed["secret"], "test_api_secret_key");
        assert_eq!(echoed["content_type"], "application/json");
        assert_eq!(echoed["query"], "");
        let body: Value =
            serde_json::from_str(echoed["body"].as_str().unwrap_or_default()).expect("json body");
        assert_eq!(body, json!({"number": "+19998887777"}));

        let echoed = gw
            .call(ApiRequest::get(
                "/accounts/messages",
                vec![("limit".to_string(), "50".to_string())],
            ))
            .await
            .expect("call");
        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["path"], "/accounts/messages");
        assert_eq!(echoed["query"], "limit=50");
        assert_eq!(echoed["body"], "");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn non_2xx_extracts_provider_error_message() {
        let app = Router::new()
            .route(
                "/api/send-message",
                any(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        axum::Json(json!({"status": "ERROR", "error_message": "Invalid request"})),
                    )
                }),
            )
            .route(
                "/api/evaluate-service",
                any(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
            );
        let (base, shutdown) = spawn(app).await;
        let gw = gateway_for(&base);

        let err = gw
            .call(ApiRequest::post("/send-message", json!({})))
            .await
            .expect_err("400");
        assert_eq!(err.to_string(), "Sendblue API error: 400 - Invalid request");

        let err = gw
            .call(ApiRequest::get("/evaluate-service", Vec::new()))
            .await
            .expect_err("502");
        assert!(matches!(err, GatewayError::Http { status: 502, .. }));
        assert_eq!(err.to_string(), "Sendblue API error: 502 - Bad Gateway");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped() {
        let gw = gateway_for("http://127.0.0.1:1");
        let err = gw
            .call(ApiRequest::get(
                "/evaluate-service",
                vec![("number".to_string(), "+19998887777".to_string())],
            ))
            .await
            .expect_err("connection refused");
        assert!(matches!(err, GatewayError::Transport(_)));
        let msg = err.to_string();
        assert!(msg.starts_with("Error communicating with Sendblue API: "));
        assert!(!msg.contains("19998887777"), "query must be redacted: {msg}");
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected_before_dispatch() {
        let gw = gateway_for("http://127.0.0.1:1");
        let mut req = ApiRequest::get("/evaluate-service", Vec::new());
        req.method = Method::DELETE;
        let err = gw.call(req).await.expect_err("unsupported");
        assert!(matches!(err, GatewayError::UnsupportedMethod(_)));
    }
}
