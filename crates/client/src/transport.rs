//! HTTP transport contract and reqwest implementation
//!
//! The facade depends only on the narrow [`Transport`] trait: one request in,
//! one parsed JSON body (or classified error) out. Retry, caching and
//! pagination all live above this seam, so tests can drive the whole stack
//! with a scripted transport and no network.

use std::time::Duration;

use async_trait::async_trait;
use docbridge_domain::{ClientConfig, Credentials, DocBridgeError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// One backend round-trip, fully described.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::POST, path: path.into(), query: Vec::new(), body: Some(body) }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::PUT, path: path.into(), query: Vec::new(), body: Some(body) }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self { method: Method::DELETE, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Performs a single HTTP round-trip against the backend.
///
/// Implementations classify every failure into the docbridge error taxonomy;
/// callers never see raw transport errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// reqwest-backed [`Transport`] with injected credentials and timeout.
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport from connection coordinates.
    ///
    /// The credential travels as an `Authorization: token key:secret` header
    /// on every request, the backend's expected wire format.
    pub fn new(credentials: &Credentials, config: &ClientConfig) -> Result<Self> {
        Self::builder()
            .timeout(config.request_timeout)
            .build(credentials)
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url.join(path.trim_start_matches('/')).map_err(|err| {
            DocBridgeError::Validation(format!("invalid request path {path:?}: {err}"))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.path)?;
        let method = request.method.clone();
        debug!(%method, %url, "sending backend request");

        let mut builder = self.client.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), "received backend response");

        if !status.is_success() {
            // Error bodies are JSON on well-behaved backends, but a gateway
            // may answer with plain text; keep whatever we got.
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| serde_json::json!({ "message": text }));
            return Err(DocBridgeError::from_status(status.as_u16(), body));
        }

        response.json::<Value>().await.map_err(|err| {
            DocBridgeError::Internal(format!("failed to parse response body: {err}"))
        })
    }
}

fn classify_send_error(err: reqwest::Error) -> DocBridgeError {
    if err.is_timeout() {
        DocBridgeError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        DocBridgeError::Network(format!("failed to connect: {err}"))
    } else if err.is_request() {
        DocBridgeError::Validation(format!("invalid request: {err}"))
    } else {
        DocBridgeError::Network(format!("transport failure: {err}"))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None }
    }
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self, credentials: &Credentials) -> Result<HttpTransport> {
        let base_url = Url::parse(&credentials.base_url).map_err(|err| {
            DocBridgeError::Validation(format!(
                "invalid base URL {:?}: {err}",
                credentials.base_url
            ))
        })?;

        let mut auth = HeaderValue::from_str(&format!(
            "token {}:{}",
            credentials.api_key, credentials.api_secret
        ))
        .map_err(|_| {
            DocBridgeError::Validation("credentials contain non-header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| DocBridgeError::Internal(format!("failed to build client: {err}")))?;

        Ok(HttpTransport { client, base_url })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport_for(uri: &str) -> HttpTransport {
        let credentials = Credentials::new(uri, "test-key", "test-secret");
        HttpTransport::builder()
            .timeout(Duration::from_secs(5))
            .build(&credentials)
            .expect("transport")
    }

    #[tokio::test]
    async fn get_returns_parsed_json_and_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource/Customer"))
            .and(header("Authorization", "token test-key:test-secret"))
            .and(query_param("limit_page_length", "20"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [{"name": "CUST-001"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri());
        let request = ApiRequest::get("/resource/Customer")
            .with_query(vec![("limit_page_length".into(), "20".into())]);

        let body = transport.execute(request).await.expect("response");
        assert_eq!(body["data"][0]["name"], "CUST-001");
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({"doctype": "ToDo", "description": "write tests"});
        Mock::given(method("POST"))
            .and(path("/resource/ToDo"))
            .and(body_json(&payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"name": "TD-01"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri());
        let body = transport
            .execute(ApiRequest::post("/resource/ToDo", payload))
            .await
            .expect("response");
        assert_eq!(body["data"]["name"], "TD-01");
    }

    #[tokio::test]
    async fn not_found_maps_to_api_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"exc_type": "DoesNotExistError"})),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri());
        let err = transport
            .execute(ApiRequest::get("/resource/Customer/missing"))
            .await
            .expect_err("should fail");

        match err {
            DocBridgeError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body["exc_type"], "DoesNotExistError");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn service_unavailable_maps_to_retryable_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri());
        let err = transport
            .execute(ApiRequest::get("/resource/Customer"))
            .await
            .expect_err("should fail");

        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so the request fails with ECONNREFUSED

        let transport = transport_for(&format!("http://{addr}"));
        let err = transport
            .execute(ApiRequest::get("/resource/Customer"))
            .await
            .expect_err("should fail");

        assert!(matches!(err, DocBridgeError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn non_json_error_body_is_preserved_as_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri());
        let err = transport
            .execute(ApiRequest::get("/resource/Customer"))
            .await
            .expect_err("should fail");

        match err {
            DocBridgeError::Api { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body["message"], "bad filter");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_base_url_is_rejected_at_build_time() {
        let credentials = Credentials::new("not a url", "k", "s");
        let result = HttpTransport::builder().build(&credentials);
        assert!(matches!(result, Err(DocBridgeError::Validation(_))));
    }
}
