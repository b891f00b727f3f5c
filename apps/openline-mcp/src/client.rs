//! # OpenLine HTTP Client
//!
//! Wrapper around the OpenLine REST API for use by the MCP server.
//!
//! 4xx bodies other than 429 are returned as JSON so that guard rejections
//! (`{ok: false, code, cap, observed}`) reach the tool layer intact.

use serde_json::Value;

/// Errors from the HTTP client layer.
#[derive(Debug)]
pub enum ClientError {
    /// Cannot reach the OpenLine server.
    ConnectionFailed(String),
    /// The configured base URL cannot carry a path.
    InvalidUrl(String),
    /// 429 Too Many Requests.
    RateLimited,
    /// Server returned a 5xx error.
    ServerError(u16, String),
    /// Failed to parse response body.
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to OpenLine at {url}"),
            Self::InvalidUrl(url) => write!(f, "Invalid OpenLine URL: {url}"),
            Self::RateLimited => write!(f, "Rate limited: too many requests"),
            Self::ServerError(status, msg) => write!(f, "Server error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// HTTP client that wraps calls to the OpenLine REST API.
#[derive(Clone)]
pub struct OpenlineClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenlineClient {
    /// Create a new client pointing at the given OpenLine server URL.
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, &url)
    }

    /// Handle HTTP response: check status codes and parse JSON.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ServerError(status.as_u16(), body));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        req.send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))
    }

    /// GET /health
    pub async fn health(&self) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::GET, "/health");
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// POST /frame → submit a frame for acceptance.
    pub async fn submit_frame(&self, frame: &Value) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::POST, "/frame").json(frame);
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// POST /extract → build a frame from text without committing it.
    pub async fn extract(&self, request: &Value) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::POST, "/extract").json(request);
        let resp = self.send(req).await?;
        self.handle_response(resp).await
    }

    /// GET /streams/{stream_id} → latest committed digest.
    pub async fn stream(&self, stream_id: &str) -> Result<Value, ClientError> {
        let url = stream_url(&self.base_url, stream_id)?;
        let resp = self.send(self.http.get(url)).await?;
        self.handle_response(resp).await
    }
}

/// Build `{base}/streams/{stream_id}` with the id percent-encoded as one segment.
fn stream_url(base_url: &str, stream_id: &str) -> Result<reqwest::Url, ClientError> {
    let mut url =
        reqwest::Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .push("streams")
        .push(stream_id);
    Ok(url)
}
