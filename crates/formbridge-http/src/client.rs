//! HTTP request wrapper shared by all adapters.

use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::status::{extract_error, status_description};
use formbridge_core::{Error, FormBridgeConfig, Result};

/// Timeout applied when neither the client nor the request overrides it.
pub const DEFAULT_TIMEOUT_SECS: u64 = formbridge_core::config::DEFAULT_HTTP_TIMEOUT_SECS;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("FormBridge-Integrations/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub bearer: Option<String>,
    pub basic_auth: Option<(String, Option<String>)>,
    /// Overrides the client timeout.
    pub timeout: Option<Duration>,
}

impl RequestArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((user.into(), password));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Normalized outcome of one request.
///
/// `status_code` is `0` when no HTTP response was received.
#[derive(Debug, Clone, Serialize)]
pub struct HttpResponse {
    pub success: bool,
    pub status_code: u16,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpResponse {
    fn network_failure(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else {
            format!("Request failed: {}", err)
        };
        Self {
            success: false,
            status_code: 0,
            data: Value::Null,
            error: Some(message),
        }
    }

    /// Error message, falling back to the status description.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| status_description(self.status_code))
    }

    /// Body on success, otherwise `Transport` (no response) or `RemoteApi`.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            return Ok(self.data);
        }
        let message = self.error_message();
        if self.status_code == 0 {
            Err(Error::Transport(message))
        } else {
            Err(Error::RemoteApi {
                status: self.status_code,
                message,
            })
        }
    }
}

/// Shared outbound client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpRequestClient {
    client: Client,
    timeout: Duration,
}

impl Default for HttpRequestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequestClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn from_config(config: &FormBridgeConfig) -> Self {
        Self::with_timeout(Duration::from_secs(config.http_timeout_secs))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform a request. Never fails; inspect [`HttpResponse::success`].
    pub async fn request(&self, method: HttpMethod, url: &str, args: RequestArgs) -> HttpResponse {
        let timeout = args.timeout.unwrap_or(self.timeout);
        let mut builder = self
            .client
            .request(method.into(), url)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(ACCEPT, "application/json")
            .timeout(timeout);

        if !args.query.is_empty() {
            builder = builder.query(&args.query);
        }
        for (name, value) in &args.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &args.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some((user, password)) = &args.basic_auth {
            builder = builder.basic_auth(user, password.as_ref());
        }
        builder = match &args.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(pairs)) => builder.form(pairs),
            None => builder,
        };

        debug!("{} {}", method, url);

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("{} {} failed: {}", method, url, e);
                return HttpResponse::network_failure(&e);
            }
        };

        let status_code = response.status().as_u16();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                warn!("{} {} body read failed: {}", method, url, e);
                return HttpResponse::network_failure(&e);
            }
        };
        let data = parse_body(&text);

        if (200..300).contains(&status_code) {
            debug!("{} {} -> {}", method, url, status_code);
            HttpResponse {
                success: true,
                status_code,
                data,
                error: None,
            }
        } else {
            let error = extract_error(&data).unwrap_or_else(|| status_description(status_code));
            warn!("{} {} -> {}: {}", method, url, status_code, error);
            HttpResponse {
                success: false,
                status_code,
                data,
                error: Some(error),
            }
        }
    }

    pub async fn get(&self, url: &str, args: RequestArgs) -> HttpResponse {
        self.request(HttpMethod::Get, url, args).await
    }

    pub async fn post(&self, url: &str, args: RequestArgs) -> HttpResponse {
        self.request(HttpMethod::Post, url, args).await
    }

    pub async fn put(&self, url: &str, args: RequestArgs) -> HttpResponse {
        self.request(HttpMethod::Put, url, args).await
    }

    pub async fn patch(&self, url: &str, args: RequestArgs) -> HttpResponse {
        self.request(HttpMethod::Patch, url, args).await
    }

    pub async fn delete(&self, url: &str, args: RequestArgs) -> HttpResponse {
        self.request(HttpMethod::Delete, url, args).await
    }
}

/// JSON when the body parses, the raw text otherwise, `Null` when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
