//! Authenticated request pipeline for the invoicing API.
//!
//! # Design
//! `ApiClient` holds a base URL, a read-only `SessionStore` for the bearer
//! credential, and a `Transport`. A call is split the same way at every
//! level: `build_request` produces an `HttpRequest`, the transport executes
//! it exactly once, and `parse_response` turns the `HttpResponse` into
//! either a decoded value or an `ApiError`. Nothing is retried, cached or
//! deduplicated.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::session::{SessionStore, TOKEN_KEY};

const NO_CONTENT: u16 = 204;

/// Per-call overrides for `ApiClient::request`.
///
/// Headers given here are applied after the defaults and replace any
/// default of the same name (compared case-insensitively).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Client for the invoicing REST API.
#[derive(Debug, Clone)]
pub struct ApiClient<S, T = UreqTransport> {
    base_url: String,
    session: S,
    transport: T,
}

impl<S: SessionStore> ApiClient<S> {
    /// Client over the default blocking transport.
    pub fn new(base_url: &str, session: S) -> Self {
        Self::with_transport(base_url, session, UreqTransport::new())
    }

    pub fn from_config(config: &ApiConfig, session: S) -> Self {
        Self::with_transport(&config.base_url, session, UreqTransport::with_timeout(config.timeout))
    }
}

impl<S: SessionStore, T: Transport> ApiClient<S, T> {
    /// `base_url` is used verbatim: endpoint paths are appended to it as-is.
    pub fn with_transport(base_url: &str, session: S, transport: T) -> Self {
        Self {
            base_url: base_url.to_string(),
            session,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Compose the request for `endpoint` with credential and JSON headers.
    ///
    /// A missing credential still produces a header, rendered as
    /// `Bearer null`; rejecting it is the server's job.
    pub fn build_request(&self, endpoint: &str, options: RequestOptions) -> HttpRequest {
        let token = self.session.get(TOKEN_KEY);
        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", token.as_deref().unwrap_or("null")),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        for (name, value) in options.headers {
            set_header(&mut headers, name, value);
        }

        HttpRequest {
            method: options.method.unwrap_or_default(),
            url: format!("{}{}", self.base_url, endpoint),
            headers,
            body: options.body,
        }
    }

    /// Interpret a response as `R`.
    ///
    /// A 204 never looks at the body; `R` is decoded from JSON `null`, so
    /// `()` and `Option<_>` yield the empty result.
    pub fn parse_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R, ApiError> {
        if !response.is_success() {
            let message = failure_message(&response);
            warn!("request failed with {}: {}", response.status, message);
            return Err(ApiError::Request {
                status: response.status,
                message,
            });
        }
        if response.status == NO_CONTENT {
            return serde_json::from_value(Value::Null).map_err(ApiError::MalformedResponse);
        }
        serde_json::from_str(&response.body).map_err(ApiError::MalformedResponse)
    }

    /// Build, send once, and parse.
    pub fn request<R: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<R, ApiError> {
        let request = self.build_request(endpoint, options);
        debug!("{} {}", request.method, request.url);
        let response = self.transport.execute(&request)?;
        debug!("{} {} -> {}", request.method, request.url, response.status);
        self.parse_response(response)
    }

    pub fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        self.request(endpoint, RequestOptions::new().method(HttpMethod::Get))
    }

    pub fn post<R: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, payload: &B) -> Result<R, ApiError> {
        let body = serde_json::to_string(payload).map_err(ApiError::Serialization)?;
        self.request(endpoint, RequestOptions::new().method(HttpMethod::Post).body(body))
    }

    pub fn put<R: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, payload: &B) -> Result<R, ApiError> {
        let body = serde_json::to_string(payload).map_err(ApiError::Serialization)?;
        self.request(endpoint, RequestOptions::new().method(HttpMethod::Put).body(body))
    }

    pub fn delete<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        self.request(endpoint, RequestOptions::new().method(HttpMethod::Delete))
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
        Some(existing) => *existing = (name, value),
        None => headers.push((name, value)),
    }
}

/// The server's `detail` string, or a synthesized status line.
///
/// An unparsable body counts as an empty object; an empty or non-string
/// `detail` falls back to the status line.
fn failure_message(response: &HttpResponse) -> String {
    let data: Value = serde_json::from_str(&response.body).unwrap_or_else(|_| Value::Object(Default::default()));
    match data.get("detail").and_then(Value::as_str) {
        Some(detail) if !detail.is_empty() => detail.to_string(),
        _ => format!("HTTP {}: {}", response.status, response.status_text),
    }
}
