pub mod transport;

use serde_json::Value;
use std::sync::Arc;

use crate::utils::config::HarnessConfig;
use transport::{HttpTransport, Transport, TransportError};

/// HTTP methods the API surface uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing call: method, path relative to the base URL, optional JSON
/// body and optional bearer token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub token: Option<String>,
}

/// What came back: status code plus the decoded JSON body. Non-JSON
/// bodies arrive as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Top-level string field of the body.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.body.get(key).and_then(Value::as_bool)
    }

    /// True when the field exists and is not null.
    pub fn has_field(&self, key: &str) -> bool {
        self.body.get(key).map_or(false, |v| !v.is_null())
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        self.body.as_array()
    }

    /// Compact body rendering for failure details, truncated so a single
    /// bad response cannot flood the report.
    pub fn detail(&self) -> String {
        let rendered = self.body.to_string();
        if rendered.chars().count() > 200 {
            let truncated: String = rendered.chars().take(200).collect();
            format!("{}...", truncated)
        } else {
            rendered
        }
    }
}

/// Thin client over the transport: one call in, one response out, or
/// `None` when no response was produced at all. Steps branch on the
/// sentinel instead of handling transport errors themselves.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.base_url, config.timeout_secs)?;
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Issue one call. Transport failures are logged and collapsed to
    /// `None`; a served error status is still a response.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Option<ApiResponse> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
            token: token.map(str::to_string),
        };

        log::debug!("{} {}", method, path);

        match self.transport.execute(&request).await {
            Ok(response) => {
                log::debug!("{} {} -> {}", method, path, response.status);
                Some(response)
            }
            Err(e) => {
                log::warn!("{} {} failed: {}", method, path, e);
                None
            }
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Option<ApiResponse> {
        self.send(HttpMethod::Get, path, None, token).await
    }

    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> Option<ApiResponse> {
        self.send(HttpMethod::Post, path, Some(body), token).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Option<ApiResponse> {
        self.send(HttpMethod::Patch, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Option<ApiResponse> {
        self.send(HttpMethod::Delete, path, None, token).await
    }
}
