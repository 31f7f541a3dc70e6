//! The HTTP capability the client needs: send a request, get back status,
//! headers and body.

use async_trait::async_trait;

use crate::auth::Headers;
use crate::error::{Result, SignifyError};

/// A request to the agent or an external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Absolute URL.
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_json_body(mut self, body: &serde_json::Value) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.set("content-type", "application/json");
        Ok(self)
    }
}

/// A response as the transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends HTTP requests.
///
/// Implementations report transport failures as
/// [`SignifyError::Remote`] with no status; any HTTP status, including
/// errors, is returned as a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Map a failed round trip onto the client's error type.
pub fn transport_error(request: &HttpRequest, message: impl std::fmt::Display) -> SignifyError {
    SignifyError::Remote {
        method: request.method.clone(),
        path: request.url.clone(),
        status: None,
        message: message.to_string(),
    }
}

/// A [`reqwest`]-backed [`Transport`].
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

#[cfg(feature = "http")]
impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a per-request timeout.
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| transport_error(&request, e))?;
        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| transport_error(&request, e))?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_owned())))
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_error(&request, e))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
