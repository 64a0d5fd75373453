use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{AuthInterceptorError, ClientOptions, HttpResponse, RequestDescriptor, Result};

/// Capability to put a request on the wire.
///
/// Implementations return `Ok` for every HTTP status, including 401. `Err`
/// is reserved for failures where no response was received.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

/// [`HttpTransport`] backed by a `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    options: ClientOptions,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("options", &self.options)
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses an existing client (connection pool, default headers, TLS setup).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            options: ClientOptions::default(),
        }
    }

    /// Applies transport options such as timeout and base URL.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Creates a transport from environment variables.
    ///
    /// Reads:
    /// - `AUTH_INTERCEPTOR_BASE_URL`: base for relative request URLs
    /// - `AUTH_INTERCEPTOR_TIMEOUT_MS`: optional per-request timeout
    ///
    /// Returns an error if the base URL is missing or empty, or if the
    /// timeout is not a number.
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("AUTH_INTERCEPTOR_BASE_URL")
            .map_err(|_| "missing AUTH_INTERCEPTOR_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("AUTH_INTERCEPTOR_BASE_URL is set but empty".to_owned());
        }

        let mut options = ClientOptions::default().with_base_url(base_url.trim());
        if let Ok(timeout) = std::env::var("AUTH_INTERCEPTOR_TIMEOUT_MS") {
            options.timeout_ms = timeout.trim().parse().map_err(|_| {
                format!("AUTH_INTERCEPTOR_TIMEOUT_MS is not a number: {timeout}")
            })?;
        }
        Ok(Self::new().with_options(options))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.options.resolve_url(&request.url))
            .headers(request.headers.clone())
            .timeout(Duration::from_millis(self.options.timeout_ms));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(AuthInterceptorError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(AuthInterceptorError::Transport)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
