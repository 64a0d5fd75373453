use std::collections::BTreeMap;

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;

use crate::{AuthInterceptorError, Result};

/// Per-call options carried alongside a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// When set, a 401 response is passed through instead of being buffered.
    pub ignore_auth_module: bool,
    /// Arbitrary application options, preserved across replays.
    pub extra: BTreeMap<String, serde_json::Value>,
    pub(crate) auth_retry: bool,
}

impl RequestOptions {
    /// Whether this call is a head retry issued by a login attempt.
    pub fn is_auth_retry(&self) -> bool {
        self.auth_retry
    }
}

/// Everything needed to (re-)issue an HTTP call.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets `Authorization` from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Result<Self> {
        let value = bearer_header_value(token.as_ref())?;
        Ok(self.header(header::AUTHORIZATION, value))
    }

    /// Sets a raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(|err| {
            AuthInterceptorError::InvalidRequest(format!("body is not serializable: {err}"))
        })?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(body);
        Ok(self)
    }

    /// Opts this call out of 401 interception.
    pub fn ignore_auth_module(mut self) -> Self {
        self.options.ignore_auth_module = true;
        self
    }

    /// Attaches an arbitrary per-call option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }
}

/// Builds a descriptor updater that stamps a bearer token on every request.
///
/// Meant for [`crate::AuthService::login_confirmed_with`] after a fresh
/// credential was obtained.
pub fn bearer_updater(
    token: impl AsRef<str>,
) -> Result<impl Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + Clone> {
    let value = bearer_header_value(token.as_ref())?;
    Ok(move |request: RequestDescriptor| request.header(header::AUTHORIZATION, value.clone()))
}

fn bearer_header_value(token: &str) -> Result<HeaderValue> {
    let authorization = normalize_bearer_authorization(token);
    let mut value = HeaderValue::from_str(&authorization).map_err(|_| {
        AuthInterceptorError::InvalidRequest("bearer token is not a valid header value".to_owned())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
