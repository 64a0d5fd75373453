//! Authentication lifecycle notifications.
//!
//! Events are a typed enum internally. The wire names are fixed strings that
//! existing consumers match on, exposed as constants and through
//! [`AuthEvent::name`].

use reqwest::{header::HeaderMap, StatusCode};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{HttpResponse, RequestDescriptor};

pub const LOGIN_REQUIRED: &str = "event:auth-loginRequired";
pub const LOGIN_FAILED: &str = "event:auth-loginFailed";
pub const LOGIN_CONFIRMED: &str = "event:auth-loginConfirmed";
pub const LOGIN_CANCELLED: &str = "event:auth-loginCancelled";
pub const LOGIN_SUCCESSFUL: &str = "event:auth-loginSuccessful";

const DEFAULT_CAPACITY: usize = 64;

/// Details of the response that triggered a login event.
#[derive(Clone, Debug)]
pub struct AuthFailure {
    /// The request as it sits in the buffer (retry marker cleared).
    pub request: RequestDescriptor,
    /// `None` when no response was received at all.
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    /// Response body, or the transport error message.
    pub body: String,
}

impl AuthFailure {
    pub(crate) fn from_response(request: RequestDescriptor, response: &HttpResponse) -> Self {
        Self {
            request,
            status: Some(response.status),
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }

    pub(crate) fn from_transport(request: RequestDescriptor, message: String) -> Self {
        Self {
            request,
            status: None,
            headers: HeaderMap::new(),
            body: message,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AuthEvent {
    /// A fresh request got 401 and was buffered.
    LoginRequired(AuthFailure),
    /// A login attempt's head retry failed.
    LoginFailed(AuthFailure),
    LoginConfirmed(Option<Value>),
    LoginCancelled(Option<Value>),
    LoginSuccessful,
}

impl AuthEvent {
    /// Wire-level event name.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::LoginRequired(_) => LOGIN_REQUIRED,
            AuthEvent::LoginFailed(_) => LOGIN_FAILED,
            AuthEvent::LoginConfirmed(_) => LOGIN_CONFIRMED,
            AuthEvent::LoginCancelled(_) => LOGIN_CANCELLED,
            AuthEvent::LoginSuccessful => LOGIN_SUCCESSFUL,
        }
    }

    pub fn failure(&self) -> Option<&AuthFailure> {
        match self {
            AuthEvent::LoginRequired(failure) | AuthEvent::LoginFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Caller-supplied payload of a confirm or cancel.
    pub fn data(&self) -> Option<&Value> {
        match self {
            AuthEvent::LoginConfirmed(data) | AuthEvent::LoginCancelled(data) => data.as_ref(),
            _ => None,
        }
    }
}

/// Fire-and-forget sink for [`AuthEvent`]s.
pub trait AuthNotifier: Send + Sync {
    fn publish(&self, event: AuthEvent);
}

impl<F> AuthNotifier for F
where
    F: Fn(AuthEvent) + Send + Sync,
{
    fn publish(&self, event: AuthEvent) {
        self(event)
    }
}

/// Broadcast fan-out of auth events built on `tokio::broadcast`.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
/// Publishing without subscribers is not an error.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthNotifier for EventBus {
    fn publish(&self, event: AuthEvent) {
        #[cfg(feature = "tracing")]
        tracing::debug!(event = event.name(), "publishing auth event");

        let _ = self.sender.send(event);
    }
}
