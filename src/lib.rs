//! `http-auth-interceptor` holds HTTP requests that fail with 401 until the
//! application has dealt with authentication, then replays them.
//!
//! The pieces:
//! - [`AuthInterceptor`] wraps an [`HttpTransport`] and parks 401s in a
//!   [`RequestBuffer`], publishing [`AuthEvent`]s to an [`AuthNotifier`]
//! - [`AuthService`] is what the login flow calls:
//!   [`AuthService::login_confirmed`], [`AuthService::login_attempted`] and
//!   [`AuthService::login_cancelled`]
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use http_auth_interceptor::{
//!     AuthInterceptor, AuthService, EventBus, RequestBuffer, RequestDescriptor, ReqwestTransport,
//! };
//!
//! # async fn run() -> http_auth_interceptor::Result<()> {
//! let events = EventBus::new();
//! let interceptor = Arc::new(AuthInterceptor::new(
//!     ReqwestTransport::new(),
//!     Arc::new(RequestBuffer::new()),
//!     Arc::new(events.clone()),
//! ));
//! let auth = AuthService::new(interceptor.clone());
//!
//! // Resolves once the request went through, even if a login happened in between.
//! let profile = interceptor
//!     .execute(RequestDescriptor::get("https://api.example.com/me"))
//!     .await?;
//! # let _ = (auth, profile);
//! # Ok(())
//! # }
//! ```

mod buffer;
mod error;
mod events;
mod interceptor;
mod options;
mod request;
mod response;
mod service;
mod transport;

#[cfg(test)]
mod testing;

pub use buffer::{PendingResponse, RequestBuffer};
pub use error::AuthInterceptorError;
pub use events::{
    AuthEvent, AuthFailure, AuthNotifier, EventBus, LOGIN_CANCELLED, LOGIN_CONFIRMED,
    LOGIN_FAILED, LOGIN_REQUIRED, LOGIN_SUCCESSFUL,
};
pub use interceptor::{AuthInterceptor, ReplayOutcome};
pub use options::ClientOptions;
pub use request::{bearer_updater, RequestDescriptor, RequestOptions};
pub use response::HttpResponse;
pub use service::{AuthService, LoginAttempt};
pub use transport::{HttpTransport, ReqwestTransport};

pub type Result<T> = std::result::Result<T, AuthInterceptorError>;
