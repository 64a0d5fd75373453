//! Entry points the login flow calls once it knows how authentication went.
//!
//! # State transitions (per buffer)
//! ```text
//! Idle       → Buffering(n)  : a request gets 401
//! Buffering  → Idle          : login_confirmed (all replayed)
//! Buffering  → Idle          : login_cancelled (all rejected or abandoned)
//! Buffering  → Idle          : login_attempted, head succeeds (rest replayed)
//! Buffering  → Buffering(n)  : login_attempted, head gets 401 (requeued at head)
//! ```
//!
//! At most one `login_attempted` is in flight per service (and its clones).

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    AuthEvent, AuthInterceptor, AuthInterceptorError, HttpTransport, ReplayOutcome,
    RequestBuffer, RequestDescriptor,
};

/// Result of [`AuthService::login_attempted`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoginAttempt {
    /// Nothing was buffered; handled as a plain confirmation.
    NothingPending,
    /// The oldest request went through and the rest were replayed.
    Succeeded,
    /// The oldest request failed; everything else stays buffered.
    Failed,
    /// Another attempt is still running; nothing was done.
    InProgress,
}

/// Coordinates replay and rejection of buffered requests.
pub struct AuthService<T> {
    interceptor: Arc<AuthInterceptor<T>>,
    attempt: Arc<Mutex<()>>,
}

impl<T> Clone for AuthService<T> {
    fn clone(&self) -> Self {
        Self {
            interceptor: Arc::clone(&self.interceptor),
            attempt: Arc::clone(&self.attempt),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AuthService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("interceptor", &self.interceptor)
            .field("attempt_in_progress", &self.attempt.try_lock().is_err())
            .finish()
    }
}

impl<T: HttpTransport + 'static> AuthService<T> {
    /// Coordinates the buffer and notifier `interceptor` was built with.
    pub fn new(interceptor: Arc<AuthInterceptor<T>>) -> Self {
        Self {
            interceptor,
            attempt: Arc::new(Mutex::new(())),
        }
    }

    pub fn interceptor(&self) -> &Arc<AuthInterceptor<T>> {
        &self.interceptor
    }

    pub fn buffer(&self) -> &Arc<RequestBuffer> {
        self.interceptor.buffer()
    }

    /// Number of requests waiting for a login.
    pub fn pending(&self) -> usize {
        self.buffer().len()
    }

    /// Reports a successful login and replays every buffered request as is.
    ///
    /// `data` is forwarded with `event:auth-loginConfirmed`, e.g. details of
    /// the user that logged in.
    pub async fn login_confirmed(&self, data: Option<Value>) {
        self.login_confirmed_with(data, |request| request).await;
    }

    /// Reports a successful login and replays every buffered request after
    /// passing it through `update`, typically to attach a fresh credential.
    ///
    /// Replays are started before the first suspension point; dropping the
    /// returned future does not stop them.
    pub async fn login_confirmed_with<F>(&self, data: Option<Value>, update: F)
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor,
    {
        self.interceptor.notify(AuthEvent::LoginConfirmed(data));
        let replayed = self.buffer().retry_all(&self.interceptor, update).await;

        #[cfg(feature = "tracing")]
        tracing::debug!(replayed, "login confirmed");
        #[cfg(not(feature = "tracing"))]
        let _ = replayed;
    }

    /// Gives up on authentication.
    ///
    /// With a non-empty `reason` every buffered caller is rejected with it.
    /// Without one they are abandoned and never settle.
    /// `event:auth-loginCancelled` is published after the buffer is cleared.
    pub fn login_cancelled(&self, data: Option<Value>, reason: Option<String>) {
        self.buffer().reject_all(reason);
        self.interceptor.notify(AuthEvent::LoginCancelled(data));
    }

    /// Checks freshly configured credentials against the oldest buffered
    /// request before releasing the rest.
    ///
    /// If the oldest request succeeds, `event:auth-loginSuccessful` is
    /// published and every other request is replayed. If it fails,
    /// `event:auth-loginFailed` is published and all requests, the oldest
    /// one included, stay buffered in the same order. With nothing buffered
    /// this behaves like [`AuthService::login_confirmed`] without data.
    ///
    /// Only one attempt runs at a time: a call made while another is in
    /// flight returns [`LoginAttempt::InProgress`] immediately. The attempt
    /// runs on its own task and completes even if the returned future is
    /// dropped.
    ///
    /// Later requests that get a 401 again start over as a fresh
    /// `event:auth-loginRequired`.
    pub async fn login_attempted(&self) -> LoginAttempt {
        let Ok(guard) = Arc::clone(&self.attempt).try_lock_owned() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("login attempt already in progress");

            return LoginAttempt::InProgress;
        };

        let this = self.clone();
        let handle = tokio::spawn(async move {
            let attempt = this.attempt_locked().await;
            drop(guard);
            attempt
        });
        match handle.await {
            Ok(attempt) => attempt,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => LoginAttempt::Failed,
        }
    }

    async fn attempt_locked(&self) -> LoginAttempt {
        // Popping the head doubles as the emptiness check, so a concurrent
        // drain between check and pop cannot slip through.
        let outcome = match self.buffer().retry_first(&self.interceptor).await {
            Ok(outcome) => outcome,
            Err(AuthInterceptorError::EmptyBuffer) => {
                self.login_confirmed(None).await;
                return LoginAttempt::NothingPending;
            }
            Err(_) => return LoginAttempt::Failed,
        };

        match outcome {
            ReplayOutcome::Succeeded => {
                self.interceptor.notify(AuthEvent::LoginSuccessful);
                let replayed = self
                    .buffer()
                    .retry_all(&self.interceptor, |request| request)
                    .await;

                #[cfg(feature = "tracing")]
                tracing::debug!(replayed, "login attempt succeeded");
                #[cfg(not(feature = "tracing"))]
                let _ = replayed;

                LoginAttempt::Succeeded
            }
            // The interceptor already requeued the head and published the failure.
            ReplayOutcome::Deferred => LoginAttempt::Failed,
            ReplayOutcome::Failed(failure) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = ?failure.status, "login attempt failed");

                self.interceptor.notify(AuthEvent::LoginFailed(failure));
                LoginAttempt::Failed
            }
        }
    }
}
