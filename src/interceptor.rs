use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;

use crate::{
    buffer::{BufferedRequest, PendingResponse, Responder},
    AuthEvent, AuthFailure, AuthInterceptorError, AuthNotifier, HttpResponse, HttpTransport,
    RequestBuffer, RequestDescriptor, Result,
};

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum ReplayOutcome {
    /// A 2xx response was handed to the caller.
    Succeeded,
    /// The caller received a non-401 failure.
    Failed(AuthFailure),
    /// The request got a 401 and went back into the buffer.
    Deferred,
}

/// Wraps a transport and turns 401 responses into buffered, suspended calls.
pub struct AuthInterceptor<T> {
    transport: T,
    buffer: Arc<RequestBuffer>,
    notifier: Arc<dyn AuthNotifier>,
}

impl<T: fmt::Debug> fmt::Debug for AuthInterceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("transport", &self.transport)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl<T: HttpTransport> AuthInterceptor<T> {
    /// Wraps `transport`. Every 401 is held in `buffer` and announced on
    /// `notifier`.
    pub fn new(transport: T, buffer: Arc<RequestBuffer>, notifier: Arc<dyn AuthNotifier>) -> Self {
        Self {
            transport,
            buffer,
            notifier,
        }
    }

    pub fn buffer(&self) -> &Arc<RequestBuffer> {
        &self.buffer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn notify(&self, event: AuthEvent) {
        self.notifier.publish(event);
    }

    /// Issues `request` and returns the caller's handle.
    ///
    /// The handle is already settled unless the response was an intercepted
    /// 401, in which case it settles when the login flow replays or rejects
    /// the request.
    pub async fn send(&self, request: RequestDescriptor) -> PendingResponse {
        let (responder, pending) = PendingResponse::channel();
        self.dispatch(request, responder).await;
        pending
    }

    /// Issues `request` and waits for its final outcome, including any time
    /// spent in the buffer.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse> {
        self.send(request).await.await
    }

    pub(crate) async fn dispatch(
        &self,
        request: RequestDescriptor,
        responder: Responder,
    ) -> ReplayOutcome {
        match self.transport.send(&request).await {
            Ok(response)
                if response.status == StatusCode::UNAUTHORIZED
                    && !request.options.ignore_auth_module =>
            {
                self.defer(request, &response, responder);
                ReplayOutcome::Deferred
            }
            Ok(response) if response.is_success() => {
                let _ = responder.send(Ok(response));
                ReplayOutcome::Succeeded
            }
            Ok(response) => {
                let failure = AuthFailure::from_response(request, &response);
                let _ = responder.send(Err(AuthInterceptorError::Http {
                    status: response.status.as_u16(),
                    body: response.body,
                }));
                ReplayOutcome::Failed(failure)
            }
            Err(err) => {
                let failure = AuthFailure::from_transport(request, err.to_string());
                let _ = responder.send(Err(err));
                ReplayOutcome::Failed(failure)
            }
        }
    }

    fn defer(&self, mut request: RequestDescriptor, response: &HttpResponse, responder: Responder) {
        let login_attempt = std::mem::take(&mut request.options.auth_retry);
        let failure = AuthFailure::from_response(request.clone(), response);
        let buffered = BufferedRequest::new(request, responder);

        if login_attempt {
            #[cfg(feature = "tracing")]
            tracing::debug!(url = %failure.request.url, "login attempt rejected, requeueing at head");

            self.buffer.push_front(buffered);
            self.notify(AuthEvent::LoginFailed(failure));
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(url = %failure.request.url, "authentication required, buffering request");

            self.buffer.push_back(buffered);
            self.notify(AuthEvent::LoginRequired(failure));
        }
    }
}
