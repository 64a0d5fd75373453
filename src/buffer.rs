//! Queue of requests held back until a login flow resolves.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::future::join_all;
use tokio::{sync::oneshot, task::JoinHandle};

use crate::{
    AuthInterceptor, AuthInterceptorError, HttpResponse, HttpTransport, ReplayOutcome,
    RequestDescriptor, Result,
};

pub(crate) type Responder = oneshot::Sender<Result<HttpResponse>>;

/// Caller-side handle of a request that may be held in the buffer.
///
/// Resolves with the response once the request is replayed, or with
/// [`AuthInterceptorError::Rejected`] when the login is cancelled with a
/// reason. A request abandoned by a cancel without reason never resolves;
/// callers that cannot wait forever should wrap it in a timeout.
#[derive(Debug)]
#[must_use = "dropping the handle discards the response"]
pub struct PendingResponse {
    receiver: oneshot::Receiver<Result<HttpResponse>>,
    abandoned: bool,
}

impl PendingResponse {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<HttpResponse>>) -> Self {
        Self {
            receiver,
            abandoned: false,
        }
    }

    pub(crate) fn channel() -> (Responder, Self) {
        let (responder, receiver) = oneshot::channel();
        (responder, Self::new(receiver))
    }
}

impl Future for PendingResponse {
    type Output = Result<HttpResponse>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.abandoned {
            return Poll::Pending;
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Responder dropped without a value: stays pending for good.
            Poll::Ready(Err(_)) => {
                this.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// One suspended call: what to re-issue and who is waiting for it.
#[derive(Debug)]
pub(crate) struct BufferedRequest {
    pub(crate) descriptor: RequestDescriptor,
    pub(crate) responder: Responder,
}

impl BufferedRequest {
    pub(crate) fn new(descriptor: RequestDescriptor, responder: Responder) -> Self {
        Self {
            descriptor,
            responder,
        }
    }
}

/// Ordered set of requests awaiting authentication, oldest first.
#[derive(Debug, Default)]
pub struct RequestBuffer {
    queue: Mutex<VecDeque<BufferedRequest>>,
}

impl RequestBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<BufferedRequest>> {
        // Queue operations never panic mid-update, so a poisoned lock still
        // holds a consistent queue.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copies of the buffered descriptors, oldest first.
    pub fn snapshot(&self) -> Vec<RequestDescriptor> {
        self.lock()
            .iter()
            .map(|request| request.descriptor.clone())
            .collect()
    }

    /// Buffers `descriptor` at the tail and returns the caller's handle.
    pub fn append(&self, descriptor: RequestDescriptor) -> PendingResponse {
        let (responder, pending) = PendingResponse::channel();
        self.push_back(BufferedRequest::new(descriptor, responder));
        pending
    }

    /// Buffers `descriptor` at the head and returns the caller's handle.
    pub fn prepend(&self, descriptor: RequestDescriptor) -> PendingResponse {
        let (responder, pending) = PendingResponse::channel();
        self.push_front(BufferedRequest::new(descriptor, responder));
        pending
    }

    pub(crate) fn push_back(&self, request: BufferedRequest) {
        self.lock().push_back(request);
    }

    pub(crate) fn push_front(&self, request: BufferedRequest) {
        self.lock().push_front(request);
    }

    fn drain(&self) -> Vec<BufferedRequest> {
        self.lock().drain(..).collect()
    }

    /// Clears the buffer, rejecting every caller with `reason` if given and
    /// abandoning them otherwise.
    ///
    /// An empty `reason` counts as no reason.
    pub fn reject_all(&self, reason: Option<String>) {
        let reason = reason.filter(|reason| !reason.is_empty());
        let requests = self.drain();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            count = requests.len(),
            rejected = reason.is_some(),
            "clearing request buffer"
        );

        match reason {
            Some(reason) => {
                for request in requests {
                    let _ = request
                        .responder
                        .send(Err(AuthInterceptorError::Rejected(reason.clone())));
                }
            }
            None => drop(requests),
        }
    }

    /// Replays every buffered request through `interceptor`, passing each
    /// descriptor through `update` first.
    ///
    /// The buffer is emptied before any replay starts, so requests that get
    /// a 401 again are queued for the next login rather than this pass.
    /// Each replay runs on its own task and settles its caller even if the
    /// returned future is dropped. Returns the number of requests replayed.
    pub async fn retry_all<T, F>(&self, interceptor: &Arc<AuthInterceptor<T>>, update: F) -> usize
    where
        T: HttpTransport + 'static,
        F: Fn(RequestDescriptor) -> RequestDescriptor,
    {
        let handles: Vec<_> = self
            .drain()
            .into_iter()
            .map(|request| spawn_replay(interceptor, update(request.descriptor), request.responder))
            .collect();
        let count = handles.len();

        #[cfg(feature = "tracing")]
        tracing::debug!(count, "replaying buffered requests");

        join_all(handles.into_iter().map(join_replay)).await;
        count
    }

    /// Replays only the oldest request, marked as a login-attempt retry.
    ///
    /// If it gets a 401 again the interceptor puts it back at the head. The
    /// replay runs on its own task, so dropping the returned future does not
    /// lose the request.
    pub async fn retry_first<T>(&self, interceptor: &Arc<AuthInterceptor<T>>) -> Result<ReplayOutcome>
    where
        T: HttpTransport + 'static,
    {
        let request = self
            .lock()
            .pop_front()
            .ok_or(AuthInterceptorError::EmptyBuffer)?;
        let mut descriptor = request.descriptor;
        descriptor.options.auth_retry = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %descriptor.method, url = %descriptor.url, "retrying first buffered request");

        join_replay(spawn_replay(interceptor, descriptor, request.responder)).await
    }
}

fn spawn_replay<T>(
    interceptor: &Arc<AuthInterceptor<T>>,
    descriptor: RequestDescriptor,
    responder: Responder,
) -> JoinHandle<ReplayOutcome>
where
    T: HttpTransport + 'static,
{
    let interceptor = Arc::clone(interceptor);
    tokio::spawn(async move { interceptor.dispatch(descriptor, responder).await })
}

async fn join_replay(handle: JoinHandle<ReplayOutcome>) -> Result<ReplayOutcome> {
    match handle.await {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(AuthInterceptorError::Cancelled),
    }
}
