//! Scripted transport and event recorder shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::{
    AuthEvent, AuthInterceptor, AuthNotifier, HttpResponse, HttpTransport, RequestBuffer,
    RequestDescriptor, Result,
};

/// Answers each URL with queued statuses, 500 once the queue runs dry.
///
/// A gated URL holds every send until the gate is notified.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<StatusCode>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    hits: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, status: StatusCode) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(status);
    }

    pub(crate) fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_owned(), Arc::clone(&gate));
        gate
    }

    pub(crate) fn hits(&self) -> Vec<RequestDescriptor> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse> {
        self.hits.lock().unwrap().push(request.clone());
        let gate = self.gates.lock().unwrap().get(&request.url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let status = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Ok(HttpResponse::new(status, format!("{} {}", status.as_u16(), request.url)))
    }
}

/// Collects every published event.
#[derive(Clone, Debug, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<AuthEvent>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notifier(&self) -> Arc<dyn AuthNotifier> {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: AuthEvent| events.lock().unwrap().push(event))
    }

    pub(crate) fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(AuthEvent::name).collect()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

pub(crate) fn interceptor_with(
    transport: Arc<ScriptedTransport>,
    recorder: &Recorder,
) -> Arc<AuthInterceptor<Arc<ScriptedTransport>>> {
    Arc::new(AuthInterceptor::new(
        transport,
        Arc::new(RequestBuffer::new()),
        recorder.notifier(),
    ))
}
