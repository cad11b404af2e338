//! Shared fixtures for kernel tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::envelope::{Entity, Envelope};
use crate::error::{IntegrationError, IntegrationResult};
use crate::integration::{EnvelopeStream, Integration};
use crate::kernel::Kernel;
use crate::middleware::{ChainEntry, IncomingMiddleware, StepOutput};
use crate::transport::{WebhookHandler, WebhookRequest, WebhookResponse};

/// A scripted integration: messages are fed with [`MockIntegration::push`]
/// and every subscriber's `listen()` stream observes all of them.
pub(crate) struct MockIntegration {
    id: String,
    events: broadcast::Sender<Envelope>,
    sent: Mutex<Vec<Envelope>>,
    failing: AtomicBool,
    webhook: bool,
}

impl MockIntegration {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Self::build(id, false)
    }

    pub(crate) fn with_webhook(id: &str) -> Arc<Self> {
        Self::build(id, true)
    }

    fn build(id: &str, webhook: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            id: id.to_string(),
            events,
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            webhook,
        })
    }

    /// Feeds an inbound envelope to every live `listen()` stream.
    pub(crate) fn push(&self, envelope: Envelope) {
        let _ = self.events.send(envelope);
    }

    /// Envelopes delivered through `send` so far.
    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    /// Makes every subsequent `send` fail.
    pub(crate) fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Integration for MockIntegration {
    fn service_id(&self) -> String {
        self.id.clone()
    }

    fn service_name(&self) -> String {
        self.id.clone()
    }

    fn listen(&self) -> EnvelopeStream {
        BroadcastStream::new(self.events.subscribe())
            .filter_map(|item| async move { item.ok() })
            .boxed()
    }

    async fn send(&self, envelope: Envelope) -> IntegrationResult<Value> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IntegrationError::SendFailed("scripted failure".into()));
        }
        self.sent.lock().push(envelope);
        Ok(json!({ "delivered": true }))
    }

    fn webhook(&self) -> Option<Arc<dyn WebhookHandler>> {
        self.webhook.then(|| Arc::new(AckHandler) as Arc<dyn WebhookHandler>)
    }
}

struct AckHandler;

#[async_trait]
impl WebhookHandler for AckHandler {
    async fn handle(&self, _request: WebhookRequest) -> WebhookResponse {
        WebhookResponse::ok()
    }
}

/// Incoming middleware that records its own name in the chain.
pub(crate) struct NamedIncoming {
    name: String,
}

impl NamedIncoming {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl IncomingMiddleware for NamedIncoming {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn incoming(&self, _kernel: Kernel, _message: Envelope, _acc: Vec<ChainEntry>) -> StepOutput {
        StepOutput::value(json!({ "handled_by": self.name }))
    }
}

/// A canonical valid inbound envelope: "ping" from `svcA` in `room1`.
pub(crate) fn ping() -> Envelope {
    Envelope::message(
        Entity::new("svcA").with_name("Svc"),
        Entity::new("room1").with_kind("Group"),
        "ping",
    )
}

/// Polls `condition` until it holds, panicking after a generous deadline.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
