//! Integration capability trait.
//!
//! An integration adapts one chat platform to the kernel: it produces raw
//! inbound envelopes on its streams and delivers outbound envelopes through
//! its `send` function. The kernel never interprets platform payloads; the
//! integration is responsible for translating to and from the envelope
//! shape.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::IntegrationResult;
use crate::transport::WebhookHandler;

/// An unbounded asynchronous sequence of raw envelopes.
pub type EnvelopeStream = BoxStream<'static, Envelope>;

/// A chat-platform adapter registered with the kernel.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Stable identifier used for outbound dispatch routing.
    fn service_id(&self) -> String;

    /// Human-readable service name, used for logging and webhook paths.
    fn service_name(&self) -> String;

    /// Connection lifecycle events, merged into the listener source
    /// alongside [`listen`](Self::listen). Defaults to an empty stream.
    fn connect(&self) -> EnvelopeStream {
        stream::empty().boxed()
    }

    /// The platform's inbound message stream.
    fn listen(&self) -> EnvelopeStream;

    /// Delivers an outbound envelope to the platform.
    async fn send(&self, envelope: Envelope) -> IntegrationResult<Value>;

    /// Request handler to mount under `/webhook/{service_name}`, for
    /// platforms that push events over HTTP. Defaults to none.
    fn webhook(&self) -> Option<Arc<dyn WebhookHandler>> {
        None
    }
}

/// A shared integration trait object.
pub type BoxedIntegration = Arc<dyn Integration>;
