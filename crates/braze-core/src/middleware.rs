//! Middleware capability traits and chain records.
//!
//! Middleware transforms messages on their way through the kernel: incoming
//! middleware sees every merged inbound envelope before listeners do,
//! outgoing middleware sees content on its way to an integration's delivery
//! function.
//!
//! A middleware function may produce its result in three shapes — a plain
//! value, a deferred value, or a multi-valued asynchronous stream — captured
//! explicitly by [`StepOutput`] and normalized exactly once, at the chain
//! boundary ([`StepOutput::into_stream`]).

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::MiddlewareError;
use crate::kernel::Kernel;
use crate::pattern::Pattern;

/// Item type produced by a middleware step.
pub type StepResult = Result<Value, MiddlewareError>;

/// The return shape of a middleware function.
pub enum StepOutput {
    /// A plain value, available immediately.
    Immediate(Value),
    /// A single deferred value.
    Deferred(BoxFuture<'static, StepResult>),
    /// A multi-valued asynchronous stream; the chain keeps only the first
    /// emission.
    Stream(BoxStream<'static, StepResult>),
}

impl StepOutput {
    /// An immediately available value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Immediate(value.into())
    }

    /// An immediately available string value.
    ///
    /// On outgoing chains a bare string is shorthand for `{"content": ...}`.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Immediate(Value::String(content.into()))
    }

    /// A single value resolved by a future.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = StepResult> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// A multi-valued stream.
    pub fn from_stream<S>(s: S) -> Self
    where
        S: Stream<Item = StepResult> + Send + 'static,
    {
        Self::Stream(s.boxed())
    }

    /// Normalizes all three shapes into one asynchronous multi-valued stream.
    pub(crate) fn into_stream(self) -> BoxStream<'static, StepResult> {
        match self {
            Self::Immediate(value) => stream::once(async move { Ok(value) }).boxed(),
            Self::Deferred(future) => stream::once(future).boxed(),
            Self::Stream(s) => s,
        }
    }
}

/// A transformation step applied to every inbound envelope.
pub trait IncomingMiddleware: Send + Sync {
    /// Stable identifier; chain entries are named `{service_name}.incoming`.
    fn service_name(&self) -> &str;

    /// Transforms an inbound message.
    ///
    /// `acc` holds the ordered results of every prior step for this message.
    fn incoming(&self, kernel: Kernel, message: Envelope, acc: Vec<ChainEntry>) -> StepOutput;
}

/// A transformation step applied to content being sent out.
pub trait OutgoingMiddleware: Send + Sync {
    /// Stable identifier; chain entries are named `{service_name}.outgoing`.
    fn service_name(&self) -> &str;

    /// Transforms outgoing content; `message` is the inbound envelope that
    /// triggered the send.
    fn outgoing(
        &self,
        kernel: Kernel,
        content: String,
        message: Envelope,
        acc: Vec<ChainEntry>,
    ) -> StepOutput;
}

/// A registered middleware step: name, optional eligibility filter, instance.
pub struct MiddlewareDescriptor<M: ?Sized> {
    pub(crate) name: String,
    pub(crate) filter: Option<Pattern>,
    pub(crate) middleware: Arc<M>,
}

impl<M: ?Sized> Clone for MiddlewareDescriptor<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            filter: self.filter.clone(),
            middleware: Arc::clone(&self.middleware),
        }
    }
}

impl<M: ?Sized> MiddlewareDescriptor<M> {
    pub(crate) fn new(name: String, filter: Option<Pattern>, middleware: Arc<M>) -> Self {
        Self {
            name,
            filter,
            middleware,
        }
    }

    /// Whether the step may run for this message.
    ///
    /// The filter is tested against the original triggering envelope, never
    /// the accumulator. A step without a filter always runs.
    pub(crate) fn eligible(&self, trigger: &Envelope) -> bool {
        match &self.filter {
            None => true,
            Some(pattern) => pattern.matches(trigger.content()),
        }
    }
}

/// Per-step record appended to the chain accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEntry {
    /// Registered step name (`{service}.incoming` / `{service}.outgoing`).
    pub middleware: String,
    /// The value the step produced.
    pub data: Value,
    /// Content extracted from the value; populated on outgoing chains.
    pub content: Option<String>,
}

impl ChainEntry {
    pub(crate) fn incoming(name: &str, data: Value) -> Self {
        Self {
            middleware: name.to_string(),
            data,
            content: None,
        }
    }

    pub(crate) fn outgoing(name: &str, data: Value) -> Self {
        // A bare string result is shorthand for `{"content": ...}`.
        let data = match data {
            Value::String(content) => json!({ "content": content }),
            other => other,
        };
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            middleware: name.to_string(),
            data,
            content,
        }
    }
}

/// Result of evaluating a middleware chain for one envelope.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Ordered per-step results, in registration order.
    pub data: Vec<ChainEntry>,
    /// The triggering envelope, unchanged.
    pub message: Envelope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_three_shapes_normalize_to_a_stream() {
        let immediate = StepOutput::value(json!(1)).into_stream();
        let deferred = StepOutput::from_future(async { Ok(json!(2)) }).into_stream();
        let streamed =
            StepOutput::from_stream(stream::iter(vec![Ok(json!(3)), Ok(json!(4))])).into_stream();

        assert_eq!(immediate.collect::<Vec<_>>().await, vec![Ok(json!(1))]);
        assert_eq!(deferred.collect::<Vec<_>>().await, vec![Ok(json!(2))]);
        assert_eq!(
            streamed.collect::<Vec<_>>().await,
            vec![Ok(json!(3)), Ok(json!(4))]
        );
    }

    #[test]
    fn outgoing_entry_lifts_bare_strings_to_content() {
        let entry = ChainEntry::outgoing("hello.outgoing", json!("hi there"));
        assert_eq!(entry.data, json!({ "content": "hi there" }));
        assert_eq!(entry.content.as_deref(), Some("hi there"));
    }

    #[test]
    fn outgoing_entry_reads_content_from_objects() {
        let entry = ChainEntry::outgoing("x.outgoing", json!({ "content": "a", "extra": 1 }));
        assert_eq!(entry.content.as_deref(), Some("a"));

        let silent = ChainEntry::outgoing("x.outgoing", json!({ "extra": 1 }));
        assert_eq!(silent.content, None);
    }
}
