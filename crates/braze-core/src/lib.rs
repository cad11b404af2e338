//! # Braze Core
//!
//! The routing kernel of the braze messaging middleware.
//!
//! Braze sits between heterogeneous chat-platform adapters ("integrations")
//! and application callbacks. Integrations feed raw events in a common
//! envelope shape; the kernel normalizes, filters, transforms and routes
//! them in both directions.
//!
//! ## Components
//!
//! - **Envelope model** ([`Envelope`]): the normalized message record all
//!   other components operate on — a profile of the ActivityStreams
//!   vocabulary.
//! - **Middleware chain**: ordered, short-circuit-free transformation
//!   pipelines for both directions. Steps may produce immediate, deferred
//!   or multi-valued results ([`StepOutput`]); only the first value of each
//!   step is kept.
//! - **Registry** ([`Kernel`], [`Registrable`]): owned, append-only
//!   collections of integrations and middleware; lookup by service ID.
//! - **Listener pipeline** ([`Listener`]): merges every integration's event
//!   streams, applies the incoming chain, then type and pattern filters.
//! - **Send dispatcher**: applies the outgoing chain, builds the outbound
//!   envelope and routes it to the owning integration.
//!
//! ## Message flow
//!
//! ```text
//! ┌─────────────┐     ┌───────────────────────────────┐     ┌────────────┐
//! │ Integration │────▶│ incoming chain → type/pattern │────▶│ subscriber │
//! │   streams   │     │        (Listener)             │     │  callback  │
//! └─────────────┘     └───────────────────────────────┘     └─────┬──────┘
//!        ▲                                                        │
//!        │            ┌───────────────────────────────┐           │
//!        └────────────│ outgoing chain → dispatcher   │◀──────────┘
//!                     │   (send_text / send_image)    │
//!                     └───────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use braze_core::{Kernel, Pattern, TypeFilter};
//!
//! let kernel = Kernel::new();
//! kernel.register_integration(my_integration);
//!
//! let listener = kernel.hear(Pattern::compile("^ping$")?, TypeFilter::any());
//! let responder = kernel.clone();
//! listener.subscribe(move |item| {
//!     if let Ok(output) = item {
//!         let kernel = responder.clone();
//!         tokio::spawn(async move {
//!             let _ = kernel.send_text("pong", &output.message).await;
//!         });
//!     }
//! });
//! ```

mod chain;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod integration;
pub mod kernel;
pub mod listener;
pub mod middleware;
pub mod pattern;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use dispatch::MediaMeta;
pub use envelope::{ACTIVITY_STREAMS_CONTEXT, Entity, Envelope, EnvelopeObject};
pub use error::{
    Error, IntegrationError, IntegrationResult, MiddlewareError, Result, TransportError,
    TransportResult,
};
pub use integration::{BoxedIntegration, EnvelopeStream, Integration};
pub use kernel::{Kernel, KernelBuilder, Registrable};
pub use listener::{Listener, ListenerStream, Subscription};
pub use middleware::{
    ChainEntry, ChainOutput, IncomingMiddleware, MiddlewareDescriptor, OutgoingMiddleware,
    StepOutput, StepResult,
};
pub use pattern::{Pattern, TypeFilter};
pub use transport::{
    HttpTransport, ServerHandle, WebhookHandler, WebhookRequest, WebhookResponse, WebhookRoute,
};
