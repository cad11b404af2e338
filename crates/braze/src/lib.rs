//! # Braze
//!
//! A message-routing middleware kernel for heterogeneous chat integrations.
//!
//! ## Overview
//!
//! Braze sits between chat-platform adapters ("integrations") and
//! application callbacks. Each integration supplies an inbound event stream
//! and an outbound delivery function; the kernel normalizes, filters,
//! transforms and dispatches messages between them using a common envelope
//! format (a profile of the ActivityStreams vocabulary).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────┐     ┌───────────────────────────┐
//! │ Integrations │────▶│  Kernel  │────▶│ Listeners (hear/hears/on) │
//! │ (per chat    │     │ incoming │     │  → application callbacks  │
//! │  platform)   │◀────│ outgoing │◀────│  → send_text/send_image   │
//! └──────────────┘     │  chains  │     └───────────────────────────┘
//!                      └──────────┘
//! ```
//!
//! - **Kernel**: registry, middleware chains, listener pipeline, dispatcher
//! - **Integrations**: adapters translating one platform to the envelope shape
//! - **Middleware**: ordered transformation steps for either direction
//! - **Runtime**: configuration, logging and process lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use braze::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BrazeRuntime::new();
//!     let kernel = runtime.kernel().clone();
//!
//!     kernel.register_integration(my_integration);
//!
//!     let responder = kernel.clone();
//!     kernel
//!         .hear(Pattern::compile("^ping$")?, TypeFilter::any())
//!         .subscribe(move |item| {
//!             if let Ok(output) = item {
//!                 let kernel = responder.clone();
//!                 tokio::spawn(async move {
//!                     let _ = kernel.send_text("pong", &output.message).await;
//!                 });
//!             }
//!         });
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub use braze_core as core;
pub use braze_runtime as runtime;
pub use braze_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use braze::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use braze_runtime::{BrazeConfig, BrazeRuntime};

    // Kernel surface
    pub use braze_core::{Kernel, Listener, Registrable, Subscription};

    // Envelope model
    pub use braze_core::{Entity, Envelope, EnvelopeObject, MediaMeta};

    // Matching
    pub use braze_core::{Pattern, TypeFilter};

    // Capability traits for integrations and middleware
    pub use braze_core::{
        ChainEntry, ChainOutput, EnvelopeStream, IncomingMiddleware, Integration,
        OutgoingMiddleware, StepOutput, WebhookHandler,
    };

    // Error types
    pub use braze_core::{Error, IntegrationError, IntegrationResult, MiddlewareError};
}
