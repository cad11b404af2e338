//! Braze Transport - webhook HTTP server for the braze messaging middleware.
//!
//! Integrations whose platforms push events over HTTP expose a
//! [`WebhookHandler`](braze_core::WebhookHandler); the kernel collects them
//! as routes and hands them to an [`HttpTransport`](braze_core::HttpTransport)
//! capability when the first listener is created. This crate provides that
//! capability, built on axum.

pub mod webhook;

pub use webhook::WebhookServer;
