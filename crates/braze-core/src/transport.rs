//! Transport capability traits.
//!
//! The kernel only knows the triggering condition for the webhook server —
//! listeners exist and at least one integration mounted a handler. The
//! server itself is a capability implemented elsewhere (see the
//! `braze-transport` crate) and injected at kernel construction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;

/// A request forwarded to an integration's webhook handler.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// HTTP method.
    pub method: String,
    /// Request path as received.
    pub path: String,
    /// Raw request body.
    pub body: Vec<u8>,
}

/// A response returned by a webhook handler.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl WebhookResponse {
    /// A `200 OK` acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: b"ok".to_vec(),
        }
    }

    /// An empty response with the given status code.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// A mountable request handler provided by an integration.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Handles one webhook request.
    async fn handle(&self, request: WebhookRequest) -> WebhookResponse;
}

/// A webhook mount: path plus handler.
#[derive(Clone)]
pub struct WebhookRoute {
    /// Mount path, e.g. `/webhook/slack`.
    pub path: String,
    /// The integration's handler.
    pub handler: Arc<dyn WebhookHandler>,
}

impl std::fmt::Debug for WebhookRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRoute")
            .field("path", &self.path)
            .finish()
    }
}

/// Capability for serving mounted webhook routes over HTTP.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Starts serving the given routes; resolves once the listener is bound.
    async fn serve(&self, routes: Vec<WebhookRoute>) -> TransportResult<ServerHandle>;
}

/// Handle to a running webhook server.
///
/// Dropping this handle stops the server.
#[derive(Debug)]
pub struct ServerHandle {
    /// Unique identifier for this server.
    pub id: String,
    /// Shutdown signal sender.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl ServerHandle {
    /// Creates a new server handle.
    pub fn new(id: impl Into<String>, shutdown_tx: tokio::sync::oneshot::Sender<()>) -> Self {
        Self {
            id: id.into(),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Stops the server.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
