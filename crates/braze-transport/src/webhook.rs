//! Webhook server capability implementation.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    http::{Method, StatusCode, Uri},
    routing::any,
};
use tracing::{error, info, trace};

use braze_core::{
    HttpTransport, ServerHandle, TransportError, TransportResult, WebhookHandler, WebhookRequest,
    WebhookRoute,
};

/// Webhook server capability built on axum.
///
/// Each registered route is mounted at its path and, for platforms that
/// post to sub-paths, at `{path}/*` as well.
pub struct WebhookServer {
    addr: String,
}

impl WebhookServer {
    /// Creates a server that will bind `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl HttpTransport for WebhookServer {
    async fn serve(&self, routes: Vec<WebhookRoute>) -> TransportResult<ServerHandle> {
        let mut router = Router::new();
        for route in routes {
            let path = normalize_path(&route.path);
            router = mount(router, &path, route.handler);
        }

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })?;
        let actual_addr = listener.local_addr()?;

        info!(addr = %actual_addr, "webhook server listening");

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let server = axum::serve(listener, router);

            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!(error = %e, "webhook server error");
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("webhook server shutting down");
                }
            }
        });

        Ok(ServerHandle::new(
            format!("webhook-server-{actual_addr}"),
            shutdown_tx,
        ))
    }
}

/// Mounts one handler at `path` and at `path/{*rest}`.
fn mount(router: Router, path: &str, handler: Arc<dyn WebhookHandler>) -> Router {
    let route_handler = move |method: Method, uri: Uri, body: Bytes| {
        let handler = handler.clone();
        async move {
            trace!(method = %method, path = %uri.path(), len = body.len(), "webhook request");
            let request = WebhookRequest {
                method: method.to_string(),
                path: uri.path().to_string(),
                body: body.to_vec(),
            };
            let response = handler.handle(request).await;
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            (status, response.body)
        }
    };

    router
        .route(path, any(route_handler.clone()))
        .route(&format!("{path}/{{*rest}}"), any(route_handler))
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        assert_eq!(normalize_path("webhook/slack"), "/webhook/slack");
        assert_eq!(normalize_path("/webhook/slack"), "/webhook/slack");
    }
}
