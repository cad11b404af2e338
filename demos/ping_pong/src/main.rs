//! Ping Pong Demo
//!
//! The smallest useful braze setup: one in-process integration that emits a
//! handful of "ping" messages, a listener matching them, and a reply sent
//! back through the kernel's dispatcher.
//!
//! ```bash
//! cargo run --package ping-pong
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use braze::prelude::*;
use futures::StreamExt;
use futures::stream;
use serde_json::{Value, json};
use tracing::{error, info};

/// An integration that scripts a short conversation and logs deliveries.
struct ShellIntegration;

impl ShellIntegration {
    fn envelope(content: &str) -> Envelope {
        Envelope::message(
            Entity::new("shell").with_name("Shell"),
            Entity::new("demo-room").with_kind("Group"),
            content,
        )
    }
}

#[async_trait]
impl Integration for ShellIntegration {
    fn service_id(&self) -> String {
        "shell".to_string()
    }

    fn service_name(&self) -> String {
        "shell".to_string()
    }

    fn listen(&self) -> EnvelopeStream {
        let script = ["hello", "ping", "how are you?", "ping"];
        stream::unfold(script.into_iter(), |mut script| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let content = script.next()?;
            info!(content, "[shell] user says");
            Some((Self::envelope(content), script))
        })
        .boxed()
    }

    async fn send(&self, envelope: Envelope) -> IntegrationResult<Value> {
        let content = envelope.content().unwrap_or_default();
        info!(content, "[shell] bot replies");
        Ok(json!({ "delivered": true }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // No webhook integrations here, so leave the HTTP server off.
    let mut config = BrazeConfig::default();
    config.http.enabled = false;

    let runtime = BrazeRuntime::from_config(&config);
    let kernel = runtime.kernel().clone();

    kernel.register_integration(Arc::new(ShellIntegration));

    let responder = kernel.clone();
    let _subscription = kernel
        .hear(Pattern::compile("^ping$")?, TypeFilter::any())
        .subscribe(move |item| match item {
            Ok(output) => {
                let kernel = responder.clone();
                tokio::spawn(async move {
                    if let Err(error) = kernel.send_text("pong", &output.message).await {
                        error!(%error, "failed to send reply");
                    }
                });
            }
            Err(error) => error!(%error, "listener failed"),
        });

    runtime
        .run_until(tokio::time::sleep(Duration::from_secs(6)))
        .await?;
    Ok(())
}
