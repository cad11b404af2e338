//! Send dispatcher: outgoing chain, envelope construction and routing.
//!
//! Sending happens in three steps. Content is first threaded through the
//! outgoing middleware chain; the non-empty per-step contents are joined
//! with a single space, falling back to the original input when no step
//! produced any. The outbound envelope is then built from the triggering
//! inbound envelope (generator and target supply the routing context).
//! Finally the envelope is routed to the integration whose service ID
//! matches its generator — after schema validation, and with delivery
//! failures propagated unchanged. No retry, no queuing.

use serde_json::Value;
use tracing::debug;

use crate::envelope::{ACTIVITY_STREAMS_CONTEXT, Entity, Envelope, EnvelopeObject};
use crate::error::{Error, Result};
use crate::kernel::Kernel;

/// Optional metadata attached to media sends.
#[derive(Debug, Clone, Default)]
pub struct MediaMeta {
    /// Display name of the media.
    pub name: Option<String>,
    /// Caption accompanying the media.
    pub content: Option<String>,
}

impl Kernel {
    /// Sends a text reply to the conversation `message` arrived from.
    pub async fn send_text(&self, text: &str, message: &Envelope) -> Result<Value> {
        let content = self
            .outgoing_content(text, message)
            .await?
            .unwrap_or_else(|| text.to_string());
        let object = EnvelopeObject {
            kind: "Note".to_string(),
            content: Some(content),
            ..Default::default()
        };
        self.dispatch(build_reply(message, object)).await
    }

    /// Sends an image by URL to the conversation `message` arrived from.
    pub async fn send_image(
        &self,
        url: &str,
        message: &Envelope,
        meta: Option<MediaMeta>,
    ) -> Result<Value> {
        self.send_media(url, "Image", message, meta).await
    }

    /// Sends a video by URL to the conversation `message` arrived from.
    pub async fn send_video(
        &self,
        url: &str,
        message: &Envelope,
        meta: Option<MediaMeta>,
    ) -> Result<Value> {
        self.send_media(url, "Video", message, meta).await
    }

    async fn send_media(
        &self,
        url: &str,
        media_kind: &str,
        message: &Envelope,
        meta: Option<MediaMeta>,
    ) -> Result<Value> {
        let resolved = self
            .outgoing_content(url, message)
            .await?
            .unwrap_or_else(|| url.to_string());
        let meta = meta.unwrap_or_default();
        let object = EnvelopeObject {
            kind: media_kind.to_string(),
            url: Some(resolved),
            content: meta.content,
            name: meta.name,
            ..Default::default()
        };
        self.dispatch(build_reply(message, object)).await
    }

    /// Runs the outgoing chain and joins the per-step contents in order.
    ///
    /// Returns `None` when no step produced content.
    async fn outgoing_content(&self, content: &str, message: &Envelope) -> Result<Option<String>> {
        let output = self.run_outgoing_chain(content, message).await?;
        let contents: Vec<&str> = output
            .data
            .iter()
            .filter_map(|entry| entry.content.as_deref())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(if contents.is_empty() {
            None
        } else {
            Some(contents.join(" "))
        })
    }

    /// Routes an outbound envelope to the integration that owns it.
    ///
    /// The envelope must carry `to.id`, `to.type`, `generator.id` and
    /// `generator.name`; anything less is a schema violation and no lookup
    /// is attempted.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<Value> {
        let to = envelope.to.as_ref().ok_or_else(|| Error::missing_field("to"))?;
        if to.id.is_empty() {
            return Err(Error::missing_field("to.id"));
        }
        if to.kind.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::missing_field("to.type"));
        }

        let generator = envelope
            .generator
            .as_ref()
            .ok_or_else(|| Error::missing_field("generator"))?;
        if generator.id.is_empty() {
            return Err(Error::missing_field("generator.id"));
        }
        if generator.name.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::missing_field("generator.name"));
        }

        let service_id = generator.id.clone();
        let Some(integration) = self.find_integration(&service_id) else {
            return Err(Error::IntegrationNotFound { id: service_id });
        };

        debug!(
            integration = %integration.service_name(),
            to = %to.id,
            "dispatching envelope"
        );
        integration.send(envelope).await.map_err(Error::from)
    }
}

/// Builds the outbound `"Create"` envelope addressed back to the trigger.
fn build_reply(trigger: &Envelope, mut object: EnvelopeObject) -> Envelope {
    // The trigger's conversational context rides along on the reply.
    if let Some(context) = trigger.object.as_ref().and_then(|o| o.context.clone()) {
        object.context = Some(context);
    }

    let generator = trigger.generator.clone().map(|entity| Entity {
        kind: Some("Service".to_string()),
        ..entity
    });
    let to = trigger.target.clone().map(|entity| Entity {
        name: None,
        ..entity
    });

    Envelope {
        context: Some(ACTIVITY_STREAMS_CONTEXT.to_string()),
        kind: Some("Create".to_string()),
        generator,
        actor: None,
        target: None,
        to,
        object: Some(object),
    }
}
