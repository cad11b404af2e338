//! Normalized message envelope.
//!
//! Every message crossing the kernel, inbound or outbound, is an
//! [`Envelope`]: a profile of the ActivityStreams vocabulary. Integrations
//! produce envelopes on their event streams and consume them in their
//! delivery functions; the kernel itself never looks at platform-specific
//! payloads.
//!
//! One struct covers both directions. Inbound traffic populates `target`
//! (where the message was seen); outbound traffic populates `to` (where the
//! reply goes). An envelope without the `@context` marker is invalid and is
//! rejected by the listener pipeline before any pattern test runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-LD context marker carried by every valid envelope.
pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// A normalized message record exchanged between integrations and the kernel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Schema marker; required for an envelope to be considered valid.
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Semantic action, e.g. `"Create"`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The integration that produced (or will deliver) this envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<Entity>,

    /// The user or system the message originates from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Entity>,

    /// Where an inbound message was seen (channel, group, private chat).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Entity>,

    /// Where an outbound message is addressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Entity>,

    /// The message payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<EnvelopeObject>,
}

impl Envelope {
    /// Builds a valid inbound message envelope carrying plain text content.
    pub fn message(generator: Entity, target: Entity, content: impl Into<String>) -> Self {
        Self {
            context: Some(ACTIVITY_STREAMS_CONTEXT.to_string()),
            kind: Some("Create".to_string()),
            generator: Some(generator),
            actor: None,
            target: Some(target),
            to: None,
            object: Some(EnvelopeObject {
                kind: "Note".to_string(),
                content: Some(content.into()),
                ..Default::default()
            }),
        }
    }

    /// Whether the envelope carries the schema marker.
    pub fn is_valid(&self) -> bool {
        self.context.is_some()
    }

    /// The textual content of the payload, if any.
    pub fn content(&self) -> Option<&str> {
        self.object.as_ref()?.content.as_deref()
    }

    /// The type of the inbound target (e.g. `"Group"`, `"Person"`).
    pub fn target_kind(&self) -> Option<&str> {
        self.target.as_ref()?.kind.as_deref()
    }
}

/// An addressable party: generator, actor, target or recipient.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Entity type, e.g. `"Service"`, `"Group"`, `"Person"`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Entity {
    /// Creates an entity with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: None,
        }
    }

    /// Sets the human-readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the entity type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// The payload of an envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeObject {
    /// Platform-assigned message identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Payload type: `"Note"` for text, `"Image"`/`"Video"` for media.
    #[serde(rename = "type")]
    pub kind: String,

    /// Textual content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Media location, for image and video payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Media display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Opaque conversational context, propagated verbatim onto replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_uses_activitystreams_field_names() {
        let envelope = Envelope::message(
            Entity::new("slack").with_name("Slack"),
            Entity::new("C123").with_kind("Group"),
            "hello",
        );

        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["@context"], json!(ACTIVITY_STREAMS_CONTEXT));
        assert_eq!(wire["type"], json!("Create"));
        assert_eq!(wire["object"]["type"], json!("Note"));
        assert_eq!(wire["target"]["type"], json!("Group"));
        // Absent fields stay off the wire entirely.
        assert!(wire.get("to").is_none());
        assert!(wire.get("actor").is_none());
    }

    #[test]
    fn envelope_without_context_marker_is_invalid() {
        let mut envelope = Envelope::message(Entity::new("a"), Entity::new("b"), "x");
        assert!(envelope.is_valid());
        envelope.context = None;
        assert!(!envelope.is_valid());
    }

    #[test]
    fn content_accessor_reads_through_object() {
        let envelope = Envelope::message(Entity::new("a"), Entity::new("b"), "ping");
        assert_eq!(envelope.content(), Some("ping"));
        assert_eq!(Envelope::default().content(), None);
    }
}
