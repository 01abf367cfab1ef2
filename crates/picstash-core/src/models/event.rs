//! Terminal notification events delivered over the per-image SSE channel.
//!
//! Exactly one terminal event is ever expected per image. Events are not
//! persisted or replayed; a subscriber that connects after publication
//! receives nothing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message accompanying a resize completed by the worker.
pub const IMAGE_PROCESSED_MESSAGE: &str = "Image processed successfully";
/// Message for images stored synchronously (no resize needed, or an existing
/// processed file was reused).
pub const IMAGE_READY_MESSAGE: &str = "Image is ready";
/// Fallback when a processing failure carries no message of its own.
pub const IMAGE_FAILED_DEFAULT_MESSAGE: &str = "Image processing failed";

/// Terminal event payload. Serializes to the wire format clients see, e.g.
/// `{"type":"completed","imageId":"…","message":"…","url":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageEvent {
    #[serde(rename_all = "camelCase")]
    Completed {
        image_id: Uuid,
        message: String,
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Failed { image_id: Uuid, message: String },
}

impl ImageEvent {
    pub fn completed(image_id: Uuid, message: impl Into<String>, url: impl Into<String>) -> Self {
        ImageEvent::Completed {
            image_id,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Build a failure event, substituting the default message when the
    /// underlying error produced an empty one.
    pub fn failed(image_id: Uuid, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            IMAGE_FAILED_DEFAULT_MESSAGE.to_string()
        } else {
            message
        };
        ImageEvent::Failed { image_id, message }
    }

    pub fn image_id(&self) -> Uuid {
        match self {
            ImageEvent::Completed { image_id, .. } => *image_id,
            ImageEvent::Failed { image_id, .. } => *image_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_event_wire_format() {
        let id = Uuid::new_v4();
        let event = ImageEvent::completed(id, IMAGE_PROCESSED_MESSAGE, "http://files/x.jpg");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["imageId"], id.to_string());
        assert_eq!(json["message"], IMAGE_PROCESSED_MESSAGE);
        assert_eq!(json["url"], "http://files/x.jpg");
    }

    #[test]
    fn test_failed_event_wire_format() {
        let id = Uuid::new_v4();
        let event = ImageEvent::failed(id, "decode error");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["imageId"], id.to_string());
        assert_eq!(json["message"], "decode error");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_failed_event_empty_message_falls_back_to_default() {
        let event = ImageEvent::failed(Uuid::new_v4(), "");
        match event {
            ImageEvent::Failed { message, .. } => {
                assert_eq!(message, IMAGE_FAILED_DEFAULT_MESSAGE)
            }
            _ => panic!("expected failed event"),
        }

        let event = ImageEvent::failed(Uuid::new_v4(), "   ");
        match event {
            ImageEvent::Failed { message, .. } => {
                assert_eq!(message, IMAGE_FAILED_DEFAULT_MESSAGE)
            }
            _ => panic!("expected failed event"),
        }
    }
}
