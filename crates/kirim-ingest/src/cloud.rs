// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API webhook transformation.
//!
//! Converts the Graph webhook envelope (entry → changes → value →
//! messages) into the same internal message payload the socket gateway
//! produces, so both providers feed one pipeline.

use crate::event::MessagePayload;

/// A cloud inbound message tagged with the phone-number id that routes it
/// to a tenant.
#[derive(Debug, Clone)]
pub struct CloudMessage {
    pub phone_number_id: String,
    pub payload: MessagePayload,
}

/// Transform a raw Graph webhook body into internal messages.
///
/// Status-only callbacks (delivery updates without a `messages` array)
/// produce an empty list; malformed input is treated the same way rather
/// than erroring, since the upstream retries on non-2xx.
pub fn transform_cloud_payload(body: &serde_json::Value) -> Vec<CloudMessage> {
    let mut out = Vec::new();
    let Some(entries) = body.get("entry").and_then(|e| e.as_array()) else {
        return out;
    };

    for entry in entries {
        let Some(changes) = entry.get("changes").and_then(|c| c.as_array()) else {
            continue;
        };
        for change in changes {
            let Some(value) = change.get("value") else {
                continue;
            };
            let Some(messages) = value.get("messages").and_then(|m| m.as_array()) else {
                continue;
            };
            let phone_number_id = value
                .pointer("/metadata/phone_number_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let push_name = value
                .pointer("/contacts/0/profile/name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            for message in messages {
                let payload = transform_message(message, &push_name);
                out.push(CloudMessage {
                    phone_number_id: phone_number_id.clone(),
                    payload,
                });
            }
        }
    }
    out
}

fn transform_message(message: &serde_json::Value, push_name: &str) -> MessagePayload {
    let kind = message
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let from: String = message
        .get("from")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let mut payload = MessagePayload {
        id: message
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        from,
        kind: kind.clone(),
        is_from_me: false,
        is_group: false,
        push_name: push_name.to_string(),
        timestamp: message
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        ..MessagePayload::default()
    };

    match kind.as_str() {
        "text" => {
            payload.body = message
                .pointer("/text/body")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
        }
        "image" | "video" | "audio" | "sticker" => {
            let media = message.get(&kind);
            payload.caption = media
                .and_then(|m| m.get("caption"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            // The cloud API hands out a media id; fetching the bytes is a
            // separate authenticated call.
            payload.media_url = media
                .and_then(|m| m.get("id"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            payload.media_mime_type = media
                .and_then(|m| m.get("mime_type"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        "document" => {
            let doc = message.get("document");
            let caption = doc
                .and_then(|d| d.get("caption"))
                .and_then(|v| v.as_str())
                .or_else(|| doc.and_then(|d| d.get("filename")).and_then(|v| v.as_str()))
                .unwrap_or_default();
            payload.caption = caption.to_string();
            payload.media_url = doc
                .and_then(|d| d.get("id"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            payload.media_mime_type = doc
                .and_then(|d| d.get("mime_type"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        _ => {}
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_body(message: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "ph-1" },
                        "contacts": [{ "profile": { "name": "Ana" } }],
                        "messages": [message],
                    },
                }],
            }],
        })
    }

    #[test]
    fn text_message_maps_body_and_routing() {
        let body = graph_body(serde_json::json!({
            "id": "wamid.1",
            "from": "+62 812-3456-789",
            "timestamp": "1700000000",
            "type": "text",
            "text": { "body": "Hello" },
        }));
        let messages = transform_cloud_payload(&body);
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.phone_number_id, "ph-1");
        assert_eq!(msg.payload.from, "628123456789");
        assert_eq!(msg.payload.body, "Hello");
        assert_eq!(msg.payload.push_name, "Ana");
        assert_eq!(msg.payload.timestamp, 1700000000);
        assert!(!msg.payload.is_from_me);
    }

    #[test]
    fn captionless_image_carries_media_id() {
        let body = graph_body(serde_json::json!({
            "id": "wamid.2",
            "from": "628123456789",
            "type": "image",
            "image": { "id": "media-99", "mime_type": "image/jpeg" },
        }));
        let messages = transform_cloud_payload(&body);
        let payload = &messages[0].payload;
        assert_eq!(payload.kind, "image");
        assert_eq!(payload.caption, "");
        assert_eq!(payload.media_url.as_deref(), Some("media-99"));
        assert_eq!(payload.media_mime_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn document_falls_back_to_filename() {
        let body = graph_body(serde_json::json!({
            "id": "wamid.3",
            "from": "628123456789",
            "type": "document",
            "document": { "id": "doc-1", "filename": "invoice.pdf" },
        }));
        let messages = transform_cloud_payload(&body);
        assert_eq!(messages[0].payload.caption, "invoice.pdf");
    }

    #[test]
    fn status_only_callback_yields_nothing() {
        let body = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "ph-1" },
                        "statuses": [{ "id": "wamid.1", "status": "delivered" }],
                    },
                }],
            }],
        });
        assert!(transform_cloud_payload(&body).is_empty());
    }

    #[test]
    fn malformed_body_yields_nothing() {
        assert!(transform_cloud_payload(&serde_json::json!({})).is_empty());
        assert!(transform_cloud_payload(&serde_json::json!({"entry": "nope"})).is_empty());
    }
}
