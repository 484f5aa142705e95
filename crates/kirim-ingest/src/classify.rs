// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content classification: reduce heterogeneous message types to a text
//! surrogate plus an optional media reference.
//!
//! Text passes through untouched. Media messages keep their caption when
//! one exists, otherwise a `[Type]` placeholder, and carry the provider's
//! media reference for later retrieval.

use crate::event::MessagePayload;

/// Classified message content ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub message_type: String,
    pub body: String,
    pub media_url: Option<String>,
}

/// Classify a message payload into its persisted form.
pub fn classify(msg: &MessagePayload) -> Classified {
    let kind = if msg.kind.is_empty() { "text" } else { &msg.kind };
    let (body, media_url) = match kind {
        "text" => (msg.body.clone(), None),
        "image" | "video" | "document" => {
            let body = if msg.caption.is_empty() {
                type_label(kind)
            } else {
                msg.caption.clone()
            };
            (body, msg.media_url.clone())
        }
        "audio" | "sticker" => (type_label(kind), msg.media_url.clone()),
        // Location, contact cards, reactions, polls arrive with a body
        // already rendered by the gateway.
        _ => {
            let body = if msg.body.is_empty() {
                type_label(kind)
            } else {
                msg.body.clone()
            };
            (body, msg.media_url.clone())
        }
    };
    Classified {
        message_type: kind.to_string(),
        body,
        media_url,
    }
}

/// `image` -> `[Image]`
fn type_label(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("[{}{}]", first.to_uppercase(), chars.as_str()),
        None => "[Unknown]".to_string(),
    }
}
