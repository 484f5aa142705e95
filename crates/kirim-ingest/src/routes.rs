// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the ingestion pipeline, built on axum.
//!
//! `POST /webhook/incoming` receives socket-gateway envelopes and
//! acknowledges once persistence and broadcast complete; downstream
//! notification failures never change the response, so the gateway does
//! not retry-storm a partially successful ingestion. `POST /webhook/cloud`
//! receives Graph callbacks; `GET /webhook/cloud` answers the hub
//! verification challenge.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::event::WebhookEnvelope;
use crate::pipeline::IngestPipeline;

/// Setting key holding the cloud webhook verification token.
pub const CLOUD_VERIFY_TOKEN_KEY: &str = "cloud_verify_token";

/// Build the webhook router.
pub fn router(pipeline: Arc<IngestPipeline>) -> Router {
    Router::new()
        .route("/webhook/incoming", post(post_incoming))
        .route("/webhook/cloud", post(post_cloud).get(get_cloud_verify))
        .route("/webhook/health", get(get_health))
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

async fn post_incoming(
    State(pipeline): State<Arc<IngestPipeline>>,
    Json(envelope): Json<WebhookEnvelope>,
) -> impl IntoResponse {
    if envelope.event.is_empty() || envelope.session_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "status": "error",
                "message": "Missing event or sessionId",
            })),
        );
    }

    match pipeline.handle(envelope).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok" })),
        ),
        Err(e) => {
            error!(error = %e, "webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
        }
    }
}

async fn post_cloud(
    State(pipeline): State<Arc<IngestPipeline>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    match pipeline.handle_cloud(&body).await {
        Ok(()) => (StatusCode::OK, "EVENT_RECEIVED"),
        Err(e) => {
            error!(error = %e, "cloud webhook processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR")
        }
    }
}

/// Hub verification handshake: echo the challenge when the verify token
/// matches the configured one.
async fn get_cloud_verify(
    State(pipeline): State<Arc<IngestPipeline>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token");
    let challenge = params.get("hub.challenge");

    let expected = match pipeline.cloud_verify_token().await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "failed to load cloud verify token");
            None
        }
    };

    match (mode, token, challenge, expected) {
        (Some("subscribe"), Some(token), Some(challenge), Some(expected))
            if *token == expected =>
        {
            (StatusCode::OK, challenge.clone())
        }
        (Some(_), Some(_), _, _) => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
        _ => (StatusCode::BAD_REQUEST, "Bad Request".to_string()),
    }
}

async fn get_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
