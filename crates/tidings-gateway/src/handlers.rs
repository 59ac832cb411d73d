// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! The webhook POST handler takes the raw body bytes because the HMAC is
//! computed over the bytes as received; parsing happens only after the
//! signature check passes.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tidings_core::{SendRequest, TidingsError, OUTGOING_QUEUE};
use tidings_pipeline::IngressOutcome;
use tidings_storage::queries::queue;
use tidings_whatsapp::{signature, WebhookEnvelope};
use tracing::{info, warn};

use crate::server::GatewayState;

/// Query parameters of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// GET /webhook
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    info!(mode = ?params.mode, "webhook verification request");
    match signature::verify_webhook_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &state.verify_token,
    ) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => {
            warn!("webhook verification failed: token mismatch or invalid mode");
            error_response(StatusCode::FORBIDDEN, "verification failed")
        }
    }
}

/// POST /webhook
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !signature::verify_signature(&body, signature_header, &state.app_secret) {
        warn!("webhook signature verification failed");
        return error_response(StatusCode::FORBIDDEN, "invalid signature");
    }

    let raw: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON");
            return error_response(StatusCode::BAD_REQUEST, "malformed payload");
        }
    };
    let envelope: WebhookEnvelope = match serde_json::from_value(raw.clone()) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "webhook body does not match the provider envelope");
            return error_response(StatusCode::BAD_REQUEST, "malformed envelope");
        }
    };

    match state.ingress.process(&envelope, &raw).await {
        Ok(outcome) => {
            if outcome == IngressOutcome::Ignored {
                info!("non-actionable webhook acknowledged");
            }
            (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
        }
        Err(TidingsError::WorkspaceNotFound { phone_number_id }) => {
            warn!(phone_number_id, "webhook for unprovisioned phone number");
            error_response(StatusCode::FORBIDDEN, "unknown workspace")
        }
        Err(e) => {
            warn!(error = %e, "webhook processing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// POST /messaging/send
pub async fn send_message(
    State(state): State<GatewayState>,
    Json(request): Json<SendRequest>,
) -> Response {
    let payload = match serde_json::to_string(&request) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to encode send request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };
    match queue::enqueue(
        &state.db,
        OUTGOING_QUEUE,
        &payload,
        state.max_delivery_attempts,
    )
    .await
    {
        Ok(id) => {
            info!(queue_entry = id, to = %request.to, "send request queued");
            (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to enqueue send request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
