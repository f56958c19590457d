use crate::entities::notification;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::webhooks::{InboundPayload, SignatureVerifier, SIGNATURE_HEADER};
use crate::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, routing::post, Router};
use bytes::Bytes;
use tracing::{info, warn};

pub fn messaging_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(messaging_webhook))
}

// POST /api/v1/messaging/webhook
#[utoipa::path(
    post,
    path = "/api/v1/messaging/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Messages stored", body = crate::ApiResponse<Vec<notification::Model>>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse)
    ),
    tag = "Messaging"
)]
pub async fn messaging_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    // Signature is only enforced when a channel secret is configured.
    if let Some(secret) = state.config.messaging_channel_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                warn!("Messaging webhook without signature");
                ServiceError::Unauthorized("missing webhook signature".to_string())
            })?;
        SignatureVerifier::new(secret)
            .verify(&body, signature)
            .map_err(|e| {
                warn!("Messaging webhook signature verification failed");
                e
            })?;
    }

    let payload: InboundPayload = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let stored = state
        .services
        .notifications
        .store_inbound(&payload)
        .await?;
    info!(events = payload.events.len(), stored = stored.len(), "Messaging webhook processed");
    Ok(success_response(stored))
}
