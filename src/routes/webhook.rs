use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use diesel::SqliteConnection;

use crate::consts::PAYMENT_SIGNATURE_HEADER;
use crate::error::{AppError, AppResult};
use crate::routes::purchase_helpers::{
    complete_purchase, mark_purchase_failed, CompletionOutcome, FailureOutcome,
};
use crate::types::{webhook_event, ApiResponse, EmptyData, RazorpayWebhookEvent, WebhookAck};
use crate::AppState;

/// Gateway server-to-server event
///
/// Takes the body as raw bytes: the signature header covers the exact payload,
/// so it has to be checked before any JSON parsing.
#[utoipa::path(
    post,
    path = "/purchase/webhook",
    request_body(content = String, description = "Raw Razorpay event JSON", content_type = "application/json"),
    params(
        ("X-Razorpay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Malformed event", body = ApiResponse<EmptyData>),
        (status = 401, description = "Signature missing or invalid", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase"
)]
pub async fn handle_razorpay_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook without signature header");
            AppError::InvalidSignature
        })?;

    app_state
        .signatures
        .verify_webhook(&body, signature)
        .inspect_err(|_| tracing::warn!(bytes = body.len(), "Rejected webhook signature"))?;

    let event: RazorpayWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook event: {}", e)))?;

    tracing::info!(event = %event.event, created_at = ?event.created_at, "Received webhook");

    let mut conn = app_state.get_db_connection()?;
    let handled = process_event(&mut conn, &event)?;

    Ok(Json(ApiResponse::ok(WebhookAck {
        event: event.event,
        handled,
    })))
}

/// Returns whether the event changed or confirmed a purchase
fn process_event(conn: &mut SqliteConnection, event: &RazorpayWebhookEvent) -> AppResult<bool> {
    match event.event.as_str() {
        webhook_event::PAYMENT_CAPTURED | webhook_event::ORDER_PAID => {
            let payment = &event
                .payload
                .payment
                .as_ref()
                .ok_or_else(|| AppError::Validation("event has no payment entity".to_string()))?
                .entity;
            let order_id = payment
                .order_id
                .as_deref()
                .or_else(|| event.payload.order.as_ref().map(|o| o.entity.id.as_str()))
                .ok_or_else(|| AppError::Validation("event has no order id".to_string()))?;

            match complete_purchase(conn, order_id, &payment.id) {
                Ok(CompletionOutcome::Completed(_)) => Ok(true),
                Ok(CompletionOutcome::AlreadyCompleted(_)) => {
                    tracing::info!(order_id, payment_id = %payment.id, "Duplicate delivery ignored");
                    Ok(true)
                }
                // Acknowledged so the gateway stops redelivering
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(order_id, "Webhook for unknown order");
                    Ok(false)
                }
                Err(AppError::AlreadyEnrolled) => Ok(false),
                Err(AppError::Validation(reason)) => {
                    tracing::warn!(order_id, payment_id = %payment.id, reason = %reason, "Payment not applied");
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }
        webhook_event::PAYMENT_FAILED => {
            let payment = &event
                .payload
                .payment
                .as_ref()
                .ok_or_else(|| AppError::Validation("event has no payment entity".to_string()))?
                .entity;
            let Some(order_id) = payment.order_id.as_deref() else {
                tracing::warn!(payment_id = %payment.id, "Failed payment without order");
                return Ok(false);
            };

            match mark_purchase_failed(conn, order_id) {
                Ok(FailureOutcome::MarkedFailed(_)) => {
                    tracing::info!(
                        order_id,
                        reason = payment.error_description.as_deref().unwrap_or("unspecified"),
                        "Gateway reported payment failure"
                    );
                    Ok(true)
                }
                Ok(FailureOutcome::Unchanged(_)) => Ok(false),
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(order_id, "Webhook for unknown order");
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }
        other => {
            tracing::debug!(event = other, "Ignoring webhook event");
            Ok(false)
        }
    }
}
