use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::routes::purchase_helpers::{
    complete_purchase, find_purchase_by_order, mark_purchase_failed, CompletionOutcome,
    FailureOutcome,
};
use crate::types::{
    ApiResponse, EmptyData, PaymentFailureData, PaymentFailureRequest, VerifyData, VerifyRequest,
};
use crate::AppState;

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Confirm a payment from the checkout widget callback
///
/// The signature is checked before any state is read. Repeating a verified
/// callback returns success without touching the enrollment again.
#[utoipa::path(
    post,
    path = "/purchase/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Payment verified, course unlocked", body = ApiResponse<VerifyData>),
        (status = 400, description = "Malformed request", body = ApiResponse<EmptyData>),
        (status = 401, description = "Signature mismatch or missing session", body = ApiResponse<EmptyData>),
        (status = 404, description = "No purchase for this order", body = ApiResponse<EmptyData>),
        (status = 409, description = "Course was already purchased with another order", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase"
)]
pub async fn verify_payment(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<VerifyData>>> {
    let Json(payload) = payload?;
    require("razorpay_order_id", &payload.razorpay_order_id)?;
    require("razorpay_payment_id", &payload.razorpay_payment_id)?;
    require("razorpay_signature", &payload.razorpay_signature)?;

    app_state
        .signatures
        .verify_payment(
            &payload.razorpay_order_id,
            &payload.razorpay_payment_id,
            &payload.razorpay_signature,
        )
        .inspect_err(|_| {
            tracing::warn!(
                order_id = %payload.razorpay_order_id,
                user_id = %user.user_id,
                "Rejected payment signature"
            );
        })?;

    let mut conn = app_state.get_db_connection()?;

    let owned_by_caller = find_purchase_by_order(&mut conn, &payload.razorpay_order_id)?
        .is_some_and(|purchase| purchase.user_id == user.user_id);
    if !owned_by_caller {
        return Err(AppError::NotFound("Purchase".to_string()));
    }

    let outcome = complete_purchase(
        &mut conn,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
    )?;

    let msg = match &outcome {
        CompletionOutcome::Completed(_) => "Payment verified, course unlocked",
        CompletionOutcome::AlreadyCompleted(_) => "Payment already verified",
    };
    let purchase = outcome.purchase();

    Ok(Json(ApiResponse::ok_with_msg(
        VerifyData {
            purchase_id: purchase.id.clone(),
            course_id: purchase.course_id.clone(),
            status: purchase.status,
            already_processed: outcome.already_processed(),
        },
        msg,
    )))
}

/// Record a failed attempt reported by the checkout widget
///
/// Only a purchase still in `created` moves to `failed`; a completed purchase
/// is never downgraded.
#[utoipa::path(
    post,
    path = "/purchase/failure",
    request_body = PaymentFailureRequest,
    responses(
        (status = 200, description = "Failure recorded", body = ApiResponse<PaymentFailureData>),
        (status = 400, description = "Malformed request", body = ApiResponse<EmptyData>),
        (status = 401, description = "Missing or invalid session", body = ApiResponse<EmptyData>),
        (status = 404, description = "No purchase for this order", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase"
)]
pub async fn record_payment_failure(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<PaymentFailureRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PaymentFailureData>>> {
    let Json(payload) = payload?;
    require("razorpay_order_id", &payload.razorpay_order_id)?;

    let mut conn = app_state.get_db_connection()?;

    let owned_by_caller = find_purchase_by_order(&mut conn, &payload.razorpay_order_id)?
        .is_some_and(|purchase| purchase.user_id == user.user_id);
    if !owned_by_caller {
        return Err(AppError::NotFound("Purchase".to_string()));
    }

    let outcome = mark_purchase_failed(&mut conn, &payload.razorpay_order_id)?;
    if let FailureOutcome::MarkedFailed(_) = outcome {
        tracing::info!(
            order_id = %payload.razorpay_order_id,
            reason = payload.reason.as_deref().unwrap_or("unspecified"),
            "Client reported payment failure"
        );
    }

    let purchase = outcome.purchase();
    Ok(Json(ApiResponse::ok(PaymentFailureData {
        purchase_id: purchase.id.clone(),
        status: purchase.status,
    })))
}
