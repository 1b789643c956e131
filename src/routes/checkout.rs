use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use diesel::prelude::*;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::consts::{CURRENCY, RECEIPT_MAX_LEN};
use crate::error::{AppError, AppResult};
use crate::gateway::{to_minor_units, CreateOrderRequest};
use crate::model::{Course, Purchase};
use crate::routes::enrollment_helpers::is_enrolled;
use crate::routes::purchase_helpers::find_completed_purchase;
use crate::schema::{courses, purchases};
use crate::types::{ApiResponse, CheckoutData, CheckoutRequest, CourseSummary, EmptyData};
use crate::AppState;

/// Load the course and make sure this user may buy it
fn load_purchasable_course(
    conn: &mut SqliteConnection,
    user_id: &str,
    course_id: &str,
) -> AppResult<Course> {
    let course: Course = courses::table
        .find(course_id)
        .select(Course::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound("Course".to_string()))?;

    if course.instructor_id == user_id {
        return Err(AppError::Validation(
            "Instructors cannot purchase their own course".to_string(),
        ));
    }

    if find_completed_purchase(conn, user_id, course_id)?.is_some()
        || is_enrolled(conn, user_id, course_id)?
    {
        return Err(AppError::AlreadyEnrolled);
    }

    Ok(course)
}

fn receipt_for(course_id: &str) -> String {
    let mut receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    if receipt.len() > RECEIPT_MAX_LEN {
        receipt.truncate(RECEIPT_MAX_LEN);
    }
    tracing::debug!(course_id, receipt = %receipt, "Generated order receipt");
    receipt
}

/// Create a gateway order for a course
///
/// The charge amount is the course price at the time of this call. A local
/// purchase row is only written once the gateway has accepted the order.
#[utoipa::path(
    post,
    path = "/purchase/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<CheckoutData>),
        (status = 400, description = "Malformed request or own course", body = ApiResponse<EmptyData>),
        (status = 401, description = "Missing or invalid session", body = ApiResponse<EmptyData>),
        (status = 404, description = "Course not found", body = ApiResponse<EmptyData>),
        (status = 409, description = "Already enrolled", body = ApiResponse<EmptyData>),
        (status = 502, description = "Payment gateway unavailable, safe to retry", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase"
)]
pub async fn create_checkout(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<CheckoutData>>> {
    let Json(payload) = payload?;
    let course_id = payload.course_id.trim();
    if course_id.is_empty() {
        return Err(AppError::Validation("courseId is required".to_string()));
    }

    // Connection is dropped before the gateway call
    let course = {
        let mut conn = app_state.get_db_connection()?;
        load_purchasable_course(&mut conn, &user.user_id, course_id)?
    };

    let amount = to_minor_units(course.price)?;
    let request = CreateOrderRequest {
        amount,
        currency: CURRENCY.to_string(),
        receipt: receipt_for(&course.id),
        notes: HashMap::from([
            ("user_id".to_string(), user.user_id.clone()),
            ("course_id".to_string(), course.id.clone()),
        ]),
    };

    let order = app_state.gateway.create_order(&request).await?;
    if order.amount != amount || order.currency != CURRENCY {
        return Err(AppError::PaymentGateway(format!(
            "order {} does not match the requested charge",
            order.id
        )));
    }

    let purchase = Purchase::new(
        user.user_id.clone(),
        course.id.clone(),
        amount,
        CURRENCY.to_string(),
        order.id.clone(),
    );

    let mut conn = app_state.get_db_connection()?;
    diesel::insert_into(purchases::table)
        .values(&purchase)
        .execute(&mut conn)?;

    tracing::info!(
        user_id = %user.user_id,
        course_id = %course.id,
        order_id = %order.id,
        amount,
        "Created checkout order"
    );

    Ok(Json(ApiResponse::ok(CheckoutData {
        purchase_id: purchase.id,
        order_id: order.id,
        amount,
        currency: purchase.currency,
        key_id: app_state.gateway.key_id().to_string(),
        course: CourseSummary {
            id: course.id,
            title: course.title,
            thumbnail: course.thumbnail,
            instructor_name: None,
        },
    })))
}
