use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::{Course, Lecture, Purchase, User};
use crate::routes::purchase_helpers::find_completed_purchase;
use crate::schema::{courses, lectures, purchases, user_enrollments, users};
use crate::types::{
    ApiResponse, CourseDetail, CourseStatusData, CourseSummary, EmptyData, InstructorSummary,
    LectureView, PaymentHistoryEntry, PurchasedCourse,
};
use crate::AppState;

/// Course detail plus whether the caller has bought it
///
/// Non-buyers other than the instructor only see preview lectures.
#[utoipa::path(
    get,
    path = "/purchase/course/{course_id}/detail-with-status",
    params(
        ("course_id" = String, Path, description = "Course identifier")
    ),
    responses(
        (status = 200, description = "Course detail with purchase status", body = ApiResponse<CourseStatusData>),
        (status = 401, description = "Missing or invalid session", body = ApiResponse<EmptyData>),
        (status = 404, description = "Course not found", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase Queries"
)]
pub async fn get_course_purchase_status(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<String>,
) -> AppResult<Json<ApiResponse<CourseStatusData>>> {
    let mut conn = app_state.get_db_connection()?;

    let (course, instructor): (Course, User) = courses::table
        .inner_join(users::table)
        .filter(courses::id.eq(&course_id))
        .select((Course::as_select(), User::as_select()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound("Course".to_string()))?;

    let purchase = find_completed_purchase(&mut conn, &user.user_id, &course.id)?;
    let is_purchased = purchase.is_some();
    let full_access = is_purchased || course.instructor_id == user.user_id;

    let lecture_rows: Vec<Lecture> = lectures::table
        .filter(lectures::course_id.eq(&course.id))
        .order(lectures::position.asc())
        .select(Lecture::as_select())
        .load(&mut conn)?;

    let visible_lectures = lecture_rows
        .into_iter()
        .filter(|lecture| full_access || lecture.is_preview)
        .map(|lecture| LectureView {
            id: lecture.id,
            title: lecture.title,
            video_url: lecture.video_url,
            is_preview: lecture.is_preview,
            position: lecture.position,
        })
        .collect();

    Ok(Json(ApiResponse::ok(CourseStatusData {
        course: CourseDetail {
            id: course.id,
            title: course.title,
            subtitle: course.subtitle,
            thumbnail: course.thumbnail,
            price: course.price,
            instructor: InstructorSummary {
                id: instructor.id,
                name: instructor.name,
            },
            lectures: visible_lectures,
        },
        is_purchased,
        purchase,
    })))
}

/// Courses the caller is enrolled in, newest enrollment first
///
/// Read from the enrollment relation rather than from purchase rows.
#[utoipa::path(
    get,
    path = "/purchase",
    responses(
        (status = 200, description = "Purchased courses", body = ApiResponse<Vec<PurchasedCourse>>),
        (status = 401, description = "Missing or invalid session", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase Queries"
)]
pub async fn get_purchased_courses(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<ApiResponse<Vec<PurchasedCourse>>>> {
    let mut conn = app_state.get_db_connection()?;

    let rows: Vec<(NaiveDateTime, Course, String)> = user_enrollments::table
        .inner_join(courses::table.inner_join(users::table))
        .filter(user_enrollments::user_id.eq(&user.user_id))
        .order(user_enrollments::enrolled_at.desc())
        .select((
            user_enrollments::enrolled_at,
            Course::as_select(),
            users::name,
        ))
        .load(&mut conn)?;

    let purchased = rows
        .into_iter()
        .map(|(enrolled_at, course, instructor_name)| PurchasedCourse {
            course: CourseSummary {
                id: course.id,
                title: course.title,
                thumbnail: course.thumbnail,
                instructor_name: Some(instructor_name),
            },
            enrolled_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(purchased)))
}

/// Every purchase attempt of the caller, newest first
#[utoipa::path(
    get,
    path = "/purchase/history",
    responses(
        (status = 200, description = "Payment history", body = ApiResponse<Vec<PaymentHistoryEntry>>),
        (status = 401, description = "Missing or invalid session", body = ApiResponse<EmptyData>)
    ),
    tag = "Purchase Queries"
)]
pub async fn get_payment_history(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<ApiResponse<Vec<PaymentHistoryEntry>>>> {
    let mut conn = app_state.get_db_connection()?;

    let rows: Vec<(Purchase, String, Option<String>, String)> = purchases::table
        .inner_join(courses::table.inner_join(users::table))
        .filter(purchases::user_id.eq(&user.user_id))
        .order((purchases::created_at.desc(), purchases::id.desc()))
        .select((
            Purchase::as_select(),
            courses::title,
            courses::thumbnail,
            users::name,
        ))
        .load(&mut conn)?;

    let history = rows
        .into_iter()
        .map(|(purchase, title, thumbnail, instructor_name)| PaymentHistoryEntry {
            course: CourseSummary {
                id: purchase.course_id,
                title,
                thumbnail,
                instructor_name: Some(instructor_name),
            },
            id: purchase.id,
            amount: purchase.amount,
            currency: purchase.currency,
            status: purchase.status,
            gateway_order_id: purchase.gateway_order_id,
            gateway_payment_id: purchase.gateway_payment_id,
            created_at: purchase.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(history)))
}
