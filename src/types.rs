use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::Purchase;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Created,
    Completed,
    Failed,
    Refunded,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Created => "created",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(PurchaseStatus::Created),
            "completed" => Some(PurchaseStatus::Completed),
            "failed" => Some(PurchaseStatus::Failed),
            "refunded" => Some(PurchaseStatus::Refunded),
            _ => None,
        }
    }
}

impl ToSql<Text, Sqlite> for PurchaseStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        <str as ToSql<Text, Sqlite>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Sqlite> for PurchaseStatus {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let status_str = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        PurchaseStatus::parse(&status_str).ok_or_else(|| "Invalid purchase status".into())
    }
}

/// Envelope shared by every JSON response of the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            msg: None,
            error: None,
            data: Some(data),
        }
    }

    pub fn ok_with_msg(data: T, msg: impl Into<String>) -> Self {
        Self {
            success: true,
            msg: Some(msg.into()),
            error: None,
            data: Some(data),
        }
    }

    pub fn error(kind: &str, message: String) -> Self {
        Self {
            success: false,
            msg: None,
            error: Some(ErrorBody {
                kind: kind.to_string(),
                message,
            }),
            data: None,
        }
    }
}

/// Machine-readable error kind plus a human message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmptyData {}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub course_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub purchase_id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub course: CourseSummary,
}

/// Field names follow the Razorpay checkout handler response.
#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
pub struct VerifyRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyData {
    pub purchase_id: String,
    pub course_id: String,
    pub status: PurchaseStatus,
    pub already_processed: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
pub struct PaymentFailureRequest {
    pub razorpay_order_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailureData {
    pub purchase_id: String,
    pub status: PurchaseStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub event: String,
    pub handled: bool,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LectureView {
    pub id: String,
    pub title: String,
    pub video_url: Option<String>,
    pub is_preview: bool,
    pub position: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub instructor: InstructorSummary,
    pub lectures: Vec<LectureView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatusData {
    pub course: CourseDetail,
    pub is_purchased: bool,
    pub purchase: Option<Purchase>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedCourse {
    pub course: CourseSummary,
    pub enrolled_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryEntry {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub course: CourseSummary,
}

// Razorpay webhook types
#[derive(Debug, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayWebhookPayload,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RazorpayWebhookPayload {
    pub payment: Option<EntityWrapper<RazorpayPaymentEntity>>,
    pub order: Option<EntityWrapper<RazorpayOrderEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayPaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayOrderEntity {
    pub id: String,
}

// Webhook event names we act on
pub mod webhook_event {
    pub const PAYMENT_CAPTURED: &str = "payment.captured";
    pub const ORDER_PAID: &str = "order.paid";
    pub const PAYMENT_FAILED: &str = "payment.failed";
}
