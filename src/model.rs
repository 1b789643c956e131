use crate::types::PurchaseStatus;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::courses)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub instructor_id: String,
    pub created_at: NaiveDateTime,
}

impl Course {
    pub fn new(title: String, price: f64, instructor_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            subtitle: None,
            thumbnail: None,
            price,
            instructor_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::lectures)]
pub struct Lecture {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub video_url: Option<String>,
    pub is_preview: bool,
    pub position: i32,
}

impl Lecture {
    pub fn new(course_id: String, title: String, is_preview: bool, position: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            course_id,
            title,
            video_url: None,
            is_preview,
            position,
        }
    }
}

/// One payment attempt for a (user, course) pair.
#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::purchases)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: PurchaseStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Purchase {
    pub fn new(
        user_id: String,
        course_id: String,
        amount: i64,
        currency: String,
        gateway_order_id: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            course_id,
            amount,
            currency,
            gateway_order_id,
            gateway_payment_id: None,
            status: PurchaseStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_enrollments)]
pub struct UserEnrollment {
    pub user_id: String,
    pub course_id: String,
    pub enrolled_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::course_students)]
pub struct CourseStudent {
    pub course_id: String,
    pub user_id: String,
    pub added_at: NaiveDateTime,
}
