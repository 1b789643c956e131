// This is imported by different tests that use different functions.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use course_billing::auth::issue_token;
use course_billing::config::{AppConfig, DEFAULT_RAZORPAY_API_BASE};
use course_billing::error::{AppError, AppResult};
use course_billing::gateway::{CreateOrderRequest, GatewayOrder, PaymentGateway};
use course_billing::model::{Course, Lecture, Purchase, User};
use course_billing::schema::{course_students, courses, lectures, purchases, user_enrollments, users};
use course_billing::types::PurchaseStatus;
use course_billing::AppState;
use diesel::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower::ServiceExt; // for `oneshot`

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

// Helper struct to ensure test database cleanup
pub struct TestDbGuard {
    db_path: String,
}

impl TestDbGuard {
    pub fn new() -> Self {
        let db_path = std::env::temp_dir()
            .join(format!("test_{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();

        course_billing::run_migrations(&db_path).expect("failed to migrate test database");

        Self { db_path }
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn conn(&self) -> SqliteConnection {
        SqliteConnection::establish(&self.db_path).expect("failed to open test database")
    }
}

impl Drop for TestDbGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-journal", self.db_path));
    }
}

/// In-memory stand-in for the payment provider
pub struct FakeGateway {
    queued_ids: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CreateOrderRequest>>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            queued_ids: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn with_order_ids(ids: &[&str]) -> Self {
        let gateway = Self::new();
        gateway
            .queued_ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        gateway
    }

    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &CreateOrderRequest) -> AppResult<GatewayOrder> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::PaymentGateway(
                "gateway unreachable: connection refused".to_string(),
            ));
        }

        self.requests.lock().unwrap().push(request.clone());
        let id = self
            .queued_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("order_{}", uuid::Uuid::new_v4().simple()));

        Ok(GatewayOrder {
            id,
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }

    fn key_id(&self) -> &str {
        KEY_ID
    }
}

pub struct TestApp {
    pub db: TestDbGuard,
    pub gateway: Arc<FakeGateway>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(FakeGateway::new())
    }

    pub fn with_gateway(gateway: FakeGateway) -> Self {
        let db = TestDbGuard::new();
        let gateway = Arc::new(gateway);

        let config = AppConfig {
            database_url: db.db_path().to_string(),
            port: 0,
            jwt_secret: JWT_SECRET.to_string(),
            razorpay_key_id: KEY_ID.to_string(),
            razorpay_key_secret: KEY_SECRET.to_string(),
            razorpay_webhook_secret: WEBHOOK_SECRET.to_string(),
            razorpay_api_base: DEFAULT_RAZORPAY_API_BASE.to_string(),
            gateway_timeout: Duration::from_secs(1),
            sentry_dsn: None,
        };

        let router = course_billing::app(AppState::new(config, gateway.clone()));

        Self {
            db,
            gateway,
            router,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body_bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn checkout(&self, user_id: &str, course_id: &str) -> (StatusCode, serde_json::Value) {
        self.send(post_json(
            "/purchase/checkout",
            user_id,
            serde_json::json!({ "courseId": course_id }),
        ))
        .await
    }

    pub async fn verify(
        &self,
        user_id: &str,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.send(post_json(
            "/purchase/verify",
            user_id,
            serde_json::json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": payment_id,
                "razorpay_signature": signature,
            }),
        ))
        .await
    }

    pub async fn webhook(&self, body: &str, signature: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/purchase/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("X-Razorpay-Signature", signature);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Checkout then verify with a correct signature
    pub async fn purchase(&self, user_id: &str, course_id: &str, payment_id: &str) -> String {
        let (status, body) = self.checkout(user_id, course_id).await;
        assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
        let order_id = body["data"]["orderId"].as_str().unwrap().to_string();

        let signature = sign_payment(&order_id, payment_id);
        let (status, body) = self.verify(user_id, &order_id, payment_id, &signature).await;
        assert_eq!(status, StatusCode::OK, "verify failed: {body}");
        order_id
    }
}

pub fn session_cookie(user_id: &str) -> String {
    let token = issue_token(JWT_SECRET, user_id, chrono::Duration::hours(1)).unwrap();
    format!("theme=light; token={}", token)
}

pub fn get(uri: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("cookie", session_cookie(user_id))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, user_id: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", session_cookie(user_id))
        .body(Body::from(json.to_string()))
        .unwrap()
}

type HmacSha256 = Hmac<Sha256>;

fn hmac_hex(secret: &str, message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

pub fn sign_payment(order_id: &str, payment_id: &str) -> String {
    hmac_hex(KEY_SECRET, format!("{}|{}", order_id, payment_id).as_bytes())
}

pub fn sign_webhook(body: &str) -> String {
    hmac_hex(WEBHOOK_SECRET, body.as_bytes())
}

pub fn payment_event(event: &str, order_id: &str, payment_id: &str, payment_status: &str) -> String {
    let error_description = if payment_status == "failed" {
        serde_json::json!("Card declined")
    } else {
        serde_json::Value::Null
    };

    serde_json::json!({
        "entity": "event",
        "account_id": "acc_test",
        "event": event,
        "contains": ["payment"],
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": 49900,
                    "currency": "INR",
                    "status": payment_status,
                    "order_id": order_id,
                    "error_description": error_description
                }
            }
        },
        "created_at": 1_700_000_000
    })
    .to_string()
}

pub fn seed_user(conn: &mut SqliteConnection, name: &str) -> User {
    let user = User::new(
        name.to_string(),
        format!("{}_{}@example.com", name, uuid::Uuid::new_v4().simple()),
    );
    diesel::insert_into(users::table)
        .values(&user)
        .execute(conn)
        .unwrap();
    user
}

pub fn seed_course(conn: &mut SqliteConnection, instructor: &User, title: &str, price: f64) -> Course {
    let course = Course::new(title.to_string(), price, instructor.id.clone());
    diesel::insert_into(courses::table)
        .values(&course)
        .execute(conn)
        .unwrap();
    course
}

pub fn seed_lecture(conn: &mut SqliteConnection, course: &Course, title: &str, is_preview: bool, position: i32) -> Lecture {
    let lecture = Lecture::new(course.id.clone(), title.to_string(), is_preview, position);
    diesel::insert_into(lectures::table)
        .values(&lecture)
        .execute(conn)
        .unwrap();
    lecture
}

pub fn purchase_by_order(conn: &mut SqliteConnection, order_id: &str) -> Purchase {
    purchases::table
        .filter(purchases::gateway_order_id.eq(order_id))
        .select(Purchase::as_select())
        .first(conn)
        .unwrap()
}

pub fn count_purchases(conn: &mut SqliteConnection, user_id: &str, course_id: &str, status: Option<PurchaseStatus>) -> i64 {
    let rows: Vec<Purchase> = purchases::table
        .filter(purchases::user_id.eq(user_id))
        .filter(purchases::course_id.eq(course_id))
        .select(Purchase::as_select())
        .load(conn)
        .unwrap();
    rows.iter()
        .filter(|p| status.map_or(true, |s| p.status == s))
        .count() as i64
}

/// Rows on each side of the enrollment relation for (user, course)
pub fn enrollment_rows(conn: &mut SqliteConnection, user_id: &str, course_id: &str) -> (i64, i64) {
    let user_side = user_enrollments::table
        .filter(user_enrollments::user_id.eq(user_id))
        .filter(user_enrollments::course_id.eq(course_id))
        .count()
        .get_result(conn)
        .unwrap();
    let course_side = course_students::table
        .filter(course_students::course_id.eq(course_id))
        .filter(course_students::user_id.eq(user_id))
        .count()
        .get_result(conn)
        .unwrap();
    (user_side, course_side)
}

/// user enrolled ⟺ course lists user ⟺ one completed purchase
#[track_caller]
pub fn assert_enrollment_symmetry(conn: &mut SqliteConnection, user_id: &str, course_id: &str) {
    let (user_side, course_side) = enrollment_rows(conn, user_id, course_id);
    let completed = count_purchases(conn, user_id, course_id, Some(PurchaseStatus::Completed));
    assert!(user_side <= 1 && course_side <= 1 && completed <= 1);
    assert_eq!(user_side, course_side, "relation sides disagree");
    assert_eq!(user_side, completed, "relation disagrees with purchases");
}
