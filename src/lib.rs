pub mod auth;
pub mod config;
pub mod consts;
pub mod error;
pub mod gateway;
pub mod model;
pub mod routes;
pub mod schema;
pub mod signature;
pub mod types;

use axum::{
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use config::AppConfig;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use error::{AppError, AppResult};
use gateway::{PaymentGateway, RazorpayClient};
use signature::SignatureVerifier;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use types::{
    ApiResponse, CheckoutData, CheckoutRequest, CourseDetail, CourseStatusData, CourseSummary,
    EmptyData, ErrorBody, InstructorSummary, LectureView, PaymentFailureData,
    PaymentFailureRequest, PaymentHistoryEntry, PurchaseStatus, PurchasedCourse, VerifyData,
    VerifyRequest, WebhookAck,
};
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub signatures: Arc<SignatureVerifier>,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let signatures = SignatureVerifier::new(
            &config.razorpay_key_secret,
            &config.razorpay_webhook_secret,
        );
        Self {
            config: Arc::new(config),
            gateway,
            signatures: Arc::new(signatures),
        }
    }

    /// Get a database connection
    pub fn get_db_connection(&self) -> AppResult<SqliteConnection> {
        establish_connection(&self.config.database_url)
    }
}

fn establish_connection(database_url: &str) -> AppResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    diesel::sql_query("PRAGMA busy_timeout = 5000").execute(&mut conn)?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
    Ok(conn)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::checkout::create_checkout,
        routes::verify::verify_payment,
        routes::verify::record_payment_failure,
        routes::webhook::handle_razorpay_webhook,
        routes::query::get_course_purchase_status,
        routes::query::get_purchased_courses,
        routes::query::get_payment_history,
        health_check
    ),
    components(
        schemas(
            ApiResponse<EmptyData>, EmptyData, ErrorBody, CheckoutRequest, CheckoutData,
            VerifyRequest, VerifyData, PaymentFailureRequest, PaymentFailureData, WebhookAck,
            CourseSummary, CourseDetail, InstructorSummary, LectureView, CourseStatusData,
            PurchasedCourse, PaymentHistoryEntry, PurchaseStatus, model::Purchase
        )
    ),
    tags(
        (name = "Purchase", description = "Course checkout and payment verification"),
        (name = "Purchase Queries", description = "Purchase status, purchased courses and history"),
        (name = "Health", description = "Health check endpoints")
    ),
    info(
        title = "Course Billing API",
        version = "1.0.0",
        description = "API for course purchases, payment verification and enrollment"
    )
)]
struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    ),
    tag = "Health"
)]
async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(serde_json::json!({"status": "ok"})))
}

async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> impl IntoResponse {
    Html(include_str!("../static/swagger.html"))
}

/// Build the full router for the given state
pub fn app(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/purchase", get(routes::query::get_purchased_courses))
        .route("/purchase/checkout", post(routes::checkout::create_checkout))
        .route("/purchase/verify", post(routes::verify::verify_payment))
        .route(
            "/purchase/failure",
            post(routes::verify::record_payment_failure),
        )
        .route(
            "/purchase/course/{course_id}/detail-with-status",
            get(routes::query::get_course_purchase_status),
        )
        .route("/purchase/history", get(routes::query::get_payment_history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::jwt_auth_middleware,
        ));

    Router::new()
        .merge(authenticated)
        .route(
            "/purchase/webhook",
            post(routes::webhook::handle_razorpay_webhook),
        )
        .route("/health", get(health_check))
        .route("/api-doc/openapi.json", get(openapi_spec))
        .route("/explore", get(swagger_ui))
        .with_state(state)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub fn run() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        // Run database migrations on startup
        if let Err(e) = run_migrations(&config.database_url) {
            tracing::error!(error = %e, "Failed to run migrations");
            std::process::exit(1);
        }

        let gateway = match RazorpayClient::new(
            &config.razorpay_api_base,
            &config.razorpay_key_id,
            &config.razorpay_key_secret,
            config.gateway_timeout,
        ) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize payment gateway client");
                std::process::exit(1);
            }
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let app = app(AppState::new(config, Arc::new(gateway)));

        if let Err(e) = serve(addr, app).await {
            tracing::error!(error = %e, "Server error");
            std::process::exit(1);
        }
    });
}

async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app.into_make_service()).await
}

pub fn run_migrations(database_url: &str) -> AppResult<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut connection = establish_connection(database_url)?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::DatabaseOperation(format!("Migration error: {}", e)))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
