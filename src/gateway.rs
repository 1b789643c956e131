use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in the currency's minor unit (paise for INR)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Remote order creation against the payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> AppResult<GatewayOrder>;

    /// Public key handed to the checkout widget
    fn key_id(&self) -> &str;
}

pub struct RazorpayClient {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        api_base: &str,
        key_id: &str,
        key_secret: &str,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build gateway client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> AppResult<GatewayOrder> {
        let url = format!("{}/orders", self.api_base);

        let res = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(AppError::from)?;

        if res.status().is_success() {
            res.json::<GatewayOrder>()
                .await
                .map_err(|e| AppError::PaymentGateway(format!("unreadable order response: {}", e)))
        } else {
            let status = res.status();
            let error_text = res.text().await.unwrap_or_default();
            Err(AppError::PaymentGateway(format!(
                "order creation returned {}: {}",
                status, error_text
            )))
        }
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// Convert a major-unit price into minor units, rounding to the nearest unit
pub fn to_minor_units(price: f64) -> AppResult<i64> {
    if !price.is_finite() {
        return Err(AppError::Validation("course price is not a number".to_string()));
    }
    let amount = (price * 100.0).round();
    if amount <= 0.0 {
        return Err(AppError::Validation(
            "course price must be greater than zero".to_string(),
        ));
    }
    if amount > i64::MAX as f64 {
        return Err(AppError::Validation("course price is too large".to_string()));
    }
    Ok(amount as i64)
}
