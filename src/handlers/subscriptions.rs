//! Stripe pass-through endpoints.
//!
//! Nothing here touches the database. Each handler validates its input,
//! makes exactly one gateway call and reshapes the answer.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path};
use crate::payments::{PaymentIntentParams, PaymentLink, PaymentLinkStatus};

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionRequest {
    #[serde(default)]
    pub price_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
}

impl CreateSubscriptionRequest {
    /// Returns `(customer_id, price_id)` or every missing field at once.
    fn validate(&self) -> Result<(&str, &str)> {
        match (present(&self.customer_id), present(&self.price_id)) {
            (Some(customer), Some(price)) => Ok((customer, price)),
            (customer, price) => {
                let mut errors = Vec::new();
                if customer.is_none() {
                    errors.push(msg::CUSTOMER_ID_REQUIRED.to_string());
                }
                if price.is_none() {
                    errors.push(msg::PRICE_ID_REQUIRED.to_string());
                }
                Err(AppError::Validation(errors))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

impl CreatePaymentRequest {
    fn validate(&self) -> Result<PaymentIntentParams<'_>> {
        let mut errors = Vec::new();
        let amount = self.amount.filter(|a| *a > 0);
        if amount.is_none() {
            errors.push(msg::AMOUNT_INVALID.to_string());
        }
        let currency = present(&self.currency);
        if currency.is_none() {
            errors.push(msg::CURRENCY_REQUIRED.to_string());
        }
        match (amount, currency) {
            (Some(amount), Some(currency)) => Ok(PaymentIntentParams {
                amount,
                currency,
                payment_method: present(&self.payment_method),
                customer: present(&self.customer),
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(input): Json<CheckoutSessionRequest>,
) -> Result<Json<Value>> {
    let price_id = present(&input.price_id)
        .ok_or_else(|| AppError::Validation(vec![msg::PRICE_ID_REQUIRED.to_string()]))?;
    let session = state.stripe.create_checkout_session(price_id).await?;
    Ok(Json(session))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(input): Json<CreateSubscriptionRequest>,
) -> Result<Json<Value>> {
    let (customer_id, price_id) = input.validate()?;
    let subscription = state
        .stripe
        .create_subscription(customer_id, price_id)
        .await?;

    tracing::info!(customer = customer_id, "Subscription created");

    Ok(Json(json!({
        "status": "success",
        "message": "Subscription created successfully",
        "data": subscription,
    })))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentRequest>,
) -> Result<Json<Value>> {
    let params = input.validate()?;
    let intent = state.stripe.create_payment_intent(&params).await?;

    Ok(Json(json!({
        "status": "success",
        "client_secret": [{ "intent": intent }],
    })))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let intent = state.stripe.retrieve_payment_intent(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "payment_status": intent.status,
    })))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(state.stripe.retrieve_subscription(&id).await?))
}

pub async fn create_payment_link(
    State(state): State<AppState>,
    Path((product_id, price_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let link = state.stripe.create_payment_link(&price_id).await?;
    tracing::debug!(product = %product_id, price = %price_id, "Payment link created");
    Ok(Json(json!({ "status": "success", "data": link })))
}

pub async fn get_payment_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(state.stripe.retrieve_payment_link(&id).await?))
}

pub async fn payment_link_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let raw = state.stripe.retrieve_payment_link(&id).await?;
    let link: PaymentLink = serde_json::from_value(raw)
        .map_err(|e| AppError::gateway(msg::PAYMENT_LINK_RETRIEVE_FAILED, e.to_string()))?;

    let status = link.effective_status();
    let class = PaymentLinkStatus::classify(status);
    Ok(Json(json!({
        "status": class.as_str(),
        "message": class.message(status),
    })))
}
