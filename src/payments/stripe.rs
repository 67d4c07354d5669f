use reqwest::{Client, IntoUrl, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::StripeSettings;
use crate::error::{AppError, Result, msg};

// Gateway objects are passed through as raw JSON. Only the fields the proxy
// branches on get typed structs below.

/// Stripe's error envelope: `{"error": {"message": "...", "type": "..."}}`.
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    #[serde(default)]
    pub active: Option<bool>,
    /// Not part of Stripe's published object; some accounts and mocks carry it.
    #[serde(default)]
    pub status: Option<String>,
}

/// Parameters for a one-time manual-confirmation payment.
#[derive(Debug, Clone)]
pub struct PaymentIntentParams<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub payment_method: Option<&'a str>,
    pub customer: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
    success_url: String,
    cancel_url: String,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            client: Client::new(),
            secret_key: settings.api_key.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            success_url: settings.success_url.clone(),
            cancel_url: settings.cancel_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    fn post(&self, path: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
    }

    /// `{api_base}/v1/{collection}/{id}` with the id as one encoded segment.
    fn object_url(&self, collection: &str, id: &str) -> Result<Url> {
        let id = object_id(id)?;
        let mut url = Url::parse(&self.url(collection))
            .map_err(|e| AppError::Internal(format!("Invalid Stripe API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Stripe API base cannot carry a path".into()))?
            .push(id);
        Ok(url)
    }

    fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.secret_key, None::<&str>)
    }

    /// Send a request and decode the body, mapping every failure to a
    /// gateway error tagged with `context`.
    async fn send(&self, request: RequestBuilder, context: &'static str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::gateway(context, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::gateway(context, e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::gateway(context, gateway_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::gateway(context, format!("Failed to parse Stripe response: {}", e))
        })
    }

    /// Hosted checkout for a single unit of a pre-configured price.
    pub async fn create_checkout_session(&self, price_id: &str) -> Result<Value> {
        let request = self.post(
            "checkout/sessions",
            &[
                ("payment_method_types[0]", "card"),
                ("line_items[0][price]", price_id),
                ("line_items[0][quantity]", "1"),
                ("mode", "payment"),
                ("success_url", &self.success_url),
                ("cancel_url", &self.cancel_url),
            ],
        );
        self.send(request, msg::CHECKOUT_FAILED).await
    }

    pub async fn create_subscription(&self, customer_id: &str, price_id: &str) -> Result<Value> {
        let request = self.post(
            "subscriptions",
            &[("customer", customer_id), ("items[0][price]", price_id)],
        );
        self.send(request, msg::SUBSCRIPTION_FAILED).await
    }

    pub async fn retrieve_subscription(&self, id: &str) -> Result<Value> {
        let request = self.get(self.object_url("subscriptions", id)?);
        self.send(request, msg::SUBSCRIPTION_RETRIEVE_FAILED).await
    }

    pub async fn create_payment_intent(&self, params: &PaymentIntentParams<'_>) -> Result<Value> {
        let amount = params.amount.to_string();
        let mut form = vec![
            ("amount", amount.as_str()),
            ("currency", params.currency),
            ("confirmation_method", "manual"),
        ];
        if let Some(payment_method) = params.payment_method {
            form.push(("payment_method", payment_method));
        }
        if let Some(customer) = params.customer {
            form.push(("customer", customer));
        }
        let request = self.post("payment_intents", &form);
        self.send(request, msg::PAYMENT_FAILED).await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        let request = self.get(self.object_url("payment_intents", id)?);
        let value = self.send(request, msg::PAYMENT_RETRIEVE_FAILED).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::gateway(msg::PAYMENT_RETRIEVE_FAILED, e.to_string()))
    }

    pub async fn create_payment_link(&self, price_id: &str) -> Result<Value> {
        let request = self.post(
            "payment_links",
            &[
                ("line_items[0][price]", price_id),
                ("line_items[0][quantity]", "1"),
            ],
        );
        self.send(request, msg::PAYMENT_LINK_FAILED).await
    }

    pub async fn retrieve_payment_link(&self, id: &str) -> Result<Value> {
        let request = self.get(self.object_url("payment_links", id)?);
        self.send(request, msg::PAYMENT_LINK_RETRIEVE_FAILED).await
    }
}

/// Stripe ids look like `sub_1Nv0Fz2eZvKYlo2C`. Anything else is refused
/// before it reaches the request path.
fn object_id(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id.len() <= 255
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(AppError::BadRequest(msg::INVALID_GATEWAY_ID.into()))
    }
}

/// Pull `error.message` out of a Stripe error body, falling back to the body.
fn gateway_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Coarse classification of a payment link for status summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentLinkStatus {
    Success,
    Info,
    Unknown,
}

impl PaymentLinkStatus {
    pub fn classify(status: Option<&str>) -> Self {
        match status {
            Some("paid") => PaymentLinkStatus::Success,
            Some("pending" | "created" | "canceled") => PaymentLinkStatus::Info,
            _ => PaymentLinkStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentLinkStatus::Success => "success",
            PaymentLinkStatus::Info => "info",
            PaymentLinkStatus::Unknown => "unknown",
        }
    }

    pub fn message(&self, status: Option<&str>) -> String {
        match (self, status) {
            (PaymentLinkStatus::Success, _) => "Payment completed".to_string(),
            (PaymentLinkStatus::Info, Some(s)) => format!("Payment is {}", s),
            _ => "Payment status is unknown".to_string(),
        }
    }
}

impl PaymentLink {
    /// Status used for classification: the explicit status when present,
    /// otherwise `created` for an active link.
    pub fn effective_status(&self) -> Option<&str> {
        match (&self.status, self.active) {
            (Some(status), _) => Some(status.as_str()),
            (None, Some(true)) => Some("created"),
            (None, Some(false)) => Some("canceled"),
            (None, None) => None,
        }
    }
}
