use std::collections::HashMap;

use anyhow::Result;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use super::webhook_signature;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    premium_price_id: String,
    success_url: String,
    cancel_url: String,
    signature_tolerance_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub subscription: Option<String>,
    pub customer: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: Option<String>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Returns the subscription period end timestamp, falling back to the first item
    /// (newer API versions only report periods per item).
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        premium_price_id: String,
        success_url: String,
        cancel_url: String,
        signature_tolerance_secs: i64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
            premium_price_id,
            success_url,
            cancel_url,
            signature_tolerance_secs,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (details.type_, details.code, details.param, details.message)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a subscription-mode Checkout Session for the premium price.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer_email: &str,
    ) -> Result<CheckoutSession> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let body: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", self.premium_price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("customer_email", customer_email.to_string()),
            ("metadata[user_id]", user_id.to_string()),
            ("subscription_data[metadata][user_id]", user_id.to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
        ];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: CheckoutSession = resp.json().await?;
        Ok(session)
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}/subscriptions/{subscription_id}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<()> {
        webhook_signature::verify(
            payload,
            signature_header,
            &self.webhook_secret,
            now,
            self.signature_tolerance_secs,
        )
    }
}

impl StripeEvent {
    pub fn checkout_session(&self) -> Option<StripeCheckoutSession> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn subscription(&self) -> Option<StripeSubscription> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn invoice(&self) -> Option<StripeInvoice> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscription_period_end_falls_back_to_first_item() {
        let subscription: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "items": { "data": [ { "current_period_end": 1_800_000_000 } ] }
        }))
        .unwrap();

        assert_eq!(subscription.period_end(), Some(1_800_000_000));
    }

    #[test]
    fn event_objects_are_extracted_by_shape() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1_767_225_600,
            "data": { "object": {
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_1",
                "customer": "cus_1",
                "metadata": { "user_id": "123e4567-e89b-12d3-a456-426614174000" }
            } }
        }))
        .unwrap();

        assert_eq!(event.created, Some(1_767_225_600));
        let session = event.checkout_session().unwrap();
        assert_eq!(session.subscription.as_deref(), Some("sub_1"));
        assert_eq!(session.customer.as_deref(), Some("cus_1"));
        assert!(event.subscription().is_none());
    }
}
