//! Payment collaborator: checkout-session creation and webhook signature
//! verification for the Stripe-style provider.
//!
//! The plan/interval pair maps to a provider price id through a fixed
//! lookup table; session creation is a single form-encoded call to the
//! provider API with no retry.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Pro,
    Enterprise,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Monthly,
    Yearly,
}

/// Fixed plan+interval -> provider price id table.
pub fn price_id(plan: Plan, interval: Interval) -> &'static str {
    match (plan, interval) {
        (Plan::Basic, Interval::Monthly) => "price_1QqT4SBMxClYjLwG6dz7uVDs",
        (Plan::Basic, Interval::Yearly) => "price_1QqT57BMxClYjLwGZUkqmoIg",
        (Plan::Pro, Interval::Monthly) => "price_pro_monthly",
        (Plan::Pro, Interval::Yearly) => "price_pro_yearly",
        (Plan::Enterprise, Interval::Monthly) => "price_enterprise_monthly",
        (Plan::Enterprise, Interval::Yearly) => "price_enterprise_yearly",
    }
}

pub struct CheckoutClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    public_url: String,
}

#[derive(Deserialize)]
struct CheckoutSession {
    id: String,
}

impl CheckoutClient {
    pub fn new(secret_key: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: "https://api.stripe.com".to_string(),
            secret_key: secret_key.into(),
            public_url: public_url.into(),
        }
    }

    /// Create a subscription checkout session and return its id.
    pub async fn create_session(&self, plan: Plan, interval: Interval) -> Result<String, AppError> {
        let price = price_id(plan, interval);
        let params = [
            ("mode", "subscription"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", price),
            ("line_items[0][quantity]", "1"),
            (
                "success_url",
                &format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.public_url),
            ),
            ("cancel_url", &format!("{}/pricing", self.public_url)),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("checkout request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "checkout provider returned {}",
                response.status()
            )));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("bad checkout response: {e}")))?;
        Ok(session.id)
    }
}

/// Compute the payment-webhook signature: HMAC-SHA256 hex over
/// `{timestamp}.{payload}`.
pub fn payment_signature(secret: &str, timestamp: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `Stripe-Signature` header (`t=<ts>,v1=<hex>[,...]`) against the
/// raw request body. Any matching `v1` entry accepts.
pub fn verify_payment_signature(secret: &str, header: &str, payload: &str) -> bool {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let Some(timestamp) = timestamp else {
        return false;
    };
    let expected = payment_signature(secret, timestamp, payload);
    signatures.iter().any(|sig| *sig == expected)
}

/// Payment events the webhook acts on; anything else is ignored.
#[derive(Debug, PartialEq)]
pub enum PaymentEvent {
    CheckoutCompleted,
    SubscriptionChanged,
    Ignored,
}

/// Classify a verified webhook body by its `type` field.
pub fn classify_event(body: &str) -> Result<PaymentEvent, AppError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|_| AppError::Validation("Webhook error".to_string()))?;
    Ok(match value["type"].as_str() {
        Some("checkout.session.completed") => PaymentEvent::CheckoutCompleted,
        Some("customer.subscription.updated") | Some("customer.subscription.deleted") => {
            PaymentEvent::SubscriptionChanged
        }
        _ => PaymentEvent::Ignored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_plan_interval_pair_has_a_price() {
        let plans = [Plan::Basic, Plan::Pro, Plan::Enterprise];
        let intervals = [Interval::Monthly, Interval::Yearly];
        for plan in plans {
            for interval in intervals {
                assert!(price_id(plan, interval).starts_with("price_"));
            }
        }
        assert_ne!(
            price_id(Plan::Basic, Interval::Monthly),
            price_id(Plan::Basic, Interval::Yearly)
        );
    }

    #[test]
    fn plan_and_interval_parse_from_lowercase_json() {
        let plan: Plan = serde_json::from_str("\"enterprise\"").unwrap();
        assert_eq!(plan, Plan::Enterprise);
        let interval: Interval = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(interval, Interval::Yearly);
    }

    #[test]
    fn signature_verification_accepts_genuine_and_rejects_tampered() {
        let secret = "whsec_payment_test";
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let sig = payment_signature(secret, "1700000000", payload);
        let header = format!("t=1700000000,v1={sig}");

        assert!(verify_payment_signature(secret, &header, payload));
        assert!(!verify_payment_signature(secret, &header, "{}"));
        assert!(!verify_payment_signature("other", &header, payload));
        assert!(!verify_payment_signature(secret, "v1=deadbeef", payload));
    }

    #[test]
    fn events_classify_by_type() {
        assert_eq!(
            classify_event(r#"{"type":"checkout.session.completed"}"#).unwrap(),
            PaymentEvent::CheckoutCompleted
        );
        assert_eq!(
            classify_event(r#"{"type":"customer.subscription.deleted"}"#).unwrap(),
            PaymentEvent::SubscriptionChanged
        );
        assert_eq!(
            classify_event(r#"{"type":"invoice.paid"}"#).unwrap(),
            PaymentEvent::Ignored
        );
        assert!(classify_event("not json").is_err());
    }
}
