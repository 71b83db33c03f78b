use serde::Deserialize;
use thiserror::Error;

use crate::booking::ContactInfo;
use crate::catalog;
use crate::config::StripeConfig;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub service_slug: String,
    pub package_option: String,
    pub date: String,
    pub time_slot: String,
    pub contact_info: ContactInfo,
    /// Whole currency units; converted to cents at the Stripe boundary.
    pub amount: f64,
}

impl CheckoutRequest {
    pub fn missing_fields(&self) -> bool {
        self.service_slug.trim().is_empty()
            || self.package_option.trim().is_empty()
            || self.date.trim().is_empty()
            || self.time_slot.trim().is_empty()
            || self.contact_info.email.trim().is_empty()
            || self.amount <= 0.0
    }
}

pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Stripe settings are incomplete")]
    NotConfigured,
    #[error("unknown service: {0}")]
    UnknownService(String),
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Stripe rejected the session: {0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

/// Exchanges a priced line item for an opaque Stripe Checkout session id.
pub async fn create_checkout_session(
    http: &reqwest::Client,
    config: &StripeConfig,
    origin: &str,
    request: &CheckoutRequest,
) -> Result<String, CheckoutError> {
    if !config.enabled() {
        return Err(CheckoutError::NotConfigured);
    }
    let service = catalog::find(&request.service_slug)
        .ok_or_else(|| CheckoutError::UnknownService(request.service_slug.clone()))?;

    let unit_amount = to_minor_units(request.amount).to_string();
    let product_name = format!("{} - {} Package", service.title, request.package_option);
    let product_description = format!(
        "Appointment on {} at {}",
        request.date, request.time_slot
    );
    let success_url = format!("{origin}/book/success?session_id={{CHECKOUT_SESSION_ID}}");
    let cancel_url = format!("{origin}/book/contact");

    let params: Vec<(&str, &str)> = vec![
        ("mode", "payment"),
        ("payment_method_types[0]", "card"),
        ("line_items[0][quantity]", "1"),
        ("line_items[0][price_data][currency]", "usd"),
        ("line_items[0][price_data][unit_amount]", &unit_amount),
        ("line_items[0][price_data][product_data][name]", &product_name),
        (
            "line_items[0][price_data][product_data][description]",
            &product_description,
        ),
        ("success_url", &success_url),
        ("cancel_url", &cancel_url),
        ("customer_email", &request.contact_info.email),
        ("metadata[serviceSlug]", &request.service_slug),
        ("metadata[packageOption]", &request.package_option),
        ("metadata[date]", &request.date),
        ("metadata[timeSlot]", &request.time_slot),
        ("metadata[customerName]", &request.contact_info.name),
        ("metadata[customerPhone]", &request.contact_info.phone),
        ("metadata[customerAddress]", &request.contact_info.address),
    ];

    let response = http
        .post(CHECKOUT_SESSIONS_URL)
        .basic_auth(&config.secret_key, Option::<&str>::None)
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CheckoutError::Rejected(body));
    }

    let session: SessionResponse = response.json().await?;
    Ok(session.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            service_slug: "tv-mounting".to_string(),
            package_option: "Standard".to_string(),
            date: "2026-09-01".to_string(),
            time_slot: "17:00-18:00".to_string(),
            contact_info: ContactInfo {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: "5551234567".to_string(),
                address: "123 Main St".to_string(),
                notes: None,
            },
            amount: 219.0,
        }
    }

    #[test]
    fn converts_to_minor_units_with_rounding() {
        assert_eq!(to_minor_units(219.0), 21900);
        assert_eq!(to_minor_units(69.995), 7000);
        assert_eq!(to_minor_units(0.004), 0);
    }

    #[test]
    fn detects_missing_fields() {
        assert!(!request().missing_fields());

        let mut incomplete = request();
        incomplete.package_option.clear();
        assert!(incomplete.missing_fields());

        let mut free = request();
        free.amount = 0.0;
        assert!(free.missing_fields());
    }

    #[actix_web::test]
    async fn unconfigured_key_is_rejected_before_any_io() {
        let http = reqwest::Client::new();
        let result = create_checkout_session(
            &http,
            &StripeConfig::default(),
            "https://requestapro.com",
            &request(),
        )
        .await;
        assert!(matches!(result, Err(CheckoutError::NotConfigured)));
    }
}
