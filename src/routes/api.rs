use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::catalog;
use crate::notify::{send_booking_notification, BookingRecord};
use crate::payments::{create_checkout_session, CheckoutError, CheckoutRequest};
use crate::state::AppState;

const AVAILABILITY_CACHE: &str = "public, s-maxage=300, stale-while-revalidate=600";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/availability").route(web::get().to(availability)))
        .service(web::resource("/api/submit-booking").route(web::post().to(submit_booking)))
        .service(
            web::resource("/api/create-checkout-session").route(web::post().to(create_checkout)),
        );
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    service: Option<String>,
}

async fn availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> HttpResponse {
    let slug = query.service.as_deref().unwrap_or_default();
    let Some(service) = catalog::find(slug) else {
        return HttpResponse::NotFound().json(json!({ "error": "Service not found" }));
    };

    let days = state.availability.availability(service.slug);
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, AVAILABILITY_CACHE))
        .json(days)
}

async fn submit_booking(
    state: web::Data<AppState>,
    record: web::Json<BookingRecord>,
) -> HttpResponse {
    if !state.smtp.enabled() {
        return HttpResponse::InternalServerError().json(json!({
            "error": "Email configuration is incomplete. Please contact support."
        }));
    }

    let errors = record.contact_info.validate();
    if !errors.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": errors.join(" ") }));
    }

    match send_booking_notification(&state.smtp, &record).await {
        Ok(()) => {
            log::info!(
                "Booking notification sent for {} on {}",
                record.service.slug,
                record.date
            );
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(err) => {
            log::error!("Failed to send booking notification: {err}");
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to send booking notification" }))
        }
    }
}

async fn create_checkout(
    req: HttpRequest,
    state: web::Data<AppState>,
    request: web::Json<CheckoutRequest>,
) -> HttpResponse {
    if request.missing_fields() {
        return HttpResponse::BadRequest().json(json!({ "error": "Missing required fields" }));
    }

    let info = req.connection_info();
    let origin = format!("{}://{}", info.scheme(), info.host());

    match create_checkout_session(&state.http, &state.stripe, &origin, &request).await {
        Ok(session_id) => HttpResponse::Ok().json(json!({ "sessionId": session_id })),
        Err(CheckoutError::NotConfigured) => HttpResponse::InternalServerError()
            .json(json!({ "error": "Payment configuration is incomplete" })),
        Err(CheckoutError::UnknownService(_)) => {
            HttpResponse::BadRequest().json(json!({ "error": "Invalid service" }))
        }
        Err(err) => {
            log::error!("Failed to create checkout session: {err}");
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to create checkout session" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;
    use crate::config::{SmtpConfig, StripeConfig};

    macro_rules! api_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new(
                        SmtpConfig::default(),
                        StripeConfig::default(),
                    )))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn availability_returns_a_week_of_evening_slots() {
        let app = api_app!();
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/availability?service=tv-mounting")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some(AVAILABILITY_CACHE)
        );

        let days: Value = test::read_body_json(resp).await;
        let days = days.as_array().unwrap();
        assert_eq!(days.len(), 7);
        for day in days {
            let slots = day["slots"].as_array().unwrap();
            assert_eq!(slots.len(), 5);
            let available = slots
                .iter()
                .filter(|slot| slot["available"].as_bool() == Some(true))
                .count();
            assert!((2..=3).contains(&available));
        }
    }

    #[actix_web::test]
    async fn availability_for_an_unknown_service_is_404() {
        let app = api_app!();
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/availability?service=window-cleaning")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn submit_booking_requires_smtp_configuration() {
        let app = api_app!();
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/submit-booking")
                .set_json(serde_json::json!({
                    "service": {"slug": "tv-mounting", "title": "TV Mounting Service"},
                    "date": "2026-09-01",
                    "timeSlot": "17:00-18:00",
                    "contactInfo": {
                        "name": "Jane Doe",
                        "email": "jane@example.com",
                        "phone": "5551234567",
                        "address": "123 Main St"
                    },
                    "total": 69
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("Email configuration"));
    }

    #[actix_web::test]
    async fn checkout_rejects_missing_fields() {
        let app = api_app!();
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/create-checkout-session")
                .set_json(serde_json::json!({
                    "serviceSlug": "tv-mounting",
                    "packageOption": "",
                    "date": "2026-09-01",
                    "timeSlot": "17:00-18:00",
                    "contactInfo": {
                        "name": "Jane Doe",
                        "email": "jane@example.com",
                        "phone": "5551234567",
                        "address": "123 Main St"
                    },
                    "amount": 219.0
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing required fields");
    }
}
