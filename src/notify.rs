use askama::Template;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use thiserror::Error;

use crate::booking::{
    BookingState, ContactInfo, FurnitureAssemblyDetails, SmartHomeDetails, TvMountingDetails,
};
use crate::catalog::{FURNITURE_ASSEMBLY, SMART_INSTALL, TV_MOUNTING};
use crate::config::SmtpConfig;

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceRef {
    pub slug: String,
    pub title: String,
}

/// The structured record handed to the operator. Field names match the JSON
/// the booking client submits.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub service: ServiceRef,
    pub date: String,
    pub time_slot: String,
    pub contact_info: ContactInfo,
    pub total: i64,
    #[serde(default)]
    pub tv_details: Option<TvMountingDetails>,
    #[serde(default)]
    pub smart_home_details: Option<SmartHomeDetails>,
    #[serde(default)]
    pub furniture_details: Option<FurnitureAssemblyDetails>,
}

impl BookingRecord {
    /// Assembles the record from a session's booking, or `None` while any of
    /// service, appointment, or contact info is still missing.
    pub fn from_state(booking: &BookingState) -> Option<Self> {
        let service = booking.selected_service()?;
        let date = booking.date()?;
        let time_slot = booking.time_slot()?.to_string();
        let contact_info = booking.contact_info()?.clone();

        let options = booking.options();
        Some(Self {
            service: ServiceRef {
                slug: service.slug.to_string(),
                title: service.title.to_string(),
            },
            date: date.format("%Y-%m-%d").to_string(),
            time_slot,
            contact_info,
            total: booking.total(),
            tv_details: (service.slug == TV_MOUNTING)
                .then(|| options.tv().cloned())
                .flatten(),
            smart_home_details: (service.slug == SMART_INSTALL)
                .then(|| options.smart_home().cloned())
                .flatten(),
            furniture_details: (service.slug == FURNITURE_ASSEMBLY)
                .then(|| options.furniture().cloned())
                .flatten(),
        })
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP settings are incomplete")]
    NotConfigured,
    #[error("failed to render notification email: {0}")]
    Render(#[from] askama::Error),
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Template)]
#[template(path = "email_booking.html")]
struct BookingEmailTemplate {
    service_title: String,
    date: String,
    time_slot: String,
    total: i64,
    name: String,
    email: String,
    phone: String,
    address: String,
    notes: String,
    has_notes: bool,
    has_tv: bool,
    tv_size_range: String,
    tv_exact_size: String,
    tv_wall_mount: String,
    tv_wire_management: String,
    tv_lifting_help: String,
    has_smart: bool,
    smart_device_type: String,
    smart_device_brand: String,
    smart_device_count: u32,
    smart_network_setup: String,
    smart_mounting_type: String,
    smart_additional_devices: String,
    has_additional_devices: bool,
    has_furniture: bool,
    furniture_job_size: String,
    furniture_item_count: u32,
    furniture_item_description: String,
}

fn email_template(record: &BookingRecord) -> BookingEmailTemplate {
    let tv = record.tv_details.as_ref();
    let smart = record.smart_home_details.as_ref();
    let furniture = record.furniture_details.as_ref();
    let notes = record.contact_info.notes.clone().unwrap_or_default();

    BookingEmailTemplate {
        service_title: record.service.title.clone(),
        date: record.date.clone(),
        time_slot: record.time_slot.clone(),
        total: record.total,
        name: record.contact_info.name.clone(),
        email: record.contact_info.email.clone(),
        phone: record.contact_info.phone.clone(),
        address: record.contact_info.address.clone(),
        has_notes: !notes.trim().is_empty(),
        notes,
        has_tv: tv.is_some(),
        tv_size_range: tv.map(|d| d.tv_size_range.to_string()).unwrap_or_default(),
        tv_exact_size: tv
            .and_then(|d| d.exact_tv_size)
            .map(|size| format!("{size}\""))
            .unwrap_or_default(),
        tv_wall_mount: tv.map(|d| d.wall_mount_type.to_string()).unwrap_or_default(),
        tv_wire_management: tv.map(|d| d.wire_management.to_string()).unwrap_or_default(),
        tv_lifting_help: tv.map(|d| d.lifting_help.to_string()).unwrap_or_default(),
        has_smart: smart.is_some(),
        smart_device_type: smart.map(|d| d.device_type.to_string()).unwrap_or_default(),
        smart_device_brand: smart
            .and_then(|d| d.device_brand.clone())
            .unwrap_or_default(),
        smart_device_count: smart.map(|d| d.device_count).unwrap_or(0),
        smart_network_setup: smart.map(|d| d.network_setup.to_string()).unwrap_or_default(),
        smart_mounting_type: smart.map(|d| d.mounting_type.to_string()).unwrap_or_default(),
        has_additional_devices: smart
            .and_then(|d| d.additional_devices.as_deref())
            .map_or(false, |text| !text.trim().is_empty()),
        smart_additional_devices: smart
            .and_then(|d| d.additional_devices.clone())
            .unwrap_or_default(),
        has_furniture: furniture.is_some(),
        furniture_job_size: furniture.map(|d| d.job_size.to_string()).unwrap_or_default(),
        furniture_item_count: furniture.map(|d| d.item_count).unwrap_or(0),
        furniture_item_description: furniture
            .map(|d| d.item_description.clone())
            .unwrap_or_default(),
    }
}

/// Emails the booking record to the administrator. The booking counts as
/// submitted only when this returns `Ok`.
pub async fn send_booking_notification(
    config: &SmtpConfig,
    record: &BookingRecord,
) -> Result<(), NotifyError> {
    if !config.enabled() {
        return Err(NotifyError::NotConfigured);
    }

    let html = email_template(record).render()?;
    let message = Message::builder()
        .from(config.from.parse()?)
        .to(config.admin_email.parse()?)
        .subject(format!("New Booking Request - {}", record.service.title))
        .header(ContentType::TEXT_HTML)
        .body(html)?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        .port(config.port)
        .credentials(Credentials::new(config.user.clone(), config.password.clone()))
        .build();

    mailer.send(message).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{JobSize, TvSizeRange, WallMountType};
    use chrono::NaiveDate;

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "5551234567".to_string(),
            address: "123 Main St".to_string(),
            notes: None,
        }
    }

    #[test]
    fn record_requires_service_date_slot_and_contact() {
        let mut booking = BookingState::default();
        assert!(BookingRecord::from_state(&booking).is_none());

        booking.select_service(TV_MOUNTING);
        booking.set_date_time(NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(), "17:00-18:00");
        assert!(BookingRecord::from_state(&booking).is_none());

        booking.set_contact_info(contact());
        let record = BookingRecord::from_state(&booking).unwrap();
        assert_eq!(record.service.slug, TV_MOUNTING);
        assert_eq!(record.date, "2026-08-24");
        assert_eq!(record.time_slot, "17:00-18:00");
        // No options entered: total falls back to the base price.
        assert_eq!(record.total, 69);
    }

    #[test]
    fn record_carries_only_the_active_variant() {
        let mut booking = BookingState::default();
        booking.select_service(TV_MOUNTING);
        booking.update_tv_mounting_details(|mut d| {
            d.tv_size_range = TvSizeRange::Over70;
            d.wall_mount_type = WallMountType::Fixed;
            d.exact_tv_size = Some(75);
            d
        });
        booking.set_date_time(NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(), "19:00-20:00");
        booking.set_contact_info(contact());

        let record = BookingRecord::from_state(&booking).unwrap();
        assert!(record.tv_details.is_some());
        assert!(record.smart_home_details.is_none());
        assert!(record.furniture_details.is_none());
        assert_eq!(record.total, 149 + 90);
    }

    #[test]
    fn email_renders_for_each_variant() {
        let mut booking = BookingState::default();
        booking.select_service(FURNITURE_ASSEMBLY);
        booking.update_furniture_assembly_details(|mut d| {
            d.job_size = JobSize::Medium;
            d.item_count = 3;
            d.item_description = "Dining table and chairs".to_string();
            d
        });
        booking.set_date_time(NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(), "18:00-19:00");
        booking.set_contact_info(contact());

        let record = BookingRecord::from_state(&booking).unwrap();
        let html = email_template(&record).render().unwrap();
        assert!(html.contains("Furniture Assembly"));
        assert!(html.contains("Dining table and chairs"));
        assert!(html.contains("$267"));
    }

    #[actix_web::test]
    async fn unconfigured_smtp_is_rejected_before_any_io() {
        let mut booking = BookingState::default();
        booking.select_service(SMART_INSTALL);
        booking.set_date_time(NaiveDate::from_ymd_opt(2026, 8, 27).unwrap(), "20:00-21:00");
        booking.set_contact_info(contact());
        let record = BookingRecord::from_state(&booking).unwrap();

        let result = send_booking_notification(&SmtpConfig::default(), &record).await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }

    #[test]
    fn record_parses_the_wire_format() {
        let json = serde_json::json!({
            "service": {"slug": "smart-install", "title": "Smart Home Installation"},
            "date": "2026-09-01",
            "timeSlot": "17:00-18:00",
            "contactInfo": {
                "name": "Jane Doe",
                "email": "jane@example.com",
                "phone": "5551234567",
                "address": "123 Main St"
            },
            "total": 236,
            "smartHomeDetails": {
                "deviceType": "camera",
                "deviceCount": 4,
                "deviceBrand": "Arlo",
                "networkSetup": "basic",
                "mountingType": "wall"
            }
        });
        let record: BookingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.total, 236);
        let details = record.smart_home_details.unwrap();
        assert_eq!(details.device_count, 4);
        assert_eq!(details.device_brand.as_deref(), Some("Arlo"));
    }
}
