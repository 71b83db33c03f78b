use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::booking::{
    furniture_base_price, lifting_surcharge, tv_base_price, wall_mount_surcharge,
    wire_management_surcharge, BookingState, ContactInfo, DeviceType, JobSize, LiftingHelp,
    NetworkSetup, TvSizeRange, WallMountType, WireManagement,
};
use crate::catalog::{self, SMART_INSTALL, TV_MOUNTING};
use crate::notify::{send_booking_notification, BookingRecord};
use crate::state::{AppState, Session, SubmissionState};
use crate::templates::render;
use crate::wizard::{Advance, Back, Sequencer, Step};

const SESSION_COOKIE: &str = "rap_session";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/book")
            .route(web::get().to(show_picker))
            .route(web::post().to(choose_service)),
    )
    .service(
        web::resource("/book/options")
            .route(web::get().to(show_step))
            .route(web::post().to(apply_step)),
    )
    .service(
        web::resource("/book/schedule")
            .route(web::get().to(show_schedule))
            .route(web::post().to(choose_slot)),
    )
    .service(
        web::resource("/book/contact")
            .route(web::get().to(show_contact))
            .route(web::post().to(save_contact)),
    )
    .service(web::resource("/book/review").route(web::get().to(review)))
    .service(web::resource("/book/submit").route(web::post().to(submit)))
    .service(web::resource("/book/success").route(web::get().to(success)));
}

fn session_key(req: &HttpRequest) -> (String, bool) {
    match req.cookie(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => (cookie.value().to_string(), false),
        _ => (Uuid::new_v4().to_string(), true),
    }
}

fn with_session(mut response: HttpResponse, id: &str, fresh: bool) -> HttpResponse {
    if fresh {
        let cookie = Cookie::build(SESSION_COOKIE, id.to_string())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();
        if let Err(err) = response.add_cookie(&cookie) {
            log::warn!("Failed to attach session cookie: {err}");
        }
    }
    response
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

// ---------------------------------------------------------------------------
// Service selection

#[derive(Clone, Debug)]
struct ServiceChoice {
    slug: String,
    title: String,
    description: String,
    base_price: i64,
    unit: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "book_service.html")]
struct PickerTemplate {
    services: Vec<ServiceChoice>,
}

#[derive(Deserialize)]
struct PickerQuery {
    service: Option<String>,
}

#[derive(Deserialize)]
struct ServiceForm {
    #[serde(default)]
    service: String,
}

async fn show_picker(query: web::Query<PickerQuery>) -> HttpResponse {
    let preselected = query.service.as_deref().unwrap_or_default();
    let services = catalog::services()
        .iter()
        .map(|service| ServiceChoice {
            slug: service.slug.to_string(),
            title: service.title.to_string(),
            description: service.description.to_string(),
            base_price: service.base_price,
            unit: service.unit.to_string(),
            selected: service.slug == preselected,
        })
        .collect();
    render(PickerTemplate { services })
}

async fn choose_service(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<ServiceForm>,
) -> HttpResponse {
    let Some(service) = catalog::find(&form.service) else {
        return redirect("/book");
    };

    let (id, fresh) = session_key(&req);
    {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        session.booking.reset();
        session.booking.select_service(service.slug);
        match service.slug {
            TV_MOUNTING => session.booking.update_tv_mounting_details(|d| d),
            SMART_INSTALL => session.booking.update_smart_home_details(|d| d),
            _ => {}
        }
        session.wizard = Sequencer::for_service(service.slug);
        session.submission = SubmissionState::Idle;
        session.submit_error = None;
    }
    with_session(redirect("/book/options"), &id, fresh)
}

// ---------------------------------------------------------------------------
// Wizard steps

#[derive(Clone, Debug)]
struct ChoiceView {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct SummaryRow {
    label: String,
    value: String,
}

#[derive(Template)]
#[template(path = "book_wizard.html")]
struct WizardTemplate {
    flow_title: String,
    step_name: String,
    step_number: usize,
    step_total: usize,
    prompt: String,
    kind: &'static str,
    field: String,
    choices: Vec<ChoiceView>,
    value: String,
    hint: String,
    rows: Vec<SummaryRow>,
    total: i64,
    can_advance: bool,
    progress: Vec<bool>,
}

#[derive(Deserialize)]
struct WizardForm {
    #[serde(default)]
    action: String,
    tv_size_range: Option<String>,
    wall_mount_type: Option<String>,
    wire_management: Option<String>,
    lifting_help: Option<String>,
    exact_tv_size: Option<String>,
    device_type: Option<String>,
    device_brand: Option<String>,
    device_count: Option<String>,
    network_setup: Option<String>,
    additional_devices: Option<String>,
    job_size: Option<String>,
    item_count: Option<String>,
    item_description: Option<String>,
}

fn parse_field<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .and_then(|text| text.parse().ok())
}

fn text_field(value: &Option<String>) -> Option<Option<String>> {
    value.as_deref().map(|text| {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn apply_wizard_form(booking: &mut BookingState, form: &WizardForm) {
    match booking.service_slug() {
        Some(TV_MOUNTING) => booking.update_tv_mounting_details(|mut d| {
            if let Some(size) = parse_field(&form.tv_size_range) {
                d.tv_size_range = size;
            }
            if let Some(mount) = parse_field(&form.wall_mount_type) {
                d.wall_mount_type = mount;
            }
            if let Some(wire) = parse_field(&form.wire_management) {
                d.wire_management = wire;
            }
            if let Some(lifting) = parse_field(&form.lifting_help) {
                d.lifting_help = lifting;
            }
            if form.exact_tv_size.is_some() {
                d.exact_tv_size = parse_field(&form.exact_tv_size).filter(|&size| size > 0);
            }
            d
        }),
        Some(SMART_INSTALL) => booking.update_smart_home_details(|mut d| {
            if let Some(device) = parse_field(&form.device_type) {
                d.device_type = device;
            }
            if let Some(brand) = text_field(&form.device_brand) {
                d.device_brand = brand;
            }
            if let Some(count) = parse_field(&form.device_count) {
                d.device_count = count;
            }
            if let Some(network) = parse_field(&form.network_setup) {
                d.network_setup = network;
            }
            if let Some(extra) = text_field(&form.additional_devices) {
                d.additional_devices = extra;
            }
            d
        }),
        Some(_) => {
            // Furniture options stay unset until the first answer arrives.
            let touched = form.job_size.is_some()
                || form.item_count.is_some()
                || form.item_description.is_some();
            if touched {
                booking.update_furniture_assembly_details(|mut d| {
                    if let Some(size) = parse_field(&form.job_size) {
                        d.job_size = size;
                    }
                    if let Some(count) = parse_field(&form.item_count) {
                        d.item_count = count;
                    }
                    if let Some(text) = form.item_description.as_deref() {
                        d.item_description = text.trim().to_string();
                    }
                    d
                });
            }
        }
        None => {}
    }
}

fn tv_size_label(size: TvSizeRange) -> &'static str {
    match size {
        TvSizeRange::Under40 => "Under 40\"",
        TvSizeRange::From41To55 => "41\" - 55\"",
        TvSizeRange::From56To70 => "56\" - 70\"",
        TvSizeRange::Over70 => "Over 70\"",
    }
}

fn wall_mount_label(mount: WallMountType) -> &'static str {
    match mount {
        WallMountType::None => "I have my own mount",
        WallMountType::Fixed => "Fixed mount",
        WallMountType::FullMotion => "Full-motion mount",
    }
}

fn wire_label(wire: WireManagement) -> &'static str {
    match wire {
        WireManagement::None => "Leave wires as they are",
        WireManagement::InWall => "Conceal wires in the wall",
        WireManagement::External => "Cover wires with a raceway",
    }
}

fn lifting_label(lifting: LiftingHelp) -> &'static str {
    match lifting {
        LiftingHelp::Yes => "Yes, someone can help lift",
        LiftingHelp::No => "No, send an extra pro",
    }
}

fn device_type_label(device: DeviceType) -> &'static str {
    match device {
        DeviceType::Camera => "Security camera",
        DeviceType::Speaker => "Smart speaker",
        DeviceType::Display => "Smart display",
        DeviceType::Doorbell => "Video doorbell",
        DeviceType::Other => "Something else",
    }
}

fn network_label(network: NetworkSetup) -> &'static str {
    match network {
        NetworkSetup::None => "No network help needed",
        NetworkSetup::Basic => "Basic network setup",
    }
}

fn job_size_label(size: JobSize) -> &'static str {
    match size {
        JobSize::Small => "Small (side table, lamp, chair)",
        JobSize::Medium => "Medium (desk, bookshelf, dresser)",
        JobSize::Large => "Large (wardrobe, bed frame, sectional)",
    }
}

fn surcharge_label(amount: i64) -> String {
    if amount == 0 {
        "included".to_string()
    } else {
        format!("+${amount}")
    }
}

fn summary_rows(booking: &BookingState) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    let row = |label: &str, value: String| SummaryRow {
        label: label.to_string(),
        value,
    };

    if let Some(d) = booking.options().tv() {
        rows.push(row("TV size", tv_size_label(d.tv_size_range).to_string()));
        if let Some(size) = d.exact_tv_size {
            rows.push(row("Exact size", format!("{size}\"")));
        }
        rows.push(row("Wall mount", wall_mount_label(d.wall_mount_type).to_string()));
        rows.push(row("Wire management", wire_label(d.wire_management).to_string()));
        rows.push(row("Lifting help", lifting_label(d.lifting_help).to_string()));
    } else if let Some(d) = booking.options().smart_home() {
        rows.push(row("Device type", device_type_label(d.device_type).to_string()));
        if let Some(brand) = d.device_brand.as_deref() {
            rows.push(row("Brand", brand.to_string()));
        }
        rows.push(row("Devices", d.device_count.to_string()));
        rows.push(row("Network setup", network_label(d.network_setup).to_string()));
        if let Some(extra) = d.additional_devices.as_deref() {
            if !extra.trim().is_empty() {
                rows.push(row("Device details", extra.to_string()));
            }
        }
    } else if let Some(d) = booking.options().furniture() {
        rows.push(row("Job size", job_size_label(d.job_size).to_string()));
        rows.push(row("Items", d.item_count.to_string()));
        if !d.item_description.trim().is_empty() {
            rows.push(row("Description", d.item_description.clone()));
        }
    }
    rows
}

fn wizard_view(session: &Session) -> Option<WizardTemplate> {
    let wizard = session.wizard.as_ref()?;
    let booking = &session.booking;
    let step = wizard.current();

    let mut view = WizardTemplate {
        flow_title: wizard.title().to_string(),
        step_name: step.label().to_string(),
        step_number: wizard.index() + 1,
        step_total: wizard.len(),
        prompt: String::new(),
        kind: "choice",
        field: String::new(),
        choices: Vec::new(),
        value: String::new(),
        hint: String::new(),
        rows: Vec::new(),
        total: booking.total(),
        can_advance: wizard.can_advance(booking),
        progress: (0..wizard.len()).map(|i| i <= wizard.index()).collect(),
    };

    match step {
        Step::TvSize => {
            view.prompt = "What size is your TV?".to_string();
            view.field = "tv_size_range".to_string();
            view.choices = TvSizeRange::ALL
                .iter()
                .map(|&size| ChoiceView {
                    value: size.as_str().to_string(),
                    label: format!("{} - ${}", tv_size_label(size), tv_base_price(size)),
                    selected: booking.options().tv().map_or(false, |d| d.tv_size_range == size),
                })
                .collect();
        }
        Step::WallMount => {
            let bucket = booking
                .options()
                .tv()
                .map(|d| d.tv_size_range)
                .unwrap_or(TvSizeRange::Under40);
            view.prompt = "Do you need a wall mount?".to_string();
            view.field = "wall_mount_type".to_string();
            view.choices = WallMountType::ALL
                .iter()
                .map(|&mount| ChoiceView {
                    value: mount.as_str().to_string(),
                    label: format!(
                        "{} - {}",
                        wall_mount_label(mount),
                        surcharge_label(wall_mount_surcharge(mount, bucket))
                    ),
                    selected: booking
                        .options()
                        .tv()
                        .map_or(false, |d| d.wall_mount_type == mount),
                })
                .collect();
        }
        Step::WireManagement => {
            view.prompt = "How should we handle the wires?".to_string();
            view.field = "wire_management".to_string();
            view.choices = WireManagement::ALL
                .iter()
                .map(|&wire| ChoiceView {
                    value: wire.as_str().to_string(),
                    label: format!(
                        "{} - {}",
                        wire_label(wire),
                        surcharge_label(wire_management_surcharge(wire))
                    ),
                    selected: booking
                        .options()
                        .tv()
                        .map_or(false, |d| d.wire_management == wire),
                })
                .collect();
        }
        Step::LiftingHelp => {
            view.prompt = "Will someone on site be able to help lift the TV?".to_string();
            view.field = "lifting_help".to_string();
            view.choices = LiftingHelp::ALL
                .iter()
                .map(|&lifting| ChoiceView {
                    value: lifting.as_str().to_string(),
                    label: format!(
                        "{} - {}",
                        lifting_label(lifting),
                        surcharge_label(lifting_surcharge(lifting))
                    ),
                    selected: booking
                        .options()
                        .tv()
                        .map_or(false, |d| d.lifting_help == lifting),
                })
                .collect();
        }
        Step::ExactSize => {
            view.prompt = "What is the exact size of your TV?".to_string();
            view.kind = "number";
            view.field = "exact_tv_size".to_string();
            view.hint = "Measured diagonally, in inches.".to_string();
            view.value = booking
                .options()
                .tv()
                .and_then(|d| d.exact_tv_size)
                .map(|size| size.to_string())
                .unwrap_or_default();
        }
        Step::DeviceType => {
            view.prompt = "What type of device are we installing?".to_string();
            view.field = "device_type".to_string();
            view.choices = DeviceType::ALL
                .iter()
                .map(|&device| ChoiceView {
                    value: device.as_str().to_string(),
                    label: device_type_label(device).to_string(),
                    selected: booking
                        .options()
                        .smart_home()
                        .map_or(false, |d| d.device_type == device),
                })
                .collect();
        }
        Step::DeviceBrand => {
            view.prompt = "What brand are the devices?".to_string();
            view.kind = "text";
            view.field = "device_brand".to_string();
            view.hint = "e.g. Ring, Nest, Philips Hue".to_string();
            view.value = booking
                .options()
                .smart_home()
                .and_then(|d| d.device_brand.clone())
                .unwrap_or_default();
        }
        Step::DeviceCount => {
            view.prompt = "How many devices should we install?".to_string();
            view.kind = "number";
            view.field = "device_count".to_string();
            view.hint = "First device $69, each additional device $39.".to_string();
            view.value = booking
                .options()
                .smart_home()
                .map(|d| d.device_count.to_string())
                .unwrap_or_default();
        }
        Step::NetworkSetup => {
            view.prompt = "Do you need help with your home network?".to_string();
            view.field = "network_setup".to_string();
            view.choices = NetworkSetup::ALL
                .iter()
                .map(|&network| ChoiceView {
                    value: network.as_str().to_string(),
                    label: format!(
                        "{} - {}",
                        network_label(network),
                        surcharge_label(if network == NetworkSetup::Basic { 50 } else { 0 })
                    ),
                    selected: booking
                        .options()
                        .smart_home()
                        .map_or(false, |d| d.network_setup == network),
                })
                .collect();
        }
        Step::AdditionalDevices => {
            view.prompt = "Tell us about the devices".to_string();
            view.kind = "text";
            view.field = "additional_devices".to_string();
            view.hint = "Describe the devices so the right tools come along.".to_string();
            view.value = booking
                .options()
                .smart_home()
                .and_then(|d| d.additional_devices.clone())
                .unwrap_or_default();
        }
        Step::JobSize => {
            view.prompt = "How big is the job?".to_string();
            view.field = "job_size".to_string();
            view.choices = JobSize::ALL
                .iter()
                .map(|&size| ChoiceView {
                    value: size.as_str().to_string(),
                    label: format!(
                        "{} - ${} per item",
                        job_size_label(size),
                        furniture_base_price(size)
                    ),
                    selected: booking
                        .options()
                        .furniture()
                        .map_or(false, |d| d.job_size == size),
                })
                .collect();
        }
        Step::ItemCount => {
            view.prompt = "How many items need assembling?".to_string();
            view.kind = "number";
            view.field = "item_count".to_string();
            view.value = booking
                .options()
                .furniture()
                .map(|d| d.item_count.to_string())
                .unwrap_or_default();
        }
        Step::ItemDescription => {
            view.prompt = "What are we assembling?".to_string();
            view.kind = "text";
            view.field = "item_description".to_string();
            view.hint = "Brand and model help, e.g. IKEA PAX wardrobe.".to_string();
            view.value = booking
                .options()
                .furniture()
                .map(|d| d.item_description.clone())
                .unwrap_or_default();
        }
        Step::Summary => {
            view.prompt = "Review your selections".to_string();
            view.kind = "summary";
            view.rows = summary_rows(booking);
            view.can_advance = wizard.flow_valid(booking);
        }
    }

    Some(view)
}

async fn show_step(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        match wizard_view(session) {
            Some(view) => render(view),
            None => redirect("/book"),
        }
    };
    with_session(response, &id, fresh)
}

async fn apply_step(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<WizardForm>,
) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        if session.wizard.is_none() {
            return with_session(redirect("/book"), &id, fresh);
        }

        apply_wizard_form(&mut session.booking, &form);

        // Navigation borrows the sequencer out so the booking stays readable.
        let mut wizard = match session.wizard.take() {
            Some(wizard) => wizard,
            None => return with_session(redirect("/book"), &id, fresh),
        };
        let response = if form.action == "back" {
            match wizard.back(&session.booking) {
                Back::Exited => redirect("/book"),
                Back::Moved => redirect("/book/options"),
            }
        } else {
            match wizard.advance(&session.booking) {
                Advance::Finished => redirect("/book/schedule"),
                Advance::Moved | Advance::Stayed => redirect("/book/options"),
            }
        };
        session.wizard = Some(wizard);
        response
    };
    with_session(response, &id, fresh)
}

// ---------------------------------------------------------------------------
// Scheduling

#[derive(Clone, Debug)]
struct SlotView {
    value: String,
    label: String,
    available: bool,
    selected: bool,
}

#[derive(Clone, Debug)]
struct DayView {
    label: String,
    slots: Vec<SlotView>,
}

#[derive(Template)]
#[template(path = "book_schedule.html")]
struct ScheduleTemplate {
    service_title: String,
    days: Vec<DayView>,
    error: String,
    has_error: bool,
}

#[derive(Deserialize)]
struct ScheduleForm {
    #[serde(default)]
    action: String,
    slot: Option<String>,
}

fn pretty_time(value: &str) -> String {
    let Some((hour, minute)) = value.split_once(':') else {
        return value.to_string();
    };
    let Ok(hour) = hour.parse::<u32>() else {
        return value.to_string();
    };
    let (display, suffix) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{display}:{minute} {suffix}")
}

fn pretty_slot(slot: &str) -> String {
    slot.split_once('-')
        .map(|(start, end)| format!("{} - {}", pretty_time(start), pretty_time(end)))
        .unwrap_or_else(|| slot.to_string())
}

fn day_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|day| day.format("%A, %B %-d").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn schedule_view(state: &AppState, session: &Session, error: Option<String>) -> Option<ScheduleTemplate> {
    let service = session.booking.selected_service()?;
    let selected_date = session
        .booking
        .date()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let selected_slot = session.booking.time_slot().unwrap_or_default().to_string();

    let days = state
        .availability
        .availability(service.slug)
        .into_iter()
        .map(|day| DayView {
            label: day_label(&day.date),
            slots: day
                .slots
                .into_iter()
                .map(|slot| SlotView {
                    value: format!("{}|{}|{}", day.date, slot.start, slot.end),
                    label: format!("{} - {}", pretty_time(&slot.start), pretty_time(&slot.end)),
                    available: slot.available,
                    selected: day.date == selected_date
                        && selected_slot == format!("{}-{}", slot.start, slot.end),
                })
                .collect(),
        })
        .collect();

    Some(ScheduleTemplate {
        service_title: service.title.to_string(),
        days,
        has_error: error.is_some(),
        error: error.unwrap_or_default(),
    })
}

async fn show_schedule(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        match schedule_view(&state, session, None) {
            Some(view) => render(view),
            None => redirect("/book"),
        }
    };
    with_session(response, &id, fresh)
}

async fn choose_slot(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<ScheduleForm>,
) -> HttpResponse {
    if form.action == "back" {
        return redirect("/book/options");
    }

    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        if session.booking.selected_service().is_none() {
            return with_session(redirect("/book"), &id, fresh);
        }

        let parsed = form.slot.as_deref().and_then(|value| {
            let mut parts = value.splitn(3, '|');
            let date = parts.next()?;
            let start = parts.next()?;
            let end = parts.next()?;
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            Some((date, format!("{start}-{end}")))
        });

        match parsed {
            Some((date, slot)) => {
                session.booking.set_date_time(date, &slot);
                redirect("/book/contact")
            }
            None => match schedule_view(&state, session, Some("Please choose a time slot.".to_string())) {
                Some(view) => render(view),
                None => redirect("/book"),
            },
        }
    };
    with_session(response, &id, fresh)
}

// ---------------------------------------------------------------------------
// Contact details

#[derive(Template)]
#[template(path = "book_contact.html")]
struct ContactTemplate {
    errors: Vec<String>,
    name: String,
    email: String,
    phone: String,
    address: String,
    notes: String,
    service_title: String,
    date: String,
    time_slot: String,
    total: i64,
}

#[derive(Deserialize)]
struct ContactForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    notes: String,
}

fn contact_view(session: &Session, entered: Option<&ContactInfo>, errors: Vec<String>) -> Option<ContactTemplate> {
    let service = session.booking.selected_service()?;
    let date = session.booking.date()?;
    let time_slot = session.booking.time_slot()?;

    let stored = session.booking.contact_info();
    let contact = entered.or(stored);
    Some(ContactTemplate {
        errors,
        name: contact.map(|c| c.name.clone()).unwrap_or_default(),
        email: contact.map(|c| c.email.clone()).unwrap_or_default(),
        phone: contact.map(|c| c.phone.clone()).unwrap_or_default(),
        address: contact.map(|c| c.address.clone()).unwrap_or_default(),
        notes: contact
            .and_then(|c| c.notes.clone())
            .unwrap_or_default(),
        service_title: service.title.to_string(),
        date: date.format("%A, %B %-d, %Y").to_string(),
        time_slot: pretty_slot(time_slot),
        total: session.booking.total(),
    })
}

async fn show_contact(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        match contact_view(session, None, Vec::new()) {
            Some(view) => render(view),
            None => redirect("/book"),
        }
    };
    with_session(response, &id, fresh)
}

async fn save_contact(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<ContactForm>,
) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();

        let notes = form.notes.trim();
        let contact = ContactInfo {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            address: form.address.trim().to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        };

        let errors = contact.validate();
        if errors.is_empty() {
            session.booking.set_contact_info(contact);
            redirect("/book/review")
        } else {
            match contact_view(session, Some(&contact), errors) {
                Some(view) => render(view),
                None => redirect("/book"),
            }
        }
    };
    with_session(response, &id, fresh)
}

// ---------------------------------------------------------------------------
// Review and submission

#[derive(Template)]
#[template(path = "book_review.html")]
struct ReviewTemplate {
    service_title: String,
    date: String,
    time_slot: String,
    rows: Vec<SummaryRow>,
    name: String,
    email: String,
    phone: String,
    address: String,
    notes: String,
    has_notes: bool,
    total: i64,
    error: String,
    has_error: bool,
}

fn review_redirect(booking: &BookingState) -> Option<HttpResponse> {
    if booking.selected_service().is_none() {
        return Some(redirect("/book"));
    }
    if booking.date().is_none() || booking.time_slot().is_none() {
        return Some(redirect("/book/schedule"));
    }
    if booking.contact_info().is_none() {
        return Some(redirect("/book/contact"));
    }
    None
}

async fn review(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        if let Some(response) = review_redirect(&session.booking) {
            return with_session(response, &id, fresh);
        }

        let error = session.submit_error.take();
        let booking = &session.booking;
        // Guarded above, so these reads cannot miss.
        let service_title = booking
            .selected_service()
            .map(|s| s.title.to_string())
            .unwrap_or_default();
        let date = booking
            .date()
            .map(|d| d.format("%A, %B %-d, %Y").to_string())
            .unwrap_or_default();
        let time_slot = booking
            .time_slot()
            .map(pretty_slot)
            .unwrap_or_default();
        let contact = booking.contact_info().cloned().unwrap_or_default();
        let notes = contact.notes.clone().unwrap_or_default();

        render(ReviewTemplate {
            service_title,
            date,
            time_slot,
            rows: summary_rows(booking),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            address: contact.address,
            has_notes: !notes.trim().is_empty(),
            notes,
            total: booking.total(),
            has_error: error.is_some(),
            error: error.unwrap_or_default(),
        })
    };
    with_session(response, &id, fresh)
}

async fn submit(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);

    // Claim the submission under the lock, then send without holding it.
    let record = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();

        if session.submission == SubmissionState::Submitted {
            return with_session(redirect("/book/success"), &id, fresh);
        }
        if let Some(response) = review_redirect(&session.booking) {
            return with_session(response, &id, fresh);
        }
        let Some(record) = BookingRecord::from_state(&session.booking) else {
            return with_session(redirect("/book/review"), &id, fresh);
        };
        if !session.begin_submission() {
            return with_session(redirect("/book/review"), &id, fresh);
        }
        record
    };

    let result = send_booking_notification(&state.smtp, &record).await;

    let mut sessions = state.lock_sessions();
    let session = sessions.entry(id.clone()).or_default();
    match result {
        Ok(()) => {
            session.finish_submission(true);
            log::info!(
                "Booking submitted for {} on {} at {}",
                record.service.slug,
                record.date,
                record.time_slot
            );
            drop(sessions);
            with_session(redirect("/book/success"), &id, fresh)
        }
        Err(err) => {
            log::error!("Failed to send booking notification: {err}");
            session.finish_submission(false);
            session.submit_error = Some(
                "We could not send your booking request. Please try again in a moment."
                    .to_string(),
            );
            drop(sessions);
            with_session(redirect("/book/review"), &id, fresh)
        }
    }
}

#[derive(Template)]
#[template(path = "book_success.html")]
struct SuccessTemplate {
    service_title: String,
    date: String,
    time_slot: String,
    name: String,
}

async fn success(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let (id, fresh) = session_key(&req);
    let response = {
        let mut sessions = state.lock_sessions();
        let session = sessions.entry(id.clone()).or_default();
        if session.submission != SubmissionState::Submitted {
            return with_session(redirect("/book"), &id, fresh);
        }

        let booking = &session.booking;
        render(SuccessTemplate {
            service_title: booking
                .selected_service()
                .map(|s| s.title.to_string())
                .unwrap_or_default(),
            date: booking
                .date()
                .map(|d| d.format("%A, %B %-d, %Y").to_string())
                .unwrap_or_default(),
            time_slot: booking.time_slot().map(pretty_slot).unwrap_or_default(),
            name: booking
                .contact_info()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        })
    };
    with_session(response, &id, fresh)
}
