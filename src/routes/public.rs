use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Result};
use askama::Template;

use crate::catalog;
use crate::templates::{render, render_with_status};

const CANONICAL_BASE: &str = "https://requestapro.com";

#[derive(Clone, Debug)]
struct ServiceCard {
    slug: String,
    title: String,
    description: String,
    base_price: i64,
    unit: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    services: Vec<ServiceCard>,
}

#[derive(Template)]
#[template(path = "services.html")]
struct ServicesTemplate {
    services: Vec<ServiceCard>,
}

#[derive(Template)]
#[template(path = "service_detail.html")]
struct ServiceDetailTemplate {
    slug: String,
    title: String,
    description: String,
    base_price: i64,
    unit: String,
    pricing_note: String,
    has_pricing_note: bool,
    included: Vec<String>,
}

#[derive(Clone, Debug)]
struct ReviewView {
    author: String,
    service: String,
    stars: String,
    text: String,
}

#[derive(Template)]
#[template(path = "reviews.html")]
struct ReviewsTemplate {
    reviews: Vec<ReviewView>,
}

#[derive(Template)]
#[template(path = "about.html")]
struct AboutTemplate {}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/services").route(web::get().to(list_services)))
        .service(web::resource("/services/{slug}").route(web::get().to(service_detail)))
        .service(web::resource("/about").route(web::get().to(about)))
        .service(web::resource("/reviews").route(web::get().to(reviews)))
        .service(web::resource("/sitemap.xml").route(web::get().to(sitemap)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

fn service_cards() -> Vec<ServiceCard> {
    catalog::services()
        .iter()
        .map(|service| ServiceCard {
            slug: service.slug.to_string(),
            title: service.title.to_string(),
            description: service.description.to_string(),
            base_price: service.base_price,
            unit: service.unit.to_string(),
        })
        .collect()
}

async fn home() -> Result<HttpResponse> {
    Ok(render(HomeTemplate {
        services: service_cards(),
    }))
}

async fn list_services() -> Result<HttpResponse> {
    Ok(render(ServicesTemplate {
        services: service_cards(),
    }))
}

async fn service_detail(path: web::Path<String>) -> Result<HttpResponse> {
    let slug = path.into_inner();
    let Some(service) = catalog::find(&slug) else {
        return not_found().await;
    };

    Ok(render(ServiceDetailTemplate {
        slug: service.slug.to_string(),
        title: service.title.to_string(),
        description: service.description.to_string(),
        base_price: service.base_price,
        unit: service.unit.to_string(),
        pricing_note: service.pricing_note.unwrap_or_default().to_string(),
        has_pricing_note: service.pricing_note.is_some(),
        included: catalog::included_items(service.slug)
            .iter()
            .map(|item| item.to_string())
            .collect(),
    }))
}

async fn about() -> Result<HttpResponse> {
    Ok(render(AboutTemplate {}))
}

async fn reviews() -> Result<HttpResponse> {
    let reviews = vec![
        ReviewView {
            author: "Marcus T.".to_string(),
            service: "TV Mounting Service".to_string(),
            stars: "★★★★★".to_string(),
            text: "Mounted a 75\" TV above the fireplace with full in-wall wire concealment. You can't see a single cable. Showed up on time and cleaned up everything.".to_string(),
        },
        ReviewView {
            author: "Priya S.".to_string(),
            service: "Smart Home Installation".to_string(),
            stars: "★★★★★".to_string(),
            text: "Had four cameras and a video doorbell installed in one visit. The technician walked me through the app setup and made sure every device was on the network before leaving.".to_string(),
        },
        ReviewView {
            author: "Dan W.".to_string(),
            service: "Furniture Assembly".to_string(),
            stars: "★★★★☆".to_string(),
            text: "Three flat-pack wardrobes assembled in an afternoon. Sturdy work and all the packaging was taken away. Booking online took about two minutes.".to_string(),
        },
    ];
    Ok(render(ReviewsTemplate { reviews }))
}

async fn sitemap() -> Result<HttpResponse> {
    let mut urls: Vec<String> = ["", "/services", "/about", "/reviews", "/book"]
        .iter()
        .map(|path| format!("{CANONICAL_BASE}{path}"))
        .collect();
    urls.extend(
        catalog::services()
            .iter()
            .map(|service| format!("{CANONICAL_BASE}/services/{}", service.slug)),
    );

    let mut body = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    body.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for url in urls {
        body.push_str(&format!("  <url><loc>{url}</loc></url>\n"));
    }
    body.push_str("</urlset>\n");

    Ok(HttpResponse::Ok()
        .content_type("application/xml; charset=utf-8")
        .body(body))
}

pub async fn not_found() -> Result<HttpResponse> {
    Ok(render_with_status(NotFoundTemplate {}, StatusCode::NOT_FOUND))
}
