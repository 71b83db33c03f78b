mod availability;
mod booking;
mod catalog;
mod config;
mod notify;
mod payments;
mod routes;
mod state;
mod templates;
mod wizard;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use std::env;

use crate::config::{SmtpConfig, StripeConfig};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let smtp = SmtpConfig::from_env();
    if !smtp.enabled() {
        log::warn!("SMTP settings incomplete. Booking notifications are disabled until SMTP_HOST, SMTP_USER, SMTP_PASSWORD, SMTP_FROM, and ADMIN_EMAIL are set.");
    }

    let stripe = StripeConfig::from_env();
    if !stripe.enabled() {
        log::warn!("STRIPE_SECRET_KEY not set. Checkout sessions are disabled.");
    }

    let state = AppState::new(smtp, stripe);

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting RequestAPro on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .configure(routes::public::configure)
            .configure(routes::book::configure)
            .configure(routes::api::configure)
            .default_service(web::route().to(routes::public::not_found))
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
