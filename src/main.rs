use std::{sync::Arc, time::Duration};

use actix_web::middleware::NormalizePath;
use actix_web::web::{Data, JsonConfig};
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod report;
mod routes;
mod selfie;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::RateLimiters;
use crate::store::{mysql::MySqlStore, photos::PhotoStore, poller::run_change_poller};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendify is running"
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env().map_err(|e| {
        eprintln!("Configuration error: {e:#}");
        startup_error(e)
    })?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await.map_err(|e| {
        error!(error = %e, "Database connection failed");
        startup_error(e)
    })?;

    let store = Arc::new(MySqlStore::new(pool));
    let photos = PhotoStore::from_config(&config);
    let limiters = RateLimiters::from_config(&config).map_err(startup_error)?;

    // Picks up check-ins the readers write straight to the database
    actix_web::rt::spawn(run_change_poller(
        store.clone(),
        store.changes().clone(),
        Duration::from_secs(config.poll_interval_secs.max(1)),
    ));

    // base64 inflates the photo by 4/3, plus the rest of the body
    let json_limit = config.max_photo_bytes / 3 * 4 + 64 * 1024;
    let server_addr = config.server_addr.clone();
    let store_data = Data::from(store);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS files match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(JsonConfig::default().limit(json_limit))
            .app_data(store_data.clone())
            .app_data(Data::new(photos.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await
}
