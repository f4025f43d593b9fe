use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use log::info;
use tera::Tera;

use ytmerge::config::AppConfig;
use ytmerge::models::form_data::AppState;
use ytmerge::service::hub::ProgressHub;
use ytmerge::service::muxer::FfmpegMuxer;
use ytmerge::service::orchestrator::Orchestrator;
use ytmerge::service::rest;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::from_env().map_err(io::Error::other)?;
    ytmerge::logging::init(&config.log_config)?;

    config.layout.ensure_dirs().await?;

    // Initialize Tera templates
    let tera = Tera::new(&config.templates).map_err(io::Error::other)?;

    let hub = Arc::new(ProgressHub::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&hub),
        config.downloader.clone(),
        config.exit_policy,
        Arc::new(FfmpegMuxer::new(config.ffmpeg.clone())),
        config.layout.clone(),
    ));
    let state = web::Data::new(AppState {
        hub,
        orchestrator,
        layout: config.layout.clone(),
    });

    info!("Listening on http://{}", config.bind);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::Data::new(tera.clone()))
            .configure(rest::routes)
    })
    .bind(&config.bind)?
    .run()
    .await
}
