use std::io;
use std::path::Path;

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{error, web, HttpResponse, Result};
use futures_util::{StreamExt, TryStreamExt};
use log::{info, warn};
use sanitize_filename::sanitize;
use serde_json::json;
use tera::{Context, Tera};
use tokio_util::io::ReaderStream;

use crate::error::JobError;
use crate::models::form_data::{AppState, DownloadRequest, DownloadResponse, FileQuery};
use crate::service::utils::confine_to;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .route("/download", web::post().to(start_download))
        .route("/progress", web::get().to(progress))
        .route("/file", web::get().to(serve_file));
}

/// Malformed JSON bodies get the same `{"error"}` shape as a missing url.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": format!("Invalid request body: {}", err) });
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

pub async fn index(tmpl: web::Data<Tera>) -> Result<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("title", "ytmerge");

    let rendered = tmpl.render("index.html", &ctx).map_err(|e| {
        warn!("Template error: {}", e);
        error::ErrorInternalServerError("Template error")
    })?;

    Ok(HttpResponse::Ok().content_type("text/html").body(rendered))
}

pub async fn start_download(
    state: web::Data<AppState>,
    body: web::Json<DownloadRequest>,
) -> std::result::Result<HttpResponse, JobError> {
    let job = state.orchestrator.run(body.url()).await?;

    Ok(HttpResponse::Ok().json(DownloadResponse::for_output(&job.output_path)))
}

pub async fn progress(state: web::Data<AppState>) -> HttpResponse {
    let subscription = state.hub.subscribe();

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(subscription.map(Ok::<_, actix_web::Error>))
}

pub async fn serve_file(
    state: web::Data<AppState>,
    query: web::Query<FileQuery>,
) -> Result<HttpResponse> {
    let requested = match query.path.as_deref() {
        Some(path) if !path.is_empty() => Path::new(path).to_path_buf(),
        _ => return Ok(HttpResponse::BadRequest().body("Missing file path")),
    };

    let resolved = match confine_to(&state.layout.merged_dir, &requested).await {
        Ok(Some(path)) => path,
        Ok(None) => {
            warn!("Refusing to serve {} outside the merged directory", requested.display());
            return Ok(HttpResponse::Forbidden().body("Path is outside the output directory"));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(HttpResponse::NotFound().body("File not found"));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Serving {}", resolved.display());
    let file = tokio::fs::File::open(&resolved).await?;
    let stream = ReaderStream::new(file).map_err(actix_web::Error::from);

    let filename = resolved
        .file_name()
        .map(|name| sanitize(name.to_string_lossy()))
        .unwrap_or_else(|| "video.mp4".to_string());

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "application/octet-stream"))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .streaming(stream))
}
