use std::sync::Mutex;

use actix_multipart::Multipart;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::error::ErrorPayloadTooLarge;
use actix_web::{web, HttpResponse, Result};
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::models::{DisplaySlots, PredictionRequest};
use crate::resolver::Resolver;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::transport::{FALLBACK_CONTENT_TYPE, FILE_FIELD};

const INDEX_HTML: &str = include_str!("../static/index.html");

pub struct AppState {
    pub resolver: Resolver,
    /// Last rendered outcome; every prediction overwrites it.
    pub display: Mutex<DisplaySlots>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            display: Mutex::new(DisplaySlots::default()),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    fn render(&self, slots: &DisplaySlots) {
        match self.display.lock() {
            Ok(mut current) => *current = slots.clone(),
            Err(poisoned) => *poisoned.into_inner() = slots.clone(),
        }
    }

    fn snapshot(&self) -> DisplaySlots {
        match self.display.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/display").route(web::get().to(display)));
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn display(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.snapshot())
}

pub async fn predict(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let selection = read_selection(payload, state.max_upload_bytes).await?;
    let slots = state.resolver.predict(selection).await;
    state.render(&slots);
    Ok(HttpResponse::Ok().json(slots))
}

/// Collect every uploaded file part into memory, refusing any part larger
/// than `limit` bytes.
async fn read_selection(mut payload: Multipart, limit: usize) -> Result<Vec<PredictionRequest>> {
    let mut selection = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition();
        let filename = disposition.get_filename().map(str::to_string);
        let is_file = filename.is_some() || disposition.get_name() == Some(FILE_FIELD);

        if !is_file {
            debug!(field = ?disposition.get_name(), "skipping non-file form field");
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let content_type = field
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                warn!(limit, filename = ?filename, "upload exceeds size limit");
                return Err(ErrorPayloadTooLarge("Image exceeds the upload size limit"));
            }
            bytes.extend_from_slice(&chunk);
        }

        selection.push(PredictionRequest::new(
            filename.unwrap_or_default(),
            content_type,
            bytes,
        ));
    }

    if selection.len() > 1 {
        warn!(files = selection.len(), "more than one file uploaded");
    }
    Ok(selection)
}
