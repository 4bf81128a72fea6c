//! docforge web: HTTP surface for the document conversion core.

pub mod helpers;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", get(routes::health))
        .route("/pdf/to/merge", post(routes::merge_pdfs))
        .route("/docx/to/pdf", post(routes::office_to_pdf))
        .route("/image/to/pdf", post(routes::image_to_pdf))
        .route("/html/to/pdf", post(routes::html_to_pdf))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
