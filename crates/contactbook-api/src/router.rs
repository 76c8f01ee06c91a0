use std::path::Path;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use contactbook_types::api::HealthResponse;

use crate::book::AppState;
use crate::contacts;
use crate::photos::PHOTO_ROUTE;

/// Default request body ceiling (10 MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10_000_000;

/// Build the HTTP surface: contact CRUD, static photo files and a health
/// check.
pub fn router(state: AppState, photo_dir: &Path, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/contacts/{id}",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .merge(api)
        .nest_service(PHOTO_ROUTE, ServeDir::new(photo_dir))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
