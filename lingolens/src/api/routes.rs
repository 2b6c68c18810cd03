use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Uploaded images are capped well below typical body limits for JSON APIs.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/images", post(handlers::process_image))
        .route("/search", post(handlers::search))
        .route("/records", get(handlers::list_records))
        .route("/records/{recordId}", get(handlers::get_record));

    Router::new()
        .nest("/api/v1", v1)
        .nest_service(
            "/images",
            ServeDir::new(state.config.storage.root.clone()),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
