use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::proxy::SearchProxy;

pub mod handlers;
pub mod models;

pub fn create_router(proxy: Arc<SearchProxy>, static_dir: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/search", post(handlers::search_handler))
        .route("/api/generate-answer", post(handlers::generate_answer_handler))
        .route(
            "/api/search-and-answer",
            post(handlers::search_and_answer_handler),
        )
        .with_state(proxy)
        // Static pages (home, about, research, contact)
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
