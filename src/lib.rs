//! CycleConnect backend: a cycle-tracking REST API with phase prediction,
//! SMS alert fan-out to emergency contacts, and AI-generated insights.

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

pub mod auth;
pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod notify;
pub mod phases;
pub mod routes;
pub mod state;
pub mod store;
pub mod validate;

use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/api", routes::api_router())
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}
