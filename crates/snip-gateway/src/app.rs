use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{create_link_handler, health_handler, link_stats_handler, resolve_link_handler};
use crate::state::AppState;

pub struct App;

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/v1/links", post(create_link_handler))
            .route("/v1/links/{code}", get(resolve_link_handler))
            .route("/v1/links/{code}/stats", get(link_stats_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
