use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `TraceLayer` logs every request/response via `tracing`; `CorsLayer` lets
/// the dashboard call the report endpoints from another origin.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/metrics", get(routes::metrics::list_metrics))
        .route(
            "/api/stories/{id}/reports/by-day",
            get(routes::reports::report_by_day),
        )
        .route(
            "/api/stories/{id}/reports/summary",
            get(routes::reports::report_summary),
        )
        .route(
            "/api/stories/{id}/reports/acquisition",
            get(routes::reports::report_acquisition),
        )
        .route(
            "/api/stories/{id}/reports/devices",
            get(routes::reports::report_devices),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
