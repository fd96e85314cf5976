use axum::{response::IntoResponse, Json};
use serde_json::json;

use storymetrics_core::vocabulary::MetricKey;

/// `GET /api/metrics` - Canonical metric keys with their display labels.
pub async fn list_metrics() -> impl IntoResponse {
    let metrics: Vec<_> = MetricKey::ALL
        .into_iter()
        .map(|key| json!({ "key": key, "label": key.label() }))
        .collect();
    Json(json!({ "data": metrics }))
}
