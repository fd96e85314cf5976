use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;

use storymetrics_core::report::ReportRequest;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub quota_user: Option<String>,
}

/// Accepts an RFC 3339 instant, or `YYYY-MM-DD` read as noon of that day in
/// the view timezone.
fn parse_instant(
    field: &'static str,
    raw: Option<&str>,
    tz: Tz,
) -> Result<DateTime<Utc>, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_field(field, format!("{field} is required")))?;
    let invalid = || AppError::bad_field(field, format!("{field} must be YYYY-MM-DD or RFC 3339"));

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let noon = NaiveTime::from_hms_opt(12, 0, 0).ok_or_else(invalid)?;
    tz.from_local_datetime(&day.and_time(noon))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn build_request(
    state: &AppState,
    story_id: String,
    query: ReportQuery,
) -> Result<ReportRequest, AppError> {
    let tz = state.view_timezone;
    let start = parse_instant("start_date", query.start_date.as_deref(), tz)?;
    let end = parse_instant("end_date", query.end_date.as_deref(), tz)?;
    let request = ReportRequest::from_instants(story_id, start, end, tz)?;
    Ok(match query.quota_user.filter(|q| !q.is_empty()) {
        Some(quota_user) => request.with_quota_user(quota_user),
        None => request,
    })
}

/// `GET /api/stories/:id/reports/by-day` - Daily trend.
#[tracing::instrument(skip(state, query))]
pub async fn report_by_day(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = build_request(&state, story_id, query)?;
    let rows = state.reports.story_report_by_day(&request).await?;
    Ok(Json(json!({ "data": rows })))
}

/// `GET /api/stories/:id/reports/summary` - Totals for the period.
#[tracing::instrument(skip(state, query))]
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = build_request(&state, story_id, query)?;
    let metrics = state.reports.story_report(&request).await?;
    Ok(Json(json!({ "data": { "metrics": metrics } })))
}

/// `GET /api/stories/:id/reports/acquisition` - Breakdown by channel.
#[tracing::instrument(skip(state, query))]
pub async fn report_acquisition(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = build_request(&state, story_id, query)?;
    let rows = state.reports.story_acquisition_report(&request).await?;
    Ok(Json(json!({ "data": rows })))
}

/// `GET /api/stories/:id/reports/devices` - Breakdown by device category.
#[tracing::instrument(skip(state, query))]
pub async fn report_devices(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = build_request(&state, story_id, query)?;
    let rows = state.reports.story_device_report(&request).await?;
    Ok(Json(json!({ "data": rows })))
}
