#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use storymetrics_core::config::LegacyConfig;
use storymetrics_core::report::{DateRange, ReportKind};
use storymetrics_core::source::{LegacyQuery, LegacySource, NextGenParams, NextGenSource};
use storymetrics_core::vocabulary::DimensionKey;
use storymetrics_core::ReportError;
use storymetrics_sources::{LegacyReportClient, NextGenReportClient, ServiceClient};

#[derive(Debug, Clone)]
struct Seen {
    uri: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    seen: Arc<Mutex<Vec<Seen>>>,
    status: StatusCode,
    reply: Value,
}

async fn record(
    State(stub): State<Stub>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    stub.seen.lock().expect("lock").push(Seen {
        uri: uri.to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (stub.status, Json(stub.reply.clone()))
}

/// Serve `reply` with `status` for every request; returns the base URL and the
/// request log.
async fn spawn_stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(Stub {
        seen: Arc::clone(&seen),
        status,
        reply,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    (format!("http://{addr}"), seen)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn params() -> NextGenParams {
    NextGenParams {
        story_id: "story-42".to_string(),
        range: DateRange::new(day(2023, 7, 1), day(2023, 7, 31)),
    }
}

#[tokio::test]
async fn service_client_posts_action_envelope_and_returns_data() {
    let (url, seen) = spawn_stub(StatusCode::OK, json!({ "data": { "rows": [] } })).await;
    let client = NextGenReportClient::from_url(&url).expect("client");

    let report = client
        .fetch(ReportKind::Acquisition, &params())
        .await
        .expect("report");
    assert!(report.rows.is_empty());

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen.len(), 1);
    let body = &seen[0].body;
    assert_eq!(body["action"], "storyAcquisitionReport");
    assert_eq!(
        body["params"],
        json!({ "storyId": "story-42", "startDate": "2023-07-01", "endDate": "2023-07-31" })
    );
    assert!(body["meta"]["requestId"].is_string());
}

#[tokio::test]
async fn service_client_surfaces_remote_status_and_message() {
    let (url, _) = spawn_stub(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "message": "property quota exhausted" }),
    )
    .await;
    let client = NextGenReportClient::from_url(&url).expect("client");

    let err = client.fetch(ReportKind::ByDay, &params()).await.unwrap_err();
    match err {
        ReportError::Remote { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "property quota exhausted");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn service_client_sends_configured_headers() {
    let (url, seen) = spawn_stub(StatusCode::OK, json!({ "data": 7 })).await;
    let client = ServiceClient::new(&url)
        .expect("client")
        .with_header("authorization", "Bearer svc")
        .expect("header");

    let value: u32 = client
        .request("ping", &json!({}), json!({}))
        .await
        .expect("request");
    assert_eq!(value, 7);
    assert_eq!(
        seen.lock().expect("lock")[0].authorization.as_deref(),
        Some("Bearer svc")
    );
}

#[tokio::test]
async fn service_client_requires_data_field() {
    let (url, _) = spawn_stub(StatusCode::OK, json!({ "result": 1 })).await;
    let client = ServiceClient::new(&url).expect("client");
    let err = client
        .request::<_, Value>("ping", &json!({}), json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::Malformed(_)));
}

/// Serve a fixed text body with `200 OK` for every request.
async fn spawn_text_stub(body: &'static str) -> String {
    let app = Router::new().fallback(move || async move { body });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn next_gen_non_json_success_body_is_malformed() {
    let url = spawn_text_stub("<html>gateway</html>").await;
    let client = NextGenReportClient::from_url(&url).expect("client");

    let err = client.fetch(ReportKind::ByDay, &params()).await.unwrap_err();
    assert!(matches!(err, ReportError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn next_gen_data_of_wrong_shape_is_malformed() {
    for reply in [json!({ "data": null }), json!({ "data": [1, 2, 3] })] {
        let (url, _) = spawn_stub(StatusCode::OK, reply).await;
        let client = NextGenReportClient::from_url(&url).expect("client");

        let err = client.fetch(ReportKind::Totals, &params()).await.unwrap_err();
        assert!(matches!(err, ReportError::Malformed(_)), "got {err:?}");
        assert!(err.to_string().contains("storyReport"));
    }
}

#[test]
fn service_client_rejects_empty_url() {
    assert!(matches!(
        ServiceClient::new("  "),
        Err(ReportError::Validation(_))
    ));
}

fn legacy_client(url: &str) -> LegacyReportClient {
    LegacyReportClient::new(&LegacyConfig {
        api_url: url.to_string(),
        view_id: "98765".to_string(),
        access_token: Some("legacy-token".to_string()),
        subject_dimension: "ga:dimension2".to_string(),
    })
    .expect("legacy client")
}

#[tokio::test]
async fn legacy_fetch_posts_batch_with_quota_user() {
    let reply = json!({ "reports": [{
        "columnHeader": {
            "dimensions": ["ga:deviceCategory"],
            "metricHeader": { "metricHeaderEntries": [{ "name": "ga:pageviews", "type": "INTEGER" }] }
        },
        "data": { "rows": [{ "dimensions": ["mobile"], "metrics": [{ "values": ["14"] }] }] }
    }]});
    let (url, seen) = spawn_stub(StatusCode::OK, reply).await;

    let report = legacy_client(&url)
        .fetch(&LegacyQuery {
            subject_id: "story-42".to_string(),
            range: DateRange::new(day(2023, 1, 1), day(2023, 6, 30)),
            dimension: Some(DimensionKey::DeviceCategory),
            quota_user: Some("editor-3".to_string()),
        })
        .await
        .expect("report");
    assert_eq!(report.data.rows.len(), 1);

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen[0].uri, "/v4/reports:batchGet?quotaUser=editor-3");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer legacy-token"));
    let requests = seen[0].body["reportRequests"].as_array().expect("requests");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["viewId"], "98765");
    assert_eq!(requests[0]["dimensions"], json!([{ "name": "ga:deviceCategory" }]));
}

#[tokio::test]
async fn legacy_batch_sends_every_query() {
    let (url, seen) = spawn_stub(StatusCode::OK, json!({ "reports": [{}, {}] })).await;
    let query = |dimension| LegacyQuery {
        subject_id: "story-1".to_string(),
        range: DateRange::new(day(2023, 1, 1), day(2023, 1, 31)),
        dimension,
        quota_user: None,
    };

    let batch = legacy_client(&url)
        .batch_get(&[query(Some(DimensionKey::Date)), query(None)], None)
        .await
        .expect("batch");
    assert_eq!(batch.reports.len(), 2);

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen[0].uri, "/v4/reports:batchGet");
    assert_eq!(seen[0].body["reportRequests"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn legacy_fault_is_a_transport_error() {
    let (url, _) = spawn_stub(StatusCode::FORBIDDEN, json!({ "error": { "code": 403 } })).await;
    let err = legacy_client(&url)
        .fetch(&LegacyQuery {
            subject_id: "story-1".to_string(),
            range: DateRange::new(day(2023, 1, 1), day(2023, 1, 31)),
            dimension: None,
            quota_user: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::Transport(_)));
    assert!(err.to_string().contains("403"));
}
