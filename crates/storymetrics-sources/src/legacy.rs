use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use storymetrics_core::config::LegacyConfig;
use storymetrics_core::normalize::{LegacyBatchResponse, LegacyReport};
use storymetrics_core::report::DateRange;
use storymetrics_core::source::{LegacyQuery, LegacySource};
use storymetrics_core::vocabulary::{source_dimension_name, Source, LEGACY_METRICS};
use storymetrics_core::ReportError;

/// Body of a legacy `reports:batchGet` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub report_requests: Vec<LegacyReportRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReportRequest {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<NamedDimension>,
    pub metrics: Vec<MetricExpression>,
    pub dimension_filter_clauses: Vec<FilterClause>,
    pub include_empty_rows: bool,
    pub hide_totals: bool,
    pub hide_value_ranges: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedDimension {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricExpression {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterClause {
    pub filters: Vec<DimensionFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilter {
    pub dimension_name: String,
    pub operator: &'static str,
    pub expressions: Vec<String>,
}

/// Client for the legacy property-based reporting API.
///
/// Built once at startup from [`LegacyConfig`]; the underlying connection
/// pool and credentials are shared by every report.
#[derive(Clone)]
pub struct LegacyReportClient {
    client: Client,
    batch_url: Url,
    view_id: String,
    subject_dimension: String,
}

impl LegacyReportClient {
    pub fn new(config: &LegacyConfig) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.access_token {
            let mut value = HeaderValue::try_from(format!("Bearer {token}"))
                .map_err(|e| ReportError::validation(format!("invalid legacy access token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("building legacy reporting HTTP client")?;

        let raw = format!("{}/v4/reports:batchGet", config.api_url.trim_end_matches('/'));
        let batch_url = Url::parse(&raw)
            .map_err(|e| ReportError::validation(format!("invalid legacy API URL '{raw}': {e}")))?;

        Ok(Self {
            client,
            batch_url,
            view_id: config.view_id.clone(),
            subject_dimension: config.subject_dimension.clone(),
        })
    }

    /// Request body for one query: the standard metric list, filtered to the
    /// query's subject.
    pub fn build_request(&self, query: &LegacyQuery) -> LegacyReportRequest {
        let dimensions = query
            .dimension
            .iter()
            .map(|key| NamedDimension {
                name: source_dimension_name(Source::Legacy, key)
                    .unwrap_or(key.as_str())
                    .to_string(),
            })
            .collect();

        LegacyReportRequest {
            view_id: self.view_id.clone(),
            date_ranges: vec![query.range],
            dimensions,
            metrics: LEGACY_METRICS
                .iter()
                .map(|(expression, _)| MetricExpression {
                    expression: expression.to_string(),
                })
                .collect(),
            dimension_filter_clauses: vec![FilterClause {
                filters: vec![DimensionFilter {
                    dimension_name: self.subject_dimension.clone(),
                    operator: "EXACT",
                    expressions: vec![query.subject_id.clone()],
                }],
            }],
            include_empty_rows: true,
            hide_totals: true,
            hide_value_ranges: true,
        }
    }

    /// Send several report requests in one batch call. Reports come back in
    /// request order.
    pub async fn batch_get(
        &self,
        queries: &[LegacyQuery],
        quota_user: Option<&str>,
    ) -> Result<LegacyBatchResponse, ReportError> {
        let body = BatchGetRequest {
            report_requests: queries.iter().map(|q| self.build_request(q)).collect(),
        };
        debug!(reports = queries.len(), quota_user, "sending legacy batch report request");

        let mut request = self.client.post(self.batch_url.clone()).json(&body);
        if let Some(quota_user) = quota_user {
            request = request.query(&[("quotaUser", quota_user)]);
        }
        let resp = request
            .send()
            .await
            .context("legacy reporting request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("legacy reporting API error {status}: {body}").into());
        }

        let batch = resp
            .json::<LegacyBatchResponse>()
            .await
            .context("legacy reporting response parse failed")?;
        Ok(batch)
    }
}

#[async_trait]
impl LegacySource for LegacyReportClient {
    async fn fetch(&self, query: &LegacyQuery) -> Result<LegacyReport, ReportError> {
        self.batch_get(std::slice::from_ref(query), query.quota_user.as_deref())
            .await?
            .reports
            .into_iter()
            .next()
            .ok_or_else(|| ReportError::malformed("legacy batch response contained no reports"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use storymetrics_core::vocabulary::DimensionKey;

    use super::*;

    fn client() -> LegacyReportClient {
        LegacyReportClient::new(&LegacyConfig {
            api_url: "https://reporting.example.com/".to_string(),
            view_id: "12345".to_string(),
            access_token: Some("secret".to_string()),
            subject_dimension: "ga:dimension2".to_string(),
        })
        .expect("client")
    }

    fn query(dimension: Option<DimensionKey>) -> LegacyQuery {
        LegacyQuery {
            subject_id: "story-42".to_string(),
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2023, 6, 1).expect("date"),
                NaiveDate::from_ymd_opt(2023, 6, 30).expect("date"),
            ),
            dimension,
            quota_user: None,
        }
    }

    #[test]
    fn batch_url_is_joined_without_double_slash() {
        assert_eq!(
            client().batch_url.as_str(),
            "https://reporting.example.com/v4/reports:batchGet"
        );
    }

    #[test]
    fn request_body_matches_wire_format() {
        let request = client().build_request(&query(Some(DimensionKey::ChannelGrouping)));
        let body = serde_json::to_value(request).expect("serialize");
        assert_eq!(body["viewId"], "12345");
        assert_eq!(
            body["dateRanges"],
            json!([{ "startDate": "2023-06-01", "endDate": "2023-06-30" }])
        );
        assert_eq!(body["dimensions"], json!([{ "name": "ga:channelGrouping" }]));
        assert_eq!(
            body["dimensionFilterClauses"],
            json!([{ "filters": [{
                "dimensionName": "ga:dimension2",
                "operator": "EXACT",
                "expressions": ["story-42"]
            }]}])
        );
        assert_eq!(body["metrics"].as_array().map(Vec::len), Some(9));
        assert_eq!(body["metrics"][8], json!({ "expression": "ga:metric1" }));
        assert_eq!(body["includeEmptyRows"], true);
    }

    #[test]
    fn totals_request_has_no_dimensions() {
        let body = serde_json::to_value(client().build_request(&query(None))).expect("serialize");
        assert!(body.get("dimensions").is_none());
    }
}
