use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use storymetrics_core::normalize::NextGenReport;
use storymetrics_core::report::ReportKind;
use storymetrics_core::source::{NextGenParams, NextGenSource};
use storymetrics_core::ReportError;

use crate::service_client::ServiceClient;

/// Reads reports from the next-gen reporting microservice.
///
/// The date range is forwarded as given; clipping is the caller's concern.
#[derive(Clone)]
pub struct NextGenReportClient {
    service: ServiceClient,
}

impl NextGenReportClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    pub fn from_url(url: &str) -> Result<Self, ReportError> {
        ServiceClient::new(url).map(Self::new)
    }

    pub async fn fetch_action(
        &self,
        action: &str,
        params: &NextGenParams,
    ) -> Result<NextGenReport, ReportError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(action, story_id = %params.story_id, %request_id, "fetching next-gen report");
        self.service
            .request(action, params, json!({ "requestId": request_id }))
            .await
    }
}

#[async_trait]
impl NextGenSource for NextGenReportClient {
    async fn fetch(
        &self,
        kind: ReportKind,
        params: &NextGenParams,
    ) -> Result<NextGenReport, ReportError> {
        self.fetch_action(kind.action(), params).await
    }
}
