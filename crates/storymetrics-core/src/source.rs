//! Seams between the facade and the two analytics backends.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ReportError;
use crate::normalize::{LegacyReport, NextGenReport};
use crate::report::{DateRange, ReportKind};
use crate::vocabulary::DimensionKey;

/// One report request against the legacy backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyQuery {
    pub subject_id: String,
    /// Already clipped to end before the cutover.
    pub range: DateRange,
    pub dimension: Option<DimensionKey>,
    pub quota_user: Option<String>,
}

/// Parameters sent to the next-gen reporting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextGenParams {
    pub story_id: String,
    #[serde(flatten)]
    pub range: DateRange,
}

#[async_trait]
pub trait LegacySource: Send + Sync + 'static {
    async fn fetch(&self, query: &LegacyQuery) -> Result<LegacyReport, ReportError>;
}

#[async_trait]
pub trait NextGenSource: Send + Sync + 'static {
    async fn fetch(
        &self,
        kind: ReportKind,
        params: &NextGenParams,
    ) -> Result<NextGenReport, ReportError>;
}
