//! Entry point used by the API layer: one method per report shape.

use std::sync::Arc;

use tracing::debug;

use crate::cutover::{CutoverClassifier, SourcePlan};
use crate::error::ReportError;
use crate::merge::{merge_metrics, merge_rows};
use crate::normalize::{normalize, RawReport};
use crate::report::{MetricSet, ReportKind, ReportRequest, Row};
use crate::source::{LegacyQuery, LegacySource, NextGenParams, NextGenSource};

/// Answers engagement reports for a subject, reading from whichever
/// backend(s) cover the requested range.
///
/// Both source handles are created once at startup and shared. When a range
/// straddles the cutover the two fetches run concurrently and either failure
/// fails the whole report.
#[derive(Clone)]
pub struct ReportFacade {
    legacy: Arc<dyn LegacySource>,
    next_gen: Arc<dyn NextGenSource>,
    classifier: CutoverClassifier,
}

impl ReportFacade {
    pub fn new(legacy: Arc<dyn LegacySource>, next_gen: Arc<dyn NextGenSource>) -> Self {
        Self {
            legacy,
            next_gen,
            classifier: CutoverClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: CutoverClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &CutoverClassifier {
        &self.classifier
    }

    /// Day-by-day trend.
    pub async fn story_report_by_day(&self, req: &ReportRequest) -> Result<Vec<Row>, ReportError> {
        self.rows(ReportKind::ByDay, req).await
    }

    /// Breakdown by acquisition channel.
    pub async fn story_acquisition_report(
        &self,
        req: &ReportRequest,
    ) -> Result<Vec<Row>, ReportError> {
        self.rows(ReportKind::Acquisition, req).await
    }

    /// Breakdown by device category.
    pub async fn story_device_report(&self, req: &ReportRequest) -> Result<Vec<Row>, ReportError> {
        self.rows(ReportKind::Device, req).await
    }

    /// Totals for the whole period. A source that returns no rows counts as
    /// all zeros.
    pub async fn story_report(&self, req: &ReportRequest) -> Result<MetricSet, ReportError> {
        let (legacy, next_gen) = self.fetch(ReportKind::Totals, req).await?;
        let totals = |rows: Vec<Row>| {
            rows.into_iter()
                .next()
                .map(|row| row.metrics)
                .unwrap_or_else(MetricSet::zeroed)
        };

        Ok(match (legacy.map(totals), next_gen.map(totals)) {
            (Some(legacy), Some(next_gen)) => {
                let merged = merge_metrics(&legacy, &next_gen);
                debug!(subject_id = req.subject_id(), "merged legacy and next-gen totals");
                merged
            }
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => MetricSet::zeroed(),
        })
    }

    async fn rows(&self, kind: ReportKind, req: &ReportRequest) -> Result<Vec<Row>, ReportError> {
        match self.fetch(kind, req).await? {
            (Some(legacy), Some(next_gen)) => {
                let merged = merge_rows(&legacy, &next_gen);
                debug!(
                    report = kind.action(),
                    legacy_rows = legacy.len(),
                    next_gen_rows = next_gen.len(),
                    merged_rows = merged.len(),
                    "merged report rows"
                );
                Ok(merged)
            }
            (Some(only), None) | (None, Some(only)) => Ok(only),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Fetch and normalize from each source the range needs.
    async fn fetch(
        &self,
        kind: ReportKind,
        req: &ReportRequest,
    ) -> Result<(Option<Vec<Row>>, Option<Vec<Row>>), ReportError> {
        req.validate()?;
        let plan = self.classifier.classify(req.start_date(), req.end_date());
        debug!(
            report = kind.action(),
            subject_id = req.subject_id(),
            use_legacy = plan.use_legacy,
            use_next_gen = plan.use_next_gen,
            "selected report sources"
        );

        let SourcePlan {
            use_legacy,
            use_next_gen,
        } = plan;
        let legacy = async {
            if use_legacy {
                self.legacy_rows(kind, req).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let next_gen = async {
            if use_next_gen {
                self.next_gen_rows(kind, req).await.map(Some)
            } else {
                Ok(None)
            }
        };
        tokio::try_join!(legacy, next_gen)
    }

    async fn legacy_rows(
        &self,
        kind: ReportKind,
        req: &ReportRequest,
    ) -> Result<Vec<Row>, ReportError> {
        let query = LegacyQuery {
            subject_id: req.subject_id().to_string(),
            range: self.classifier.legacy_range(req.range()),
            dimension: kind.dimension(),
            quota_user: req.quota_user().map(str::to_string),
        };
        let report = self.legacy.fetch(&query).await?;
        normalize(&RawReport::Legacy(report))
    }

    async fn next_gen_rows(
        &self,
        kind: ReportKind,
        req: &ReportRequest,
    ) -> Result<Vec<Row>, ReportError> {
        let params = NextGenParams {
            story_id: req.subject_id().to_string(),
            range: req.range(),
        };
        let report = self.next_gen.fetch(kind, &params).await?;
        normalize(&RawReport::NextGen(report))
    }
}
