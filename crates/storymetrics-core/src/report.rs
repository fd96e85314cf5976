//! Request and result types shared by every stage of the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ReportError;
use crate::vocabulary::{DimensionKey, MetricKey};

/// Inclusive range of calendar days in the reporting view's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }
}

/// "Give me metrics for this subject over these days."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    subject_id: String,
    range: DateRange,
    quota_user: Option<String>,
}

impl ReportRequest {
    pub fn new(
        subject_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ReportError> {
        let request = Self {
            subject_id: subject_id.into(),
            range: DateRange::new(start_date, end_date),
            quota_user: None,
        };
        request.validate()?;
        Ok(request)
    }

    /// Build a request from two instants, reducing each to the day it falls
    /// on in the view timezone.
    pub fn from_instants(
        subject_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        view_tz: Tz,
    ) -> Result<Self, ReportError> {
        Self::new(
            subject_id,
            start.with_timezone(&view_tz).date_naive(),
            end.with_timezone(&view_tz).date_naive(),
        )
    }

    /// Attribute the legacy API's rate limit to a specific user.
    pub fn with_quota_user(mut self, quota_user: impl Into<String>) -> Self {
        self.quota_user = Some(quota_user.into());
        self
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.subject_id.trim().is_empty() {
            return Err(ReportError::validation("no subject ID was provided"));
        }
        if self.range.start_date > self.range.end_date {
            return Err(ReportError::validation(
                "end_date must be on or after start_date",
            ));
        }
        Ok(())
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn start_date(&self) -> NaiveDate {
        self.range.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.range.end_date
    }

    pub fn quota_user(&self) -> Option<&str> {
        self.quota_user.as_deref()
    }
}

/// The logical reports the engine can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Day-by-day trend.
    ByDay,
    /// Single-period totals.
    Totals,
    /// Breakdown by acquisition channel.
    Acquisition,
    /// Breakdown by device category.
    Device,
}

impl ReportKind {
    /// Action name understood by the remote reporting service.
    pub fn action(self) -> &'static str {
        match self {
            ReportKind::ByDay => "storyReportByDay",
            ReportKind::Totals => "storyReport",
            ReportKind::Acquisition => "storyAcquisitionReport",
            ReportKind::Device => "storyDeviceReport",
        }
    }

    /// Dimension the rows of this report are keyed by.
    pub fn dimension(self) -> Option<DimensionKey> {
        match self {
            ReportKind::ByDay => Some(DimensionKey::Date),
            ReportKind::Totals => None,
            ReportKind::Acquisition => Some(DimensionKey::ChannelGrouping),
            ReportKind::Device => Some(DimensionKey::DeviceCategory),
        }
    }
}

/// Canonical metric values for one aggregation bucket.
///
/// Absent keys read as 0. Source metrics with no canonical name are kept in a
/// separate map rather than dropped; that map never holds a canonical name, so
/// the flattened JSON object has no duplicate keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSet {
    #[serde(flatten)]
    values: BTreeMap<MetricKey, f64>,
    #[serde(flatten)]
    unmapped: BTreeMap<String, f64>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every canonical key present, all at 0.
    pub fn zeroed() -> Self {
        Self {
            values: MetricKey::ALL.into_iter().map(|k| (k, 0.0)).collect(),
            unmapped: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: MetricKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: MetricKey) -> f64 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: MetricKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn set(&mut self, key: MetricKey, value: f64) {
        self.values.insert(key, value);
    }

    /// Add `value` onto `key`, treating an absent key as 0.
    pub fn add(&mut self, key: MetricKey, value: f64) {
        *self.values.entry(key).or_insert(0.0) += value;
    }

    /// Store a metric under its source name. A name that is itself a
    /// canonical key is added onto that key instead.
    pub fn set_unmapped(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match MetricKey::from_canonical(&name) {
            Some(key) => self.add(key, value),
            None => {
                self.unmapped.insert(name, value);
            }
        }
    }

    pub fn unmapped(&self, name: &str) -> Option<f64> {
        self.unmapped.get(name).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = MetricKey> + '_ {
        self.values.keys().copied()
    }

    pub fn unmapped_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.unmapped.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.unmapped.is_empty()
    }
}

/// Value of a row's dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Day(NaiveDate),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub key: DimensionKey,
    pub value: DimensionValue,
}

/// One unit of a report: a dimension value (or none) paired with its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub dimension: Option<Dimension>,
    pub metrics: MetricSet,
}

impl Row {
    pub fn day(&self) -> Option<NaiveDate> {
        match self.dimension.as_ref().map(|d| &d.value) {
            Some(DimensionValue::Day(day)) => Some(*day),
            _ => None,
        }
    }
}

/// Serializes as `{"<dimension>": value, "metrics": {...}}`.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(dimension) = &self.dimension {
            map.serialize_entry(dimension.key.as_str(), &dimension.value)?;
        }
        map.serialize_entry("metrics", &self.metrics)?;
        map.end()
    }
}
