//! Raw backend report shapes and their conversion into canonical [`Row`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReportError;
use crate::report::{Dimension, MetricSet, Row};
use crate::vocabulary::{dimension_key, metric_key, DimensionKey, MetricName, Source};

/// Body of a legacy batch-report call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBatchResponse {
    #[serde(default)]
    pub reports: Vec<LegacyReport>,
}

/// One report from a legacy batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReport {
    #[serde(default)]
    pub column_header: LegacyColumnHeader,
    #[serde(default)]
    pub data: LegacyReportData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyColumnHeader {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metric_header: LegacyMetricHeader,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMetricHeader {
    #[serde(default)]
    pub metric_header_entries: Vec<MetricHeader>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReportData {
    #[serde(default)]
    pub rows: Vec<LegacyRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// One value set per requested date range; only the first is read.
    #[serde(default)]
    pub metrics: Vec<LegacyValueSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyValueSet {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricHeader {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
}

/// Report returned (as `data`) by the next-gen reporting service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextGenReport {
    #[serde(default)]
    pub dimension_headers: Vec<DimensionHeader>,
    #[serde(default)]
    pub metric_headers: Vec<MetricHeader>,
    #[serde(default)]
    pub rows: Vec<NextGenRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionHeader {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextGenRow {
    #[serde(default)]
    pub dimension_values: Vec<ValueCell>,
    #[serde(default)]
    pub metric_values: Vec<ValueCell>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueCell {
    #[serde(default)]
    pub value: Value,
}

/// A raw report from either backend.
#[derive(Debug, Clone)]
pub enum RawReport {
    Legacy(LegacyReport),
    NextGen(NextGenReport),
}

impl RawReport {
    pub fn source(&self) -> Source {
        match self {
            RawReport::Legacy(_) => Source::Legacy,
            RawReport::NextGen(_) => Source::NextGen,
        }
    }
}

/// Both raw shapes reduced to header names plus positional value lists.
struct Table<'a> {
    dimensions: Vec<&'a str>,
    metrics: Vec<&'a str>,
    rows: Vec<TableRow<'a>>,
}

struct TableRow<'a> {
    dimensions: Vec<String>,
    metrics: Vec<&'a Value>,
}

impl RawReport {
    fn table<'a>(&'a self) -> Result<Table<'a>, ReportError> {
        match self {
            RawReport::Legacy(report) => {
                let header = &report.column_header;
                let rows = report
                    .data
                    .rows
                    .iter()
                    .map(|row| -> Result<TableRow<'a>, ReportError> {
                        let values = row.metrics.first().ok_or_else(|| {
                            ReportError::malformed("legacy row has no metric values")
                        })?;
                        Ok(TableRow {
                            dimensions: row.dimensions.clone(),
                            metrics: values.values.iter().collect(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Table {
                    dimensions: header.dimensions.iter().map(String::as_str).collect(),
                    metrics: header
                        .metric_header
                        .metric_header_entries
                        .iter()
                        .map(|m| m.name.as_str())
                        .collect(),
                    rows,
                })
            }
            RawReport::NextGen(report) => Ok(Table {
                dimensions: report
                    .dimension_headers
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect(),
                metrics: report.metric_headers.iter().map(|m| m.name.as_str()).collect(),
                rows: report
                    .rows
                    .iter()
                    .map(|row| TableRow {
                        dimensions: row.dimension_values.iter().map(|c| text(&c.value)).collect(),
                        metrics: row.metric_values.iter().map(|c| &c.value).collect(),
                    })
                    .collect(),
            }),
        }
    }
}

/// Convert a raw report into canonical rows, in source order.
///
/// An empty report yields no rows. Metric names missing from the source's
/// table are kept under their source name.
pub fn normalize(raw: &RawReport) -> Result<Vec<Row>, ReportError> {
    let source = raw.source();
    let table = raw.table()?;
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }

    // Rows carry at most one dimension.
    let dimension = match table.dimensions.as_slice() {
        [] => None,
        [name] => Some(dimension_key(source, name)),
        names => {
            return Err(ReportError::malformed(format!(
                "expected at most one dimension, got {}",
                names.len()
            )))
        }
    };
    let metrics: Vec<MetricName> = table
        .metrics
        .iter()
        .map(|name| metric_key(source, name))
        .collect();

    table
        .rows
        .iter()
        .map(|row| normalize_row(dimension.as_ref(), &metrics, row))
        .collect()
}

fn normalize_row(
    dimension: Option<&DimensionKey>,
    metric_names: &[MetricName],
    row: &TableRow<'_>,
) -> Result<Row, ReportError> {
    let expected_dimensions = usize::from(dimension.is_some());
    if row.dimensions.len() != expected_dimensions {
        return Err(ReportError::malformed(format!(
            "row has {} dimension values, header declares {}",
            row.dimensions.len(),
            expected_dimensions
        )));
    }
    if row.metrics.len() != metric_names.len() {
        return Err(ReportError::malformed(format!(
            "row has {} metric values, header declares {}",
            row.metrics.len(),
            metric_names.len()
        )));
    }

    let dimension = match (dimension, row.dimensions.first()) {
        (Some(key), Some(raw)) => Some(Dimension {
            key: key.clone(),
            value: key.format_value(raw)?,
        }),
        _ => None,
    };

    let mut metrics = MetricSet::new();
    for (name, value) in metric_names.iter().zip(&row.metrics) {
        let number = coerce_metric(value)?;
        match name {
            MetricName::Canonical(key) => metrics.add(*key, number),
            MetricName::Unmapped(name) => metrics.set_unmapped(name.clone(), number),
        }
    }

    Ok(Row { dimension, metrics })
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Backends send numbers as strings; blanks and nulls count as 0.
fn coerce_metric(value: &Value) -> Result<f64, ReportError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(0.0),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(ReportError::malformed(format!(
            "metric value {value} is not a non-negative number"
        ))),
    }
}
