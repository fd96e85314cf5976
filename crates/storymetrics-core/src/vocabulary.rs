//! Canonical metric and dimension names, and the per-source tables that map
//! each backend's vocabulary onto them.
//!
//! The tables are plain data. Adding a metric means adding a [`MetricKey`]
//! variant and one row per source table; the lookup functions below do not
//! change.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::report::DimensionValue;

/// Which analytics backend a name or a raw report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Property-based reporting API, authoritative before the cutover.
    Legacy,
    /// Event-based reporting service, authoritative from the cutover on.
    NextGen,
}

/// Source-independent name of a measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    Pageviews,
    UniquePageviews,
    Sessions,
    Users,
    AvgSessionDuration,
    BounceRate,
    TimeOnPage,
    AvgTimeOnPage,
    Shares,
}

impl MetricKey {
    pub const ALL: [MetricKey; 9] = [
        MetricKey::Pageviews,
        MetricKey::UniquePageviews,
        MetricKey::Sessions,
        MetricKey::Users,
        MetricKey::AvgSessionDuration,
        MetricKey::BounceRate,
        MetricKey::TimeOnPage,
        MetricKey::AvgTimeOnPage,
        MetricKey::Shares,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::Pageviews => "pageviews",
            MetricKey::UniquePageviews => "uniquePageviews",
            MetricKey::Sessions => "sessions",
            MetricKey::Users => "users",
            MetricKey::AvgSessionDuration => "avgSessionDuration",
            MetricKey::BounceRate => "bounceRate",
            MetricKey::TimeOnPage => "timeOnPage",
            MetricKey::AvgTimeOnPage => "avgTimeOnPage",
            MetricKey::Shares => "shares",
        }
    }

    /// Reverse of [`MetricKey::as_str`].
    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn merge_policy(self) -> MergePolicy {
        MERGE_POLICIES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, p)| *p)
            .unwrap_or(MergePolicy::Sum)
    }

    pub fn label(self) -> String {
        label(self.as_str())
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How two values of the same metric combine when a report straddles the
/// cutover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Sum,
    /// Mean when both sides are non-zero, otherwise whichever side is non-zero.
    AverageIfBothPresent,
}

/// Merge policy per canonical key. Keys not listed here are summed.
pub const MERGE_POLICIES: &[(MetricKey, MergePolicy)] = &[
    (MetricKey::Pageviews, MergePolicy::Sum),
    (MetricKey::UniquePageviews, MergePolicy::Sum),
    (MetricKey::Sessions, MergePolicy::Sum),
    (MetricKey::Users, MergePolicy::Sum),
    (MetricKey::AvgSessionDuration, MergePolicy::AverageIfBothPresent),
    (MetricKey::BounceRate, MergePolicy::Sum),
    (MetricKey::TimeOnPage, MergePolicy::Sum),
    (MetricKey::AvgTimeOnPage, MergePolicy::AverageIfBothPresent),
    (MetricKey::Shares, MergePolicy::Sum),
];

/// Legacy metric expressions. Also the standard metric list sent with every
/// legacy report request, in this order.
pub const LEGACY_METRICS: &[(&str, MetricKey)] = &[
    ("ga:pageviews", MetricKey::Pageviews),
    ("ga:uniquePageviews", MetricKey::UniquePageviews),
    ("ga:sessions", MetricKey::Sessions),
    ("ga:users", MetricKey::Users),
    ("ga:avgSessionDuration", MetricKey::AvgSessionDuration),
    ("ga:bounceRate", MetricKey::BounceRate),
    ("ga:timeOnPage", MetricKey::TimeOnPage),
    ("ga:avgTimeOnPage", MetricKey::AvgTimeOnPage),
    // custom metric slot 1 holds social shares
    ("ga:metric1", MetricKey::Shares),
];

/// Next-gen metric names. The next-gen backend has no unique-pageview or
/// total-time-on-page equivalent.
pub const NEXT_GEN_METRICS: &[(&str, MetricKey)] = &[
    ("screenPageViews", MetricKey::Pageviews),
    ("sessions", MetricKey::Sessions),
    ("totalUsers", MetricKey::Users),
    ("averageSessionDuration", MetricKey::AvgSessionDuration),
    ("bounceRate", MetricKey::BounceRate),
    ("userEngagementDuration", MetricKey::AvgTimeOnPage),
    ("countCustomEvent:ua_metric_1", MetricKey::Shares),
];

/// Canonical dimension a report row can be keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DimensionKey {
    Date,
    ChannelGrouping,
    DeviceCategory,
    /// A source dimension with no canonical counterpart, carried verbatim.
    Other(String),
}

impl DimensionKey {
    pub fn as_str(&self) -> &str {
        match self {
            DimensionKey::Date => "date",
            DimensionKey::ChannelGrouping => "channelGrouping",
            DimensionKey::DeviceCategory => "deviceCategory",
            DimensionKey::Other(name) => name,
        }
    }

    /// Apply the per-key formatter to a raw dimension value.
    pub fn format_value(&self, raw: &str) -> Result<DimensionValue, ReportError> {
        match self {
            DimensionKey::Date => parse_day(raw).map(DimensionValue::Day),
            _ => Ok(DimensionValue::Label(raw.to_string())),
        }
    }
}

pub const LEGACY_DIMENSIONS: &[(&str, DimensionKey)] = &[
    ("ga:date", DimensionKey::Date),
    ("ga:channelGrouping", DimensionKey::ChannelGrouping),
    ("ga:deviceCategory", DimensionKey::DeviceCategory),
];

pub const NEXT_GEN_DIMENSIONS: &[(&str, DimensionKey)] = &[
    ("date", DimensionKey::Date),
    ("sessionDefaultChannelGrouping", DimensionKey::ChannelGrouping),
    ("deviceCategory", DimensionKey::DeviceCategory),
];

/// A source metric name after lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricName {
    Canonical(MetricKey),
    Unmapped(String),
}

fn metric_table(source: Source) -> &'static [(&'static str, MetricKey)] {
    match source {
        Source::Legacy => LEGACY_METRICS,
        Source::NextGen => NEXT_GEN_METRICS,
    }
}

fn dimension_table(source: Source) -> &'static [(&'static str, DimensionKey)] {
    match source {
        Source::Legacy => LEGACY_DIMENSIONS,
        Source::NextGen => NEXT_GEN_DIMENSIONS,
    }
}

/// Map a source metric name to its canonical key.
///
/// Names missing from the table still resolve when they already are a
/// canonical key, with or without the legacy `ga:` prefix. Anything else
/// comes back unchanged as [`MetricName::Unmapped`].
pub fn metric_key(source: Source, name: &str) -> MetricName {
    metric_table(source)
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, k)| *k)
        .or_else(|| MetricKey::from_canonical(name.strip_prefix("ga:").unwrap_or(name)))
        .map(MetricName::Canonical)
        .unwrap_or_else(|| MetricName::Unmapped(name.to_string()))
}

pub fn dimension_key(source: Source, name: &str) -> DimensionKey {
    dimension_table(source)
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, k)| k.clone())
        .unwrap_or_else(|| DimensionKey::Other(name.to_string()))
}

/// Source-side name of a canonical dimension, if the source has one.
pub fn source_dimension_name(source: Source, key: &DimensionKey) -> Option<&'static str> {
    dimension_table(source)
        .iter()
        .find(|(_, k)| k == key)
        .map(|(n, _)| *n)
}

/// Human label for a key: `avgSessionDuration` becomes `Avg Session Duration`.
pub fn label(name: &str) -> String {
    titleize(&underscore(name))
}

fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        if c == '-' {
            out.push('_');
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn titleize(underscored: &str) -> String {
    underscored
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_day(raw: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| ReportError::malformed(format!("unparseable date dimension value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_key_has_a_merge_policy() {
        for key in MetricKey::ALL {
            assert!(MERGE_POLICIES.iter().any(|(k, _)| *k == key), "{key} missing");
        }
        assert_eq!(
            MetricKey::AvgTimeOnPage.merge_policy(),
            MergePolicy::AverageIfBothPresent
        );
        assert_eq!(MetricKey::Sessions.merge_policy(), MergePolicy::Sum);
    }

    #[test]
    fn legacy_table_covers_all_canonical_keys() {
        for key in MetricKey::ALL {
            assert!(LEGACY_METRICS.iter().any(|(_, k)| *k == key), "{key} missing");
        }
    }

    #[test]
    fn mapped_keys_round_trip_through_canonical_name() {
        for source in [Source::Legacy, Source::NextGen] {
            for (name, key) in metric_table(source) {
                let MetricName::Canonical(mapped) = metric_key(source, name) else {
                    panic!("{name} should be mapped");
                };
                assert_eq!(mapped, *key);
                assert_eq!(MetricKey::from_canonical(mapped.as_str()), Some(*key));
            }
        }
    }

    #[test]
    fn unmapped_metric_passes_through_verbatim() {
        assert_eq!(
            metric_key(Source::NextGen, "engagementRate"),
            MetricName::Unmapped("engagementRate".to_string())
        );
        assert_eq!(
            metric_key(Source::Legacy, "ga:newUsers"),
            MetricName::Unmapped("ga:newUsers".to_string())
        );
    }

    #[test]
    fn canonical_names_resolve_without_table_entry() {
        assert_eq!(
            metric_key(Source::NextGen, "uniquePageviews"),
            MetricName::Canonical(MetricKey::UniquePageviews)
        );
        assert_eq!(
            metric_key(Source::Legacy, "pageviews"),
            MetricName::Canonical(MetricKey::Pageviews)
        );
    }

    #[test]
    fn canonical_serde_name_matches_as_str() {
        for key in MetricKey::ALL {
            let json = serde_json::to_value(key).expect("serialize");
            assert_eq!(json, serde_json::Value::String(key.as_str().to_string()));
        }
    }

    #[test]
    fn dimension_lookup_per_source() {
        assert_eq!(dimension_key(Source::Legacy, "ga:date"), DimensionKey::Date);
        assert_eq!(
            dimension_key(Source::NextGen, "sessionDefaultChannelGrouping"),
            DimensionKey::ChannelGrouping
        );
        assert_eq!(
            dimension_key(Source::NextGen, "city"),
            DimensionKey::Other("city".to_string())
        );
        assert_eq!(
            source_dimension_name(Source::Legacy, &DimensionKey::DeviceCategory),
            Some("ga:deviceCategory")
        );
    }

    #[test]
    fn date_formatter_accepts_compact_and_iso_days() {
        let expected = DimensionValue::Day(NaiveDate::from_ymd_opt(2023, 7, 4).expect("date"));
        assert_eq!(DimensionKey::Date.format_value("20230704").expect("compact"), expected);
        assert_eq!(DimensionKey::Date.format_value("2023-07-04").expect("iso"), expected);
        assert!(DimensionKey::Date.format_value("July 4th").is_err());
    }

    #[test]
    fn labels_are_titleized() {
        assert_eq!(MetricKey::AvgSessionDuration.label(), "Avg Session Duration");
        assert_eq!(MetricKey::Pageviews.label(), "Pageviews");
        assert_eq!(MetricKey::UniquePageviews.label(), "Unique Pageviews");
        assert_eq!(label("channelGrouping"), "Channel Grouping");
    }
}
