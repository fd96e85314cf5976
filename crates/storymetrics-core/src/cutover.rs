//! Decides which backend(s) a date range must be read from.
//!
//! Days strictly before the cutover date are served by the legacy backend; the
//! cutover date and every later day are served by the next-gen backend.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::report::DateRange;

/// First day (in the view timezone) with next-gen data.
pub const CUTOVER_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2023, 7, 1) {
    Some(d) => d,
    None => panic!("invalid cutover date"),
};

/// Timezone the legacy reporting view is configured in.
pub const VIEW_TZ: Tz = chrono_tz::America::Chicago;

/// Start of [`CUTOVER_DATE`] in [`VIEW_TZ`] (`2023-07-01T00:00:00-05:00`).
pub fn cutover_instant() -> DateTime<Utc> {
    CutoverClassifier::default().cutover_instant(VIEW_TZ)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePlan {
    pub use_legacy: bool,
    pub use_next_gen: bool,
}

impl SourcePlan {
    pub fn is_straddling(&self) -> bool {
        self.use_legacy && self.use_next_gen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoverClassifier {
    cutover: NaiveDate,
}

impl Default for CutoverClassifier {
    fn default() -> Self {
        Self::new(CUTOVER_DATE)
    }
}

impl CutoverClassifier {
    pub fn new(cutover: NaiveDate) -> Self {
        Self { cutover }
    }

    pub fn cutover(&self) -> NaiveDate {
        self.cutover
    }

    /// First instant of the cutover day in `tz`.
    pub fn cutover_instant(&self, tz: Tz) -> DateTime<Utc> {
        let midnight = self.cutover.and_time(chrono::NaiveTime::MIN);
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc())
    }

    /// At least one flag is set for any range with `start <= end`.
    pub fn classify(&self, start_date: NaiveDate, end_date: NaiveDate) -> SourcePlan {
        SourcePlan {
            use_legacy: start_date < self.cutover,
            use_next_gen: end_date >= self.cutover,
        }
    }

    /// Clip a range so it ends on the last legacy day at the latest.
    pub fn legacy_range(&self, range: DateRange) -> DateRange {
        let last_legacy_day = self.cutover - Duration::days(1);
        let end_date = range.end_date.min(last_legacy_day);
        DateRange::new(range.start_date.min(end_date), end_date)
    }
}
