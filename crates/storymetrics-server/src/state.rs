use chrono_tz::Tz;

use storymetrics_core::ReportFacade;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Report engine. Holds the backend clients built once at startup.
    pub reports: ReportFacade,

    /// Timezone used to reduce RFC 3339 instants in query strings to days.
    pub view_timezone: Tz,
}

impl AppState {
    pub fn new(reports: ReportFacade, view_timezone: Tz) -> Self {
        Self {
            reports,
            view_timezone,
        }
    }
}
