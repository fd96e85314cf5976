use chrono_tz::Tz;

use crate::cutover::VIEW_TZ;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub legacy: LegacyConfig,
    /// URL of the next-gen reporting service; every action is POSTed here.
    pub reporting_service_url: String,
    /// Timezone request instants are reduced to calendar days in. Cutover
    /// classification works on those days, so this also fixes the instant
    /// the cutover falls on.
    pub view_timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyConfig {
    pub api_url: String,
    pub view_id: String,
    /// Bearer token sent with every batch call. `None` relies on the
    /// endpoint accepting unauthenticated calls (local stubs).
    pub access_token: Option<String>,
    /// Custom dimension holding the subject ID on every hit.
    pub subject_dimension: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Self {
            port: var("STORYMETRICS_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            legacy: LegacyConfig {
                api_url: var("STORYMETRICS_LEGACY_API_URL")
                    .unwrap_or_else(|| "https://analyticsreporting.googleapis.com".to_string()),
                view_id: var("STORYMETRICS_LEGACY_VIEW_ID")
                    .ok_or_else(|| "STORYMETRICS_LEGACY_VIEW_ID is required".to_string())?,
                access_token: var("STORYMETRICS_LEGACY_ACCESS_TOKEN").filter(|v| !v.is_empty()),
                subject_dimension: var("STORYMETRICS_SUBJECT_DIMENSION")
                    .unwrap_or_else(|| "ga:dimension2".to_string()),
            },
            reporting_service_url: var("STORYMETRICS_REPORTING_SERVICE_URL")
                .ok_or_else(|| "STORYMETRICS_REPORTING_SERVICE_URL is required".to_string())?,
            view_timezone: match var("STORYMETRICS_VIEW_TIMEZONE") {
                Some(raw) => raw
                    .parse::<Tz>()
                    .map_err(|e| format!("invalid view timezone: {e}"))?,
                None => VIEW_TZ,
            },
        })
    }
}
