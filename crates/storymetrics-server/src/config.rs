/// Re-export `Config` from `storymetrics-core` for use within this crate.
///
/// Environment parsing lives in `storymetrics-core` so integration tests can
/// build a config without the server.
pub use storymetrics_core::config::{Config, LegacyConfig};
