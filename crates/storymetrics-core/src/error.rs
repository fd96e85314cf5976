use thiserror::Error;

/// Failures surfaced by the reporting engine.
///
/// Nothing in the engine retries: every variant reaches the caller as-is, and
/// a failure on either side of a straddling report fails the whole report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The request was rejected before any network call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// The legacy reporting API (or the connection to either backend) failed.
    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// The remote reporting service answered with a non-success status.
    #[error("remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A backend answered with a shape the normalizer cannot read.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// HTTP status reported by the remote service, when there is one.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
