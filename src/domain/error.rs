//! Domain error types.

use crate::domain::ohlcv::Interval;

/// Top-level error type for barsim.
///
/// Warm-up shortfalls and unaffordable entries are not errors: the indicator
/// functions fall back to neutral values and the simulator skips the entry.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no bars for {ticker} at {interval}")]
    NoData { ticker: String, interval: Interval },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        SimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        let code: u8 = match err {
            SimError::Io(_) => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::Database { .. } | SimError::DatabaseQuery { .. } => 3,
            SimError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
