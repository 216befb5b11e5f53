//! Domain error types.

/// Top-level error type for nextopen.
#[derive(Debug, thiserror::Error)]
pub enum NextOpenError {
    #[error("misaligned input: {what} has length {actual}, expected {expected}")]
    Alignment {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid calendar: {reason}")]
    Calendar { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

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

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NextOpenError {
    pub fn alignment(what: &str, expected: usize, actual: usize) -> Self {
        NextOpenError::Alignment {
            what: what.to_string(),
            expected,
            actual,
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        NextOpenError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        NextOpenError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&NextOpenError> for std::process::ExitCode {
    fn from(err: &NextOpenError) -> Self {
        let code: u8 = match err {
            NextOpenError::Io(_) | NextOpenError::Export { .. } => 1,
            NextOpenError::ConfigParse { .. }
            | NextOpenError::ConfigMissing { .. }
            | NextOpenError::ConfigInvalid { .. } => 2,
            NextOpenError::DataSource { .. } => 3,
            NextOpenError::NoData { .. } => 5,
            NextOpenError::Alignment { .. } | NextOpenError::Calendar { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
