//! Domain error types.
//!
//! Insufficient history is not an error: detection reports it through
//! [`crate::domain::levels::DetectionStatus`].

/// Top-level error type for levelscope.
#[derive(Debug, thiserror::Error)]
pub enum LevelscopeError {
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

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

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LevelscopeError {
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        LevelscopeError::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn data_unavailable(instrument: &str, reason: impl Into<String>) -> Self {
        LevelscopeError::DataUnavailable {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&LevelscopeError> for std::process::ExitCode {
    fn from(err: &LevelscopeError) -> Self {
        let code: u8 = match err {
            LevelscopeError::Io(_) | LevelscopeError::Report { .. } => 1,
            LevelscopeError::ConfigParse { .. }
            | LevelscopeError::ConfigMissing { .. }
            | LevelscopeError::ConfigInvalid { .. } => 2,
            LevelscopeError::Database { .. } => 3,
            LevelscopeError::InvalidArgument { .. } => 4,
            LevelscopeError::DataUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
