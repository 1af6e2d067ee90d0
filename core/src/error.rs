use serde::Serialize;

/// Structured error envelope printed by clients on stderr.
/// Carries enough context for a script to decide what to do next.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

impl From<&ValidationError> for ErrorBody {
    fn from(err: &ValidationError) -> Self {
        Self {
            error: codes::VALIDATION_FAILED.to_string(),
            message: err.message.clone(),
            field: Some(err.field.to_string()),
            docs_hint: None,
        }
    }
}

/// Error codes used in [`ErrorBody::error`]
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const CLI_ERROR: &str = "cli_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const API_ERROR: &str = "api_error";
    pub const NOT_FOUND: &str = "not_found";
}

/// A form value rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown filter '{0}'")]
    UnknownKey(String),
    #[error("page size must be greater than zero")]
    ZeroLimit,
}
