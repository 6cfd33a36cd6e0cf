//! Error types for Code Engine API operations.

use thiserror::Error;

/// Errors that can occur during Code Engine API operations.
#[derive(Debug, Error)]
pub enum CodeEngineError {
    /// Configuration is missing or incomplete.
    #[error("Code Engine configuration required: {0}")]
    ConfigMissing(String),

    /// A required argument was empty or a call was made out of order.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Entity not found.
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// API request failed.
    #[error("Code Engine API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
        /// Server-side trace identifier, when the API returned one.
        trace: Option<String>,
    },

    /// Exchanging credentials for an access token failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },
}

impl CodeEngineError {
    /// HTTP status code of the failed request, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => *status_code,
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the server rejected a stale `If-Match` entity tag.
    pub fn is_precondition_failed(&self) -> bool {
        self.status_code() == Some(412)
    }

    /// Turn a 404 API error into [`CodeEngineError::NotFound`].
    pub(crate) fn or_not_found(self, entity_type: &'static str, id: impl Into<String>) -> Self {
        match self {
            Self::ApiError {
                status_code: Some(404),
                ..
            } => Self::NotFound {
                entity_type,
                id: id.into(),
            },
            other => other,
        }
    }
}

/// Fail with [`CodeEngineError::InvalidArgument`] when a required value is empty.
pub(crate) fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CodeEngineError::InvalidArgument(format!("{name} must be set")));
    }
    Ok(())
}

/// Result type alias for Code Engine operations.
pub type Result<T> = core::result::Result<T, CodeEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found_maps_404_only() {
        let err = CodeEngineError::ApiError {
            message: "gone".to_string(),
            status_code: Some(404),
            trace: None,
        }
        .or_not_found("App", "proj/my-app");
        assert!(matches!(err, CodeEngineError::NotFound { entity_type: "App", .. }));
        assert_eq!(err.to_string(), "App 'proj/my-app' not found");

        let err = CodeEngineError::ApiError {
            message: "boom".to_string(),
            status_code: Some(500),
            trace: None,
        }
        .or_not_found("App", "x");
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn test_precondition_failed() {
        let err = CodeEngineError::ApiError {
            message: "etag mismatch".to_string(),
            status_code: Some(412),
            trace: None,
        };
        assert!(err.is_precondition_failed());
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("project_id", "abc").is_ok());
        let err = require("project_id", "  ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: project_id must be set");
    }
}
