//! Failures surfaced by backend calls.
//!
//! Every variant renders a human-readable cause. Panels never propagate these;
//! they turn them into a chat failure message or an error notice.

/// Error returned by [`crate::api::ApiClient`] operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The backend could not be reached (DNS, connection refused, reset).
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("server responded with HTTP {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// A 2xx response whose body was not JSON or lacked the expected field.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An upload source could not be read from disk.
    #[error("could not read {path}: {reason}")]
    LocalFile { path: String, reason: String },

    /// The request task ended without producing a result.
    #[error("request aborted: {0}")]
    Aborted(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({})", d),
        None => String::new(),
    }
}

impl ApiError {
    /// Short title used for notices.
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "Network error",
            ApiError::Status { .. } => "Server error",
            ApiError::Malformed(_) => "Unexpected response",
            ApiError::LocalFile { .. } => "File error",
            ApiError::Aborted(_) => "Request aborted",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Status {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_with_detail() {
        let err = ApiError::Status {
            status: 400,
            detail: Some("Query text cannot be empty".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "server responded with HTTP 400 (Query text cannot be empty)"
        );
    }

    #[test]
    fn test_status_display_without_detail() {
        let err = ApiError::Status { status: 502, detail: None };
        assert_eq!(err.to_string(), "server responded with HTTP 502");
    }

    #[test]
    fn test_titles_distinguish_failure_kinds() {
        let transport = ApiError::Transport("connection refused".into());
        let status = ApiError::Status { status: 500, detail: None };
        let malformed = ApiError::Malformed("missing field `response`".into());

        assert_ne!(transport.title(), status.title());
        assert_ne!(status.title(), malformed.title());
        assert_ne!(transport.title(), malformed.title());
    }
}
