// src/error.rs
use std::fmt;

use thiserror::Error;

/// Why a request was refused before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    MissingImage,
    MissingQuestion,
    UnsupportedMode,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationReason::MissingImage => "Please select or capture an image first",
            ValidationReason::MissingQuestion => "Please enter a question",
            ValidationReason::UnsupportedMode => "This mode is not available on the selected service",
        };
        f.write_str(text)
    }
}

/// Every failure the pipeline can produce, from acquisition to decoding.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("Image acquisition was cancelled")]
    Cancelled,

    #[error("Failed to read image '{handle}': {reason}")]
    ReadFailure { handle: String, reason: String },

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API error: {status}{}", excerpt(.body))]
    Http { status: u16, body: String },

    #[error("Invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(ValidationReason),

    #[error("Image acquisition failed: {0}")]
    Unknown(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!(" ({}...)", &body[..cut]),
        None => format!(" ({})", body),
    }
}

impl AssistError {
    pub fn read_failure(handle: impl fmt::Display, reason: impl fmt::Display) -> Self {
        AssistError::ReadFailure {
            handle: handle.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classifies a reqwest error into a timeout or a plain transport failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AssistError::Timeout(err)
        } else {
            AssistError::Transport(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AssistError::Cancelled => ErrorKind::Cancelled,
            AssistError::ReadFailure { .. } => ErrorKind::ReadFailure,
            AssistError::Timeout(_) | AssistError::Transport(_) => ErrorKind::Transport,
            AssistError::Http { status, .. } => ErrorKind::Http { status: *status },
            AssistError::Decode(_) => ErrorKind::Decode,
            AssistError::Validation(reason) => ErrorKind::Validation(*reason),
            AssistError::Unknown(_) => ErrorKind::Unknown,
            AssistError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Cloneable projection of [`AssistError`] kept in the request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    Cancelled,
    ReadFailure,
    Transport,
    Http { status: u16 },
    Decode,
    Validation(ValidationReason),
    Unknown,
    Config,
}

pub type Result<T> = std::result::Result<T, AssistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_reports_status_and_body_excerpt() {
        let err = AssistError::Http { status: 500, body: "internal failure".to_string() };
        assert_eq!(err.kind(), ErrorKind::Http { status: 500 });
        assert_eq!(err.to_string(), "API error: 500 (internal failure)");

        let bare = AssistError::Http { status: 404, body: "  ".to_string() };
        assert_eq!(bare.to_string(), "API error: 404");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let err = AssistError::Http { status: 502, body: "x".repeat(1000) };
        let message = err.to_string();
        assert!(message.ends_with("...)"));
        assert!(message.len() < 300);
    }

    #[test]
    fn validation_messages_are_user_facing() {
        let err = AssistError::Validation(ValidationReason::MissingQuestion);
        assert_eq!(err.to_string(), "Please enter a question");
        assert_eq!(err.kind(), ErrorKind::Validation(ValidationReason::MissingQuestion));
    }

    #[test]
    fn decode_errors_keep_their_kind() {
        let parse = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = AssistError::from(parse);
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().starts_with("Invalid JSON in response"));
    }
}
