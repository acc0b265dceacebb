use thiserror::Error;

/// Main error type for the live poll client
#[derive(Error, Debug)]
pub enum QuickPollError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Poll service returned {status}: {body}")]
    Api { status: u16, body: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Live event errors
    #[error("Malformed live event: {0}")]
    MalformedEvent(String),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Actor plumbing
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl QuickPollError {
    /// True when the collaborator service answered but refused the request.
    pub fn is_rejected(&self) -> bool {
        matches!(self, QuickPollError::Api { status, .. } if (400..500).contains(status))
    }
}

/// Result type alias for QuickPollError
pub type Result<T> = std::result::Result<T, QuickPollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let not_found = QuickPollError::Api {
            status: 404,
            body: "Poll not found".to_string(),
        };
        assert!(not_found.is_rejected());
        assert_eq!(
            not_found.to_string(),
            "Poll service returned 404: Poll not found"
        );

        let unavailable = QuickPollError::Api {
            status: 503,
            body: String::new(),
        };
        assert!(!unavailable.is_rejected());
        assert!(!QuickPollError::Cancelled.is_rejected());
    }
}
