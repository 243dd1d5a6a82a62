//! Backend client error types.

/// Errors from a departures backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No response was received (connect failure, reset, body read failure)
    #[error("transport error: {message}")]
    Transport { message: String },

    /// A response arrived with a non-success status code
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the JSON shape we expect
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },
}

impl BackendError {
    /// True for a 404, which the more-info endpoint uses for
    /// "this departure has already left".
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::Status { status: 404, .. })
    }

    pub(crate) fn json(message: impl Into<String>, body: &str) -> Self {
        BackendError::Json {
            message: message.into(),
            body: Some(body.chars().take(500).collect()),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport {
            message: err.to_string(),
        }
    }
}
