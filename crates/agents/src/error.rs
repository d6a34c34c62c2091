use std::time::Duration;

use thiserror::Error;

/// Why a single (credential, model) attempt did not produce text.
///
/// Cloneable and comparable so a dispatch outcome can be asserted on and
/// carried into notifications without re-rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// The credential set was empty; nothing was attempted.
    #[error("no API credentials configured")]
    NoCredentials,

    /// A client could not be built for the credential.
    #[error("client construction failed for {slot}: {message}")]
    Construction { slot: String, message: String },

    /// The backend answered with a non-success status.
    #[error("backend error HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection, TLS or read failure before a status was available.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response was not the JSON shape the backend documents.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The backend refused to answer the prompt.
    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    #[error("backend returned no text")]
    EmptyResponse,

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,
}

impl AttemptError {
    #[must_use]
    pub fn construction(slot: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Construction {
            slot: slot.into(),
            message: message.to_string(),
        }
    }

    /// Classify into a coarse failure kind for logs and client payloads.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoCredentials => FailureKind::NoCredentials,
            Self::Construction { .. } => FailureKind::Construction,
            Self::Api { status, body } => classify_status(*status, body),
            Self::Transport(msg) if msg.to_lowercase().contains("timed out") => {
                FailureKind::Timeout
            },
            Self::Transport(_) => FailureKind::Network,
            Self::Malformed(_) => FailureKind::MalformedResponse,
            Self::Blocked { .. } => FailureKind::Blocked,
            Self::EmptyResponse => FailureKind::EmptyResponse,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Coarse failure classes surfaced outside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoCredentials,
    Construction,
    /// 429 / RESOURCE_EXHAUSTED.
    RateLimited,
    /// 401/403, or a 400 complaining about the key.
    Unauthorized,
    /// 404: the model id is unknown to this key.
    ModelNotFound,
    InvalidRequest,
    ServerError,
    Timeout,
    Network,
    MalformedResponse,
    Blocked,
    EmptyResponse,
    Cancelled,
    Unknown,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCredentials => "no_credentials",
            Self::Construction => "construction",
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::ModelNotFound => "model_not_found",
            Self::InvalidRequest => "invalid_request",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::MalformedResponse => "malformed_response",
            Self::Blocked => "blocked",
            Self::EmptyResponse => "empty_response",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classify_status(status: u16, body: &str) -> FailureKind {
    let body = body.to_lowercase();
    match status {
        429 => FailureKind::RateLimited,
        401 | 403 => FailureKind::Unauthorized,
        404 => FailureKind::ModelNotFound,
        // Gemini answers an invalid key with 400 INVALID_ARGUMENT.
        400 if body.contains("api key not valid") || body.contains("api_key_invalid") => {
            FailureKind::Unauthorized
        },
        400 => FailureKind::InvalidRequest,
        500..=599 => FailureKind::ServerError,
        _ if body.contains("resource_exhausted") || body.contains("quota") => {
            FailureKind::RateLimited
        },
        _ => FailureKind::Unknown,
    }
}
