//! Error taxonomy
//!
//! Every failure surfaced by the client falls into one of six kinds. Local
//! validation failures never reach the transport; server failures keep the
//! original status, code and request id as context.

use crate::scm::http::TransportError;
use crate::validation::ValidationError;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Coarse classification of [`ScmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    InvalidObject,
    ObjectNotPresent,
    NameNotUnique,
    ReferenceNotZero,
    Server,
}

/// Details recovered from a failed API response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    /// `details.errorType` from the error envelope, e.g. "Object Already Exists"
    pub error_type: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "_errors", default)]
    errors: Vec<ErrorEntry>,
    #[serde(rename = "_request_id", default)]
    request_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

impl ApiFailure {
    /// Parse the `{"_errors": [...], "_request_id": ...}` envelope, falling back
    /// to the canonical status text when the body is something else.
    pub fn from_body(status: u16, body: &str) -> Self {
        let fallback_message = || {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        };

        let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
            return Self {
                status,
                message: fallback_message(),
                ..Default::default()
            };
        };

        let request_id = envelope.request_id;
        let Some(entry) = envelope.errors.into_iter().next() else {
            return Self {
                status,
                message: fallback_message(),
                request_id,
                ..Default::default()
            };
        };

        let details = entry.details.unwrap_or(Value::Null);
        let error_type = details
            .get("errorType")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Some errors put the useful text under details.message
        let mut message = entry.message.unwrap_or_else(fallback_message);
        if let Some(extra) = details.get("message").and_then(Value::as_str) {
            if extra != message {
                message = format!("{} ({})", message, extra);
            }
        }

        Self {
            status,
            code: entry.code,
            message,
            error_type,
            request_id,
        }
    }

    fn mentions_reference(&self) -> bool {
        let haystack = format!(
            "{} {}",
            self.error_type.as_deref().unwrap_or_default(),
            self.message
        )
        .to_lowercase();
        haystack.contains("reference")
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(error_type) = &self.error_type {
            write!(f, " {}", error_type)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request {})", request_id)?;
        }
        Ok(())
    }
}

/// Main error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    /// Token acquisition exhausted its retries, or the API rejected our credentials
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        failure: Option<ApiFailure>,
        #[source]
        source: Option<TransportError>,
    },

    /// Local validation failure; no request was sent
    #[error("invalid object: {0}")]
    InvalidObject(#[from] ValidationError),

    /// 400-class rejection echoed back by the server
    #[error("invalid object rejected by server: {0}")]
    Rejected(ApiFailure),

    #[error("object not present: {0}")]
    ObjectNotPresent(ApiFailure),

    #[error("name not unique: {0}")]
    NameNotUnique(ApiFailure),

    #[error("reference not zero: {0}")]
    ReferenceNotZero(ApiFailure),

    #[error("server error: {0}")]
    Server(ApiFailure),

    /// The request never produced a response
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ScmError {
    /// Classify a non-success response
    pub fn from_response(status: u16, body: &str) -> Self {
        let failure = ApiFailure::from_body(status, body);
        match status {
            401 | 403 => Self::Authentication {
                message: failure.message.clone(),
                failure: Some(failure),
                source: None,
            },
            404 => Self::ObjectNotPresent(failure),
            409 if failure.mentions_reference() => Self::ReferenceNotZero(failure),
            409 => Self::NameNotUnique(failure),
            429 => Self::Server(failure),
            400..=499 => Self::Rejected(failure),
            _ => Self::Server(failure),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::InvalidObject(_) | Self::Rejected(_) => ErrorKind::InvalidObject,
            Self::ObjectNotPresent(_) => ErrorKind::ObjectNotPresent,
            Self::NameNotUnique(_) => ErrorKind::NameNotUnique,
            Self::ReferenceNotZero(_) => ErrorKind::ReferenceNotZero,
            Self::Server(_) | Self::Transport(_) => ErrorKind::Server,
        }
    }

    /// Server response details, when the failure came from one
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Authentication { failure, .. } => failure.as_ref(),
            Self::Rejected(f)
            | Self::ObjectNotPresent(f)
            | Self::NameNotUnique(f)
            | Self::ReferenceNotZero(f)
            | Self::Server(f) => Some(f),
            Self::InvalidObject(_) | Self::Transport(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }
}

/// Short user-facing message for an error
pub fn format_error(error: &ScmError) -> String {
    match error {
        ScmError::Authentication { .. } => {
            "Authentication failed. Check the client id, secret and tenant (TSG) id.".to_string()
        }
        ScmError::InvalidObject(err) => format!("Invalid object: {}", err),
        ScmError::Rejected(f) => format!("Rejected by server: {}", f.message),
        ScmError::ObjectNotPresent(_) => "Object not found.".to_string(),
        ScmError::NameNotUnique(_) => "An object with this name already exists.".to_string(),
        ScmError::ReferenceNotZero(_) => {
            "Object is still referenced by other configuration.".to_string()
        }
        ScmError::Server(f) if f.status == 429 => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        ScmError::Server(_) => "Service temporarily unavailable. Please try again.".to_string(),
        ScmError::Transport(TransportError::Timeout) => "Request timed out.".to_string(),
        ScmError::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
    }
}
