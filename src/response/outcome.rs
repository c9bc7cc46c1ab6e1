use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// What the transport hands us: a status code and the unread body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Already-decoded body, if the transport did that for us.
    pub json: Option<Value>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            json: None,
        }
    }

    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Body as text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ClientError,
    ServerError,
    TransportError,
    DecodeError,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::ClientError => "client error",
            FailureKind::ServerError => "server error",
            FailureKind::TransportError => "transport error",
            FailureKind::DecodeError => "decode error",
            FailureKind::Unexpected => "unexpected error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure. Displays as e.g.
/// `user id retrieval failed: client error (HTTP 401): Login failed`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{context} failed: {kind}{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct ApiFailure {
    pub kind: FailureKind,
    pub context: String,
    pub status: Option<u16>,
    pub message: String,
    /// Raw body text, when a body was received.
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    Success(Value),
    Failure(ApiFailure),
}

impl ApiOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ApiOutcome::Failure(f) => Some(f),
            ApiOutcome::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Value, ApiFailure> {
        match self {
            ApiOutcome::Success(v) => Ok(v),
            ApiOutcome::Failure(f) => Err(f),
        }
    }
}
