use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::codes::http_status;

/// Per-response metadata attached to every envelope
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
}

impl Metadata {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Error body carried inside a failed envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Uniform response envelope
///
/// The transport layer serializes this as-is; `data` and `message` are
/// omitted when absent so success and error replies keep the same shape
/// the frontend already consumes.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub metadata: Metadata,
}

impl<T: Serialize> Envelope<T> {
    /// Successful reply carrying data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            metadata: Metadata::now(),
        }
    }

    /// Successful reply carrying data and a human-readable message
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
            metadata: Metadata::now(),
        }
    }

    /// Successful reply with a message only (logout and friends)
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
            metadata: Metadata::now(),
        }
    }

    /// Failed reply with a stable error code
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
            metadata: Metadata::now(),
        }
    }

    /// HTTP status this envelope maps to (200 for successes)
    pub fn status(&self) -> u16 {
        match &self.error {
            Some(body) => http_status(&body.code),
            None => 200,
        }
    }
}
