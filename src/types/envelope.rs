//! Uniform success/error result wrapper returned by every entry point.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_UNPROCESSABLE: u16 = 422;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub message: String,
    pub status_code: u16,
    pub response: Option<serde_json::Value>,
}

impl ResponseEnvelope {
    pub fn ok(message: impl Into<String>, response: impl Into<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            status_code: STATUS_OK,
            response: Some(response.into()),
        }
    }

    /// A 422 envelope; no capability has been invoked.
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            message: detail.into(),
            status_code: STATUS_UNPROCESSABLE,
            response: None,
        }
    }

    /// An error-shaped envelope carrying the stringified cause.
    pub fn from_error(message: impl Into<String>, error: &IntakeError) -> Self {
        if error.status_code() == STATUS_UNPROCESSABLE {
            return Self::unprocessable(error.to_string());
        }
        Self::internal_error(message, error)
    }

    /// A 500 envelope whatever the error's category. Used once a capability
    /// has been invoked, where no failure is the caller's to fix.
    pub fn internal_error(message: impl Into<String>, error: &IntakeError) -> Self {
        Self {
            message: message.into(),
            status_code: STATUS_INTERNAL_ERROR,
            response: Some(serde_json::Value::String(error.to_string())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Run a handler body, log its outcome, and turn an escaped error into an envelope.
pub async fn intercept<F>(operation: &str, handler: F) -> ResponseEnvelope
where
    F: Future<Output = Result<ResponseEnvelope, IntakeError>>,
{
    match handler.await {
        Ok(envelope) => {
            tracing::info!(operation, status = envelope.status_code, "Operation executed");
            envelope
        }
        Err(e) => {
            tracing::error!(operation, error = %e, "Operation failed");
            ResponseEnvelope::from_error(format!("Error in {operation}: {e}"), &e)
        }
    }
}
