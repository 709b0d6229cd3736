//! Recorded outcomes of calls.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::call::canonical::to_json;
use crate::CacheError;

/// An error captured from a wrapped call, in a form that survives persistence.
///
/// Holds the error classification, its message and an optional structured
/// payload. Replaying builds a new error with the same content; the original
/// error object itself is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct CapturedError {
    /// Classification, usually the error variant or type name.
    pub kind: String,

    /// Human readable message.
    pub message: String,

    /// Structured data needed to rebuild the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl CapturedError {
    /// Creates a captured error without payload.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            payload: None,
        }
    }

    /// Attaches a structured payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Captures a serializable error, storing the error itself as payload.
    ///
    /// The payload is left out when the error holds data JSON cannot
    /// represent, such as a NaN.
    pub fn from_serializable<E: Serialize + fmt::Display>(kind: impl Into<String>, err: &E) -> Self {
        Self {
            kind: kind.into(),
            message: err.to_string(),
            payload: to_json(err).ok(),
        }
    }

    /// Decodes the payload, `None` when absent or of another shape.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl From<CacheError> for CapturedError {
    fn from(err: CacheError) -> Self {
        Self::new("CacheError", err.to_string())
    }
}

/// Errors that can be recorded in the cache and raised again on a hit.
///
/// `replay(capture(e))` must produce an error of the same classification and
/// content as `e`.
pub trait ReplayableError: Sized {
    /// Captures this error for storage.
    fn capture(&self) -> CapturedError;

    /// Rebuilds an error from its captured form.
    fn replay(captured: CapturedError) -> Self;
}

impl ReplayableError for CapturedError {
    fn capture(&self) -> CapturedError {
        self.clone()
    }

    fn replay(captured: CapturedError) -> Self {
        captured
    }
}

/// What a call produced. Exactly one outcome is active per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    /// The call returned this value.
    Value(Value),
    /// The call failed with this error.
    Error(CapturedError),
}

/// Outcome of one call, as stored in a [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub outcome: Outcome,

    /// Moment the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Record of a returned value.
    pub fn value(value: Value) -> Self {
        Self {
            outcome: Outcome::Value(value),
            recorded_at: Utc::now(),
        }
    }

    /// Record of a raised error.
    pub fn error(error: CapturedError) -> Self {
        Self {
            outcome: Outcome::Error(error),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Returned value, `None` for error records.
    pub fn returned(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Value(v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    /// Captured error, `None` for value records.
    pub fn raised(&self) -> Option<&CapturedError> {
        match &self.outcome {
            Outcome::Value(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }
}
