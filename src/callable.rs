//! Envelope for client-callable functions: requests arrive as `{"data": ...}`
//! and are answered with `{"result": ...}` or `{"error": {"status", "message"}}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorStatus {
    InvalidArgument,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallableError {
    pub status: ErrorStatus,
    pub message: String,
}

impl CallableError {
    pub fn new(status: ErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallableResponse<T> {
    Result(T),
    Error(CallableError),
}

impl<T, E> From<Result<T, E>> for CallableResponse<T>
where
    E: Into<CallableError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => CallableResponse::Result(value),
            Err(e) => CallableResponse::Error(e.into()),
        }
    }
}
