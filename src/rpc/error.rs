//! Facade error taxonomy and its HTTP mapping.

use thiserror::Error;

use crate::actor::CounterError;

/// Errors surfaced to RPC callers.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Input is not JSON at all
    #[error("malformed input: {0}")]
    Parse(String),

    /// Input is JSON of the wrong shape
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("no procedure `{0}`")]
    NotFound(String),

    #[error("`{procedure}` must be called with {expected}")]
    MethodNotAllowed {
        procedure: String,
        expected: &'static str,
    },

    /// Watch requested without a WebSocket upgrade
    #[error("upgrade required: connect to {0}")]
    UpgradeRequired(String),

    #[error(transparent)]
    Counter(#[from] CounterError),
}

impl RpcError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Parse(_) | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::UpgradeRequired(_) => 426,
            Self::Counter(CounterError::Overflow(_)) => 422,
            Self::Counter(CounterError::ShuttingDown) => 503,
            Self::Counter(_) => 500,
        }
    }

    /// tRPC error code name and its JSON-RPC number.
    pub fn code(&self) -> (&'static str, i32) {
        match self {
            Self::Parse(_) => ("PARSE_ERROR", -32700),
            Self::Validation(_) | Self::UpgradeRequired(_) => ("BAD_REQUEST", -32600),
            Self::NotFound(_) => ("NOT_FOUND", -32004),
            Self::MethodNotAllowed { .. } => ("METHOD_NOT_SUPPORTED", -32005),
            Self::Counter(CounterError::Overflow(_)) => ("UNPROCESSABLE_CONTENT", -32022),
            Self::Counter(CounterError::ShuttingDown) => ("SERVICE_UNAVAILABLE", -32603),
            Self::Counter(_) => ("INTERNAL_SERVER_ERROR", -32603),
        }
    }
}
