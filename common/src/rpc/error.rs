use serde_json::Value;
use thiserror::Error;

use super::{RpcErrorObject, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};

/// Failure of a single gateway call.
///
/// Callers branch on the variant: `NotImplemented` is a skip signal,
/// `Application` is an expected scenario outcome to assert on, everything
/// else is an infrastructure failure.
#[derive(Error, Debug, Clone)]
pub enum RpcError {
    /// No structured JSON-RPC response was received
    #[error("Transport error: {message}")]
    Transport { message: String },
    /// The backend build does not implement the method
    #[error("Method '{method}' is not implemented by the backend")]
    NotImplemented {
        method: String,
        message: Option<String>,
    },
    /// The backend answered with a JSON-RPC error
    #[error("{}", describe_application(.code, .status, .message))]
    Application {
        code: i64,
        status: Option<String>,
        message: Option<String>,
    },
    #[error("Response id {got} does not match request id {expected}")]
    MismatchedId { expected: u64, got: Value },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The request was refused locally before being sent
    #[error("Invalid params: {0}")]
    InvalidParams(String),
}

impl RpcError {
    /// Classify the `error` member of a response for `method`
    pub fn from_error_object(method: &str, error: RpcErrorObject) -> Self {
        if error.code == METHOD_NOT_FOUND {
            return Self::NotImplemented {
                method: method.to_string(),
                message: non_empty(error.message),
            };
        }

        let status = error.status().map(str::to_string);
        Self::Application {
            code: error.code,
            status,
            message: non_empty(error.message),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn get_code(&self) -> i64 {
        match self {
            Self::NotImplemented { .. } => METHOD_NOT_FOUND,
            Self::Application { code, .. } => *code,
            Self::InvalidParams(_) => INVALID_PARAMS,
            // No structured error from the backend: escalate as internal
            Self::Transport { .. } | Self::MismatchedId { .. } | Self::InvalidResponse(_) => {
                INTERNAL_ERROR
            }
        }
    }

    /// Domain status string of an application error
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Application { status, .. } => status.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }
}

fn non_empty(message: String) -> Option<String> {
    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

fn describe_application(code: &i64, status: &Option<String>, message: &Option<String>) -> String {
    let mut out = format!("RPC error {}", code);
    if let Some(status) = status {
        out.push_str(&format!(" [{}]", status));
    }
    if let Some(message) = message {
        out.push_str(&format!(": {}", message));
    }
    out
}
