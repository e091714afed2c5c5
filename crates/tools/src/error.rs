use std::time::Duration;

use tollgate_fetch::{FetchCode, FetchResult};

/// Every failure that can cross the tool boundary. Each maps to a stable
/// machine-readable [`code`](Error::code).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("disabled: {0}")]
    Disabled(String),

    #[error("the user declined: {0}")]
    UserDenied(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("the user canceled the request")]
    UserCanceled,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),

    /// A failed remote fetch, keeping its category and HTTP status.
    #[error("{message}")]
    Fetch {
        code: FetchCode,
        message: String,
        http_status: Option<u16>,
    },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Bridge(#[from] tollgate_common::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Convert a non-ok [`FetchResult`] into a tool error.
    #[must_use]
    pub fn from_fetch(result: &FetchResult) -> Self {
        let code = result.code.unwrap_or(FetchCode::ConnectFailed);
        let message = result.message.clone().unwrap_or_else(|| match result.http_status {
            Some(status) => format!("HTTP {status}"),
            None => code.to_string(),
        });
        Self::Fetch {
            code,
            message,
            http_status: result.http_status,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Disabled(_) => "disabled",
            Self::UserDenied(_) => "user_denied",
            Self::PermissionDenied(_) => "permission_denied",
            Self::UserCanceled => "user_canceled",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
            Self::Fetch { code, .. } => code.as_str(),
            Self::Failed(_) | Self::Bridge(_) | Self::Io(_) | Self::Json(_) => "tool_failed",
        }
    }

    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Fetch { http_status, .. } => *http_status,
            _ => None,
        }
    }
}

impl tollgate_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Failed(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

tollgate_common::impl_context!();
