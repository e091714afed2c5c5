use thiserror::Error;

/// Failure reported by a host collaborator (device bridge, file system).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// The host has no implementation for this capability.
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),

    /// The host understood the request and refused it, e.g. a full calendar
    /// or a muted notification channel. Returned by device bridge
    /// implementations.
    #[error("host rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

impl crate::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
