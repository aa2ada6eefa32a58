use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Probe failure: {0}")]
    ProbeFailure(String),

    #[error("Publish failure: {0}")]
    PublishFailure(String),

    #[error("Cache failure: {0}")]
    CacheFailure(String),

    #[error("Dispatch failure: {0}")]
    DispatchFailure(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::ProbeFailure(_) => "PROBE_FAILURE",
            Error::PublishFailure(_) => "PUBLISH_FAILURE",
            Error::CacheFailure(_) => "CACHE_FAILURE",
            Error::DispatchFailure(_) => "DISPATCH_FAILURE",
            Error::Serde(_) => "SERDE_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// A `Conflict` is a bounded lock-wait timeout and may succeed on a later
    /// attempt; dispatch and transport failures are transient. Logical errors
    /// like `NotFound` or `InvalidArgument` never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Retryable errors (transient)
            Error::Conflict(_) => true,
            Error::DispatchFailure(_) => true,
            Error::Http(_) => true,
            Error::ProbeFailure(_) => true,

            // Non-retryable errors (logical/permanent)
            Error::NotFound(_) => false,
            Error::PublishFailure(_) => false,
            Error::CacheFailure(_) => false,
            Error::Serde(_) => false,
            Error::InvalidArgument(_) => false,
            Error::Internal(_) => false,
        }
    }

}

pub type Result<T> = std::result::Result<T, Error>;
