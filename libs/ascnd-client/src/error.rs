//! Error types for the Ascnd client
//!
//! Every failure surfaces as [`AscndError`]. Remote and transport failures are
//! folded into a single [`RemoteError`] that carries a normalized, HTTP-style
//! status code next to the original gRPC code.

use std::time::Duration;
use thiserror::Error;
use tonic::{Code, Status};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, AscndError>;

/// Errors raised while building a client from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("API key must be printable ASCII to travel as request metadata")]
    InvalidApiKey,

    #[error("endpoint is required")]
    MissingEndpoint,

    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unsupported endpoint scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),

    #[error("{field} must be positive, got {value}s")]
    NonPositiveTimeout { field: &'static str, value: i64 },

    #[error("failed to load configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("failed to read TLS certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to configure transport: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// A failed remote call
///
/// `status_code` is the normalized code from [`normalized_status`]; `code` is
/// the gRPC code the transport reported.
#[derive(Debug, Clone, Error)]
#[error("Ascnd request failed with status {status_code} ({code:?}): {message}")]
pub struct RemoteError {
    status_code: u16,
    code: Code,
    message: String,
}

impl RemoteError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            status_code: normalized_status(code),
            code,
            message: message.into(),
        }
    }

    /// Local deadline fired before the service answered.
    pub fn deadline_exceeded(timeout: Duration) -> Self {
        Self::new(
            Code::DeadlineExceeded,
            format!("no response within {:?}", timeout),
        )
    }

    /// The service answered with a message the client cannot interpret.
    pub fn malformed_response(detail: impl Into<String>) -> Self {
        Self::new(Code::DataLoss, detail)
    }

    /// Normalized HTTP-style status code
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Original gRPC status code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Detail message supplied by the service or transport
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Status> for RemoteError {
    fn from(status: Status) -> Self {
        Self::new(status.code(), status.message())
    }
}

/// Top-level client error
#[derive(Debug, Error)]
pub enum AscndError {
    #[error("invalid client configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: &'static str,
    },

    #[error("client is closed")]
    Closed,

    #[error("request cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Coarse classification of [`AscndError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration or missing request fields; fix the input.
    Configuration,
    /// The client was used after `close`.
    Closed,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The service or the transport rejected the call.
    Remote,
}

impl AscndError {
    pub(crate) fn missing(field: &'static str) -> Self {
        Self::InvalidArgument {
            field,
            reason: "must not be empty",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::InvalidArgument { .. } => ErrorKind::Configuration,
            Self::Closed => ErrorKind::Closed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Remote(_) => ErrorKind::Remote,
        }
    }

    /// Normalized status code when the failure came from the service.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Remote(remote) => Some(remote.status_code()),
            _ => None,
        }
    }
}

impl From<Status> for AscndError {
    fn from(status: Status) -> Self {
        Self::Remote(status.into())
    }
}

/// Map a gRPC status code onto its HTTP-style equivalent.
///
/// The match is exhaustive, so every code has exactly one image.
pub fn normalized_status(code: Code) -> u16 {
    match code {
        Code::Ok => 200,
        Code::Cancelled => 499,
        Code::Unknown => 500,
        Code::InvalidArgument => 400,
        Code::DeadlineExceeded => 504,
        Code::NotFound => 404,
        Code::AlreadyExists => 409,
        Code::PermissionDenied => 403,
        Code::ResourceExhausted => 429,
        Code::FailedPrecondition => 412,
        Code::Aborted => 409,
        Code::OutOfRange => 400,
        Code::Unimplemented => 501,
        Code::Internal => 500,
        Code::Unavailable => 503,
        Code::DataLoss => 500,
        Code::Unauthenticated => 401,
    }
}

/// Same as [`normalized_status`] for a raw wire value.
///
/// Values outside the gRPC code range land on `Unknown` and therefore 500.
pub fn normalized_status_from_raw(raw: i32) -> u16 {
    normalized_status(Code::from_i32(raw))
}
