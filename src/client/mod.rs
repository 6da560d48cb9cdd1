pub mod invoker;
pub mod log_store;
pub mod memory;

pub use invoker::{ActivationState, HttpInvoker, InvokeResponse, JobInvoker, JobRef};
pub use log_store::{HttpLogStore, LogEvent, LogStore};
pub use memory::{InMemoryInvoker, InMemoryLogStore};

/// Coarse classification of a remote-call failure. The channel manager
/// keys its soft-failure handling off these, so every client
/// implementation must map its native error surface onto them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    NotFound,
    InvalidParameter,
    OperationAborted,
    ServiceUnavailable,
    Http,
    Io,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransportErrorKind::NotFound => "not-found",
            TransportErrorKind::InvalidParameter => "invalid-parameter",
            TransportErrorKind::OperationAborted => "operation-aborted",
            TransportErrorKind::ServiceUnavailable => "service-unavailable",
            TransportErrorKind::Http => "http",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("transport call `{operation}` failed ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub operation: String,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, operation: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}
