//! Error types for benchmark runs.

use std::io;

/// Error raised while establishing or driving benchmark connections.
#[derive(Debug)]
pub enum BenchError {
    /// A connection could not be established.
    Connect { addr: String, source: io::Error },
    /// A read or write failed on an established connection.
    Io(io::Error),
    /// The server sent a reply with broken framing.
    Protocol(String),
    /// The benchmark options are unusable.
    InvalidConfig(String),
    /// Writing to an output sink failed.
    Output(io::Error),
    /// A worker task died before reporting its outcome.
    Worker(String),
}

impl BenchError {
    pub(crate) fn protocol<S: Into<String>>(msg: S) -> Self {
        BenchError::Protocol(msg.into())
    }

    pub(crate) fn invalid_response() -> Self {
        BenchError::Protocol("invalid server response".to_string())
    }
}

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchError::Connect { addr, source } => {
                write!(f, "dial tcp {}: {}", addr, source)
            }
            BenchError::Io(e) => write!(f, "{}", e),
            BenchError::Protocol(msg) => write!(f, "{}", msg),
            BenchError::InvalidConfig(msg) => write!(f, "invalid options: {}", msg),
            BenchError::Output(e) => write!(f, "failed to write output: {}", e),
            BenchError::Worker(msg) => write!(f, "worker failed: {}", msg),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Connect { source, .. } => Some(source),
            BenchError::Io(e) | BenchError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BenchError {
    fn from(e: io::Error) -> Self {
        BenchError::Io(e)
    }
}
