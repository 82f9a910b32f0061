//! Bolt protocol error types.

use std::fmt;
use std::io;

use super::packstream::PackStreamError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Bolt protocol errors.
#[derive(Debug)]
pub enum BoltError {
    /// I/O error
    Io(io::Error),

    /// Handshake error
    Handshake(HandshakeError),

    /// An outbound message could not be serialized; nothing was written
    Encode {
        /// Name of the message that failed
        message: &'static str,
        /// Underlying serialization error
        source: PackStreamError,
    },

    /// An inbound message could not be deserialized
    Decode(PackStreamError),

    /// Protocol error (invalid framing, etc.)
    Protocol(String),

    /// Message too large
    MessageTooLarge { size: usize, max: usize },

    /// Connection closed
    ConnectionClosed,
}

impl BoltError {
    /// Check if the error leaves the connection usable.
    ///
    /// Only encode errors are local: the failed message never reached the
    /// transport.
    pub fn is_local(&self) -> bool {
        matches!(self, BoltError::Encode { .. })
    }
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Io(e) => write!(f, "I/O error: {}", e),
            BoltError::Handshake(e) => write!(f, "Handshake error: {}", e),
            BoltError::Encode { message, source } => {
                write!(f, "Failed to write outbound message {}: {}", message, source)
            }
            BoltError::Decode(e) => write!(f, "Failed to read inbound message: {}", e),
            BoltError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BoltError::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {} bytes (max: {})", size, max)
            }
            BoltError::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Io(e) => Some(e),
            BoltError::Handshake(e) => Some(e),
            BoltError::Encode { source, .. } => Some(source),
            BoltError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Io(err)
    }
}

impl From<HandshakeError> for BoltError {
    fn from(err: HandshakeError) -> Self {
        BoltError::Handshake(err)
    }
}

/// Handshake-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// No compatible protocol version found
    NoCompatibleVersion,

    /// Invalid handshake data (wrong size, unexpected version, etc.)
    InvalidData(String),

    /// Connection closed during handshake
    ConnectionClosed,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::NoCompatibleVersion => {
                write!(f, "No compatible protocol version found")
            }
            HandshakeError::InvalidData(msg) => {
                write!(f, "Invalid handshake data: {}", msg)
            }
            HandshakeError::ConnectionClosed => {
                write!(f, "Connection closed during handshake")
            }
        }
    }
}

impl std::error::Error for HandshakeError {}
