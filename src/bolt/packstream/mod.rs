//! PackStream serialization format.
//!
//! PackStream is the binary serialization format used by the Bolt protocol
//! to encode values for transmission between client and server. This module
//! only knows markers, sizes and structure headers; how typed values and
//! messages map onto structures lives in [`crate::bolt::format`].

pub mod decoder;
pub mod encoder;
pub mod marker;

pub use decoder::PackStreamDecoder;
pub use encoder::PackStreamEncoder;
pub use marker::PackType;

use std::fmt;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamError {
    /// Unexpected end of input
    UnexpectedEof,
    /// Reserved marker byte
    UnknownMarker(u8),
    /// A value of a different type was found
    UnexpectedType(String),
    /// Invalid UTF-8 in string
    InvalidUtf8(String),
    /// Value too large to encode
    ValueTooLarge(&'static str, usize),
    /// Invalid structure format
    InvalidStructure(String),
    /// Value cannot be written in this position or format
    UnsupportedValue(String),
    /// Bytes left over after a complete message
    TrailingBytes(usize),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "Unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "Unknown PackStream marker: 0x{:02X}", m),
            PackStreamError::UnexpectedType(msg) => write!(f, "Unexpected type: {}", msg),
            PackStreamError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            PackStreamError::ValueTooLarge(t, s) => write!(f, "{} too large: {}", t, s),
            PackStreamError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
            PackStreamError::UnsupportedValue(msg) => write!(f, "Unsupported value: {}", msg),
            PackStreamError::TrailingBytes(n) => {
                write!(f, "{} unread bytes after end of message", n)
            }
        }
    }
}

impl std::error::Error for PackStreamError {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_primitive_roundtrip() {
        let mut buf = BytesMut::new();
        let mut enc = PackStreamEncoder::new(&mut buf);
        for v in [0i64, 1, -1, 127, -16, 128, -128, 1000, -1000, i64::MAX, i64::MIN] {
            enc.pack_int(v);
        }
        enc.pack_float(3.5);
        enc.pack_string(&"x".repeat(70_000)).unwrap();
        enc.pack_bytes(&[0u8; 300]).unwrap();

        let mut dec = PackStreamDecoder::new(&buf);
        for v in [0i64, 1, -1, 127, -16, 128, -128, 1000, -1000, i64::MAX, i64::MIN] {
            assert_eq!(dec.unpack_int().unwrap(), v, "Failed for {}", v);
        }
        assert_eq!(dec.unpack_float().unwrap(), 3.5);
        assert_eq!(dec.unpack_string().unwrap().len(), 70_000);
        assert_eq!(dec.unpack_bytes().unwrap().len(), 300);
        assert!(dec.is_empty());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            PackStreamError::UnknownMarker(0xC7).to_string(),
            "Unknown PackStream marker: 0xC7"
        );
        assert_eq!(
            PackStreamError::TrailingBytes(2).to_string(),
            "2 unread bytes after end of message"
        );
    }
}
