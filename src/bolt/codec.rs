//! Bolt protocol codec for tokio_util.
//!
//! Chunked message framing for the Bolt transport.
//! Messages are split into chunks with a 2-byte length prefix and terminated
//! by a zero-length chunk.

use std::fmt::Write as _;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, Level};

use super::format::MessageFormat;
use super::message::BoltMessage;
use super::BoltError;

/// Maximum chunk size allowed by the 2-byte length prefix
pub const MAX_CHUNK_SIZE: usize = 65535;

/// Default maximum size of a reassembled inbound message (16MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Bolt message codec for framing.
///
/// Both directions carry [`BoltMessage`]; the active [`MessageFormat`]
/// decides how values are (de)serialized and can be swapped mid-stream once
/// patches are negotiated.
#[derive(Debug)]
pub struct BoltCodec {
    format: MessageFormat,
    max_chunk_size: usize,
    max_message_size: usize,
    /// Buffer for accumulating chunks
    message_buffer: BytesMut,
}

impl BoltCodec {
    /// Create a new codec with default limits.
    pub fn new(format: MessageFormat) -> Self {
        Self::with_limits(format, MAX_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with custom chunk and message limits.
    ///
    /// `max_chunk_size` is clamped to `1..=65535`.
    pub fn with_limits(format: MessageFormat, max_chunk_size: usize, max_message_size: usize) -> Self {
        Self {
            format,
            max_chunk_size: max_chunk_size.clamp(1, MAX_CHUNK_SIZE),
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// The active message format.
    pub fn format(&self) -> &MessageFormat {
        &self.format
    }

    /// Apply negotiated patches to the active format.
    ///
    /// Partially received messages stay buffered and are decoded with the
    /// patched format.
    pub fn apply_patches<S: AsRef<str>>(&mut self, patches: &[S]) {
        let patched = self.format.with_patches(patches);
        if patched != self.format {
            debug!(format = %patched, "switching message format");
            self.format = patched;
        }
    }

    /// Split `body` into chunks appended to `dst`, followed by the end marker.
    fn write_chunks(&self, body: &[u8], dst: &mut BytesMut) {
        dst.reserve(body.len() + 2 * (body.len() / self.max_chunk_size + 2));
        for chunk in body.chunks(self.max_chunk_size) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_MARKER);
    }
}

impl Decoder for BoltCodec {
    type Item = BoltMessage;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Need at least 2 bytes for chunk header
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);

                if self.message_buffer.is_empty() {
                    // NOOP keep-alive
                    trace!("S: <NOOP>");
                    continue;
                }

                let message_data = self.message_buffer.split();
                if tracing::enabled!(Level::TRACE) {
                    trace!("S: {}", hex(&message_data));
                }
                let message = self
                    .format
                    .read_message(&message_data)
                    .map_err(BoltError::Decode)?;
                debug!("S: {}", message);
                return Ok(Some(message));
            }

            if src.len() < 2 + chunk_size {
                src.reserve(2 + chunk_size - src.len());
                return Ok(None);
            }

            if self.message_buffer.len() + chunk_size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size: self.message_buffer.len() + chunk_size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }
}

impl Encoder<BoltMessage> for BoltCodec {
    type Error = BoltError;

    fn encode(&mut self, item: BoltMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("C: {}", item);
        let start = dst.len();
        if let Err(source) = self.format.write_message(&item, dst) {
            dst.truncate(start);
            return Err(BoltError::Encode {
                message: item.name(),
                source,
            });
        }
        let body = dst.split_off(start);
        if tracing::enabled!(Level::TRACE) {
            trace!("C: {}", hex(&body));
        }
        self.write_chunks(&body, dst);
        Ok(())
    }
}

/// Space separated hex dump.
fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::handshake::BoltVersion;
    use crate::bolt::message::{
        BoltRequest, BoltResponse, PullMessage, RecordMessage, RunMessage, SuccessMessage,
    };
    use crate::bolt::value::{Node, Value};
    use std::collections::HashMap;

    fn codec() -> BoltCodec {
        BoltCodec::new(MessageFormat::new(BoltVersion::V4_4))
    }

    fn success() -> BoltMessage {
        BoltResponse::Success(SuccessMessage::hello_success("Zeta4G/1.0", "conn-1")).into()
    }

    #[test]
    fn test_encode_reset_bytes() {
        let mut buf = BytesMut::new();
        codec().encode(BoltRequest::Reset.into(), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x02, 0xB0, 0x0F, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_decode_message() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode(success(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(success()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_chunked_large_message() {
        let mut codec = BoltCodec::with_limits(MessageFormat::new(BoltVersion::V4_4), 100, 1 << 20);
        let mut buf = BytesMut::new();
        let big = "x".repeat(1_000);
        let msg: BoltMessage = BoltResponse::Record(RecordMessage::new(vec![Value::from(big.as_str())])).into();
        codec.encode(msg.clone(), &mut buf).unwrap();

        // first chunk is exactly the configured size
        assert_eq!(u16::from_be_bytes([buf[0], buf[1]]), 100);
        assert_eq!(&buf[buf.len() - 2..], &END_MARKER);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(msg));
    }

    #[test]
    fn test_chunk_size_clamped() {
        let codec = BoltCodec::with_limits(MessageFormat::new(BoltVersion::V4_4), 1 << 20, 1 << 20);
        assert_eq!(codec.max_chunk_size, MAX_CHUNK_SIZE);
        let codec = BoltCodec::with_limits(MessageFormat::new(BoltVersion::V4_4), 0, 1 << 20);
        assert_eq!(codec.max_chunk_size, 1);
    }

    #[test]
    fn test_max_size_chunk_boundary() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        let big = "y".repeat(MAX_CHUNK_SIZE * 2);
        let msg: BoltMessage = BoltRequest::Run(RunMessage::new(&big)).into();
        codec.encode(msg.clone(), &mut buf).unwrap();
        assert_eq!(u16::from_be_bytes([buf[0], buf[1]]) as usize, MAX_CHUNK_SIZE);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(msg));
    }

    #[test]
    fn test_partial_chunk() {
        let mut codec = codec();
        let mut full = BytesMut::new();
        codec.encode(success(), &mut full).unwrap();

        let mut partial = BytesMut::from(&full[..3]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full[3..]);
        assert_eq!(codec.decode(&mut partial).unwrap(), Some(success()));
    }

    #[test]
    fn test_encode_failure_leaves_buffer_untouched() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode(BoltRequest::Reset.into(), &mut buf).unwrap();
        let before = buf.clone();

        let node = Value::Node(Node::new(1, vec![], HashMap::new()));
        let run = RunMessage::new("RETURN $n").with_param("n", node);
        let err = codec.encode(BoltRequest::Run(run).into(), &mut buf).unwrap_err();

        assert!(matches!(err, BoltError::Encode { message: "RUN", .. }));
        assert_eq!(buf, before);
    }

    #[test]
    fn test_message_too_large() {
        let mut codec = BoltCodec::with_limits(MessageFormat::new(BoltVersion::V4_4), MAX_CHUNK_SIZE, 100);
        let mut buf = BytesMut::new();
        buf.put_u16(200);
        buf.extend_from_slice(&[0u8; 200]);
        assert!(matches!(codec.decode(&mut buf), Err(BoltError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_noop_skipped() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        buf.put_slice(&END_MARKER);
        buf.put_slice(&END_MARKER);
        codec.encode(BoltResponse::Ignored.into(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(BoltResponse::Ignored.into()));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_only_noops_yield_nothing() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_messages() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode(BoltRequest::Pull(PullMessage::all()).into(), &mut buf).unwrap();
        codec.encode(BoltRequest::Commit.into(), &mut buf).unwrap();
        codec.encode(BoltRequest::Goodbye.into(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(BoltRequest::Pull(PullMessage::all()).into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(BoltRequest::Commit.into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(BoltRequest::Goodbye.into()));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_error() {
        let mut codec = codec();
        // chunk holding a reserved marker
        let mut buf = BytesMut::from(&[0x00, 0x01, 0xC4, 0x00, 0x00][..]);
        assert!(matches!(codec.decode(&mut buf), Err(BoltError::Decode(_))));
    }

    #[test]
    fn test_apply_patches_keeps_buffered_bytes() {
        let mut codec = codec();
        // RECORD [DateTime UTC (0, 0, 0)] split across two deliveries
        let body = [0xB1, 0x71, 0x91, 0xB3, 0x49, 0x00, 0x00, 0x00];
        let mut first = BytesMut::new();
        first.put_u16(4);
        first.put_slice(&body[..4]);
        assert!(codec.decode(&mut first).unwrap().is_none());

        codec.apply_patches(&["utc"]);
        codec.apply_patches(&["utc"]);
        assert!(codec.format().date_time_utc());

        let mut rest = BytesMut::new();
        rest.put_u16(4);
        rest.put_slice(&body[4..]);
        rest.put_slice(&END_MARKER);
        let msg = codec.decode(&mut rest).unwrap().unwrap();
        assert!(matches!(msg, BoltMessage::Response(BoltResponse::Record(_))));
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xAB, 0x7F]), "00 AB 7F");
        assert_eq!(hex(&[]), "");
    }
}
