//! # Bolt Protocol Implementation
//!
//! Wire level of the Bolt protocol: how messages and values become bytes.
//!
//! ## Overview
//!
//! - **PackStream** - Binary serialization primitives
//! - **Values** - Typed application values carried in messages
//! - **Format** - Version and patch dependent mapping of values and messages
//! - **Message Types** - Request/response message model
//! - **Handshake** - Protocol version negotiation
//! - **Codec** - Chunked message framing for Tokio
//!
//! ## Submodules
//!
//! - [`packstream`] - Markers, encoder, decoder
//! - [`value`] - `Value`, graph, spatial and temporal types
//! - [`format`] - `MessageFormat` and the `utc` patch
//! - [`message`] - Bolt message types (HELLO, RUN, PULL, etc.)
//! - [`handshake`] - Version negotiation
//! - [`codec`] - Tokio codec for async I/O
//! - [`error`] - Protocol error types
//!
//! Most users drive a connection through [`crate::driver`] instead of using
//! these types directly.

pub mod codec;
pub mod error;
pub mod format;
pub mod handshake;
pub mod message;
pub mod packstream;
pub mod value;

pub use codec::BoltCodec;
pub use error::{BoltError, BoltResult, HandshakeError};
pub use format::MessageFormat;
pub use handshake::{BoltVersion, Handshake, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE};
pub use message::{
    AccessMode, AuthToken, BeginMessage, BoltMessage, BoltRequest, BoltResponse, DiscardMessage,
    FailureMessage, HelloMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage,
    ABSENT_QUERY_ID, FETCH_ALL,
};
pub use packstream::{PackStreamDecoder, PackStreamEncoder, PackStreamError};
pub use value::Value;
