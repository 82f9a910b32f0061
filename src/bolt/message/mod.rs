//! Bolt protocol message types.
//!
//! This module defines the request and response messages exchanged over a
//! Bolt connection for versions 3.0 through 5.0.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use std::fmt;

/// Bolt message tags.
pub mod tag {
    /// HELLO message tag (0x01)
    pub const HELLO: u8 = 0x01;
    /// GOODBYE message tag (0x02)
    pub const GOODBYE: u8 = 0x02;
    /// RESET message tag (0x0F)
    pub const RESET: u8 = 0x0F;
    /// RUN message tag (0x10)
    pub const RUN: u8 = 0x10;
    /// BEGIN message tag (0x11)
    pub const BEGIN: u8 = 0x11;
    /// COMMIT message tag (0x12)
    pub const COMMIT: u8 = 0x12;
    /// ROLLBACK message tag (0x13)
    pub const ROLLBACK: u8 = 0x13;
    /// DISCARD message tag (0x2F); DISCARD_ALL on Bolt 3
    pub const DISCARD: u8 = 0x2F;
    /// PULL message tag (0x3F); PULL_ALL on Bolt 3
    pub const PULL: u8 = 0x3F;

    /// SUCCESS response tag (0x70)
    pub const SUCCESS: u8 = 0x70;
    /// RECORD response tag (0x71)
    pub const RECORD: u8 = 0x71;
    /// IGNORED response tag (0x7E)
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE response tag (0x7F)
    pub const FAILURE: u8 = 0x7F;
}

/// Any message that travels over a Bolt connection, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltMessage {
    /// Client to server
    Request(BoltRequest),
    /// Server to client
    Response(BoltResponse),
}

impl BoltMessage {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltMessage::Request(req) => req.tag(),
            BoltMessage::Response(resp) => resp.tag(),
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltMessage::Request(req) => req.name(),
            BoltMessage::Response(resp) => resp.name(),
        }
    }

    /// Borrow as a request, if it is one.
    pub fn as_request(&self) -> Option<&BoltRequest> {
        match self {
            BoltMessage::Request(req) => Some(req),
            BoltMessage::Response(_) => None,
        }
    }

    /// Unwrap into a response, if it is one.
    pub fn into_response(self) -> Option<BoltResponse> {
        match self {
            BoltMessage::Response(resp) => Some(resp),
            BoltMessage::Request(_) => None,
        }
    }
}

impl From<BoltRequest> for BoltMessage {
    fn from(req: BoltRequest) -> Self {
        BoltMessage::Request(req)
    }
}

impl From<BoltResponse> for BoltMessage {
    fn from(resp: BoltResponse) -> Self {
        BoltMessage::Response(resp)
    }
}

impl fmt::Display for BoltMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltMessage::Request(req) => write!(f, "{}", req),
            BoltMessage::Response(resp) => write!(f, "{}", resp),
        }
    }
}
