//! Version negotiation preceding the first Bolt message.
//!
//! The client writes the magic preamble and up to four version slots; the
//! server answers with a single slot naming the agreed version, or zeros.
//! The agreed version selects the [`MessageFormat`](crate::bolt::MessageFormat).

mod negotiation;
mod version;

pub use negotiation::{Handshake, VersionProposal};
pub use version::BoltVersion;

pub use super::error::HandshakeError;

/// Preamble identifying a Bolt client: 0x6060B017
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Client preamble length: magic plus four version slots
pub const HANDSHAKE_SIZE: usize = BOLT_MAGIC.len() + 4 * 4;

/// Server answer length: one version slot
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;
