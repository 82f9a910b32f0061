//! Client side of the Bolt handshake.

use super::{BoltVersion, HandshakeError, BOLT_MAGIC, HANDSHAKE_SIZE};

/// ASCII "HTTP", returned when the client reached an HTTP endpoint.
const HTTP_RESPONSE: [u8; 4] = [b'H', b'T', b'T', b'P'];

/// A single version slot in the client preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProposal {
    /// Highest version in the slot
    pub version: BoltVersion,
    /// How many minor versions below `version` are also accepted
    pub range: u8,
}

impl VersionProposal {
    /// Propose one exact version.
    pub fn exact(version: BoltVersion) -> Self {
        Self { version, range: 0 }
    }

    /// Propose `version` and the `range` minor versions below it.
    pub fn with_range(version: BoltVersion, range: u8) -> Self {
        Self { version, range }
    }

    fn accepts(&self, version: BoltVersion) -> bool {
        version.major() == self.version.major()
            && version.minor() <= self.version.minor()
            && version.minor() + u16::from(self.range) >= self.version.minor()
    }
}

/// Bolt handshake.
///
/// The handshake process:
/// 1. Client sends 20 bytes: 4-byte magic + 4 x 4-byte version proposals
/// 2. Server picks the first proposal it supports
/// 3. Server responds with the 4-byte agreed version (or zeros if none)
#[derive(Debug, Clone)]
pub struct Handshake {
    proposals: Vec<VersionProposal>,
}

impl Handshake {
    /// Propose 5.0, 4.4 down to 4.2, 4.1 down to 4.0, then 3.0.
    pub fn new() -> Self {
        Self::with_proposals(vec![
            VersionProposal::exact(BoltVersion::V5_0),
            VersionProposal::with_range(BoltVersion::V4_4, 2),
            VersionProposal::with_range(BoltVersion::V4_1, 1),
            VersionProposal::exact(BoltVersion::V3_0),
        ])
    }

    /// Create a handshake with explicit proposals; only the first four are sent.
    pub fn with_proposals(mut proposals: Vec<VersionProposal>) -> Self {
        proposals.truncate(4);
        Self { proposals }
    }

    /// The 20-byte client preamble.
    pub fn preamble(&self) -> [u8; HANDSHAKE_SIZE] {
        let mut data = [0u8; HANDSHAKE_SIZE];
        data[0..4].copy_from_slice(&BOLT_MAGIC);
        for (i, proposal) in self.proposals.iter().enumerate() {
            let offset = 4 + i * 4;
            data[offset..offset + 4]
                .copy_from_slice(&proposal.version.to_bytes_with_range(proposal.range));
        }
        data
    }

    /// Interpret the server's 4-byte answer.
    pub fn accept(&self, response: [u8; 4]) -> Result<BoltVersion, HandshakeError> {
        if response == HTTP_RESPONSE {
            return Err(HandshakeError::InvalidData(
                "server responded HTTP; make sure you are not connecting to the http endpoint"
                    .to_string(),
            ));
        }
        if response == [0, 0, 0, 0] {
            return Err(HandshakeError::NoCompatibleVersion);
        }
        let version = BoltVersion::from_bytes(response).ok_or_else(|| {
            HandshakeError::InvalidData(format!("unknown protocol version {:02X?}", response))
        })?;
        if self.proposals.iter().any(|p| p.accepts(version)) {
            Ok(version)
        } else {
            Err(HandshakeError::InvalidData(format!(
                "server chose version {} which was not proposed",
                version
            )))
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preamble() {
        let data = Handshake::new().preamble();
        assert_eq!(&data[0..4], &BOLT_MAGIC);
        assert_eq!(&data[4..8], &[0x00, 0x00, 0x00, 0x05]);
        assert_eq!(&data[8..12], &[0x00, 0x02, 0x04, 0x04]);
        assert_eq!(&data[12..16], &[0x00, 0x01, 0x01, 0x04]);
        assert_eq!(&data[16..20], &[0x00, 0x00, 0x00, 0x03]);
    }

    #[test]
    fn test_unused_slots_are_zero() {
        let data = Handshake::with_proposals(vec![VersionProposal::exact(BoltVersion::V4_4)]).preamble();
        assert_eq!(&data[8..20], &[0u8; 12]);
    }

    #[test]
    fn test_accept_within_range() {
        let handshake = Handshake::new();
        assert_eq!(handshake.accept([0, 0, 0, 5]).unwrap(), BoltVersion::V5_0);
        assert_eq!(handshake.accept([0, 0, 3, 4]).unwrap(), BoltVersion::V4_3);
        assert_eq!(handshake.accept([0, 0, 2, 4]).unwrap(), BoltVersion::V4_2);
        assert_eq!(handshake.accept([0, 0, 0, 4]).unwrap(), BoltVersion::V4_0);
        assert_eq!(handshake.accept([0, 0, 0, 3]).unwrap(), BoltVersion::V3_0);
    }

    #[test]
    fn test_accept_rejects_unproposed() {
        let handshake = Handshake::with_proposals(vec![VersionProposal::exact(BoltVersion::V4_4)]);
        assert!(matches!(
            handshake.accept([0, 0, 3, 4]),
            Err(HandshakeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_accept_no_version() {
        assert_eq!(
            Handshake::new().accept([0, 0, 0, 0]),
            Err(HandshakeError::NoCompatibleVersion)
        );
    }

    #[test]
    fn test_accept_http() {
        let err = Handshake::new().accept(*b"HTTP").unwrap_err();
        assert!(err.to_string().contains("http endpoint"));
    }

    #[test]
    fn test_accept_unknown_version() {
        assert!(matches!(
            Handshake::new().accept([0, 0, 9, 9]),
            Err(HandshakeError::InvalidData(_))
        ));
    }
}
