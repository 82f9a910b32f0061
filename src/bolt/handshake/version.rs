//! Bolt protocol version definitions.

use std::fmt;

/// Bolt protocol versions.
///
/// The discriminant orders versions: major in the high 2 bytes, minor in
/// the low 2 bytes (V4_3 = 0x0004_0003). On the wire a version occupies
/// 4 bytes laid out as `[reserved, range, minor, major]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 3.0 - PULL_ALL/DISCARD_ALL only
    V3_0 = 0x0003_0000,
    /// Bolt 4.0 - Bounded PULL/DISCARD, qid
    V4_0 = 0x0004_0000,
    /// Bolt 4.1
    V4_1 = 0x0004_0001,
    /// Bolt 4.2
    V4_2 = 0x0004_0002,
    /// Bolt 4.3 - `utc` patch available
    V4_3 = 0x0004_0003,
    /// Bolt 4.4 - `utc` patch available
    V4_4 = 0x0004_0004,
    /// Bolt 5.0 - Element IDs, UTC date-times
    V5_0 = 0x0005_0000,
}

impl BoltVersion {
    /// All supported versions in order of preference (newest first).
    pub const ALL: [BoltVersion; 7] = [
        BoltVersion::V5_0,
        BoltVersion::V4_4,
        BoltVersion::V4_3,
        BoltVersion::V4_2,
        BoltVersion::V4_1,
        BoltVersion::V4_0,
        BoltVersion::V3_0,
    ];

    /// Create a BoltVersion from a raw u32 value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0003_0000 => Some(BoltVersion::V3_0),
            0x0004_0000 => Some(BoltVersion::V4_0),
            0x0004_0001 => Some(BoltVersion::V4_1),
            0x0004_0002 => Some(BoltVersion::V4_2),
            0x0004_0003 => Some(BoltVersion::V4_3),
            0x0004_0004 => Some(BoltVersion::V4_4),
            0x0005_0000 => Some(BoltVersion::V5_0),
            _ => None,
        }
    }

    /// Get the raw u32 value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Get the major version number.
    pub fn major(self) -> u16 {
        ((self as u32) >> 16) as u16
    }

    /// Get the minor version number.
    pub fn minor(self) -> u16 {
        ((self as u32) & 0xFFFF) as u16
    }

    /// Encode as a handshake slot with no range.
    pub fn to_bytes(self) -> [u8; 4] {
        self.to_bytes_with_range(0)
    }

    /// Encode as a handshake slot that also accepts the `range` minor
    /// versions below this one.
    pub fn to_bytes_with_range(self, range: u8) -> [u8; 4] {
        [0x00, range, self.minor() as u8, self.major() as u8]
    }

    /// Parse a negotiated version from its wire bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        let [_, _, minor, major] = bytes;
        Self::from_u32(((major as u32) << 16) | minor as u32)
    }

    /// Check if PULL/DISCARD accept a record count and query id.
    pub fn supports_bounded_pull(self) -> bool {
        self >= BoltVersion::V4_0
    }

    /// Check if this version uses element IDs (5.x style).
    pub fn uses_element_ids(self) -> bool {
        self >= BoltVersion::V5_0
    }

    /// Check if date-times are encoded against UTC without negotiation.
    pub fn utc_date_time_by_default(self) -> bool {
        self >= BoltVersion::V5_0
    }

    /// Check if HELLO may negotiate the `utc` patch.
    pub fn supports_utc_patch(self) -> bool {
        matches!(self, BoltVersion::V4_3 | BoltVersion::V4_4)
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl PartialOrd for BoltVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoltVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_u32().cmp(&other.as_u32())
    }
}
