//! PackStream type markers.
//!
//! Every PackStream value starts with a marker byte. Small integers, strings,
//! lists, maps and structures fold their size into the low nibble of the
//! marker; everything else carries an explicit size after it.

/// Null marker
pub const NULL: u8 = 0xC0;

/// Float marker (64-bit IEEE 754)
pub const FLOAT_64: u8 = 0xC1;

/// Boolean markers
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Sized integer markers
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Byte array markers
pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

/// String markers
pub const TINY_STRING: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// List markers
pub const TINY_LIST: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers
pub const TINY_MAP: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure markers
pub const TINY_STRUCT: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Largest size that fits in the low nibble of a tiny marker.
pub const TINY_SIZE_MAX: usize = 15;

/// Smallest integer encoded inline in the marker byte.
pub const TINY_INT_MIN: i64 = -16;

/// Largest integer encoded inline in the marker byte.
pub const TINY_INT_MAX: i64 = 127;

/// Broad value family of a marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackType {
    /// Null
    Null,
    /// Boolean
    Boolean,
    /// Integer (tiny or sized)
    Integer,
    /// 64-bit float
    Float,
    /// Byte array
    Bytes,
    /// UTF-8 string
    String,
    /// List
    List,
    /// Map
    Map,
    /// Tagged structure
    Struct,
    /// Reserved marker
    Reserved,
}

impl PackType {
    /// Classify a marker byte.
    pub fn of(marker: u8) -> Self {
        match marker {
            0x00..=0x7F | 0xF0..=0xFF => PackType::Integer,
            0x80..=0x8F => PackType::String,
            0x90..=0x9F => PackType::List,
            0xA0..=0xAF => PackType::Map,
            0xB0..=0xBF => PackType::Struct,
            NULL => PackType::Null,
            FLOAT_64 => PackType::Float,
            FALSE | TRUE => PackType::Boolean,
            INT_8 | INT_16 | INT_32 | INT_64 => PackType::Integer,
            BYTES_8 | BYTES_16 | BYTES_32 => PackType::Bytes,
            STRING_8 | STRING_16 | STRING_32 => PackType::String,
            LIST_8 | LIST_16 | LIST_32 => PackType::List,
            MAP_8 | MAP_16 | MAP_32 => PackType::Map,
            STRUCT_8 | STRUCT_16 => PackType::Struct,
            _ => PackType::Reserved,
        }
    }
}

/// Low nibble of a tiny marker.
#[inline]
pub fn tiny_size(marker: u8) -> usize {
    (marker & 0x0F) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tiny_int() {
        assert_eq!(PackType::of(0x00), PackType::Integer);
        assert_eq!(PackType::of(0x7F), PackType::Integer);
        assert_eq!(PackType::of(0xF0), PackType::Integer);
        assert_eq!(PackType::of(0xFF), PackType::Integer);
    }

    #[test]
    fn test_classify_tiny_containers() {
        assert_eq!(PackType::of(0x85), PackType::String);
        assert_eq!(PackType::of(0x9F), PackType::List);
        assert_eq!(PackType::of(0xA0), PackType::Map);
        assert_eq!(PackType::of(0xB3), PackType::Struct);
        assert_eq!(tiny_size(0xB3), 3);
        assert_eq!(tiny_size(0x8F), 15);
    }

    #[test]
    fn test_classify_sized_markers() {
        assert_eq!(PackType::of(NULL), PackType::Null);
        assert_eq!(PackType::of(TRUE), PackType::Boolean);
        assert_eq!(PackType::of(INT_64), PackType::Integer);
        assert_eq!(PackType::of(BYTES_16), PackType::Bytes);
        assert_eq!(PackType::of(STRING_32), PackType::String);
        assert_eq!(PackType::of(STRUCT_16), PackType::Struct);
    }

    #[test]
    fn test_classify_reserved() {
        for marker in [0xC4, 0xC7, 0xCF, 0xD3, 0xD7, 0xDB, 0xDE, 0xEF] {
            assert_eq!(PackType::of(marker), PackType::Reserved, "0x{:02X}", marker);
        }
    }
}
