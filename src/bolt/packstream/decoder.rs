//! PackStream decoder.

use super::marker::*;
use super::PackStreamError;

/// Reads PackStream primitives and container headers from a byte slice.
///
/// Containers are read header-first: the caller learns the size from
/// `unpack_list_header`/`unpack_map_header`/`unpack_struct_header` and then
/// unpacks that many elements itself.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Classify the next value without consuming it.
    pub fn peek_type(&self) -> Result<PackType, PackStreamError> {
        let marker = *self.data.get(self.pos).ok_or(PackStreamError::UnexpectedEof)?;
        match PackType::of(marker) {
            PackType::Reserved => Err(PackStreamError::UnknownMarker(marker)),
            t => Ok(t),
        }
    }

    /// Consume a null marker.
    pub fn unpack_null(&mut self) -> Result<(), PackStreamError> {
        match self.read_u8()? {
            NULL => Ok(()),
            m => Err(self.unexpected("null", m)),
        }
    }

    /// Read a boolean.
    pub fn unpack_bool(&mut self) -> Result<bool, PackStreamError> {
        match self.read_u8()? {
            TRUE => Ok(true),
            FALSE => Ok(false),
            m => Err(self.unexpected("boolean", m)),
        }
    }

    /// Read an integer in any of its encodings.
    pub fn unpack_int(&mut self) -> Result<i64, PackStreamError> {
        let marker = self.read_u8()?;
        match marker {
            0x00..=0x7F | 0xF0..=0xFF => Ok(marker as i8 as i64),
            INT_8 => Ok(self.read_array::<1>()?[0] as i8 as i64),
            INT_16 => Ok(i16::from_be_bytes(self.read_array()?) as i64),
            INT_32 => Ok(i32::from_be_bytes(self.read_array()?) as i64),
            INT_64 => Ok(i64::from_be_bytes(self.read_array()?)),
            m => Err(self.unexpected("integer", m)),
        }
    }

    /// Read a 64-bit float.
    pub fn unpack_float(&mut self) -> Result<f64, PackStreamError> {
        match self.read_u8()? {
            FLOAT_64 => Ok(f64::from_be_bytes(self.read_array()?)),
            m => Err(self.unexpected("float", m)),
        }
    }

    /// Read a byte array.
    pub fn unpack_bytes(&mut self) -> Result<Vec<u8>, PackStreamError> {
        let len = match self.read_u8()? {
            BYTES_8 => self.read_array::<1>()?[0] as usize,
            BYTES_16 => u16::from_be_bytes(self.read_array()?) as usize,
            BYTES_32 => u32::from_be_bytes(self.read_array()?) as usize,
            m => return Err(self.unexpected("bytes", m)),
        };
        Ok(self.read_slice(len)?.to_vec())
    }

    /// Read a UTF-8 string.
    pub fn unpack_string(&mut self) -> Result<String, PackStreamError> {
        let len = self.unpack_sized_header("string", TINY_STRING, [STRING_8, STRING_16, STRING_32])?;
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))
    }

    /// Read a list header, returning the element count.
    pub fn unpack_list_header(&mut self) -> Result<usize, PackStreamError> {
        self.unpack_sized_header("list", TINY_LIST, [LIST_8, LIST_16, LIST_32])
    }

    /// Read a map header, returning the entry count.
    pub fn unpack_map_header(&mut self) -> Result<usize, PackStreamError> {
        self.unpack_sized_header("map", TINY_MAP, [MAP_8, MAP_16, MAP_32])
    }

    /// Read a structure header, returning `(field_count, tag)`.
    pub fn unpack_struct_header(&mut self) -> Result<(usize, u8), PackStreamError> {
        let marker = self.read_u8()?;
        let size = match marker {
            0xB0..=0xBF => tiny_size(marker),
            STRUCT_8 => self.read_array::<1>()?[0] as usize,
            STRUCT_16 => u16::from_be_bytes(self.read_array()?) as usize,
            m => return Err(self.unexpected("structure", m)),
        };
        let tag = self.read_u8()?;
        Ok((size, tag))
    }

    fn unpack_sized_header(
        &mut self,
        kind: &'static str,
        tiny: u8,
        [m8, m16, m32]: [u8; 3],
    ) -> Result<usize, PackStreamError> {
        let marker = self.read_u8()?;
        if marker & 0xF0 == tiny {
            return Ok(tiny_size(marker));
        }
        if marker == m8 {
            Ok(self.read_array::<1>()?[0] as usize)
        } else if marker == m16 {
            Ok(u16::from_be_bytes(self.read_array()?) as usize)
        } else if marker == m32 {
            Ok(u32::from_be_bytes(self.read_array()?) as usize)
        } else {
            Err(self.unexpected(kind, marker))
        }
    }

    fn unexpected(&self, expected: &str, marker: u8) -> PackStreamError {
        match PackType::of(marker) {
            PackType::Reserved => PackStreamError::UnknownMarker(marker),
            found => PackStreamError::UnexpectedType(format!(
                "expected {} but found {:?} at offset {}",
                expected,
                found,
                self.pos - 1
            )),
        }
    }

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        let byte = *self.data.get(self.pos).ok_or(PackStreamError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PackStreamError> {
        let slice = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_null_and_bool() {
        let mut dec = PackStreamDecoder::new(&[0xC0, 0xC3, 0xC2]);
        dec.unpack_null().unwrap();
        assert!(dec.unpack_bool().unwrap());
        assert!(!dec.unpack_bool().unwrap());
        assert!(dec.is_empty());
    }

    #[test]
    fn test_unpack_ints() {
        let data = [
            0x7F, 0xF0, INT_8, 0x80, INT_16, 0x01, 0x00, INT_32, 0x00, 0x01, 0x00, 0x00,
        ];
        let mut dec = PackStreamDecoder::new(&data);
        assert_eq!(dec.unpack_int().unwrap(), 127);
        assert_eq!(dec.unpack_int().unwrap(), -16);
        assert_eq!(dec.unpack_int().unwrap(), -128);
        assert_eq!(dec.unpack_int().unwrap(), 256);
        assert_eq!(dec.unpack_int().unwrap(), 65536);
    }

    #[test]
    fn test_unpack_int64() {
        let mut data = vec![INT_64];
        data.extend_from_slice(&i64::MIN.to_be_bytes());
        assert_eq!(PackStreamDecoder::new(&data).unpack_int().unwrap(), i64::MIN);
    }

    #[test]
    fn test_unpack_float() {
        let mut data = vec![FLOAT_64];
        data.extend_from_slice(&(-2.25f64).to_be_bytes());
        assert_eq!(PackStreamDecoder::new(&data).unpack_float().unwrap(), -2.25);
    }

    #[test]
    fn test_unpack_strings() {
        let mut dec = PackStreamDecoder::new(&[0x80, 0x82, b'h', b'i', STRING_8, 1, b'x']);
        assert_eq!(dec.unpack_string().unwrap(), "");
        assert_eq!(dec.unpack_string().unwrap(), "hi");
        assert_eq!(dec.unpack_string().unwrap(), "x");
    }

    #[test]
    fn test_unpack_bytes() {
        let mut dec = PackStreamDecoder::new(&[BYTES_8, 3, 1, 2, 3]);
        assert_eq!(dec.unpack_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unpack_headers() {
        let mut dec = PackStreamDecoder::new(&[0x93, MAP_8, 20, 0xB2, 0x4E, STRUCT_16, 0x00, 0x10, 0x50]);
        assert_eq!(dec.unpack_list_header().unwrap(), 3);
        assert_eq!(dec.unpack_map_header().unwrap(), 20);
        assert_eq!(dec.unpack_struct_header().unwrap(), (2, 0x4E));
        assert_eq!(dec.unpack_struct_header().unwrap(), (16, 0x50));
    }

    #[test]
    fn test_peek_type_does_not_consume() {
        let dec = PackStreamDecoder::new(&[0x91, 0x01]);
        assert_eq!(dec.peek_type().unwrap(), PackType::List);
        assert_eq!(dec.position(), 0);
    }

    #[test]
    fn test_unexpected_eof() {
        let mut dec = PackStreamDecoder::new(&[0x85, b'a']);
        assert!(matches!(dec.unpack_string(), Err(PackStreamError::UnexpectedEof)));
        let mut dec = PackStreamDecoder::new(&[]);
        assert!(matches!(dec.unpack_int(), Err(PackStreamError::UnexpectedEof)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut dec = PackStreamDecoder::new(&[0x82, 0xFF, 0xFE]);
        assert!(matches!(dec.unpack_string(), Err(PackStreamError::InvalidUtf8(_))));
    }

    #[test]
    fn test_type_mismatch() {
        let mut dec = PackStreamDecoder::new(&[0x81, b'a']);
        assert!(matches!(dec.unpack_int(), Err(PackStreamError::UnexpectedType(_))));

        let mut dec = PackStreamDecoder::new(&[0xC4]);
        assert!(matches!(dec.unpack_bool(), Err(PackStreamError::UnknownMarker(0xC4))));
        assert!(matches!(
            PackStreamDecoder::new(&[0xE0]).peek_type(),
            Err(PackStreamError::UnknownMarker(0xE0))
        ));
    }
}
