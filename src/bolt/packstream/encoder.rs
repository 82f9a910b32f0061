//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::PackStreamError;

/// Writes PackStream primitives and container headers into a byte buffer.
///
/// The encoder borrows the destination buffer, so a caller can pack a whole
/// message straight into an outbound frame and truncate it on failure.
pub struct PackStreamEncoder<'a> {
    buffer: &'a mut BytesMut,
}

impl<'a> PackStreamEncoder<'a> {
    /// Create an encoder that appends to `buffer`.
    pub fn new(buffer: &'a mut BytesMut) -> Self {
        Self { buffer }
    }

    /// Number of bytes in the underlying buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Encode null.
    pub fn pack_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn pack_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer using the smallest representation.
    pub fn pack_int(&mut self, value: i64) {
        if (TINY_INT_MIN..=TINY_INT_MAX).contains(&value) {
            self.buffer.put_i8(value as i8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(v);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float (always 64-bit).
    pub fn pack_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode a byte array.
    pub fn pack_bytes(&mut self, value: &[u8]) -> Result<(), PackStreamError> {
        let len = value.len();
        if len <= u8::MAX as usize {
            self.buffer.put_u8(BYTES_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(BYTES_16);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(BYTES_32);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge("bytes", len));
        }
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Encode a UTF-8 string.
    pub fn pack_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        self.pack_sized_header(
            value.len(),
            "string",
            [TINY_STRING, STRING_8, STRING_16, STRING_32],
        )?;
        self.buffer.put_slice(value.as_bytes());
        Ok(())
    }

    /// Encode a list header; the caller packs `size` elements after it.
    pub fn pack_list_header(&mut self, size: usize) -> Result<(), PackStreamError> {
        self.pack_sized_header(size, "list", [TINY_LIST, LIST_8, LIST_16, LIST_32])
    }

    /// Encode a map header; the caller packs `size` key/value pairs after it.
    pub fn pack_map_header(&mut self, size: usize) -> Result<(), PackStreamError> {
        self.pack_sized_header(size, "map", [TINY_MAP, MAP_8, MAP_16, MAP_32])
    }

    /// Encode a structure header; the caller packs `size` fields after it.
    pub fn pack_struct_header(&mut self, size: usize, tag: u8) -> Result<(), PackStreamError> {
        if size <= TINY_SIZE_MAX {
            self.buffer.put_u8(TINY_STRUCT | size as u8);
        } else if size <= u8::MAX as usize {
            self.buffer.put_u8(STRUCT_8);
            self.buffer.put_u8(size as u8);
        } else if size <= u16::MAX as usize {
            self.buffer.put_u8(STRUCT_16);
            self.buffer.put_u16(size as u16);
        } else {
            return Err(PackStreamError::ValueTooLarge("structure fields", size));
        }
        self.buffer.put_u8(tag);
        Ok(())
    }

    fn pack_sized_header(
        &mut self,
        size: usize,
        kind: &'static str,
        [tiny, m8, m16, m32]: [u8; 4],
    ) -> Result<(), PackStreamError> {
        if size <= TINY_SIZE_MAX {
            self.buffer.put_u8(tiny | size as u8);
        } else if size <= u8::MAX as usize {
            self.buffer.put_u8(m8);
            self.buffer.put_u8(size as u8);
        } else if size <= u16::MAX as usize {
            self.buffer.put_u8(m16);
            self.buffer.put_u16(size as u16);
        } else if size <= u32::MAX as usize {
            self.buffer.put_u8(m32);
            self.buffer.put_u32(size as u32);
        } else {
            return Err(PackStreamError::ValueTooLarge(kind, size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(f: impl FnOnce(&mut PackStreamEncoder<'_>)) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let mut enc = PackStreamEncoder::new(&mut buf);
        f(&mut enc);
        buf.to_vec()
    }

    #[test]
    fn test_pack_null_and_bool() {
        let bytes = packed(|e| {
            e.pack_null();
            e.pack_bool(true);
            e.pack_bool(false);
        });
        assert_eq!(bytes, vec![0xC0, 0xC3, 0xC2]);
    }

    #[test]
    fn test_pack_tiny_int() {
        let bytes = packed(|e| {
            e.pack_int(0);
            e.pack_int(127);
            e.pack_int(-16);
            e.pack_int(-1);
        });
        assert_eq!(bytes, vec![0x00, 0x7F, 0xF0, 0xFF]);
    }

    #[test]
    fn test_pack_sized_ints() {
        assert_eq!(packed(|e| e.pack_int(-17)), vec![INT_8, 0xEF]);
        assert_eq!(packed(|e| e.pack_int(-128)), vec![INT_8, 0x80]);
        assert_eq!(packed(|e| e.pack_int(128)), vec![INT_16, 0x00, 0x80]);
        assert_eq!(packed(|e| e.pack_int(32768)), vec![INT_32, 0x00, 0x00, 0x80, 0x00]);
        assert_eq!(packed(|e| e.pack_int(i64::MAX))[0], INT_64);
        assert_eq!(packed(|e| e.pack_int(i64::MAX)).len(), 9);
    }

    #[test]
    fn test_pack_float() {
        let bytes = packed(|e| e.pack_float(1.5));
        assert_eq!(bytes[0], FLOAT_64);
        assert_eq!(&bytes[1..], &1.5f64.to_be_bytes());
    }

    #[test]
    fn test_pack_strings() {
        assert_eq!(packed(|e| e.pack_string("").unwrap()), vec![0x80]);
        assert_eq!(packed(|e| e.pack_string("abc").unwrap()), vec![0x83, b'a', b'b', b'c']);

        let long = "x".repeat(16);
        let bytes = packed(|e| e.pack_string(&long).unwrap());
        assert_eq!(&bytes[..2], &[STRING_8, 16]);

        let longer = "y".repeat(300);
        let bytes = packed(|e| e.pack_string(&longer).unwrap());
        assert_eq!(&bytes[..3], &[STRING_16, 0x01, 0x2C]);
    }

    #[test]
    fn test_pack_bytes_always_sized() {
        assert_eq!(packed(|e| e.pack_bytes(&[]).unwrap()), vec![BYTES_8, 0]);
        assert_eq!(packed(|e| e.pack_bytes(&[1, 2]).unwrap()), vec![BYTES_8, 2, 1, 2]);
    }

    #[test]
    fn test_pack_headers() {
        assert_eq!(packed(|e| e.pack_list_header(3).unwrap()), vec![0x93]);
        assert_eq!(packed(|e| e.pack_map_header(0).unwrap()), vec![0xA0]);
        assert_eq!(packed(|e| e.pack_map_header(20).unwrap()), vec![MAP_8, 20]);
        assert_eq!(packed(|e| e.pack_struct_header(1, 0x70).unwrap()), vec![0xB1, 0x70]);
        assert_eq!(packed(|e| e.pack_struct_header(16, 0x4E).unwrap()), vec![STRUCT_8, 16, 0x4E]);
    }
}
