//! Unsigned LEB128 ("ULEB128") used by the hybrid-RLE run headers and the
//! delta-binary-packed page header.

use crate::error::{Error, Result};

/// Maximum encoded length of a `u64`, in bytes.
pub const MAX_BYTE_LENGTH: usize = 10;

/// Decodes a ULEB128-encoded `u64` from the start of `values`, returning the
/// value and the number of bytes consumed.
pub fn decode(values: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0u32;
    for (consumed, byte) in values.iter().take(MAX_BYTE_LENGTH).enumerate() {
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, consumed + 1));
        }
        shift += 7;
    }
    if values.len() < MAX_BYTE_LENGTH {
        Err(Error::BufferUnderrun(
            "uleb128 value ended mid-byte".to_string(),
        ))
    } else {
        Err(Error::oos("uleb128 value longer than 10 bytes"))
    }
}

/// Encodes `value` into `container`, returning the number of bytes written.
/// `container` must hold at least [`MAX_BYTE_LENGTH`] bytes.
pub fn encode(mut value: u64, container: &mut [u8]) -> usize {
    let mut consumed = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        container[consumed] = byte;
        consumed += 1;
        if value == 0 {
            return consumed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut container = [0u8; MAX_BYTE_LENGTH];
        for value in [0u64, 1, 127, 128, 300, 16383, 16384, u32::MAX as u64, u64::MAX] {
            let used = encode(value, &mut container);
            let (decoded, consumed) = decode(&container).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, used);
        }
    }

    #[test]
    fn known_bytes() {
        let mut container = [0u8; MAX_BYTE_LENGTH];
        let used = encode(300, &mut container);
        assert_eq!(&container[..used], &[0xAC, 0x02]);
    }

    #[test]
    fn truncated() {
        assert!(matches!(decode(&[0x80]), Err(Error::BufferUnderrun(_))));
        assert!(decode(&[0x80; MAX_BYTE_LENGTH]).is_err());
    }
}
