//! Zigzag-mapped LEB128 for signed 64-bit quantities (delta header fields).

use super::uleb128;
use crate::error::Result;

/// Decodes a zigzag ULEB128 `i64`, returning the value and bytes consumed.
pub fn decode(values: &[u8]) -> Result<(i64, usize)> {
    let (unsigned, consumed) = uleb128::decode(values)?;
    let value = (unsigned >> 1) as i64 ^ -((unsigned & 1) as i64);
    Ok((value, consumed))
}

/// Encodes `value` into `container`, returning the number of bytes written.
pub fn encode(value: i64, container: &mut [u8]) -> usize {
    let unsigned = ((value << 1) ^ (value >> 63)) as u64;
    uleb128::encode(unsigned, container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_magnitudes_stay_small() {
        let mut container = [0u8; uleb128::MAX_BYTE_LENGTH];
        assert_eq!(encode(0, &mut container), 1);
        assert_eq!(container[0], 0);
        assert_eq!(encode(-1, &mut container), 1);
        assert_eq!(container[0], 1);
        assert_eq!(encode(1, &mut container), 1);
        assert_eq!(container[0], 2);
    }

    #[test]
    fn roundtrip() {
        let mut container = [0u8; uleb128::MAX_BYTE_LENGTH];
        for value in [0i64, 1, -1, 63, -64, i32::MAX as i64, i64::MIN, i64::MAX] {
            let used = encode(value, &mut container);
            let (decoded, consumed) = decode(&container).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, used);
        }
    }
}
