//! Framing for repetition and definition level streams inside v1 data pages:
//! a 4-byte little-endian length prefix followed by a hybrid-RLE body.
//!
//! A leaf whose maximum level is zero carries no level stream at all, not
//! even the prefix.

use super::get_bit_width;
use super::hybrid_rle::{encode_u32, HybridRleDecoder};
use crate::error::{Error, Result};

/// Encodes `length` levels bounded by `max_level`, appending to `buffer`.
/// The 4-byte length prefix is reserved up front and backfilled.
pub fn encode<I: Iterator<Item = u32>>(
    buffer: &mut Vec<u8>,
    levels: I,
    max_level: u32,
    length: usize,
) -> Result<()> {
    if max_level == 0 {
        return Ok(());
    }
    buffer.extend_from_slice(&[0; 4]);
    let start = buffer.len();
    encode_u32(buffer, levels, get_bit_width(u64::from(max_level)), length)?;
    let body_len = (buffer.len() - start) as u32;
    buffer[start - 4..start].copy_from_slice(&body_len.to_le_bytes());
    Ok(())
}

/// Carves one level stream off the front of `data`, returning the decoder
/// over `num_values` levels and the number of bytes consumed (prefix
/// included). Consumes nothing when `max_level` is zero.
pub fn decode(data: &[u8], num_values: usize, max_level: u32) -> Result<(HybridRleDecoder<'_>, usize)> {
    if max_level == 0 {
        let decoder = HybridRleDecoder::try_new(&[], 0, num_values)?;
        return Ok((decoder, 0));
    }
    if data.len() < 4 {
        return Err(Error::BufferUnderrun(
            "level stream shorter than its length prefix".to_string(),
        ));
    }
    let body_len = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
    let body = data
        .get(4..4 + body_len)
        .ok_or_else(|| Error::oos("level stream length prefix points past the page"))?;
    let num_bits = get_bit_width(u64::from(max_level)) as usize;
    Ok((
        HybridRleDecoder::try_new(body, num_bits, num_values)?,
        4 + body_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let levels = [0u32, 1, 2, 2, 1, 0, 2, 2, 2, 0];
        let mut buffer = vec![];
        encode(&mut buffer, levels.iter().copied(), 2, levels.len()).unwrap();

        let (decoder, consumed) = decode(&buffer, levels.len(), 2).unwrap();
        assert_eq!(consumed, buffer.len());
        let decoded = decoder.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded, levels);
    }

    #[test]
    fn prefix_matches_body() {
        let levels = std::iter::repeat(1u32).take(1000);
        let mut buffer = vec![];
        encode(&mut buffer, levels, 1, 1000).unwrap();
        let body_len = u32::from_le_bytes(buffer[..4].try_into().unwrap()) as usize;
        assert_eq!(body_len, buffer.len() - 4);
    }

    #[test]
    fn max_level_zero_is_omitted() {
        let mut buffer = vec![];
        encode(&mut buffer, std::iter::repeat(0u32).take(5), 0, 5).unwrap();
        assert!(buffer.is_empty());

        let (decoder, consumed) = decode(&[0xAB, 0xCD], 5, 0).unwrap();
        assert_eq!(consumed, 0);
        let decoded = decoder.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded, vec![0; 5]);
    }

    #[test]
    fn level_stream_is_followed_by_values() {
        let levels = [1u32, 1, 0, 1];
        let mut buffer = vec![];
        encode(&mut buffer, levels.iter().copied(), 1, levels.len()).unwrap();
        buffer.extend_from_slice(b"values");

        let (decoder, consumed) = decode(&buffer, levels.len(), 1).unwrap();
        let decoded = decoder.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded, levels);
        assert_eq!(&buffer[consumed..], b"values");
    }

    #[test]
    fn bad_prefix_is_rejected() {
        assert!(decode(&[1, 0], 2, 1).is_err());
        assert!(decode(&[200, 0, 0, 0, 1], 2, 1).is_err());
    }
}
