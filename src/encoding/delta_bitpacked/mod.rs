//! The DELTA_BINARY_PACKED encoding for 32- and 64-bit integers.
//!
//! A page starts with `<block size> <miniblocks per block> <total count>`
//! as ULEB128 plus the zigzag first value. Deltas follow in blocks: the
//! block's zigzag `min delta`, one bit-width byte per miniblock, then each
//! miniblock's `delta - min delta` values bit-packed at its width.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::encode;

/// Deltas per block. Parquet requires a multiple of 128.
const BLOCK_SIZE: usize = 128;
/// Miniblocks per block; each holds 32 deltas.
const MINIBLOCKS_PER_BLOCK: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    fn roundtrip(values: &[i64]) {
        let mut buffer = vec![];
        encode(values.iter().copied(), &mut buffer);
        let decoded = Decoder::try_new(&buffer)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn empty() {
        roundtrip(&[]);
    }

    #[test]
    fn single_value() {
        roundtrip(&[2426]);
    }

    #[test]
    fn constant_deltas_use_no_payload() {
        let values: Vec<i64> = (0..128).map(|i| 7 + 3 * i).collect();
        let mut buffer = vec![];
        encode(values.iter().copied(), &mut buffer);
        // header (4 fields) + one block of min_delta + four zero widths
        let decoded = Decoder::try_new(&buffer)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, values);
        assert!(buffer.len() < 16);
    }

    #[test]
    fn negative_deltas() {
        roundtrip(&[100, 90, 80, 81, 79, -10, -100, 0, i64::MIN / 2]);
    }

    #[test]
    fn multiple_blocks() {
        let values: Vec<i64> = (0..1000).map(|i| (i * i) % 40961 - 20000).collect();
        roundtrip(&values);
    }

    #[test]
    fn extremes() {
        roundtrip(&[i64::MIN, i64::MAX, i64::MIN, 0, i64::MAX - 1]);
    }

    #[test]
    fn beats_plain_for_monotonic_sequences() {
        let values: Vec<i64> = (0..128).map(|i| 1_000_000 + i * 3).collect();
        let mut buffer = vec![];
        encode(values.iter().copied(), &mut buffer);
        assert!(buffer.len() < values.len() * std::mem::size_of::<i64>());
    }

    #[test]
    fn rejects_bad_headers() {
        // block size not a multiple of 128
        let mut data = vec![];
        let mut scratch = [0u8; 10];
        for value in [100u64, 4, 1, 0] {
            let used = crate::encoding::uleb128::encode(value, &mut scratch);
            data.extend_from_slice(&scratch[..used]);
        }
        assert!(Decoder::try_new(&data).is_err());

        // truncated header
        assert!(Decoder::try_new(&[0x80]).is_err());
    }

    #[test]
    fn rejects_miniblock_width_out_of_range() {
        let mut data = vec![];
        let mut scratch = [0u8; 10];
        for value in [128u64, 4, 2, 0] {
            let used = crate::encoding::uleb128::encode(value, &mut scratch);
            data.extend_from_slice(&scratch[..used]);
        }
        // block: min_delta 0, then an invalid 65-bit miniblock width
        data.push(0);
        data.extend_from_slice(&[65, 0, 0, 0]);
        let result = Decoder::try_new(&data).unwrap().collect::<Result<Vec<_>>>();
        assert!(result.is_err());
    }
}
