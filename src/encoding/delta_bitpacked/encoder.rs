use super::{BLOCK_SIZE, MINIBLOCKS_PER_BLOCK};
use crate::encoding::bitpacked;
use crate::encoding::{uleb128, zigzag_leb128};

const VALUES_PER_MINIBLOCK: usize = BLOCK_SIZE / MINIBLOCKS_PER_BLOCK;

#[inline]
fn push_uleb(buffer: &mut Vec<u8>, value: u64) {
    let mut container = [0u8; uleb128::MAX_BYTE_LENGTH];
    let used = uleb128::encode(value, &mut container);
    buffer.extend_from_slice(&container[..used]);
}

#[inline]
fn push_zigzag(buffer: &mut Vec<u8>, value: i64) {
    let mut container = [0u8; uleb128::MAX_BYTE_LENGTH];
    let used = zigzag_leb128::encode(value, &mut container);
    buffer.extend_from_slice(&container[..used]);
}

/// Delta-binary-packed encodes `iterator`, appending to `buffer`.
///
/// Emits blocks of 128 deltas split into four 32-value miniblocks. A
/// miniblock whose adjusted deltas are all zero gets width zero and no
/// payload; a trailing partial miniblock is padded with zeros.
pub fn encode<I: Iterator<Item = i64>>(iterator: I, buffer: &mut Vec<u8>) {
    let values: Vec<i64> = iterator.collect();

    push_uleb(buffer, BLOCK_SIZE as u64);
    push_uleb(buffer, MINIBLOCKS_PER_BLOCK as u64);
    push_uleb(buffer, values.len() as u64);
    push_zigzag(buffer, values.first().copied().unwrap_or(0));

    let deltas: Vec<i64> = values
        .windows(2)
        .map(|pair| pair[1].wrapping_sub(pair[0]))
        .collect();

    for block in deltas.chunks(BLOCK_SIZE) {
        let min_delta = block.iter().copied().min().unwrap();
        push_zigzag(buffer, min_delta);

        let mut adjusted = [0u64; BLOCK_SIZE];
        for (slot, delta) in adjusted.iter_mut().zip(block) {
            *slot = delta.wrapping_sub(min_delta) as u64;
        }
        let num_miniblocks = (block.len() + VALUES_PER_MINIBLOCK - 1) / VALUES_PER_MINIBLOCK;

        let mut widths = [0u8; MINIBLOCKS_PER_BLOCK];
        for (width, miniblock) in widths
            .iter_mut()
            .zip(adjusted[..num_miniblocks * VALUES_PER_MINIBLOCK].chunks(VALUES_PER_MINIBLOCK))
        {
            let max = miniblock.iter().copied().max().unwrap_or(0);
            *width = (64 - max.leading_zeros()) as u8;
        }
        buffer.extend_from_slice(&widths);

        for (index, miniblock) in adjusted[..num_miniblocks * VALUES_PER_MINIBLOCK]
            .chunks(VALUES_PER_MINIBLOCK)
            .enumerate()
        {
            let num_bits = widths[index] as usize;
            if num_bits == 0 {
                continue;
            }
            bitpacked::encode(miniblock, num_bits, buffer);
        }
    }
}
