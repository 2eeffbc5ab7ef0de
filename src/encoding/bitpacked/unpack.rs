//! Per-bit-width unpack kernels. Monomorphization over the width turns the
//! shift/mask arithmetic into branch-free straight-line code.

use seq_macro::seq;

#[inline]
fn unpack_bits32<const NUM_BITS: usize>(input: &[u8], output: &mut [u32; 32]) {
    let mask = ((1u64 << NUM_BITS) - 1) as u32;
    for (i, out) in output.iter_mut().enumerate() {
        let start_bit = i * NUM_BITS;
        let byte = start_bit / 8;
        let mut word = [0u8; 8];
        let available = (input.len() - byte).min(8);
        word[..available].copy_from_slice(&input[byte..byte + available]);
        *out = ((u64::from_le_bytes(word) >> (start_bit % 8)) as u32) & mask;
    }
}

#[inline]
fn unpack_bits64<const NUM_BITS: usize>(input: &[u8], output: &mut [u64; 64]) {
    let mask = ((1u128 << NUM_BITS) - 1) as u64;
    for (i, out) in output.iter_mut().enumerate() {
        let start_bit = i * NUM_BITS;
        let byte = start_bit / 8;
        let mut word = [0u8; 16];
        let available = (input.len() - byte).min(16);
        word[..available].copy_from_slice(&input[byte..byte + available]);
        *out = ((u128::from_le_bytes(word) >> (start_bit % 8)) as u64) & mask;
    }
}

/// Unpacks a group of 32 `u32` values of width `num_bits` from `input`.
///
/// `input` must hold at least `4 * num_bits` bytes.
pub fn unpack32(input: &[u8], num_bits: usize, output: &mut [u32; 32]) {
    seq!(B in 0..=32 {
        match num_bits {
            #(B => unpack_bits32::<B>(input, output),)*
            _ => unreachable!("bit width above 32"),
        }
    });
}

/// Unpacks a group of 64 `u64` values of width `num_bits` from `input`.
///
/// `input` must hold at least `8 * num_bits` bytes.
pub fn unpack64(input: &[u8], num_bits: usize, output: &mut [u64; 64]) {
    seq!(B in 0..=64 {
        match num_bits {
            #(B => unpack_bits64::<B>(input, output),)*
            _ => unreachable!("bit width above 64"),
        }
    });
}
