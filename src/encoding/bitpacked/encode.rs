use super::{Unpackable, Unpacked};

/// Packs one complete group (`T::Unpacked::LENGTH` values) at `num_bits`
/// into `packed`, which must hold `size_of::<T>() * num_bits` bytes.
#[inline]
pub fn encode_pack<T: Unpackable>(unpacked: &T::Unpacked, num_bits: usize, packed: &mut [u8]) {
    T::pack(unpacked, num_bits, packed)
}

/// Bit-packs `input` at `num_bits` into `output`, group by group. The
/// trailing partial group, if any, is packed from a zero-padded buffer and
/// truncated to `ceil(len * num_bits / 8)` bytes.
pub fn encode<T: Unpackable>(input: &[T], num_bits: usize, output: &mut Vec<u8>) {
    let mut scratch = vec![0u8; std::mem::size_of::<T>() * num_bits];

    for chunk in input.chunks(T::Unpacked::LENGTH) {
        let mut group = T::Unpacked::zero();
        for (i, &value) in chunk.iter().enumerate() {
            group[i] = value;
        }
        encode_pack::<T>(&group, num_bits, &mut scratch);
        let num_bytes = (chunk.len() * num_bits + 7) / 8;
        output.extend_from_slice(&scratch[..num_bytes]);
    }
}
