use super::{Packed, Unpackable, Unpacked};
use crate::error::{Error, Result};

/// An [`Iterator`] over values unpacked from a bit-packed byte slice.
///
/// Unpacks one group at a time through the width-specialized kernels and
/// does not allocate.
#[derive(Debug, Clone)]
pub struct Decoder<'a, T: Unpackable> {
    packed: std::slice::Chunks<'a, u8>,
    num_bits: usize,
    remaining: usize,
    current_pack_index: usize,
    unpacked: T::Unpacked,
}

#[inline]
fn decode_pack<T: Unpackable>(packed: &[u8], num_bits: usize, unpacked: &mut T::Unpacked) {
    if packed.len() < T::Unpacked::LENGTH * num_bits / 8 {
        // partial trailing group: unpack from a zero-padded copy
        let mut padded = T::Packed::zero();
        padded.as_mut()[..packed.len()].copy_from_slice(packed);
        T::unpack(padded.as_ref(), num_bits, unpacked)
    } else {
        T::unpack(packed, num_bits, unpacked)
    }
}

impl<'a, T: Unpackable> Decoder<'a, T> {
    /// Returns a decoder over `length` values of `num_bits` each.
    ///
    /// Fails when `num_bits` is zero or out of range for `T`, or when
    /// `packed` does not hold `length` values.
    pub fn try_new(packed: &'a [u8], num_bits: usize, length: usize) -> Result<Self> {
        if num_bits == 0 || num_bits > T::MAX_NUM_BITS {
            return Err(Error::oos(format!(
                "bit-packed run with invalid bit width {num_bits}"
            )));
        }
        if packed.len() * 8 < length * num_bits {
            return Err(Error::BufferUnderrun(format!(
                "{} bytes cannot hold {length} bit-packed values of width {num_bits}",
                packed.len()
            )));
        }

        let block_size = std::mem::size_of::<T>() * num_bits;
        Ok(Self {
            packed: packed.chunks(block_size),
            num_bits,
            remaining: length,
            // force an unpack on the first read
            current_pack_index: T::Unpacked::LENGTH,
            unpacked: T::Unpacked::zero(),
        })
    }

    #[inline]
    fn refill(&mut self) {
        if let Some(chunk) = self.packed.next() {
            decode_pack::<T>(chunk, self.num_bits, &mut self.unpacked);
            self.current_pack_index = 0;
        }
    }

    /// Fills `out` from the stream, returning how many values were written.
    pub fn read(&mut self, out: &mut [T]) -> usize {
        let mut read = 0;
        while read < out.len() && self.remaining > 0 {
            if self.current_pack_index == T::Unpacked::LENGTH {
                self.refill();
            }
            let available = (T::Unpacked::LENGTH - self.current_pack_index)
                .min(self.remaining)
                .min(out.len() - read);
            let source = &self.unpacked.as_ref()
                [self.current_pack_index..self.current_pack_index + available];
            out[read..read + available].copy_from_slice(source);
            self.current_pack_index += available;
            self.remaining -= available;
            read += available;
        }
        read
    }
}

impl<'a, T: Unpackable> Iterator for Decoder<'a, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.current_pack_index == T::Unpacked::LENGTH {
            self.refill();
        }
        let result = self.unpacked[self.current_pack_index];
        self.current_pack_index += 1;
        self.remaining -= 1;
        Some(result)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
