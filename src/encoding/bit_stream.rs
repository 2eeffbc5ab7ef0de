//! Bit-level reader and writer over caller-owned byte buffers.
//!
//! Both sides buffer through a 64-bit accumulator: the writer spills eight
//! little-endian bytes at a time, the reader refills the same way. Values are
//! packed LSB-first. Failed operations commit nothing: the writer's length
//! and the reader's cursor stay at their last good position.

use super::bitpacked::{Unpackable, Unpacked};
use super::ceil8;
use crate::error::{Error, Result};

/// Maximum encoded length of a `u32` VLQ, in bytes.
pub const MAX_VLQ_BYTE_LENGTH: usize = 5;

#[inline]
fn trailing_bits(value: u64, num_bits: usize) -> u64 {
    if num_bits >= 64 {
        value
    } else {
        value & ((1u64 << num_bits) - 1)
    }
}

/// Appends bit-packed and byte-aligned values to a caller-owned buffer.
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    buffered_values: u64,
    byte_offset: usize,
    bit_offset: usize,
}

impl<'a> BitWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            buffered_values: 0,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// The number of bytes written so far, including any partial byte.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.byte_offset + ceil8(self.bit_offset)
    }

    /// Writes the `num_bits` low bits of `value`, bit-packed.
    ///
    /// The bits of `value` above `num_bits` must be zero; `num_bits` must be
    /// at most 32.
    pub fn put_value(&mut self, value: u64, num_bits: usize) -> Result<()> {
        debug_assert!(num_bits <= 32);
        debug_assert_eq!(value >> num_bits, 0, "value has bits above num_bits");

        if self.byte_offset * 8 + self.bit_offset + num_bits > self.buffer.len() * 8 {
            return Err(Error::BufferFull(format!(
                "no room for {num_bits} more bits"
            )));
        }

        self.buffered_values |= value << self.bit_offset;
        self.bit_offset += num_bits;
        if self.bit_offset >= 64 {
            // spill the accumulator and carry over the bits that did not fit
            self.buffer[self.byte_offset..self.byte_offset + 8]
                .copy_from_slice(&self.buffered_values.to_le_bytes());
            self.byte_offset += 8;
            self.bit_offset -= 64;
            self.buffered_values = if self.bit_offset == 0 {
                0
            } else {
                value >> (num_bits - self.bit_offset)
            };
        }
        Ok(())
    }

    /// Copies any buffered bits out to the buffer. With `align`, the cursor
    /// moves to the next byte boundary and the accumulator resets.
    pub fn flush(&mut self, align: bool) {
        let num_bytes = ceil8(self.bit_offset);
        let bytes = self.buffered_values.to_le_bytes();
        self.buffer[self.byte_offset..self.byte_offset + num_bytes]
            .copy_from_slice(&bytes[..num_bytes]);
        if align {
            self.byte_offset += num_bytes;
            self.bit_offset = 0;
            self.buffered_values = 0;
        }
    }

    /// Flushes, then reserves `num_bytes` aligned bytes, returning their
    /// offset. Used to backfill headers whose value is known only later.
    pub fn skip_bytes(&mut self, num_bytes: usize) -> Result<usize> {
        self.flush(true);
        if self.byte_offset + num_bytes > self.buffer.len() {
            return Err(Error::BufferFull(format!(
                "no room for {num_bytes} aligned bytes"
            )));
        }
        let offset = self.byte_offset;
        self.byte_offset += num_bytes;
        Ok(offset)
    }

    /// Overwrites a single previously reserved byte.
    #[inline]
    pub fn set_byte(&mut self, offset: usize, value: u8) {
        self.buffer[offset] = value;
    }

    /// Flushes to the next byte boundary, then writes the `num_bytes` low
    /// bytes of `value` little-endian. `num_bytes` must be at most 8.
    pub fn put_aligned(&mut self, value: u64, num_bytes: usize) -> Result<()> {
        debug_assert!(num_bytes <= 8);
        let offset = self.skip_bytes(num_bytes)?;
        self.buffer[offset..offset + num_bytes]
            .copy_from_slice(&value.to_le_bytes()[..num_bytes]);
        Ok(())
    }

    /// Writes an unsigned VLQ, byte-aligned: 7 bits per byte, high bit set on
    /// continuation bytes.
    pub fn put_vlq(&mut self, value: u32) -> Result<()> {
        let mut scratch = [0u8; MAX_VLQ_BYTE_LENGTH];
        let mut v = value;
        let mut len = 0;
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            scratch[len] = if v != 0 { byte | 0x80 } else { byte };
            len += 1;
            if v == 0 {
                break;
            }
        }
        let offset = self.skip_bytes(len)?;
        self.buffer[offset..offset + len].copy_from_slice(&scratch[..len]);
        Ok(())
    }

    /// Writes `value` zigzag-mapped as a VLQ.
    pub fn put_zigzag_vlq(&mut self, value: i32) -> Result<()> {
        self.put_vlq(((value << 1) ^ (value >> 31)) as u32)
    }
}

/// Reads bit-packed and byte-aligned values from a byte buffer.
pub struct BitReader<'a> {
    buffer: &'a [u8],
    buffered_values: u64,
    byte_offset: usize,
    bit_offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        let mut reader = Self {
            buffer,
            buffered_values: 0,
            byte_offset: 0,
            bit_offset: 0,
        };
        reader.reload();
        reader
    }

    /// The number of whole bytes left, not counting a partially read byte.
    #[inline]
    pub fn bytes_left(&self) -> usize {
        self.buffer.len() - (self.byte_offset + ceil8(self.bit_offset))
    }

    #[inline]
    fn remaining_bits(&self) -> usize {
        (self.buffer.len() - self.byte_offset) * 8 - self.bit_offset
    }

    #[inline]
    fn reload(&mut self) {
        let available = (self.buffer.len() - self.byte_offset).min(8);
        let mut word = [0u8; 8];
        word[..available].copy_from_slice(&self.buffer[self.byte_offset..][..available]);
        self.buffered_values = u64::from_le_bytes(word);
    }

    #[inline]
    fn read_bits(&mut self, num_bits: usize) -> u64 {
        let mut value =
            trailing_bits(self.buffered_values, self.bit_offset + num_bits) >> self.bit_offset;
        self.bit_offset += num_bits;
        if self.bit_offset >= 64 {
            self.byte_offset += 8;
            self.bit_offset -= 64;
            self.reload();
            // pick up the bits of the value that crossed into the new word
            value |= trailing_bits(self.buffered_values, self.bit_offset)
                << (num_bits - self.bit_offset);
        }
        value
    }

    /// Reads the next `num_bits` bits as a `T`. `num_bits` must be at most 32
    /// and at most the width of `T`.
    pub fn get_value<T: Unpackable>(&mut self, num_bits: usize) -> Result<T> {
        debug_assert!(num_bits <= 32 && num_bits <= T::MAX_NUM_BITS);
        if self.remaining_bits() < num_bits {
            return Err(Error::BufferUnderrun(format!(
                "fewer than {num_bits} bits left"
            )));
        }
        Ok(T::from_u64(self.read_bits(num_bits)))
    }

    /// Reads up to `out.len()` values of `num_bits` each, returning how many
    /// were read. Byte-aligned whole groups go through the width-specialized
    /// unpackers; the unaligned head and the tail take the one-value path.
    pub fn get_batch<T: Unpackable>(&mut self, num_bits: usize, out: &mut [T]) -> usize {
        debug_assert!(num_bits <= 32 && num_bits <= T::MAX_NUM_BITS);
        let batch = out.len().min(self.remaining_bits() / num_bits.max(1));
        if num_bits == 0 {
            return 0;
        }

        let mut i = 0;
        while i < batch && self.bit_offset != 0 {
            out[i] = T::from_u64(self.read_bits(num_bits));
            i += 1;
        }

        let group_len = <T as Unpackable>::Unpacked::LENGTH;
        let group_bytes = std::mem::size_of::<T>() * num_bits;
        let mut unpacked = <T as Unpackable>::Unpacked::zero();
        while batch - i >= group_len && self.buffer.len() - self.byte_offset >= group_bytes {
            T::unpack(
                &self.buffer[self.byte_offset..self.byte_offset + group_bytes],
                num_bits,
                &mut unpacked,
            );
            out[i..i + group_len].copy_from_slice(unpacked.as_ref());
            i += group_len;
            self.byte_offset += group_bytes;
        }
        self.reload();

        while i < batch {
            out[i] = T::from_u64(self.read_bits(num_bits));
            i += 1;
        }
        batch
    }

    /// Skips to the next byte boundary, then reads `num_bytes` little-endian
    /// bytes zero-extended into a `u64`. `num_bytes` must be at most 8.
    pub fn get_aligned(&mut self, num_bytes: usize) -> Result<u64> {
        debug_assert!(num_bytes <= 8);
        let aligned = self.byte_offset + ceil8(self.bit_offset);
        if aligned + num_bytes > self.buffer.len() {
            return Err(Error::BufferUnderrun(format!(
                "fewer than {num_bytes} aligned bytes left"
            )));
        }
        let mut word = [0u8; 8];
        word[..num_bytes].copy_from_slice(&self.buffer[aligned..aligned + num_bytes]);
        self.byte_offset = aligned + num_bytes;
        self.bit_offset = 0;
        self.reload();
        Ok(u64::from_le_bytes(word))
    }

    /// Reads a byte-aligned unsigned VLQ. Fails after five continuation
    /// bytes; the cursor is left untouched on failure.
    pub fn get_vlq(&mut self) -> Result<u32> {
        let checkpoint = (self.byte_offset, self.bit_offset, self.buffered_values);
        let mut value = 0u32;
        for i in 0..MAX_VLQ_BYTE_LENGTH {
            let byte = match self.get_aligned(1) {
                Ok(byte) => byte as u8,
                Err(e) => {
                    (self.byte_offset, self.bit_offset, self.buffered_values) = checkpoint;
                    return Err(e);
                }
            };
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        (self.byte_offset, self.bit_offset, self.buffered_values) = checkpoint;
        Err(Error::oos("vlq value longer than 5 bytes"))
    }

    /// Reads a zigzag-mapped VLQ back into an `i32`.
    pub fn get_zigzag_vlq(&mut self) -> Result<i32> {
        let unsigned = self.get_vlq()?;
        Ok((unsigned >> 1) as i32 ^ -((unsigned & 1) as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_pair_in_one_byte() {
        let mut buffer = [0u8; 8];
        let mut writer = BitWriter::new(&mut buffer);
        writer.put_value(5, 3).unwrap();
        writer.put_value(7, 3).unwrap();
        writer.flush(false);
        assert_eq!(writer.bytes_written(), 1);
        assert_eq!(buffer[0], 0b00111101);
    }

    #[test]
    fn mixed_widths_roundtrip() {
        let values: Vec<(u64, usize)> = (1..=32)
            .map(|num_bits| {
                let mask = ((1u64 << num_bits) - 1) as u64;
                (0xDEADBEEFCAFEu64 & mask, num_bits)
            })
            .collect();
        let total_bits: usize = values.iter().map(|(_, n)| n).sum();

        let mut buffer = vec![0u8; ceil8(total_bits)];
        let mut writer = BitWriter::new(&mut buffer);
        for &(value, num_bits) in &values {
            writer.put_value(value, num_bits).unwrap();
        }
        writer.flush(false);
        assert_eq!(writer.bytes_written(), ceil8(total_bits));

        let mut reader = BitReader::new(&buffer);
        for &(value, num_bits) in &values {
            assert_eq!(reader.get_value::<u64>(num_bits).unwrap(), value);
        }
    }

    #[test]
    fn write_over_capacity_is_rejected() {
        let mut buffer = [0u8; 1];
        let mut writer = BitWriter::new(&mut buffer);
        writer.put_value(3, 7).unwrap();
        assert!(matches!(writer.put_value(3, 2), Err(Error::BufferFull(_))));
        // the failed write committed nothing
        writer.put_value(1, 1).unwrap();
        writer.flush(false);
        assert_eq!(buffer[0], 0b10000011);
    }

    #[test]
    fn aligned_after_bits() {
        let mut buffer = [0u8; 16];
        let mut writer = BitWriter::new(&mut buffer);
        writer.put_value(1, 1).unwrap();
        writer.put_aligned(0xABCD, 2).unwrap();
        assert_eq!(writer.bytes_written(), 3);

        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.get_value::<u32>(1).unwrap(), 1);
        assert_eq!(reader.get_aligned(2).unwrap(), 0xABCD);
        assert_eq!(reader.bytes_left(), 13);
    }

    #[test]
    fn vlq_known_bytes() {
        let mut buffer = [0u8; 8];
        let mut writer = BitWriter::new(&mut buffer);
        writer.put_vlq(300).unwrap();
        assert_eq!(&buffer[..2], &[0xAC, 0x02]);

        let mut reader = BitReader::new(&buffer[..2]);
        assert_eq!(reader.get_vlq().unwrap(), 300);
    }

    #[test]
    fn vlq_roundtrip_extremes() {
        for value in [0u32, 1, 127, 128, 300, u32::MAX / 2, u32::MAX] {
            let mut buffer = [0u8; MAX_VLQ_BYTE_LENGTH];
            let mut writer = BitWriter::new(&mut buffer);
            writer.put_vlq(value).unwrap();
            assert!(writer.bytes_written() <= MAX_VLQ_BYTE_LENGTH);
            let mut reader = BitReader::new(&buffer);
            assert_eq!(reader.get_vlq().unwrap(), value);
        }
    }

    #[test]
    fn zigzag_small_values() {
        let mut buffer = [0u8; 8];
        let mut writer = BitWriter::new(&mut buffer);
        writer.put_zigzag_vlq(-1).unwrap();
        writer.put_zigzag_vlq(1).unwrap();
        assert_eq!(&buffer[..2], &[0x01, 0x02]);

        let mut reader = BitReader::new(&buffer[..2]);
        assert_eq!(reader.get_zigzag_vlq().unwrap(), -1);
        assert_eq!(reader.get_zigzag_vlq().unwrap(), 1);
    }

    #[test]
    fn zigzag_roundtrip_extremes() {
        for value in [0i32, 1, -1, i32::MAX, i32::MIN, 123456, -123456] {
            let mut buffer = [0u8; MAX_VLQ_BYTE_LENGTH];
            let mut writer = BitWriter::new(&mut buffer);
            writer.put_zigzag_vlq(value).unwrap();
            let mut reader = BitReader::new(&buffer);
            assert_eq!(reader.get_zigzag_vlq().unwrap(), value);
        }
    }

    #[test]
    fn batch_uses_unpackers_and_tail() {
        let num_bits = 7;
        let values: Vec<u32> = (0..75).map(|i| i % 128).collect();
        let mut buffer = vec![0u8; ceil8(values.len() * num_bits)];
        let mut writer = BitWriter::new(&mut buffer);
        for &value in &values {
            writer.put_value(u64::from(value), num_bits).unwrap();
        }
        writer.flush(false);

        let mut reader = BitReader::new(&buffer);
        let mut out = vec![0u32; 75];
        assert_eq!(reader.get_batch(num_bits, &mut out), 75);
        assert_eq!(out, values);
    }

    #[test]
    fn batch_is_clamped_to_available_bits() {
        let buffer = [0xFFu8; 2];
        let mut reader = BitReader::new(&buffer);
        let mut out = vec![0u32; 10];
        assert_eq!(reader.get_batch(3, &mut out), 5);
    }

    #[test]
    fn truncated_vlq_leaves_cursor() {
        let buffer = [0x80u8, 0x80];
        let mut reader = BitReader::new(&buffer);
        assert!(reader.get_vlq().is_err());
        assert_eq!(reader.bytes_left(), 2);
    }
}
