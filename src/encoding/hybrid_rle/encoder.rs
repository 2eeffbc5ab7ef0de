use crate::encoding::bit_stream::BitWriter;
use crate::encoding::ceil8;
use crate::error::Result;

/// Bit-packed runs keep a single-byte header so it can be reserved up front
/// and backfilled once the group count is known: `(63 << 1) | 1` is the
/// largest indicator that still fits one byte.
const MAX_GROUPS_PER_RUN: usize = 63;

/// Upper bound for the encoded size of `num_values` values at `num_bits`.
///
/// Every eight values cost at most the larger of one bit-packed group plus
/// its amortized header and one minimal RLE run.
pub fn max_buffer_size(num_bits: usize, num_values: usize) -> usize {
    let per_group = (num_bits + 1).max(5 + ceil8(num_bits));
    ceil8(num_values) * per_group + 1
}

/// Hybrid RLE/bit-packed encoder.
///
/// Buffers up to eight values: a run of at least eight equal values is
/// emitted as an RLE run, everything else joins the open bit-packed run in
/// groups of eight. `flush` pads a trailing partial group with zeros.
pub struct RleEncoder<'a> {
    bit_writer: BitWriter<'a>,
    num_bits: usize,
    buffered_values: [u64; 8],
    num_buffered_values: usize,
    current_value: u64,
    repeat_count: usize,
    /// Values committed to the open bit-packed run.
    bit_packed_count: usize,
    /// Offset of the open bit-packed run's reserved header byte.
    indicator_offset: Option<usize>,
}

impl<'a> RleEncoder<'a> {
    /// Returns an encoder of `num_bits`-wide values into `buffer`. Use
    /// [`max_buffer_size`] to size the buffer.
    pub fn new(buffer: &'a mut [u8], num_bits: usize) -> Self {
        debug_assert!(num_bits <= 32);
        Self {
            bit_writer: BitWriter::new(buffer),
            num_bits,
            buffered_values: [0; 8],
            num_buffered_values: 0,
            current_value: 0,
            repeat_count: 0,
            bit_packed_count: 0,
            indicator_offset: None,
        }
    }

    /// Appends one value. The bits above `num_bits` must be zero.
    pub fn put(&mut self, value: u64) -> Result<()> {
        if value == self.current_value {
            self.repeat_count += 1;
            if self.repeat_count > 8 {
                // continuation of an RLE run, nothing to buffer
                return Ok(());
            }
        } else {
            if self.repeat_count >= 8 {
                self.flush_rle_run()?;
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered_values[self.num_buffered_values] = value;
        self.num_buffered_values += 1;
        if self.num_buffered_values == 8 {
            self.flush_buffered_values()?;
        }
        Ok(())
    }

    /// Flushes all pending state and returns the number of bytes written.
    pub fn flush(&mut self) -> Result<usize> {
        if self.bit_packed_count > 0 || self.repeat_count > 0 || self.num_buffered_values > 0 {
            let all_repeat = self.bit_packed_count == 0
                && (self.repeat_count == self.num_buffered_values || self.num_buffered_values == 0);
            if self.repeat_count >= 8 && all_repeat {
                self.flush_rle_run()?;
            } else {
                // pad the trailing group with zeros and close the run
                while self.num_buffered_values != 0 && self.num_buffered_values < 8 {
                    self.buffered_values[self.num_buffered_values] = 0;
                    self.num_buffered_values += 1;
                }
                if self.num_buffered_values == 8 {
                    self.write_buffered_group()?;
                }
                self.close_bit_packed_run();
                self.repeat_count = 0;
            }
        }
        // commit bits still sitting in the accumulator
        self.bit_writer.flush(false);
        Ok(self.bit_writer.bytes_written())
    }

    fn flush_rle_run(&mut self) -> Result<()> {
        self.bit_writer.put_vlq((self.repeat_count as u32) << 1)?;
        self.bit_writer
            .put_aligned(self.current_value, ceil8(self.num_bits))?;
        self.repeat_count = 0;
        self.num_buffered_values = 0;
        Ok(())
    }

    /// Called when eight values are buffered: either they belong to an RLE
    /// candidate, or they are committed to the open bit-packed run.
    fn flush_buffered_values(&mut self) -> Result<()> {
        if self.repeat_count >= 8 {
            self.num_buffered_values = 0;
            // a bit-packed run cannot extend past an RLE run: close it
            self.close_bit_packed_run();
            return Ok(());
        }

        self.write_buffered_group()?;
        // the buffered repeats are committed to the bit-packed run now
        self.repeat_count = 0;
        if self.bit_packed_count == MAX_GROUPS_PER_RUN * 8 {
            self.close_bit_packed_run();
        }
        Ok(())
    }

    fn write_buffered_group(&mut self) -> Result<()> {
        if self.indicator_offset.is_none() {
            self.indicator_offset = Some(self.bit_writer.skip_bytes(1)?);
        }
        for value in &self.buffered_values[..self.num_buffered_values] {
            self.bit_writer.put_value(*value, self.num_bits)?;
        }
        self.bit_packed_count += self.num_buffered_values;
        self.num_buffered_values = 0;
        Ok(())
    }

    fn close_bit_packed_run(&mut self) {
        if let Some(offset) = self.indicator_offset {
            let num_groups = self.bit_packed_count / 8;
            self.bit_writer
                .set_byte(offset, ((num_groups as u8) << 1) | 1);
            self.indicator_offset = None;
            self.bit_packed_count = 0;
        }
    }
}

/// Hybrid-RLE encodes `length` values of `num_bits` each, appending to
/// `buffer`.
pub fn encode_u32<I: Iterator<Item = u32>>(
    buffer: &mut Vec<u8>,
    iterator: I,
    num_bits: u32,
    length: usize,
) -> Result<()> {
    let start = buffer.len();
    buffer.resize(start + max_buffer_size(num_bits as usize, length), 0);
    let mut encoder = RleEncoder::new(&mut buffer[start..], num_bits as usize);
    for value in iterator {
        encoder.put(u64::from(value))?;
    }
    let written = encoder.flush()?;
    buffer.truncate(start + written);
    Ok(())
}

/// Hybrid-RLE encodes `length` bools at bit width 1, appending to `buffer`.
pub fn encode_bool<I: Iterator<Item = bool>>(
    buffer: &mut Vec<u8>,
    iterator: I,
    length: usize,
) -> Result<()> {
    encode_u32(buffer, iterator.map(u32::from), 1, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_equal_becomes_rle() {
        let mut buffer = vec![];
        encode_u32(&mut buffer, std::iter::repeat(3).take(10), 2, 10).unwrap();
        assert_eq!(buffer, vec![0x14, 0x03]);
    }

    #[test]
    fn one_group_bit_packed() {
        let mut buffer = vec![];
        encode_u32(&mut buffer, 0..8u32, 3, 8).unwrap();
        assert_eq!(buffer, vec![0x03, 0x88, 0xC6, 0xFA]);
    }

    #[test]
    fn trailing_partial_group_is_padded() {
        let mut buffer = vec![];
        encode_u32(&mut buffer, [0u32, 1, 2, 1, 2, 1, 1, 0, 3].iter().copied(), 2, 9).unwrap();
        assert_eq!(
            buffer,
            vec![
                (2 << 1) | 1,
                0b01_10_01_00,
                0b00_01_01_10,
                0b00_00_00_11,
                0b00_00_00_00
            ]
        );
    }

    #[test]
    fn rle_after_bit_packed() {
        // 9 mixed values then 16 equal ones: a bit-packed run then an RLE run
        let values = [0u32, 1, 0, 1, 0, 1, 0, 1, 0]
            .into_iter()
            .chain(std::iter::repeat(1).take(16));
        let mut buffer = vec![];
        encode_u32(&mut buffer, values, 1, 25).unwrap();
        // 2 groups bit-packed (9th value plus 7 of the repeats), 9 repeats rle
        assert_eq!(buffer[0], (2 << 1) | 1);
    }

    #[test]
    fn long_rle_run_has_multibyte_header() {
        let length = 113_000;
        let mut buffer = vec![];
        encode_u32(&mut buffer, std::iter::repeat(1).take(length), 1, length).unwrap();
        let mut expected = vec![];
        let mut header = [0u8; 10];
        let used = crate::encoding::uleb128::encode((length as u64) << 1, &mut header);
        expected.extend_from_slice(&header[..used]);
        expected.push(1);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn all_equal_sequences_stay_small() {
        for length in [8usize, 100, 4096] {
            for num_bits in [1u32, 7, 17, 32] {
                let mut buffer = vec![];
                encode_u32(
                    &mut buffer,
                    std::iter::repeat(1u32).take(length),
                    num_bits,
                    length,
                )
                .unwrap();
                // one vlq header plus the repeated value
                assert!(buffer.len() <= 5 + ceil8(num_bits as usize));
            }
        }
    }
}
