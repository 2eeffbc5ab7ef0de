use crate::encoding::bitpacked;
use crate::encoding::{uleb128, zigzag_leb128};
use crate::error::{Error, Result};

enum MiniBlock<'a> {
    Packed(bitpacked::Decoder<'a, u64>),
    /// Width-zero miniblock: every delta equals the block's minimum.
    Constant { remaining: usize },
}

/// Decodes a delta-binary-packed stream into `i64` values.
///
/// Validates the header arithmetic and every miniblock bit width; stops
/// after the declared value count regardless of trailing padding.
pub struct Decoder<'a> {
    data: &'a [u8],
    num_miniblocks: usize,
    values_per_miniblock: usize,
    remaining: usize,
    consumed_first: bool,
    current_value: i64,
    min_delta: i64,
    widths: Vec<u8>,
    miniblock_index: usize,
    current: Option<MiniBlock<'a>>,
}

impl<'a> Decoder<'a> {
    pub fn try_new(mut data: &'a [u8]) -> Result<Self> {
        let (block_size, consumed) = uleb128::decode(data)?;
        data = &data[consumed..];
        let (num_miniblocks, consumed) = uleb128::decode(data)?;
        data = &data[consumed..];
        let (total_count, consumed) = uleb128::decode(data)?;
        data = &data[consumed..];
        let (first_value, consumed) = zigzag_leb128::decode(data)?;
        data = &data[consumed..];

        if block_size == 0 || block_size % 128 != 0 {
            return Err(Error::oos(format!(
                "delta block size {block_size} is not a positive multiple of 128"
            )));
        }
        if num_miniblocks == 0 || block_size % num_miniblocks != 0 {
            return Err(Error::oos(format!(
                "{num_miniblocks} miniblocks do not divide a block of {block_size}"
            )));
        }
        let values_per_miniblock = (block_size / num_miniblocks) as usize;
        if values_per_miniblock % 32 != 0 {
            return Err(Error::oos(format!(
                "miniblock of {values_per_miniblock} values is not a multiple of 32"
            )));
        }

        let num_miniblocks = num_miniblocks as usize;
        Ok(Self {
            data,
            num_miniblocks,
            values_per_miniblock,
            remaining: total_count as usize,
            consumed_first: false,
            current_value: first_value,
            min_delta: 0,
            // sized on the first block header, after its bytes are verified
            widths: Vec::new(),
            // force a block header read for the first delta
            miniblock_index: num_miniblocks,
            current: None,
        })
    }

    /// The number of values not yet decoded.
    #[inline]
    pub fn len(&self) -> usize {
        self.remaining
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    fn read_block_header(&mut self) -> Result<()> {
        let (min_delta, consumed) = zigzag_leb128::decode(self.data)?;
        self.data = &self.data[consumed..];
        if self.data.len() < self.num_miniblocks {
            return Err(Error::BufferUnderrun(
                "delta block ends before its miniblock widths".to_string(),
            ));
        }
        self.widths.clear();
        self.widths.extend_from_slice(&self.data[..self.num_miniblocks]);
        if let Some(&width) = self.widths.iter().find(|&&width| width > 64) {
            return Err(Error::oos(format!(
                "miniblock bit width {width} above 64"
            )));
        }
        self.data = &self.data[self.num_miniblocks..];
        self.min_delta = min_delta;
        self.miniblock_index = 0;
        Ok(())
    }

    fn advance_miniblock(&mut self) -> Result<()> {
        if self.miniblock_index == self.num_miniblocks {
            self.read_block_header()?;
        }
        let num_bits = self.widths[self.miniblock_index] as usize;
        self.miniblock_index += 1;

        self.current = Some(if num_bits == 0 {
            MiniBlock::Constant {
                remaining: self.values_per_miniblock,
            }
        } else {
            let num_bytes = self.values_per_miniblock * num_bits / 8;
            let bytes = self.data.get(..num_bytes).ok_or_else(|| {
                Error::BufferUnderrun("delta miniblock ends before its payload".to_string())
            })?;
            self.data = &self.data[num_bytes..];
            MiniBlock::Packed(bitpacked::Decoder::try_new(
                bytes,
                num_bits,
                self.values_per_miniblock,
            )?)
        });
        Ok(())
    }

    fn next_delta(&mut self) -> Result<i64> {
        loop {
            match &mut self.current {
                Some(MiniBlock::Packed(decoder)) => {
                    if let Some(adjusted) = decoder.next() {
                        return Ok(self.min_delta.wrapping_add(adjusted as i64));
                    }
                }
                Some(MiniBlock::Constant { remaining }) => {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Ok(self.min_delta);
                    }
                }
                None => {}
            }
            self.advance_miniblock()?;
        }
    }

    /// Fills `out`, returning how many values were written; fewer than
    /// `out.len()` only when the stream's declared count is exhausted.
    pub fn decode_batch(&mut self, out: &mut [i64]) -> Result<usize> {
        let mut read = 0;
        while read < out.len() {
            match self.next() {
                Some(Ok(value)) => {
                    out[read] = value;
                    read += 1;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(read)
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.consumed_first {
            match self.next_delta() {
                Ok(delta) => self.current_value = self.current_value.wrapping_add(delta),
                Err(e) => {
                    self.remaining = 0;
                    return Some(Err(e));
                }
            }
        } else {
            self.consumed_first = true;
        }
        self.remaining -= 1;
        Some(Ok(self.current_value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
