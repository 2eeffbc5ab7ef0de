use super::HybridEncoded;
use crate::encoding::bit_stream::BitReader;
use crate::encoding::{ceil8, uleb128};
use crate::error::{Error, Result};

/// An [`Iterator`] over the runs of a hybrid RLE/bit-packed stream.
///
/// Each item is one whole [`HybridEncoded`] run. Malformed headers
/// (zero-length runs, a run body shorter than its header declares, a
/// truncated header) surface as errors and end iteration.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    values: &'a [u8],
    num_bits: usize,
}

impl<'a> Decoder<'a> {
    /// Returns a decoder over the runs in `values`.
    pub fn new(values: &'a [u8], num_bits: usize) -> Self {
        Self { values, num_bits }
    }

    /// The bit width shared by every run of the stream.
    #[inline]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    fn poison<T>(&mut self, error: Error) -> Option<Result<T>> {
        self.values = &[];
        Some(Err(error))
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<HybridEncoded<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_bits == 0 || self.values.is_empty() {
            return None;
        }
        let (indicator, consumed) = match uleb128::decode(self.values) {
            Ok(header) => header,
            Err(e) => return self.poison(e),
        };
        self.values = &self.values[consumed..];

        if indicator & 1 == 1 {
            let num_groups = (indicator >> 1) as usize;
            if num_groups == 0 {
                return self.poison(Error::oos("bit-packed run of zero groups"));
            }
            let Some(num_bytes) = num_groups.checked_mul(self.num_bits) else {
                return self.poison(Error::oos("bit-packed run length overflows"));
            };
            let Some(run) = self.values.get(..num_bytes) else {
                return self.poison(Error::BufferUnderrun(
                    "bit-packed run ends before its declared length".to_string(),
                ));
            };
            self.values = &self.values[num_bytes..];
            Some(Ok(HybridEncoded::Bitpacked(run)))
        } else {
            let length = (indicator >> 1) as usize;
            if length == 0 {
                return self.poison(Error::oos("rle run of zero length"));
            }
            let num_bytes = ceil8(self.num_bits);
            let Some(pack) = self.values.get(..num_bytes) else {
                return self.poison(Error::BufferUnderrun(
                    "rle run ends before its value".to_string(),
                ));
            };
            self.values = &self.values[num_bytes..];
            Some(Ok(HybridEncoded::Rle(pack, length)))
        }
    }
}

enum Run<'a> {
    Rle {
        value: u32,
        remaining: usize,
    },
    Bitpacked {
        reader: BitReader<'a>,
        remaining: usize,
    },
}

/// Decodes a hybrid stream of `num_values` values, one run at a time.
///
/// Pulls whole runs from [`Decoder`], broadcasting RLE runs and reading
/// bit-packed run bodies through [`BitReader::get_batch`]'s bulk path. A bit
/// width of zero consumes no bytes and yields zeros.
pub struct HybridRleDecoder<'a> {
    runs: Decoder<'a>,
    num_bits: usize,
    num_values: usize,
    run: Run<'a>,
}

impl<'a> HybridRleDecoder<'a> {
    pub fn try_new(data: &'a [u8], num_bits: usize, num_values: usize) -> Result<Self> {
        if num_bits > 32 {
            return Err(Error::oos(format!(
                "hybrid rle bit width {num_bits} above 32"
            )));
        }
        Ok(Self {
            runs: Decoder::new(data, num_bits),
            num_bits,
            num_values,
            run: Run::Rle {
                value: 0,
                remaining: 0,
            },
        })
    }

    /// The number of values not yet decoded.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_values
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_values == 0
    }

    fn next_run(&mut self) -> Result<()> {
        match self.runs.next() {
            Some(Ok(HybridEncoded::Rle(pack, length))) => {
                let mut bytes = [0u8; 4];
                bytes[..pack.len()].copy_from_slice(pack);
                self.run = Run::Rle {
                    value: u32::from_le_bytes(bytes),
                    remaining: length,
                };
            }
            Some(Ok(HybridEncoded::Bitpacked(data))) => {
                self.run = Run::Bitpacked {
                    reader: BitReader::new(data),
                    remaining: data.len() * 8 / self.num_bits,
                };
            }
            Some(Err(e)) => return Err(e),
            None => {
                return Err(Error::BufferUnderrun(
                    "hybrid stream ends before its declared value count".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Fills `out` from the stream, returning how many values were written.
    /// Fewer than `out.len()` are written only when the declared value count
    /// is exhausted; a run body shorter than its header is an error.
    pub fn get_batch(&mut self, out: &mut [u32]) -> Result<usize> {
        let limit = out.len().min(self.num_values);
        if self.num_bits == 0 {
            out[..limit].iter_mut().for_each(|value| *value = 0);
            self.num_values -= limit;
            return Ok(limit);
        }

        let mut read = 0;
        while read < limit {
            match &mut self.run {
                Run::Rle { value, remaining } if *remaining > 0 => {
                    let take = (*remaining).min(limit - read);
                    out[read..read + take].iter_mut().for_each(|slot| *slot = *value);
                    *remaining -= take;
                    read += take;
                }
                Run::Bitpacked { reader, remaining } if *remaining > 0 => {
                    let take = (*remaining).min(limit - read);
                    let got = reader.get_batch(self.num_bits, &mut out[read..read + take]);
                    if got < take {
                        self.num_values -= read;
                        return Err(Error::BufferUnderrun(
                            "bit-packed run ends before its declared length".to_string(),
                        ));
                    }
                    *remaining -= take;
                    read += take;
                }
                _ => self.next_run()?,
            }
        }
        self.num_values -= read;
        Ok(read)
    }
}

impl<'a> Iterator for HybridRleDecoder<'a> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_values == 0 {
            return None;
        }
        let mut out = [0u32];
        match self.get_batch(&mut out) {
            Ok(_) => Some(Ok(out[0])),
            Err(e) => {
                // poison further iteration
                self.num_values = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.num_values, Some(self.num_values))
    }
}

#[cfg(test)]
mod tests {
    use super::super::encoder::encode_u32;
    use super::*;

    fn roundtrip(values: &[u32], num_bits: u32) {
        let mut buffer = vec![];
        encode_u32(&mut buffer, values.iter().copied(), num_bits, values.len()).unwrap();
        let decoded = HybridRleDecoder::try_new(&buffer, num_bits as usize, values.len())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn rle_run_is_exposed_whole() {
        let runs = Decoder::new(&[0x14, 0x03], 2)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(runs, vec![HybridEncoded::Rle(&[0x03], 10)]);
    }

    #[test]
    fn bit_packed_run_is_exposed_whole() {
        let data = [0x03, 0x88, 0xC6, 0xFA];
        let runs = Decoder::new(&data, 3)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(runs, vec![HybridEncoded::Bitpacked(&data[1..])]);
    }

    #[test]
    fn mixed_stream_walks_run_by_run() {
        let mut values = vec![7u32; 20];
        values.extend((0..24u32).map(|i| i % 4));
        let mut buffer = vec![];
        encode_u32(&mut buffer, values.iter().copied(), 3, values.len()).unwrap();

        let runs = Decoder::new(&buffer, 3)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], HybridEncoded::Rle(&[0x07], 20));
        match runs[1] {
            // three groups of eight values at three bits
            HybridEncoded::Bitpacked(data) => assert_eq!(data.len(), 9),
            _ => unreachable!(),
        }
    }

    #[test]
    fn run_decoder_rejects_truncated_bodies() {
        // bit-packed header declaring two groups with one byte of payload
        let result = Decoder::new(&[0x05, 0xFF], 3).collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(Error::BufferUnderrun(_))));

        // rle header with no value bytes
        let result = Decoder::new(&[0x14], 2).collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(Error::BufferUnderrun(_))));
    }

    #[test]
    fn rle_value_decode() {
        let decoded = HybridRleDecoder::try_new(&[0x14, 0x03], 2, 10)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, vec![3; 10]);
    }

    #[test]
    fn bit_packed_value_decode() {
        let decoded = HybridRleDecoder::try_new(&[0x03, 0x88, 0xC6, 0xFA], 3, 8)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn roundtrip_mixed_runs() {
        let mut values = vec![];
        values.extend(std::iter::repeat(5).take(100));
        values.extend((0..29u32).map(|i| i % 8));
        values.extend(std::iter::repeat(1).take(31));
        roundtrip(&values, 3);
    }

    #[test]
    fn roundtrip_every_width() {
        for num_bits in 1..=32u32 {
            let mask = ((1u64 << num_bits) - 1) as u32;
            let values: Vec<u32> = (0..1000u32)
                .map(|i| i.wrapping_mul(0x9E3779B9) & mask)
                .collect();
            roundtrip(&values, num_bits);
        }
    }

    #[test]
    fn batched_reads_cross_runs() {
        let mut values = vec![7u32; 20];
        values.extend((0..24u32).map(|i| i % 4));
        let mut buffer = vec![];
        encode_u32(&mut buffer, values.iter().copied(), 3, values.len()).unwrap();

        let mut decoder = HybridRleDecoder::try_new(&buffer, 3, values.len()).unwrap();
        let mut out = vec![0u32; values.len()];
        assert_eq!(decoder.get_batch(&mut out[..11]).unwrap(), 11);
        assert_eq!(decoder.get_batch(&mut out[11..30]).unwrap(), 19);
        assert_eq!(decoder.get_batch(&mut out[30..]).unwrap(), 14);
        assert_eq!(out, values);
        assert!(decoder.is_empty());
    }

    #[test]
    fn zero_bit_width_yields_zeros() {
        let mut decoder = HybridRleDecoder::try_new(&[], 0, 5).unwrap();
        let mut out = [9u32; 5];
        assert_eq!(decoder.get_batch(&mut out).unwrap(), 5);
        assert_eq!(out, [0; 5]);
    }

    #[test]
    fn zero_length_run_is_malformed() {
        // an RLE header declaring zero repetitions
        let result = HybridRleDecoder::try_new(&[0x00, 0x01], 1, 4)
            .unwrap()
            .collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(Error::OutOfSpec(_))));
    }

    #[test]
    fn truncated_run_is_an_error() {
        // bit-packed header declaring two groups with one byte of payload
        let result = HybridRleDecoder::try_new(&[0x05, 0xFF], 3, 16)
            .unwrap()
            .collect::<Result<Vec<_>>>();
        assert!(result.is_err());
    }

    #[test]
    fn declared_count_past_the_stream_is_an_error() {
        let mut buffer = vec![];
        encode_u32(&mut buffer, std::iter::repeat(1).take(10), 1, 10).unwrap();
        let result = HybridRleDecoder::try_new(&buffer, 1, 20)
            .unwrap()
            .collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(Error::BufferUnderrun(_))));
    }
}
