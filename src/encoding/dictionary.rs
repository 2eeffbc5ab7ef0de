//! Dictionary encoding: a column chunk owns one dictionary whose values are
//! written PLAIN to the dictionary page; data pages carry a one-byte bit
//! width followed by hybrid-RLE indices into it.

use std::collections::HashMap;

use super::hybrid_rle::{encode_u32, HybridRleDecoder};
use super::{get_bit_width, plain};
use crate::error::{Error, Result};
use crate::types::{NativeType, PhysicalType};

/// Dictionary value bytes past this limit trigger the PLAIN fallback.
pub const MAX_DICTIONARY_BYTES: usize = 1 << 20;
/// Dictionary entries past this limit trigger the PLAIN fallback.
pub const MAX_DICTIONARY_ENTRIES: usize = 1 << 20;

/// A column-chunk-scoped dictionary builder.
///
/// Values are interned on their canonical little-endian bytes. Once either
/// [`MAX_DICTIONARY_BYTES`] or [`MAX_DICTIONARY_ENTRIES`] would be exceeded
/// the encoder falls back: `index` returns `None`, the triggering page and
/// every later page of the chunk must be written PLAIN, and entries interned
/// so far stay valid for the pages already written.
pub struct DictEncoder {
    /// PLAIN-encoded dictionary page payload.
    values: Vec<u8>,
    map: HashMap<Box<[u8]>, u32>,
    fallen_back: bool,
}

impl DictEncoder {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            map: HashMap::new(),
            fallen_back: false,
        }
    }

    /// The number of interned values.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether the chunk has fallen back to PLAIN.
    #[inline]
    pub fn fallen_back(&self) -> bool {
        self.fallen_back
    }

    /// The PLAIN dictionary page payload, frozen when the page is emitted.
    #[inline]
    pub fn dict_page(&self) -> &[u8] {
        &self.values
    }

    /// The index bit width for data pages: `ceil(log2(len))`, at least 1.
    #[inline]
    pub fn bit_width(&self) -> u32 {
        get_bit_width(self.map.len().saturating_sub(1) as u64).max(1)
    }

    fn intern(&mut self, key: &[u8], length_prefixed: bool) -> Option<u32> {
        if self.fallen_back {
            return None;
        }
        if let Some(&index) = self.map.get(key) {
            return Some(index);
        }
        let entry_bytes = key.len() + if length_prefixed { 4 } else { 0 };
        if self.map.len() == MAX_DICTIONARY_ENTRIES
            || self.values.len() + entry_bytes > MAX_DICTIONARY_BYTES
        {
            self.fallen_back = true;
            return None;
        }
        let index = self.map.len() as u32;
        if length_prefixed {
            self.values.extend_from_slice(&(key.len() as u32).to_le_bytes());
        }
        self.values.extend_from_slice(key);
        self.map.insert(key.into(), index);
        Some(index)
    }

    /// Interns a native value, returning its index, or `None` on fallback.
    pub fn index_native<T: NativeType>(&mut self, value: T) -> Option<u32> {
        self.intern(value.to_le_bytes().as_ref(), false)
    }

    /// Interns a byte array (stored length-prefixed in the dictionary page).
    pub fn index_byte_array(&mut self, value: &[u8]) -> Option<u32> {
        self.intern(value, true)
    }

    /// Interns a fixed-length value (stored back to back).
    pub fn index_fixed_len(&mut self, value: &[u8]) -> Option<u32> {
        self.intern(value, false)
    }
}

impl Default for DictEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes one data page's index stream: the bit width byte, then the
/// hybrid-RLE indices at that width.
pub fn encode_indices(buffer: &mut Vec<u8>, indices: &[u32], dict_len: usize) -> Result<()> {
    let num_bits = get_bit_width(dict_len.saturating_sub(1) as u64).max(1);
    buffer.push(num_bits as u8);
    encode_u32(buffer, indices.iter().copied(), num_bits, indices.len())
}

/// A decoded dictionary page, typed by the leaf's physical type.
#[derive(Debug, Clone)]
pub enum Dictionary<'a> {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<[u32; 3]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<&'a [u8]>),
    FixedLenByteArray {
        data: &'a [u8],
        type_length: usize,
    },
}

impl<'a> Dictionary<'a> {
    /// Decodes a PLAIN dictionary page of `num_values` values.
    pub fn try_new(
        physical_type: PhysicalType,
        data: &'a [u8],
        num_values: usize,
    ) -> Result<Self> {
        Ok(match physical_type {
            PhysicalType::Boolean => {
                return Err(Error::FeatureNotSupported(
                    "dictionary-encoded booleans".to_string(),
                ))
            }
            PhysicalType::Int32 => {
                Dictionary::Int32(plain::NativeDecoder::try_new(data, num_values)?.collect())
            }
            PhysicalType::Int64 => {
                Dictionary::Int64(plain::NativeDecoder::try_new(data, num_values)?.collect())
            }
            PhysicalType::Int96 => {
                Dictionary::Int96(plain::NativeDecoder::try_new(data, num_values)?.collect())
            }
            PhysicalType::Float => {
                Dictionary::Float(plain::NativeDecoder::try_new(data, num_values)?.collect())
            }
            PhysicalType::Double => {
                Dictionary::Double(plain::NativeDecoder::try_new(data, num_values)?.collect())
            }
            PhysicalType::ByteArray => Dictionary::ByteArray(
                plain::BinaryDecoder::new(data, num_values).collect::<Result<Vec<_>>>()?,
            ),
            PhysicalType::FixedLenByteArray(type_length) => {
                // validates size and length up front
                plain::FixedLenDecoder::try_new(data, type_length, num_values)?;
                Dictionary::FixedLenByteArray { data, type_length }
            }
        })
    }

    /// The number of dictionary entries.
    pub fn len(&self) -> usize {
        match self {
            Dictionary::Int32(values) => values.len(),
            Dictionary::Int64(values) => values.len(),
            Dictionary::Int96(values) => values.len(),
            Dictionary::Float(values) => values.len(),
            Dictionary::Double(values) => values.len(),
            Dictionary::ByteArray(values) => values.len(),
            Dictionary::FixedLenByteArray { data, type_length } => data.len() / type_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The index stream of a dictionary-encoded data page.
///
/// A bit width of zero is accepted only for single-entry dictionaries, in
/// which case the stream carries no bytes and every index is zero.
pub struct IndicesDecoder<'a> {
    inner: HybridRleDecoder<'a>,
}

impl<'a> IndicesDecoder<'a> {
    pub fn try_new(data: &'a [u8], dict_len: usize, num_values: usize) -> Result<Self> {
        let &num_bits = data.first().ok_or_else(|| {
            Error::BufferUnderrun("dictionary page data without a bit width byte".to_string())
        })?;
        if num_bits > 32 {
            return Err(Error::oos(format!(
                "dictionary index bit width {num_bits} above 32"
            )));
        }
        if num_bits == 0 && dict_len != 1 {
            return Err(Error::oos(format!(
                "dictionary index bit width 0 with {dict_len} dictionary entries"
            )));
        }
        Ok(Self {
            inner: HybridRleDecoder::try_new(&data[1..], num_bits as usize, num_values)?,
        })
    }

    /// See [`HybridRleDecoder::get_batch`].
    pub fn get_batch(&mut self, out: &mut [u32]) -> Result<usize> {
        self.inner.get_batch(out)
    }
}

impl<'a> Iterator for IndicesDecoder<'a> {
    type Item = Result<u32>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
