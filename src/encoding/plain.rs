//! The PLAIN encoding: native values as little-endian bytes, booleans as an
//! LSB-first bitmap, byte arrays with a 4-byte length prefix, fixed-length
//! arrays back to back.

use std::marker::PhantomData;

use super::hybrid_rle::{bitpacked_encode, BitmapIter};
use crate::error::{Error, Result};
use crate::types::NativeType;

/// Appends native values as little-endian bytes.
pub fn encode_native<T: NativeType, I: Iterator<Item = T>>(buffer: &mut Vec<u8>, values: I) {
    for value in values {
        buffer.extend_from_slice(value.to_le_bytes().as_ref());
    }
}

/// Appends `length` booleans as an LSB-first bitmap of `ceil(length / 8)`
/// bytes.
pub fn encode_boolean<I: Iterator<Item = bool>>(buffer: &mut Vec<u8>, values: I, length: usize) {
    bitpacked_encode(buffer, values, length);
}

/// Appends byte arrays, each prefixed with its 4-byte little-endian length.
pub fn encode_byte_array<'a, I: Iterator<Item = &'a [u8]>>(buffer: &mut Vec<u8>, values: I) {
    for value in values {
        buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buffer.extend_from_slice(value);
    }
}

/// Appends fixed-length values back to back, checking each against the
/// schema-declared length.
pub fn encode_fixed_len_byte_array<'a, I: Iterator<Item = &'a [u8]>>(
    buffer: &mut Vec<u8>,
    values: I,
    type_length: usize,
) -> Result<()> {
    for value in values {
        if value.len() != type_length {
            return Err(Error::InvalidSchema(format!(
                "fixed-length value of {} bytes in a column of type length {type_length}",
                value.len()
            )));
        }
        buffer.extend_from_slice(value);
    }
    Ok(())
}

/// An [`Iterator`] of native values decoded from PLAIN bytes. The byte count
/// is validated up front, so items are infallible.
#[derive(Debug, Clone)]
pub struct NativeDecoder<'a, T: NativeType> {
    chunks: std::slice::ChunksExact<'a, u8>,
    remaining: usize,
    _type: PhantomData<T>,
}

impl<'a, T: NativeType> NativeDecoder<'a, T> {
    pub fn try_new(data: &'a [u8], num_values: usize) -> Result<Self> {
        let size = std::mem::size_of::<T>();
        if data.len() < size * num_values {
            return Err(Error::BufferUnderrun(format!(
                "{} bytes cannot hold {num_values} plain values of {size} bytes",
                data.len()
            )));
        }
        Ok(Self {
            chunks: data.chunks_exact(size),
            remaining: num_values,
            _type: PhantomData,
        })
    }
}

impl<'a, T: NativeType> Iterator for NativeDecoder<'a, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let chunk = self.chunks.next()?;
        let bytes: T::Bytes = chunk.try_into().ok()?;
        Some(T::from_le_bytes(bytes))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Returns an iterator over `num_values` PLAIN booleans.
pub fn boolean_decoder(data: &[u8], num_values: usize) -> Result<BitmapIter<'_>> {
    if data.len() * 8 < num_values {
        return Err(Error::BufferUnderrun(format!(
            "{} bytes cannot hold {num_values} plain booleans",
            data.len()
        )));
    }
    Ok(BitmapIter::new(data, num_values))
}

/// An [`Iterator`] over length-prefixed byte arrays.
#[derive(Debug, Clone)]
pub struct BinaryDecoder<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(data: &'a [u8], num_values: usize) -> Self {
        Self {
            data,
            offset: 0,
            remaining: num_values,
        }
    }
}

impl<'a> Iterator for BinaryDecoder<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if self.offset + 4 > self.data.len() {
            self.remaining = 0;
            return Some(Err(Error::BufferUnderrun(
                "byte array length prefix past the end of the page".to_string(),
            )));
        }
        let length =
            u32::from_le_bytes(self.data[self.offset..self.offset + 4].try_into().unwrap())
                as usize;
        self.offset += 4;

        if self.offset + length > self.data.len() {
            self.remaining = 0;
            return Some(Err(Error::BufferUnderrun(
                "byte array value past the end of the page".to_string(),
            )));
        }
        let value = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Some(Ok(value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// An [`Iterator`] over fixed-length values. The byte count is validated up
/// front, so items are infallible.
#[derive(Debug, Clone)]
pub struct FixedLenDecoder<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
    remaining: usize,
}

impl<'a> FixedLenDecoder<'a> {
    pub fn try_new(data: &'a [u8], type_length: usize, num_values: usize) -> Result<Self> {
        if type_length == 0 {
            return Err(Error::oos("fixed-length type of zero bytes"));
        }
        if data.len() < type_length * num_values {
            return Err(Error::BufferUnderrun(format!(
                "{} bytes cannot hold {num_values} values of {type_length} bytes",
                data.len()
            )));
        }
        Ok(Self {
            chunks: data.chunks_exact(type_length),
            remaining: num_values,
        })
    }
}

impl<'a> Iterator for FixedLenDecoder<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.chunks.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_roundtrip() {
        let values = [1i32, -1, i32::MAX, i32::MIN, 0];
        let mut buffer = vec![];
        encode_native(&mut buffer, values.iter().copied());
        assert_eq!(buffer.len(), 20);

        let decoded = NativeDecoder::<i32>::try_new(&buffer, values.len())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(decoded, values);
    }

    #[test]
    fn int96_roundtrip() {
        let values = [[1u32, 2, 3], [u32::MAX, 0, 7]];
        let mut buffer = vec![];
        encode_native(&mut buffer, values.iter().copied());
        assert_eq!(buffer.len(), 24);

        let decoded = NativeDecoder::<[u32; 3]>::try_new(&buffer, values.len())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(decoded, values);
    }

    #[test]
    fn boolean_roundtrip() {
        let values = [true, true, false, true, false, false, true, true, true];
        let mut buffer = vec![];
        encode_boolean(&mut buffer, values.iter().copied(), values.len());
        assert_eq!(buffer.len(), 2);

        let decoded = boolean_decoder(&buffer, values.len())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(decoded, values);
    }

    #[test]
    fn byte_array_roundtrip() {
        let values: [&[u8]; 4] = [b"", b"a", b"hello world", b"\x00\x01"];
        let mut buffer = vec![];
        encode_byte_array(&mut buffer, values.iter().copied());

        let decoded = BinaryDecoder::new(&buffer, values.len())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn truncated_byte_array_fails() {
        let mut buffer = vec![];
        encode_byte_array(&mut buffer, [b"hello".as_slice()].into_iter());
        buffer.truncate(buffer.len() - 1);
        let result = BinaryDecoder::new(&buffer, 1).collect::<Result<Vec<_>>>();
        assert!(result.is_err());
    }

    #[test]
    fn fixed_len_roundtrip() {
        let values: [&[u8]; 3] = [b"abcd", b"efgh", b"ijkl"];
        let mut buffer = vec![];
        encode_fixed_len_byte_array(&mut buffer, values.iter().copied(), 4).unwrap();

        let decoded = FixedLenDecoder::try_new(&buffer, 4, values.len())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(decoded, values);
    }

    #[test]
    fn wrong_fixed_len_is_rejected() {
        let mut buffer = vec![];
        let result =
            encode_fixed_len_byte_array(&mut buffer, [b"abc".as_slice()].into_iter(), 4);
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }
}
