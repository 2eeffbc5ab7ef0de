//! Per-leaf codec factory: one [`PageEncoder`] per column chunk on the write
//! side, one [`PageValues`] per data page slice on the read side.

use num_traits::AsPrimitive;

use crate::encoding::dictionary::{self, DictEncoder, Dictionary, IndicesDecoder};
use crate::encoding::hybrid_rle::BitmapIter;
use crate::encoding::{delta_bitpacked, plain};
use crate::error::{Error, Result};
use crate::schema::ColumnDescriptor;
use crate::types::{Encoding, NativeType, PhysicalType};

/// Typed, null-stripped values for one data page.
#[derive(Debug, Clone, Copy)]
pub enum Values<'a> {
    Boolean(&'a [bool]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int96(&'a [[u32; 3]]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    ByteArray(&'a [&'a [u8]]),
    FixedLenByteArray(&'a [&'a [u8]]),
}

impl Values<'_> {
    pub fn len(&self) -> usize {
        match self {
            Values::Boolean(values) => values.len(),
            Values::Int32(values) => values.len(),
            Values::Int64(values) => values.len(),
            Values::Int96(values) => values.len(),
            Values::Float(values) => values.len(),
            Values::Double(values) => values.len(),
            Values::ByteArray(values) => values.len(),
            Values::FixedLenByteArray(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, physical_type: PhysicalType) -> bool {
        matches!(
            (self, physical_type),
            (Values::Boolean(_), PhysicalType::Boolean)
                | (Values::Int32(_), PhysicalType::Int32)
                | (Values::Int64(_), PhysicalType::Int64)
                | (Values::Int96(_), PhysicalType::Int96)
                | (Values::Float(_), PhysicalType::Float)
                | (Values::Double(_), PhysicalType::Double)
                | (Values::ByteArray(_), PhysicalType::ByteArray)
                | (Values::FixedLenByteArray(_), PhysicalType::FixedLenByteArray(_))
        )
    }
}

/// Encodes the value section of data pages for one leaf across a column
/// chunk, owning the chunk's dictionary when the leaf is
/// dictionary-encoded.
pub struct PageEncoder {
    descriptor: ColumnDescriptor,
    dict: Option<DictEncoder>,
}

impl PageEncoder {
    /// Fails with [`Error::FeatureNotSupported`] outside the supported
    /// encoding/type matrix.
    pub fn try_new(descriptor: &ColumnDescriptor) -> Result<Self> {
        let supported = match descriptor.encoding {
            Encoding::Plain => true,
            Encoding::PlainDictionary | Encoding::RleDictionary => {
                descriptor.physical_type != PhysicalType::Boolean
            }
            Encoding::DeltaBinaryPacked => matches!(
                descriptor.physical_type,
                PhysicalType::Int32 | PhysicalType::Int64
            ),
            Encoding::Rle => false,
        };
        if !supported {
            return Err(Error::FeatureNotSupported(format!(
                "{:?}-encoding {:?} columns",
                descriptor.encoding, descriptor.physical_type
            )));
        }
        let dict = descriptor.encoding.is_dictionary().then(DictEncoder::new);
        Ok(Self {
            descriptor: descriptor.clone(),
            dict,
        })
    }

    /// Encodes one page of values, appending to `buffer`, and returns the
    /// encoding actually used: the declared one, or PLAIN once the
    /// dictionary has fallen back.
    pub fn encode(&mut self, values: &Values<'_>, buffer: &mut Vec<u8>) -> Result<Encoding> {
        if !values.matches(self.descriptor.physical_type) {
            return Err(Error::InvalidSchema(format!(
                "page values do not match a {:?} column",
                self.descriptor.physical_type
            )));
        }
        if let PhysicalType::FixedLenByteArray(type_length) = self.descriptor.physical_type {
            if let Values::FixedLenByteArray(slices) = values {
                if let Some(bad) = slices.iter().find(|value| value.len() != type_length) {
                    return Err(Error::InvalidSchema(format!(
                        "fixed-length value of {} bytes in a column of type length {type_length}",
                        bad.len()
                    )));
                }
            }
        }

        if let Some(dict) = &mut self.dict {
            if !dict.fallen_back() {
                if let Some(indices) = try_intern(dict, values) {
                    dictionary::encode_indices(buffer, &indices, dict.len())?;
                    return Ok(self.descriptor.encoding);
                }
                // interning overflowed the dictionary limits: this page and
                // the rest of the chunk are written PLAIN
            }
            encode_plain(values, buffer)?;
            return Ok(Encoding::Plain);
        }

        match self.descriptor.encoding {
            Encoding::Plain => {
                encode_plain(values, buffer)?;
                Ok(Encoding::Plain)
            }
            Encoding::DeltaBinaryPacked => {
                match values {
                    Values::Int32(slice) => {
                        delta_bitpacked::encode(slice.iter().map(|&value| i64::from(value)), buffer)
                    }
                    Values::Int64(slice) => {
                        delta_bitpacked::encode(slice.iter().copied(), buffer)
                    }
                    // try_new only admits the integer types
                    _ => unreachable!(),
                }
                Ok(Encoding::DeltaBinaryPacked)
            }
            _ => unreachable!(),
        }
    }

    /// The PLAIN dictionary page payload and its value count, if this leaf
    /// is dictionary-encoded and any page used the dictionary.
    pub fn dict_page(&self) -> Option<(&[u8], usize)> {
        self.dict
            .as_ref()
            .filter(|dict| !dict.is_empty())
            .map(|dict| (dict.dict_page(), dict.len()))
    }
}

fn try_intern(dict: &mut DictEncoder, values: &Values<'_>) -> Option<Vec<u32>> {
    match values {
        Values::Int32(slice) => slice.iter().map(|&v| dict.index_native(v)).collect(),
        Values::Int64(slice) => slice.iter().map(|&v| dict.index_native(v)).collect(),
        Values::Int96(slice) => slice.iter().map(|&v| dict.index_native(v)).collect(),
        Values::Float(slice) => slice.iter().map(|&v| dict.index_native(v)).collect(),
        Values::Double(slice) => slice.iter().map(|&v| dict.index_native(v)).collect(),
        Values::ByteArray(slices) => slices.iter().map(|v| dict.index_byte_array(v)).collect(),
        Values::FixedLenByteArray(slices) => {
            slices.iter().map(|v| dict.index_fixed_len(v)).collect()
        }
        Values::Boolean(_) => None,
    }
}

fn encode_plain(values: &Values<'_>, buffer: &mut Vec<u8>) -> Result<()> {
    match values {
        Values::Boolean(slice) => plain::encode_boolean(buffer, slice.iter().copied(), slice.len()),
        Values::Int32(slice) => plain::encode_native(buffer, slice.iter().copied()),
        Values::Int64(slice) => plain::encode_native(buffer, slice.iter().copied()),
        Values::Int96(slice) => plain::encode_native(buffer, slice.iter().copied()),
        Values::Float(slice) => plain::encode_native(buffer, slice.iter().copied()),
        Values::Double(slice) => plain::encode_native(buffer, slice.iter().copied()),
        Values::ByteArray(slices) => plain::encode_byte_array(buffer, slices.iter().copied()),
        Values::FixedLenByteArray(slices) => {
            // lengths were validated against the descriptor by the caller
            for value in slices.iter() {
                buffer.extend_from_slice(value);
            }
        }
    }
    Ok(())
}

/// Decodes a PLAIN dictionary page for `descriptor`.
pub fn decode_dict_page<'a>(
    descriptor: &ColumnDescriptor,
    data: &'a [u8],
    num_values: usize,
) -> Result<Dictionary<'a>> {
    Dictionary::try_new(descriptor.physical_type, data, num_values)
}

/// Plain or dictionary-indexed native values.
pub enum NativeValues<'a, 'd, T: NativeType> {
    Plain(plain::NativeDecoder<'a, T>),
    Dictionary {
        indices: IndicesDecoder<'a>,
        dict: &'d [T],
    },
}

impl<'a, 'd, T: NativeType> Iterator for NativeValues<'a, 'd, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            NativeValues::Plain(decoder) => decoder.next().map(Ok),
            NativeValues::Dictionary { indices, dict } => {
                let index = match indices.next()? {
                    Ok(index) => index as usize,
                    Err(e) => return Some(Err(e)),
                };
                Some(dict.get(index).copied().ok_or_else(|| {
                    Error::oos(format!(
                        "dictionary index {index} out of bounds {}",
                        dict.len()
                    ))
                }))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            NativeValues::Plain(decoder) => decoder.size_hint(),
            NativeValues::Dictionary { indices, .. } => indices.size_hint(),
        }
    }
}

/// Delta-binary-packed values narrowed to the leaf's native integer type.
pub struct DeltaValues<'a, T> {
    decoder: delta_bitpacked::Decoder<'a>,
    _type: std::marker::PhantomData<T>,
}

impl<'a, T: Copy + 'static> Iterator for DeltaValues<'a, T>
where
    i64: AsPrimitive<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.decoder.next()?.map(|value| value.as_()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.decoder.size_hint()
    }
}

/// Plain or dictionary-indexed byte arrays.
pub enum ByteArrayValues<'a, 'd> {
    Plain(plain::BinaryDecoder<'a>),
    Dictionary {
        indices: IndicesDecoder<'a>,
        dict: &'d [&'a [u8]],
    },
}

impl<'a, 'd> Iterator for ByteArrayValues<'a, 'd> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ByteArrayValues::Plain(decoder) => decoder.next(),
            ByteArrayValues::Dictionary { indices, dict } => {
                let index = match indices.next()? {
                    Ok(index) => index as usize,
                    Err(e) => return Some(Err(e)),
                };
                Some(dict.get(index).copied().ok_or_else(|| {
                    Error::oos(format!(
                        "dictionary index {index} out of bounds {}",
                        dict.len()
                    ))
                }))
            }
        }
    }
}

/// Plain or dictionary-indexed fixed-length values.
pub enum FixedLenValues<'a> {
    Plain(plain::FixedLenDecoder<'a>),
    Dictionary {
        indices: IndicesDecoder<'a>,
        data: &'a [u8],
        type_length: usize,
    },
}

impl<'a> Iterator for FixedLenValues<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FixedLenValues::Plain(decoder) => decoder.next().map(Ok),
            FixedLenValues::Dictionary {
                indices,
                data,
                type_length,
            } => {
                let index = match indices.next()? {
                    Ok(index) => index as usize,
                    Err(e) => return Some(Err(e)),
                };
                let start = index * *type_length;
                Some(
                    data.get(start..start + *type_length).ok_or_else(|| {
                        Error::oos(format!(
                            "dictionary index {index} out of bounds {}",
                            data.len() / *type_length
                        ))
                    }),
                )
            }
        }
    }
}

/// The lazily decoded value section of one data page, typed by the leaf's
/// physical type. Yields exactly the page's non-null count.
pub enum PageValues<'a, 'd> {
    Boolean(BitmapIter<'a>),
    Int32(NativeValues<'a, 'd, i32>),
    Int32Delta(DeltaValues<'a, i32>),
    Int64(NativeValues<'a, 'd, i64>),
    Int64Delta(DeltaValues<'a, i64>),
    Int96(NativeValues<'a, 'd, [u32; 3]>),
    Float(NativeValues<'a, 'd, f32>),
    Double(NativeValues<'a, 'd, f64>),
    ByteArray(ByteArrayValues<'a, 'd>),
    FixedLenByteArray(FixedLenValues<'a>),
}

impl<'a, 'd> PageValues<'a, 'd> {
    /// Builds the reader codec for one page's value bytes. `encoding` is the
    /// page's own encoding (a chunk that fell back carries PLAIN pages after
    /// dictionary ones); dictionary pages must have been decoded first.
    pub fn try_new(
        descriptor: &ColumnDescriptor,
        data: &'a [u8],
        num_values: usize,
        encoding: Encoding,
        dict: Option<&'d Dictionary<'a>>,
    ) -> Result<Self> {
        match encoding {
            Encoding::Plain => Self::try_new_plain(descriptor, data, num_values),
            Encoding::PlainDictionary | Encoding::RleDictionary => {
                let dict = dict.ok_or_else(|| {
                    Error::oos("dictionary-encoded page without a dictionary page")
                })?;
                Self::try_new_dictionary(descriptor, data, num_values, dict)
            }
            Encoding::DeltaBinaryPacked => {
                let decoder = delta_bitpacked::Decoder::try_new(data)?;
                if decoder.len() < num_values {
                    return Err(Error::oos(format!(
                        "delta header declares {} values, page has {num_values}",
                        decoder.len()
                    )));
                }
                match descriptor.physical_type {
                    PhysicalType::Int32 => Ok(PageValues::Int32Delta(DeltaValues {
                        decoder,
                        _type: std::marker::PhantomData,
                    })),
                    PhysicalType::Int64 => Ok(PageValues::Int64Delta(DeltaValues {
                        decoder,
                        _type: std::marker::PhantomData,
                    })),
                    other => Err(Error::FeatureNotSupported(format!(
                        "DELTA_BINARY_PACKED {other:?} columns"
                    ))),
                }
            }
            Encoding::Rle => Err(Error::FeatureNotSupported(
                "RLE as a value encoding".to_string(),
            )),
        }
    }

    fn try_new_plain(
        descriptor: &ColumnDescriptor,
        data: &'a [u8],
        num_values: usize,
    ) -> Result<Self> {
        Ok(match descriptor.physical_type {
            PhysicalType::Boolean => {
                PageValues::Boolean(plain::boolean_decoder(data, num_values)?)
            }
            PhysicalType::Int32 => PageValues::Int32(NativeValues::Plain(
                plain::NativeDecoder::try_new(data, num_values)?,
            )),
            PhysicalType::Int64 => PageValues::Int64(NativeValues::Plain(
                plain::NativeDecoder::try_new(data, num_values)?,
            )),
            PhysicalType::Int96 => PageValues::Int96(NativeValues::Plain(
                plain::NativeDecoder::try_new(data, num_values)?,
            )),
            PhysicalType::Float => PageValues::Float(NativeValues::Plain(
                plain::NativeDecoder::try_new(data, num_values)?,
            )),
            PhysicalType::Double => PageValues::Double(NativeValues::Plain(
                plain::NativeDecoder::try_new(data, num_values)?,
            )),
            PhysicalType::ByteArray => {
                PageValues::ByteArray(ByteArrayValues::Plain(plain::BinaryDecoder::new(
                    data, num_values,
                )))
            }
            PhysicalType::FixedLenByteArray(type_length) => PageValues::FixedLenByteArray(
                FixedLenValues::Plain(plain::FixedLenDecoder::try_new(
                    data,
                    type_length,
                    num_values,
                )?),
            ),
        })
    }

    fn try_new_dictionary(
        descriptor: &ColumnDescriptor,
        data: &'a [u8],
        num_values: usize,
        dict: &'d Dictionary<'a>,
    ) -> Result<Self> {
        let indices = IndicesDecoder::try_new(data, dict.len(), num_values)?;
        Ok(match (descriptor.physical_type, dict) {
            (PhysicalType::Int32, Dictionary::Int32(values)) => {
                PageValues::Int32(NativeValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (PhysicalType::Int64, Dictionary::Int64(values)) => {
                PageValues::Int64(NativeValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (PhysicalType::Int96, Dictionary::Int96(values)) => {
                PageValues::Int96(NativeValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (PhysicalType::Float, Dictionary::Float(values)) => {
                PageValues::Float(NativeValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (PhysicalType::Double, Dictionary::Double(values)) => {
                PageValues::Double(NativeValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (PhysicalType::ByteArray, Dictionary::ByteArray(values)) => {
                PageValues::ByteArray(ByteArrayValues::Dictionary {
                    indices,
                    dict: values,
                })
            }
            (
                PhysicalType::FixedLenByteArray(type_length),
                Dictionary::FixedLenByteArray {
                    data: dict_data,
                    type_length: dict_length,
                },
            ) if type_length == *dict_length => {
                PageValues::FixedLenByteArray(FixedLenValues::Dictionary {
                    indices,
                    data: *dict_data,
                    type_length,
                })
            }
            (physical_type, _) => {
                return Err(Error::oos(format!(
                    "dictionary page does not match a {physical_type:?} column"
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Compression;

    fn descriptor(physical_type: PhysicalType, encoding: Encoding) -> ColumnDescriptor {
        ColumnDescriptor {
            path: vec!["col".to_string()],
            max_rep_level: 0,
            max_def_level: 0,
            physical_type,
            encoding,
            compression: Compression::Uncompressed,
            logical_type: None,
        }
    }

    #[test]
    fn unsupported_combinations_are_rejected() {
        assert!(PageEncoder::try_new(&descriptor(
            PhysicalType::Boolean,
            Encoding::RleDictionary
        ))
        .is_err());
        assert!(PageEncoder::try_new(&descriptor(
            PhysicalType::Float,
            Encoding::DeltaBinaryPacked
        ))
        .is_err());
        assert!(PageEncoder::try_new(&descriptor(PhysicalType::Int32, Encoding::Rle)).is_err());
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let descriptor = descriptor(PhysicalType::Int32, Encoding::Plain);
        let mut encoder = PageEncoder::try_new(&descriptor).unwrap();
        let mut buffer = vec![];
        assert!(encoder
            .encode(&Values::Int64(&[1, 2]), &mut buffer)
            .is_err());
    }

    #[test]
    fn plain_int32_roundtrip() {
        let descriptor = descriptor(PhysicalType::Int32, Encoding::Plain);
        let mut encoder = PageEncoder::try_new(&descriptor).unwrap();
        let values = [3i32, -7, 0, i32::MAX];
        let mut buffer = vec![];
        let used = encoder
            .encode(&Values::Int32(&values), &mut buffer)
            .unwrap();
        assert_eq!(used, Encoding::Plain);
        assert!(encoder.dict_page().is_none());

        let page =
            PageValues::try_new(&descriptor, &buffer, values.len(), used, None).unwrap();
        match page {
            PageValues::Int32(iter) => {
                assert_eq!(iter.collect::<Result<Vec<_>>>().unwrap(), values)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn dictionary_chunk_roundtrip() {
        let descriptor = descriptor(PhysicalType::ByteArray, Encoding::RleDictionary);
        let mut encoder = PageEncoder::try_new(&descriptor).unwrap();
        let values: [&[u8]; 6] = [b"ab", b"cd", b"ab", b"ab", b"ef", b"cd"];
        let mut buffer = vec![];
        let used = encoder
            .encode(&Values::ByteArray(&values), &mut buffer)
            .unwrap();
        assert_eq!(used, Encoding::RleDictionary);

        let (dict_data, dict_len) = encoder.dict_page().unwrap();
        assert_eq!(dict_len, 3);
        let dict_data = dict_data.to_vec();
        let dict = decode_dict_page(&descriptor, &dict_data, dict_len).unwrap();
        let page =
            PageValues::try_new(&descriptor, &buffer, values.len(), used, Some(&dict)).unwrap();
        match page {
            PageValues::ByteArray(iter) => {
                assert_eq!(iter.collect::<Result<Vec<_>>>().unwrap(), values)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        let descriptor = descriptor(PhysicalType::Int32, Encoding::RleDictionary);
        let dict_data = 7i32.to_le_bytes();
        let dict = decode_dict_page(&descriptor, &dict_data, 1).unwrap();
        // width 1, one bit-packed group starting with index 1
        let page_data = [1u8, 0x03, 0b00000010];
        let page = PageValues::try_new(&descriptor, &page_data, 2, Encoding::RleDictionary, Some(&dict))
            .unwrap();
        match page {
            PageValues::Int32(iter) => {
                let result = iter.collect::<Result<Vec<_>>>();
                assert!(matches!(result, Err(Error::OutOfSpec(_))));
            }
            _ => unreachable!(),
        }
    }
}
