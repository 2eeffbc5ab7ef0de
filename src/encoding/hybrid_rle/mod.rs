//! The Parquet hybrid RLE/bit-packed integer format, used for repetition and
//! definition levels and for dictionary indices.
//!
//! A stream alternates two kinds of runs behind ULEB128 headers:
//! `(length << 1) | 0` introduces `length` repetitions of one value stored in
//! `ceil(bit_width / 8)` little-endian bytes; `(groups << 1) | 1` introduces
//! `groups` eight-value bit-packed groups.
//!
//! [`Decoder`] walks a stream run by run; [`HybridRleDecoder`] sits on top of
//! it and yields individual values.

mod bitmap;
mod decoder;
mod encoder;

pub use bitmap::{bitpacked_encode, BitmapIter};
pub use decoder::{Decoder, HybridRleDecoder};
pub use encoder::{encode_bool, encode_u32, max_buffer_size, RleEncoder};

/// One whole run of a hybrid stream. Callers can broadcast an RLE run or
/// bulk-unpack a bit-packed one without per-value dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HybridEncoded<'a> {
    /// A bit-packed run holding `bytes.len() * 8 / bit_width` values.
    Bitpacked(&'a [u8]),
    /// The little-endian bytes of a single value, repeated `usize` times.
    Rle(&'a [u8], usize),
}
