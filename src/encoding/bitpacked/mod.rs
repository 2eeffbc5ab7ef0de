//! Bit-packing of small unsigned integers in fixed-size groups, with
//! per-bit-width specialized pack/unpack kernels.

mod decode;
mod encode;
mod pack;
mod unpack;

pub use decode::Decoder;
pub use encode::{encode, encode_pack};

/// A fixed-size byte buffer large enough for a complete packed group at the
/// widest supported bit width.
pub trait Packed: Copy + Sized + AsRef<[u8]> + AsMut<[u8]> {
    const LENGTH: usize;

    fn zero() -> Self;
}

impl Packed for [u8; 32 * 4] {
    const LENGTH: usize = 32 * 4;

    #[inline]
    fn zero() -> Self {
        [0; 32 * 4]
    }
}

impl Packed for [u8; 64 * 8] {
    const LENGTH: usize = 64 * 8;

    #[inline]
    fn zero() -> Self {
        [0; 64 * 8]
    }
}

/// A fixed-size buffer holding one complete unpacked group of values.
pub trait Unpacked<T>:
    Copy
    + Sized
    + std::fmt::Debug
    + AsRef<[T]>
    + std::ops::Index<usize, Output = T>
    + std::ops::IndexMut<usize>
{
    const LENGTH: usize;

    fn zero() -> Self;
}

impl Unpacked<u32> for [u32; 32] {
    const LENGTH: usize = 32;

    #[inline]
    fn zero() -> Self {
        [0; 32]
    }
}

impl Unpacked<u64> for [u64; 64] {
    const LENGTH: usize = 64;

    #[inline]
    fn zero() -> Self {
        [0; 64]
    }
}

/// An unsigned integer that can be bit-packed and unpacked in groups.
///
/// The kernels are monomorphized per bit width; the group size is 32 values
/// for `u32` and 64 for `u64`.
pub trait Unpackable: Copy + Sized + Default {
    /// Widest supported packing width, `8 * size_of::<Self>()`.
    const MAX_NUM_BITS: usize;
    type Packed: Packed;
    type Unpacked: Unpacked<Self>;

    /// Unpacks one complete group from `packed` at `num_bits`.
    fn unpack(packed: &[u8], num_bits: usize, unpacked: &mut Self::Unpacked);

    /// Packs one complete group into `packed` at `num_bits`.
    fn pack(unpacked: &Self::Unpacked, num_bits: usize, packed: &mut [u8]);

    fn from_u64(value: u64) -> Self;

    fn to_u64(self) -> u64;
}

impl Unpackable for u32 {
    const MAX_NUM_BITS: usize = 32;
    type Packed = [u8; 32 * 4];
    type Unpacked = [u32; 32];

    #[inline]
    fn unpack(packed: &[u8], num_bits: usize, unpacked: &mut Self::Unpacked) {
        unpack::unpack32(packed, num_bits, unpacked)
    }

    #[inline]
    fn pack(unpacked: &Self::Unpacked, num_bits: usize, packed: &mut [u8]) {
        pack::pack32(unpacked, num_bits, packed)
    }

    #[inline]
    fn from_u64(value: u64) -> Self {
        value as u32
    }

    #[inline]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }
}

impl Unpackable for u64 {
    const MAX_NUM_BITS: usize = 64;
    type Packed = [u8; 64 * 8];
    type Unpacked = [u64; 64];

    #[inline]
    fn unpack(packed: &[u8], num_bits: usize, unpacked: &mut Self::Unpacked) {
        unpack::unpack64(packed, num_bits, unpacked)
    }

    #[inline]
    fn pack(unpacked: &Self::Unpacked, num_bits: usize, packed: &mut [u8]) {
        pack::pack64(unpacked, num_bits, packed)
    }

    #[inline]
    fn from_u64(value: u64) -> Self {
        value
    }

    #[inline]
    fn to_u64(self) -> u64 {
        self
    }
}
