//! Physical types, encodings and the native value trait shared by the codecs.

/// The set of Parquet physical types a leaf column can have.
///
/// `FixedLenByteArray` carries its schema-declared byte length, so a
/// fixed-length leaf without a length is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray(usize),
}

/// The encodings this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    RleDictionary,
    DeltaBinaryPacked,
}

impl Encoding {
    /// Whether data pages under this encoding carry dictionary indices.
    pub fn is_dictionary(&self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

/// Compression codec recorded per leaf and handed to the page assembler.
/// The codecs in this crate never inspect it beyond carrying it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Lz4,
    Zstd,
}

/// Repetition of a schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

/// Converted type annotation on a group element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupConvertedType {
    List,
    Map,
}

/// Logical type annotation on a primitive element. Passed through to the
/// metadata writer opaquely; never consulted by the physical codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Enum,
    Uuid,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Decimal(usize, usize),
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Json,
    Bson,
    Interval,
}

/// A physical value type with a defined little-endian byte layout.
///
/// Implemented for the closed set of fixed-size Parquet value types; byte
/// arrays are handled separately as slices.
pub trait NativeType: std::fmt::Debug + Copy + PartialEq + Default + Send + Sync + 'static {
    type Bytes: AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// The physical type this native type maps to.
    const TYPE: PhysicalType;

    fn to_le_bytes(&self) -> Self::Bytes;

    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! native {
    ($type:ty, $physical_type:expr) => {
        impl NativeType for $type {
            type Bytes = [u8; std::mem::size_of::<Self>()];

            const TYPE: PhysicalType = $physical_type;

            #[inline]
            fn to_le_bytes(&self) -> Self::Bytes {
                Self::to_le_bytes(*self)
            }

            #[inline]
            fn from_le_bytes(bytes: Self::Bytes) -> Self {
                Self::from_le_bytes(bytes)
            }
        }
    };
}

native!(i32, PhysicalType::Int32);
native!(i64, PhysicalType::Int64);
native!(f32, PhysicalType::Float);
native!(f64, PhysicalType::Double);

/// INT96 is three little-endian `u32` words, treated opaquely.
impl NativeType for [u32; 3] {
    type Bytes = [u8; 12];

    const TYPE: PhysicalType = PhysicalType::Int96;

    #[inline]
    fn to_le_bytes(&self) -> Self::Bytes {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self[0].to_le_bytes());
        bytes[4..8].copy_from_slice(&self[1].to_le_bytes());
        bytes[8..12].copy_from_slice(&self[2].to_le_bytes());
        bytes
    }

    #[inline]
    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        [
            u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
        ]
    }
}
