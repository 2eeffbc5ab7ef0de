//! Page-level encoders and decoders for the Parquet columnar format.
//!
//! This crate covers the bit-exact encoding layer of a Parquet reader and
//! writer: the bit-packed stream primitives, the hybrid RLE/bit-packed
//! integer format, the level-stream framing of v1 data pages, the PLAIN,
//! dictionary and DELTA_BINARY_PACKED value encodings, and the lowering of
//! a nested logical schema to flat metadata elements with repetition and
//! definition level bookkeeping.
//!
//! File I/O, Thrift metadata, compression and page orchestration are the
//! caller's concern: every codec here consumes and produces caller-owned
//! byte buffers, synchronously and without logging.

pub mod column;
pub mod encoding;
pub mod error;
pub mod schema;
pub mod types;
