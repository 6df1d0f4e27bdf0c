//! # Classic Codecs
//!
//! Two classic lossless codecs, each exposing a stream to stream `compress`/`expand` pair:
//! * `huffman` - static Huffman coding, the code tree travels with the data
//! * `lz77` - sliding window compression with 16 bit length/distance references
//!
//! Both transform `std::io` streams, with `compress_slice` and `expand_slice` conveniences
//! for in-memory buffers.

mod tools;
pub mod huffman;
pub mod lz77;

type DYNERR = Box<dyn std::error::Error>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("no data to encode")]
    NoData,
    #[error("file format mismatch")]
    FileFormatMismatch
}
