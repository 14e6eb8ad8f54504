//! # zflate Deflate
//!
//! Pure Rust streaming implementation of DEFLATE (RFC 1951) with zlib
//! framing (RFC 1950).
//!
//! Both directions are incremental: input may arrive in chunks of any size
//! and output may be drained into buffers of any size, including one byte
//! at a time.
//!
//! ## Features
//!
//! - **Compression** ([`Deflater`]): hash-chain LZ77 with lazy matching,
//!   stored/static/dynamic block selection, sync flush, preset dictionaries
//!   and per-level tuning (0-9) with the default, filtered and Huffman-only
//!   strategies
//! - **Decompression** ([`Inflater`]): all three block types, resumable at
//!   every bit, preset dictionaries, Adler-32 verification
//! - **Adapters**: [`DeflaterWriter`] and [`InflaterReader`] for
//!   `std::io`, and one-shot helpers in [`zlib`]
//!
//! ## Example
//!
//! ```rust
//! use zflate_core::CompressionLevel;
//! use zflate_deflate::{zlib_compress, zlib_decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = zlib_compress(original, CompressionLevel::DEFAULT).unwrap();
//! let decompressed = zlib_decompress(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: Stored blocks only
//! - Level 1-4: Greedy matching, short chains
//! - Level 5-9: Lazy matching, longer chains (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod coder;
pub mod config;
pub mod deflate;
pub mod dyn_header;
pub mod engine;
pub mod huffman;
pub mod inflate;
pub mod stream;
pub mod tables;
pub mod zlib;

// Re-exports
pub use config::{DeflateConfig, LevelConfig, Strategy};
pub use deflate::{Deflater, deflate};
pub use huffman::HuffmanTree;
pub use inflate::{Inflater, inflate};
pub use stream::{DeflaterWriter, InflaterReader};
pub use zlib::{
    ZlibHeader, ZlibLevel, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict, zlib_requires_dictionary,
};
