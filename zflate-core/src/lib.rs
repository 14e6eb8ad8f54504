//! # zflate Core
//!
//! Core components for the zflate zlib/DEFLATE codec.
//!
//! This crate provides the building blocks shared by the encoder and decoder:
//!
//! - [`bitstream`]: Pending output buffer and resumable bit input reader
//! - [`checksum`]: Adler-32
//! - [`window`]: Circular output window for decompression
//! - [`traits`]: Streaming compressor/decompressor traits and levels
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! zflate is designed as a layered protocol stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Tools                                               │
//! │     zflate CLI                                          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Framing                                             │
//! │     zlib header/trailer, Read/Write stream adapters     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflater (LZ77 + Huffman), Inflater                 │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Buffers (this crate)                                │
//! │     BitWriter/BitReader, OutputWindow, Adler-32         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use zflate_core::bitstream::BitReader;
//! use zflate_core::checksum::Adler32;
//!
//! // Read bits from data
//! let mut reader = BitReader::new();
//! reader.set_input(&[0xAB, 0xCD]);
//! assert_eq!(reader.try_get_bits(12), Some(0xDAB));
//!
//! // Compute Adler-32
//! assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E6_0398);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use checksum::Adler32;
pub use error::{Result, ZflateError};
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};
pub use window::{OutputWindow, WINDOW_SIZE};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::checksum::Adler32;
    pub use crate::error::{Result, ZflateError};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
    pub use crate::window::OutputWindow;
}
