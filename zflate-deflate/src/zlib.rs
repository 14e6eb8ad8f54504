//! One-shot helpers for the zlib format (RFC 1950).
//!
//! ```text
//! +---+---+=========+============+---+---+---+---+
//! |CMF|FLG|[DICTID] | compressed |    ADLER32    |
//! +---+---+=========+============+---+---+---+---+
//! ```
//!
//! - CMF: compression method 8 (DEFLATE) in the low nibble, log2(window) - 8
//!   in the high nibble
//! - FLG: check bits making `CMF*256 + FLG` a multiple of 31, the preset
//!   dictionary flag (bit 5) and a level hint (bits 6-7)
//! - DICTID: Adler-32 of the preset dictionary, present when FDICT is set
//! - ADLER32: Adler-32 of the uncompressed data, big-endian
//!
//! The streaming types live in [`crate::deflate`] and [`crate::inflate`];
//! everything here is built on them.

use crate::config::MAX_DIST;
use crate::deflate::Deflater;
use crate::inflate::Inflater;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::{CompressionLevel, Compressor, Decompressor};

/// Longest dictionary suffix the compressor can match against. The window
/// keeps a lookahead margin, so this is less than the window size.
pub const MAX_DICTIONARY_SIZE: usize = MAX_DIST;

/// Level hint carried in the FLEVEL bits of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Levels 0-2.
    Fastest = 0,
    /// Levels 3-4.
    Fast = 1,
    /// Levels 5-6.
    Default = 2,
    /// Levels 7-9.
    Maximum = 3,
}

impl ZlibLevel {
    /// The hint a [`Deflater`] writes for `level`.
    pub fn from_level(level: CompressionLevel) -> Self {
        Self::from_bits(level.level().saturating_sub(1) >> 1)
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// Decoded zlib stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size in bytes.
    pub window_size: usize,
    /// Level hint.
    pub level: ZlibLevel,
    /// Adler-32 of the required preset dictionary.
    pub dict_id: Option<u32>,
}

impl ZlibHeader {
    /// Parse and validate the header at the start of `input`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let (&cmf, &flg) = match input {
            [cmf, flg, ..] => (cmf, flg),
            _ => return Err(ZflateError::unexpected_eof("zlib header")),
        };

        if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
            return Err(ZflateError::invalid_header("header check bits are wrong"));
        }
        if cmf & 0x0F != 8 {
            return Err(ZflateError::unsupported_method(cmf & 0x0F));
        }
        let cinfo = cmf >> 4;
        if cinfo > 7 {
            return Err(ZflateError::invalid_header(format!(
                "window size 2^{} exceeds 32 KB",
                cinfo + 8
            )));
        }

        let dict_id = if flg & 0x20 != 0 {
            match input.get(2..6) {
                Some(id) => Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]])),
                None => return Err(ZflateError::unexpected_eof("zlib dictionary id")),
            }
        } else {
            None
        };

        Ok(Self {
            window_size: 1 << (cinfo + 8),
            level: ZlibLevel::from_bits(flg >> 6),
            dict_id,
        })
    }

    /// Length of the header in bytes.
    pub fn size(&self) -> usize {
        if self.dict_id.is_some() { 6 } else { 2 }
    }
}

/// Compress `input` into a zlib stream.
///
/// ```
/// use zflate_core::CompressionLevel;
/// use zflate_deflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, CompressionLevel::DEFAULT).unwrap();
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// assert_eq!(zlib_decompress(&compressed).unwrap(), data);
/// ```
pub fn zlib_compress(input: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    Deflater::new(level).compress_all(input)
}

/// Compress `input` into a zlib stream that references a preset dictionary.
///
/// Only the last [`MAX_DICTIONARY_SIZE`] bytes of the dictionary can be
/// matched against, but the header id covers all of it.
///
/// ```
/// use zflate_core::CompressionLevel;
/// use zflate_deflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict};
///
/// let dict = b"common patterns and shared content";
/// let data = b"This text has common patterns that match the dictionary";
/// let compressed = zlib_compress_with_dict(data, dict, CompressionLevel::DEFAULT).unwrap();
/// assert_eq!(zlib_decompress_with_dict(&compressed, dict).unwrap(), data);
/// ```
pub fn zlib_compress_with_dict(
    input: &[u8],
    dictionary: &[u8],
    level: CompressionLevel,
) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.set_dictionary(dictionary)?;
    deflater.compress_all(input)
}

/// Decompress a zlib stream.
///
/// Bytes after the trailer are ignored. Streams that need a preset
/// dictionary fail with [`ZflateError::InvalidState`]; use
/// [`zlib_decompress_with_dict`] for those.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_all(input)
}

/// Decompress a zlib stream, supplying `dictionary` if the stream asks
/// for one.
///
/// A dictionary whose Adler-32 differs from the header id fails with
/// [`ZflateError::ChecksumMismatch`].
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new();
    inflater.set_input(input);

    let mut output = Vec::new();
    let mut buffer = vec![0u8; 32768];
    loop {
        let n = inflater.inflate(&mut buffer)?;
        output.extend_from_slice(&buffer[..n]);

        if inflater.is_finished() {
            return Ok(output);
        }
        if inflater.is_needing_dictionary() {
            inflater.set_dictionary(dictionary)?;
        } else if n == 0 {
            return Err(ZflateError::unexpected_eof("compressed stream is truncated"));
        }
    }
}

/// The Adler-32 id of the preset dictionary `input` needs, if any.
///
/// ```
/// use zflate_core::{Adler32, CompressionLevel};
/// use zflate_deflate::zlib::{zlib_compress_with_dict, zlib_requires_dictionary};
///
/// let dict = b"test dictionary";
/// let compressed = zlib_compress_with_dict(b"test data", dict, CompressionLevel::DEFAULT).unwrap();
/// assert_eq!(zlib_requires_dictionary(&compressed), Some(Adler32::checksum(dict)));
/// ```
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    ZlibHeader::parse(input).ok().and_then(|header| header.dict_id)
}
