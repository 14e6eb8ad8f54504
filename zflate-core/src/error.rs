//! Error types for zflate operations.
//!
//! A single error enum covers I/O failures of the stream adapters, malformed
//! zlib/DEFLATE data seen by the decoder, and API misuse of the streaming
//! state machines.

use std::io;
use thiserror::Error;

/// The main error type for zflate operations.
#[derive(Debug, Error)]
pub enum ZflateError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid zlib stream header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Compression method other than DEFLATE (8).
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The method field from the stream header.
        method: u8,
    },

    /// Adler-32 mismatch on the stream trailer or preset dictionary.
    #[error("Adler-32 mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum carried by the stream.
        expected: u32,
        /// Checksum computed from the data.
        computed: u32,
    },

    /// Bit pattern that is not a valid Huffman code, or a code table that
    /// cannot describe a prefix code.
    #[error("Invalid Huffman code: {message}")]
    InvalidHuffmanCode {
        /// Description of the problem.
        message: String,
    },

    /// Structurally corrupted DEFLATE data.
    #[error("Corrupted data at input byte {offset}: {message}")]
    CorruptedData {
        /// Number of input bytes consumed when the corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Back-reference reaching before the available history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Number of history bytes available.
        history_size: usize,
    },

    /// Write past the free space of the output window.
    #[error("Output window overflow: {requested} bytes requested, {free} free")]
    WindowOverflow {
        /// Number of bytes the write needed.
        requested: usize,
        /// Free space at the time of the write.
        free: usize,
    },

    /// Input ended before the stream was complete.
    #[error("Unexpected end of stream: {message}")]
    UnexpectedEof {
        /// What the decoder was waiting for.
        message: String,
    },

    /// The Huffman tree builder's heap lost its shape.
    #[error("Huffman heap invariant violated")]
    HeapInvariant,

    /// Operation not permitted in the current state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// Argument out of its valid range.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the bad argument.
        message: String,
    },
}

/// Result type alias for zflate operations.
pub type Result<T> = std::result::Result<T, ZflateError>;

impl ZflateError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: u8) -> Self {
        Self::UnsupportedMethod { method }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(message: impl Into<String>) -> Self {
        Self::InvalidHuffmanCode {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a window overflow error.
    pub fn window_overflow(requested: usize, free: usize) -> Self {
        Self::WindowOverflow { requested, free }
    }

    /// Create an unexpected end of stream error.
    pub fn unexpected_eof(message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the content of the compressed stream
    /// rather than by I/O or API misuse.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. }
                | Self::UnsupportedMethod { .. }
                | Self::ChecksumMismatch { .. }
                | Self::InvalidHuffmanCode { .. }
                | Self::CorruptedData { .. }
                | Self::InvalidDistance { .. }
                | Self::WindowOverflow { .. }
                | Self::UnexpectedEof { .. }
        )
    }
}

impl From<ZflateError> for io::Error {
    fn from(err: ZflateError) -> Self {
        match err {
            ZflateError::Io(inner) => inner,
            ZflateError::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            ZflateError::InvalidState { .. } | ZflateError::InvalidArgument { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ZflateError::checksum_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("Adler-32 mismatch"));
        assert!(err.to_string().contains("0x12345678"));

        let err = ZflateError::unsupported_method(15);
        assert!(err.to_string().contains("15"));

        let err = ZflateError::invalid_distance(40000, 32768);
        assert!(err.to_string().contains("40000"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ZflateError = io_err.into();
        assert!(matches!(err, ZflateError::Io(_)));
    }

    #[test]
    fn test_into_io_error_kind() {
        let err: io::Error = ZflateError::corrupted(3, "bad block type").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err: io::Error = ZflateError::unexpected_eof("trailer").into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err: io::Error = ZflateError::invalid_state("finished").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_format_error_classification() {
        assert!(ZflateError::invalid_header("check bits").is_format_error());
        assert!(ZflateError::window_overflow(10, 2).is_format_error());
        assert!(!ZflateError::HeapInvariant.is_format_error());
        assert!(!ZflateError::invalid_argument("level 12").is_format_error());
    }
}
