//! Output window for DEFLATE decompression.
//!
//! The decoder writes literals and back-reference copies into a circular
//! buffer twice the size of the DEFLATE window. Bytes stay in the buffer
//! until the caller drains them with [`OutputWindow::copy_output`]; they stay
//! referable as history after that, up to [`WINDOW_SIZE`] bytes back.
//!
//! # Example
//!
//! ```
//! use zflate_core::window::OutputWindow;
//!
//! let mut window = OutputWindow::new();
//! window.write_byte(b'a').unwrap();
//! window.write_byte(b'b').unwrap();
//! window.repeat(4, 2).unwrap();
//!
//! let mut out = [0u8; 8];
//! let n = window.copy_output(&mut out);
//! assert_eq!(&out[..n], b"ababab");
//! ```

use crate::bitstream::BitReader;
use crate::error::{Result, ZflateError};

/// Largest back-reference distance allowed by DEFLATE (32 KB).
pub const WINDOW_SIZE: usize = 1 << 15;

/// Buffer capacity: one window of history plus one window of output.
const CAPACITY: usize = WINDOW_SIZE * 2;
const MASK: usize = CAPACITY - 1;

/// Circular decompression output buffer.
#[derive(Debug, Clone)]
pub struct OutputWindow {
    buffer: Box<[u8]>,
    /// Next write position.
    end: usize,
    /// Bytes written but not yet copied out.
    filled: usize,
    /// Bytes that back-references may reach.
    history: usize,
}

impl OutputWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            buffer: vec![0; CAPACITY].into_boxed_slice(),
            end: 0,
            filled: 0,
            history: 0,
        }
    }

    /// Forget all output and history.
    pub fn reset(&mut self) {
        self.end = 0;
        self.filled = 0;
        self.history = 0;
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.buffer[self.end] = byte;
        self.end = (self.end + 1) & MASK;
    }

    #[inline]
    fn commit(&mut self, count: usize) {
        self.filled += count;
        self.history = (self.history + count).min(CAPACITY);
    }

    fn check_space(&self, count: usize) -> Result<()> {
        if count > self.free_space() {
            return Err(ZflateError::window_overflow(count, self.free_space()));
        }
        Ok(())
    }

    /// Append one literal byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.check_space(1)?;
        self.push(byte);
        self.commit(1);
        Ok(())
    }

    /// Append `length` bytes copied from `distance` bytes back.
    ///
    /// The source may overlap the bytes being written, so a distance shorter
    /// than the length repeats a pattern.
    pub fn repeat(&mut self, length: usize, distance: usize) -> Result<()> {
        self.check_space(length)?;
        if distance == 0 || distance > self.history || distance > WINDOW_SIZE {
            return Err(ZflateError::invalid_distance(
                distance,
                self.history.min(WINDOW_SIZE),
            ));
        }

        let mut src = (self.end + CAPACITY - distance) & MASK;
        if distance >= length && src + length <= CAPACITY && self.end + length <= CAPACITY {
            self.buffer.copy_within(src..src + length, self.end);
            self.end = (self.end + length) & MASK;
        } else {
            for _ in 0..length {
                let byte = self.buffer[src];
                self.push(byte);
                src = (src + 1) & MASK;
            }
        }

        self.commit(length);
        Ok(())
    }

    /// Copy up to `length` stored-block bytes from `input`.
    ///
    /// Stops early when the window is full or the input runs dry; returns
    /// the number of bytes copied.
    pub fn copy_stored(&mut self, input: &mut BitReader, length: usize) -> Result<usize> {
        let length = length
            .min(self.free_space())
            .min(input.available_bytes());

        let tail = length.min(CAPACITY - self.end);
        let mut copied = input.copy_bytes(&mut self.buffer[self.end..self.end + tail])?;
        if copied == tail && tail < length {
            copied += input.copy_bytes(&mut self.buffer[..length - tail])?;
        }

        self.end = (self.end + copied) & MASK;
        self.commit(copied);
        Ok(copied)
    }

    /// Load a preset dictionary as history.
    ///
    /// Only the last [`WINDOW_SIZE`] bytes are kept. Nothing becomes
    /// available as output.
    pub fn copy_dict(&mut self, dict: &[u8]) -> Result<()> {
        if self.filled > 0 {
            return Err(ZflateError::invalid_state(
                "dictionary supplied after output was produced",
            ));
        }

        let dict = &dict[dict.len().saturating_sub(WINDOW_SIZE)..];
        for &byte in dict {
            self.push(byte);
        }
        self.history = (self.history + dict.len()).min(CAPACITY);
        Ok(())
    }

    /// Bytes that can still be written before the window is full.
    #[inline]
    pub fn free_space(&self) -> usize {
        CAPACITY - self.filled
    }

    /// Bytes written but not yet copied out.
    #[inline]
    pub fn available(&self) -> usize {
        self.filled
    }

    /// Move up to `output.len()` pending bytes into `output`, oldest first.
    pub fn copy_output(&mut self, output: &mut [u8]) -> usize {
        let n = output.len().min(self.filled);
        let start = (self.end + CAPACITY - self.filled) & MASK;

        let first = n.min(CAPACITY - start);
        output[..first].copy_from_slice(&self.buffer[start..start + first]);
        output[first..n].copy_from_slice(&self.buffer[..n - first]);

        self.filled -= n;
        n
    }
}

impl Default for OutputWindow {
    fn default() -> Self {
        Self::new()
    }
}
