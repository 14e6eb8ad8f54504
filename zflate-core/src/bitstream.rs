//! Bit-level buffers for the DEFLATE encoder and decoder.
//!
//! [`BitWriter`] is the encoder's pending output: Huffman codes are packed
//! into it and the caller drains finished bytes with [`BitWriter::flush`].
//! [`BitReader`] is the decoder's input: the caller appends compressed bytes
//! with [`BitReader::set_input`] and the decoder peeks and drops bits. When
//! not enough bits are buffered, `peek_bits` returns `None` and consumes
//! nothing, so a decoder can stop and resume on the next input chunk.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits starting at the least significant bit of each byte.
//! Multi-bit values are stored LSB first; Huffman codes are bit-reversed by
//! the encoder before they reach [`BitWriter::write_bits`].
//!
//! # Example
//!
//! ```
//! use zflate_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_bits(0b1100, 4);
//! writer.align_to_byte();
//!
//! let mut out = [0u8; 4];
//! let n = writer.flush(&mut out);
//!
//! let mut reader = BitReader::new();
//! reader.set_input(&out[..n]);
//! assert_eq!(reader.try_get_bits(3), Some(0b101));
//! assert_eq!(reader.try_get_bits(4), Some(0b1100));
//! ```

use crate::error::{Result, ZflateError};

/// Pending output of the encoder.
///
/// Bits accumulate LSB-first; whole bytes move into a byte buffer that the
/// caller drains. Fewer than 8 bits are ever held in the accumulator.
#[derive(Debug, Default)]
pub struct BitWriter {
    /// Finished bytes; `buf[start..]` has not been handed out yet.
    buf: Vec<u8>,
    /// Drain position in `buf`.
    start: usize,
    /// Bit accumulator (LSB-first).
    bit_buf: u64,
    /// Number of valid bits in the accumulator.
    bit_count: u32,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Discard everything, including unflushed bits.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.start = 0;
        self.bit_buf = 0;
        self.bit_count = 0;
    }

    /// Append the low `count` bits of `value`, LSB first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return;
        }

        let mask = (1u64 << count) - 1;
        self.bit_buf |= (u64::from(value) & mask) << self.bit_count;
        self.bit_count += count;

        while self.bit_count >= 8 {
            self.buf.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Append one byte. The writer must be byte aligned.
    #[inline]
    pub fn write_byte(&mut self, value: u8) {
        debug_assert_eq!(self.bit_count, 0, "write_byte on unaligned writer");
        self.buf.push(value);
    }

    /// Append a 16-bit value, little-endian. The writer must be byte aligned.
    pub fn write_short(&mut self, value: u16) {
        debug_assert_eq!(self.bit_count, 0, "write_short on unaligned writer");
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 16-bit value, big-endian. The writer must be byte aligned.
    pub fn write_short_msb(&mut self, value: u16) {
        debug_assert_eq!(self.bit_count, 0, "write_short_msb on unaligned writer");
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes. The writer must be byte aligned.
    pub fn write_block(&mut self, data: &[u8]) {
        debug_assert_eq!(self.bit_count, 0, "write_block on unaligned writer");
        self.buf.extend_from_slice(data);
    }

    /// Pad the accumulator with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            self.buf.push(self.bit_buf as u8);
            self.bit_buf = 0;
            self.bit_count = 0;
        }
    }

    /// Number of bits in the accumulator not yet forming a whole byte.
    #[inline]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Number of whole bytes waiting to be drained.
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Whether every whole byte has been drained.
    ///
    /// Bits still in the accumulator are not counted.
    #[inline]
    pub fn is_flushed(&self) -> bool {
        self.start == self.buf.len()
    }

    /// Move as many pending bytes as fit into `output`.
    ///
    /// Returns the number of bytes written.
    pub fn flush(&mut self, output: &mut [u8]) -> usize {
        let n = output.len().min(self.pending_bytes());
        output[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;

        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }

        n
    }
}

/// Input side of the decoder.
///
/// Holds a private copy of the bytes supplied through
/// [`set_input`](BitReader::set_input) plus a small bit accumulator.
#[derive(Debug, Default)]
pub struct BitReader {
    /// Supplied input; `input[pos..]` has not entered the accumulator.
    input: Vec<u8>,
    /// Read position in `input`.
    pos: usize,
    /// Bit accumulator (LSB-first).
    bit_buf: u32,
    /// Number of valid bits in the accumulator.
    bits_in_buffer: u32,
    /// Bytes moved from `input` into the accumulator or copied out so far.
    bytes_consumed: u64,
}

impl BitReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all input and buffered bits.
    pub fn reset(&mut self) {
        self.input.clear();
        self.pos = 0;
        self.bit_buf = 0;
        self.bits_in_buffer = 0;
        self.bytes_consumed = 0;
    }

    /// Append more compressed bytes.
    pub fn set_input(&mut self, data: &[u8]) {
        if self.pos == self.input.len() {
            self.input.clear();
        } else if self.pos > 0 {
            self.input.drain(..self.pos);
        }
        self.pos = 0;
        self.input.extend_from_slice(data);
    }

    /// Look at the next `count` bits (at most 16) without consuming them.
    ///
    /// Returns `None` when fewer than `count` bits are available; in that
    /// case nothing is consumed.
    #[inline]
    pub fn peek_bits(&mut self, count: u32) -> Option<u32> {
        debug_assert!(count <= 16, "Cannot peek more than 16 bits at once");

        while self.bits_in_buffer < count {
            let &byte = self.input.get(self.pos)?;
            self.bit_buf |= u32::from(byte) << self.bits_in_buffer;
            self.bits_in_buffer += 8;
            self.pos += 1;
            self.bytes_consumed += 1;
        }

        Some(self.bit_buf & ((1u32 << count) - 1))
    }

    /// Consume `count` bits previously made available by `peek_bits`.
    #[inline]
    pub fn drop_bits(&mut self, count: u32) {
        debug_assert!(count <= self.bits_in_buffer);
        self.bit_buf >>= count;
        self.bits_in_buffer -= count;
    }

    /// Read `count` bits (at most 16), or `None` without consuming anything
    /// if not enough input is buffered.
    #[inline]
    pub fn try_get_bits(&mut self, count: u32) -> Option<u32> {
        let bits = self.peek_bits(count)?;
        self.drop_bits(count);
        Some(bits)
    }

    /// Number of bits available to read.
    pub fn available_bits(&self) -> usize {
        self.bits_in_buffer as usize + 8 * (self.input.len() - self.pos)
    }

    /// Number of whole bytes available to read.
    pub fn available_bytes(&self) -> usize {
        (self.bits_in_buffer >> 3) as usize + (self.input.len() - self.pos)
    }

    /// Drop bits up to the next byte boundary.
    pub fn skip_to_byte_boundary(&mut self) {
        let partial = self.bits_in_buffer & 7;
        self.bit_buf >>= partial;
        self.bits_in_buffer -= partial;
    }

    /// Whether every supplied byte has entered the accumulator.
    pub fn is_needing_input(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Number of input bytes read so far, for error reporting.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Copy whole bytes into `output`, as many as are available and fit.
    ///
    /// The reader must be byte aligned.
    pub fn copy_bytes(&mut self, output: &mut [u8]) -> Result<usize> {
        if self.bits_in_buffer & 7 != 0 {
            return Err(ZflateError::invalid_state(
                "byte copy from a reader that is not byte aligned",
            ));
        }

        let mut written = 0;
        while self.bits_in_buffer > 0 && written < output.len() {
            output[written] = self.bit_buf as u8;
            self.bit_buf >>= 8;
            self.bits_in_buffer -= 8;
            written += 1;
        }

        let n = (output.len() - written).min(self.input.len() - self.pos);
        output[written..written + n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        self.bytes_consumed += n as u64;

        Ok(written + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(writer: &mut BitWriter) -> Vec<u8> {
        let mut out = vec![0u8; writer.pending_bytes()];
        let n = writer.flush(&mut out);
        out.truncate(n);
        out
    }

    #[test]
    fn test_bitreader_basic() {
        // 0b10110101 = 0xB5
        let mut reader = BitReader::new();
        reader.set_input(&[0xB5]);

        let expected = [1, 0, 1, 0, 1, 1, 0, 1]; // LSB first
        for bit in expected {
            assert_eq!(reader.try_get_bits(1), Some(bit));
        }
        assert_eq!(reader.try_get_bits(1), None);
    }

    #[test]
    fn test_bitreader_multi_byte() {
        let mut reader = BitReader::new();
        reader.set_input(&[0xFF, 0x00]);

        assert_eq!(reader.try_get_bits(4), Some(0xF));
        assert_eq!(reader.try_get_bits(8), Some(0x0F)); // Crosses byte boundary
        assert_eq!(reader.try_get_bits(4), Some(0x0));
    }

    #[test]
    fn test_bitreader_peek() {
        let mut reader = BitReader::new();
        reader.set_input(&[0xAB]);

        assert_eq!(reader.peek_bits(4), Some(0xB));
        assert_eq!(reader.peek_bits(4), Some(0xB)); // Same value
        reader.drop_bits(4);
        assert_eq!(reader.peek_bits(4), Some(0xA));
    }

    #[test]
    fn test_bitreader_resumes_across_input_chunks() {
        let mut reader = BitReader::new();
        reader.set_input(&[0x34]);
        assert_eq!(reader.try_get_bits(12), None);
        assert_eq!(reader.available_bits(), 8);

        reader.set_input(&[0x12]);
        assert_eq!(reader.try_get_bits(12), Some(0x234));
        assert_eq!(reader.try_get_bits(4), Some(0x1));
        assert!(reader.is_needing_input());
    }

    #[test]
    fn test_bitreader_copy_bytes() {
        let mut reader = BitReader::new();
        reader.set_input(&[0xFF, 0x12, 0x34, 0x56, 0x78]);

        reader.try_get_bits(3);
        assert!(reader.copy_bytes(&mut [0u8; 1]).is_err());
        reader.skip_to_byte_boundary();

        // Pull two bytes into the accumulator, then copy across it.
        assert_eq!(reader.peek_bits(16), Some(0x3412));
        let mut buf = [0u8; 3];
        assert_eq!(reader.copy_bytes(&mut buf).unwrap(), 3);
        assert_eq!(buf, [0x12, 0x34, 0x56]);
        assert_eq!(reader.available_bytes(), 1);
        assert_eq!(reader.bytes_consumed(), 4);
    }

    #[test]
    fn test_bitwriter_basic() {
        let mut writer = BitWriter::new();
        // Write 0b10110101 bit by bit, LSB first
        for bit in [1, 0, 1, 0, 1, 1, 0, 1] {
            writer.write_bits(bit, 1);
        }
        assert_eq!(writer.bit_count(), 0);
        assert_eq!(drain(&mut writer), vec![0xB5]);
        assert!(writer.is_flushed());
    }

    #[test]
    fn test_bitwriter_multi_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b11001, 5);
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(drain(&mut writer), vec![0xCD]);
    }

    #[test]
    fn test_bitwriter_shorts_and_alignment() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1);
        assert_eq!(writer.bit_count(), 1);
        writer.align_to_byte();
        writer.write_short(0x1234);
        writer.write_short_msb(0x1234);
        writer.write_block(&[0xAA]);
        assert_eq!(drain(&mut writer), vec![0x01, 0x34, 0x12, 0x12, 0x34, 0xAA]);
    }

    #[test]
    fn test_bitwriter_partial_flush() {
        let mut writer = BitWriter::new();
        writer.write_block(&[1, 2, 3, 4, 5]);

        let mut out = [0u8; 2];
        assert_eq!(writer.flush(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert!(!writer.is_flushed());
        assert_eq!(writer.pending_bytes(), 3);

        let mut rest = [0u8; 8];
        assert_eq!(writer.flush(&mut rest), 3);
        assert_eq!(&rest[..3], &[3, 4, 5]);
        assert!(writer.is_flushed());
    }

    #[test]
    fn test_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b1111, 4);
        writer.write_bits(0b10, 2);
        writer.write_bits(0x1_2345, 17);
        writer.align_to_byte();
        let bytes = drain(&mut writer);

        let mut reader = BitReader::new();
        reader.set_input(&bytes);
        assert_eq!(reader.try_get_bits(3), Some(0b101));
        assert_eq!(reader.try_get_bits(4), Some(0b1111));
        assert_eq!(reader.try_get_bits(2), Some(0b10));
        assert_eq!(reader.try_get_bits(16), Some(0x2345));
        assert_eq!(reader.try_get_bits(1), Some(1));
    }
}
