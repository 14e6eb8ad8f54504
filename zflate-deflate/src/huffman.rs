//! Huffman decoding for DEFLATE decompression.
//!
//! DEFLATE uses canonical Huffman codes, where codes of the same length are
//! assigned consecutive values in symbol order, so a tree is fully described
//! by the code length of each symbol.
//!
//! Decoding is resumable: when the reader does not hold enough bits for the
//! next code, [`HuffmanTree::decode`] returns `Ok(None)` without consuming
//! anything.

use crate::tables::{STATIC_DIST_LENGTHS, STATIC_LITLEN_LENGTHS};
use std::sync::OnceLock;
use zflate_core::BitReader;
use zflate_core::error::{Result, ZflateError};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// A Huffman tree for decoding.
///
/// Codes up to `FAST_BITS` long are resolved with one table lookup; longer
/// codes are walked one bit at a time against the canonical code ranges.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    /// `(symbol, code length)` indexed by the next `fast_bits` input bits.
    /// A length of 0 means the code is longer or unused.
    fast_table: Vec<(u16, u8)>,
    fast_bits: u32,
    max_code_length: u32,
    /// Symbols sorted by (code length, symbol).
    symbols: Vec<u16>,
    /// First canonical code of each length.
    first_code: [u32; MAX_CODE_LENGTH + 1],
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Index into `symbols` of the first code of each length.
    offsets: [u16; MAX_CODE_LENGTH + 1],
}

impl HuffmanTree {
    /// Number of bits for fast lookup table.
    const FAST_BITS: u32 = 9;

    /// Build a Huffman tree from code lengths.
    ///
    /// `code_lengths[i]` is the bit length for symbol `i`; 0 means unused.
    /// Over-subscribed codes are rejected. Incomplete codes are accepted and
    /// fail only if an unused bit pattern is actually decoded.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.is_empty() {
            return Err(ZflateError::invalid_huffman("empty code length table"));
        }

        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in code_lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(ZflateError::invalid_huffman(format!(
                    "code length {len} exceeds maximum {MAX_CODE_LENGTH}"
                )));
            }
            counts[len as usize] += 1;
        }

        let mut left: i32 = 1;
        for &count in &counts[1..] {
            left = (left << 1) - i32::from(count);
            if left < 0 {
                return Err(ZflateError::invalid_huffman("over-subscribed code lengths"));
            }
        }

        Ok(Self::build(code_lengths))
    }

    /// Build without validation. Callers guarantee a code that is not
    /// over-subscribed and has lengths of at most 15.
    fn build(code_lengths: &[u8]) -> Self {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in code_lengths {
            counts[len as usize] += 1;
        }
        counts[0] = 0;

        let max_code_length = (1..=MAX_CODE_LENGTH)
            .rev()
            .find(|&len| counts[len] > 0)
            .unwrap_or(0) as u32;

        let mut first_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut offsets = [0u16; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        let mut offset = 0u16;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + u32::from(counts[len - 1])) << 1;
            first_code[len] = code;
            offsets[len] = offset;
            offset += counts[len];
        }

        let mut symbols = vec![0u16; offset as usize];
        let mut next = offsets;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                symbols[next[len as usize] as usize] = symbol as u16;
                next[len as usize] += 1;
            }
        }

        let fast_bits = Self::FAST_BITS.min(max_code_length.max(1));
        let mut fast_table = vec![(0u16, 0u8); 1 << fast_bits];
        for len in 1..=fast_bits as usize {
            for i in 0..counts[len] {
                let symbol = symbols[(offsets[len] + i) as usize];
                let code = Self::reverse(first_code[len] + u32::from(i), len as u32);
                let mut index = code as usize;
                while index < fast_table.len() {
                    fast_table[index] = (symbol, len as u8);
                    index += 1 << len;
                }
            }
        }

        Self {
            fast_table,
            fast_bits,
            max_code_length,
            symbols,
            first_code,
            counts,
            offsets,
        }
    }

    fn reverse(code: u32, length: u32) -> u32 {
        code.reverse_bits() >> (32 - length)
    }

    /// Largest code length in use, 0 for an empty code.
    pub fn max_code_length(&self) -> u32 {
        self.max_code_length
    }

    /// Decode one symbol.
    ///
    /// Returns `Ok(None)` if more input is needed; nothing is consumed then.
    #[inline]
    pub fn decode(&self, input: &mut BitReader) -> Result<Option<u16>> {
        if let Some(bits) = input.peek_bits(self.fast_bits) {
            let (symbol, len) = self.fast_table[bits as usize];
            if len > 0 {
                input.drop_bits(u32::from(len));
                return Ok(Some(symbol));
            }
        }

        self.decode_slow(input)
    }

    /// Walk the canonical code ranges one bit at a time.
    fn decode_slow(&self, input: &mut BitReader) -> Result<Option<u16>> {
        let mut code = 0u32;

        for len in 1..=self.max_code_length {
            let Some(bits) = input.peek_bits(len) else {
                return Ok(None);
            };
            code = (code << 1) | ((bits >> (len - 1)) & 1);

            let len = len as usize;
            let index = code.wrapping_sub(self.first_code[len]);
            if index < u32::from(self.counts[len]) {
                input.drop_bits(len as u32);
                let symbol = self.symbols[self.offsets[len] as usize + index as usize];
                return Ok(Some(symbol));
            }
        }

        Err(ZflateError::corrupted(
            input.bytes_consumed(),
            "bit pattern matches no Huffman code",
        ))
    }
}

/// The static literal/length tree of block type 1.
pub fn fixed_litlen_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::build(&STATIC_LITLEN_LENGTHS))
}

/// The static distance tree of block type 1.
pub fn fixed_distance_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::build(&STATIC_DIST_LENGTHS))
}
