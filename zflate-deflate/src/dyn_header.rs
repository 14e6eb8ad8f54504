//! Resumable decoder for the header of a dynamic Huffman block.
//!
//! The header (RFC 1951 Section 3.2.7) is the literal/length and distance
//! code counts, the bit-length code, and the run-length coded code lengths of
//! both trees. It may be split across any number of input chunks, so every
//! step records where it stopped.

use crate::huffman::HuffmanTree;
use crate::tables::{BIT_LENGTH_ORDER, BITLEN_CODES, DIST_CODES, END_OF_BLOCK, LITLEN_CODES};
use zflate_core::BitReader;
use zflate_core::error::{Result, ZflateError};

/// Minimum run for symbols 16, 17, 18.
const REP_MIN: [usize; 3] = [3, 3, 11];

/// Extra bits for symbols 16, 17, 18.
const REP_BITS: [u32; 3] = [2, 3, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    LitLenCount,
    DistCount,
    BitLenCount,
    BitLens,
    Lens,
    Repeats,
}

/// Dynamic block header decoder.
#[derive(Debug)]
pub struct DynHeaderDecoder {
    step: Step,
    lit_count: usize,
    dist_count: usize,
    bitlen_count: usize,
    bitlen_lengths: [u8; BITLEN_CODES],
    bitlen_tree: Option<HuffmanTree>,
    /// Literal/length code lengths followed by distance code lengths.
    lengths: [u8; LITLEN_CODES + DIST_CODES],
    /// Next entry of `bitlen_lengths` or `lengths` to fill.
    ptr: usize,
    /// Pending repeat symbol minus 16.
    rep_symbol: usize,
    last_len: u8,
}

impl DynHeaderDecoder {
    /// Create a decoder positioned at the start of a header.
    pub fn new() -> Self {
        Self {
            step: Step::LitLenCount,
            lit_count: 0,
            dist_count: 0,
            bitlen_count: 0,
            bitlen_lengths: [0; BITLEN_CODES],
            bitlen_tree: None,
            lengths: [0; LITLEN_CODES + DIST_CODES],
            ptr: 0,
            rep_symbol: 0,
            last_len: 0,
        }
    }

    fn corrupted(input: &BitReader, message: impl Into<String>) -> ZflateError {
        ZflateError::corrupted(input.bytes_consumed(), message)
    }

    /// Consume header bits from `input`.
    ///
    /// Returns `Ok(true)` once the header is complete, `Ok(false)` when more
    /// input is needed.
    pub fn decode(&mut self, input: &mut BitReader) -> Result<bool> {
        loop {
            match self.step {
                Step::LitLenCount => {
                    let Some(bits) = input.try_get_bits(5) else {
                        return Ok(false);
                    };
                    self.lit_count = bits as usize + 257;
                    if self.lit_count > LITLEN_CODES {
                        return Err(Self::corrupted(
                            input,
                            format!("too many literal/length codes: {}", self.lit_count),
                        ));
                    }
                    self.step = Step::DistCount;
                }
                Step::DistCount => {
                    let Some(bits) = input.try_get_bits(5) else {
                        return Ok(false);
                    };
                    self.dist_count = bits as usize + 1;
                    if self.dist_count > DIST_CODES {
                        return Err(Self::corrupted(
                            input,
                            format!("too many distance codes: {}", self.dist_count),
                        ));
                    }
                    self.step = Step::BitLenCount;
                }
                Step::BitLenCount => {
                    let Some(bits) = input.try_get_bits(4) else {
                        return Ok(false);
                    };
                    self.bitlen_count = bits as usize + 4;
                    self.bitlen_lengths = [0; BITLEN_CODES];
                    self.ptr = 0;
                    self.step = Step::BitLens;
                }
                Step::BitLens => {
                    while self.ptr < self.bitlen_count {
                        let Some(bits) = input.try_get_bits(3) else {
                            return Ok(false);
                        };
                        self.bitlen_lengths[BIT_LENGTH_ORDER[self.ptr]] = bits as u8;
                        self.ptr += 1;
                    }
                    self.bitlen_tree = Some(HuffmanTree::from_code_lengths(&self.bitlen_lengths)?);
                    self.lengths = [0; LITLEN_CODES + DIST_CODES];
                    self.ptr = 0;
                    self.last_len = 0;
                    self.step = Step::Lens;
                }
                Step::Lens => {
                    let total = self.lit_count + self.dist_count;
                    let Some(tree) = self.bitlen_tree.as_ref() else {
                        return Err(ZflateError::invalid_state("bit-length tree missing"));
                    };

                    loop {
                        if self.ptr >= total {
                            return self.finish(input);
                        }
                        let Some(symbol) = tree.decode(input)? else {
                            return Ok(false);
                        };
                        if symbol < 16 {
                            self.lengths[self.ptr] = symbol as u8;
                            self.last_len = symbol as u8;
                            self.ptr += 1;
                            continue;
                        }
                        if symbol == 16 && self.ptr == 0 {
                            return Err(Self::corrupted(input, "repeat of previous length at start"));
                        }
                        if symbol > 16 {
                            self.last_len = 0;
                        }
                        self.rep_symbol = symbol as usize - 16;
                        self.step = Step::Repeats;
                        break;
                    }
                }
                Step::Repeats => {
                    let total = self.lit_count + self.dist_count;
                    let Some(bits) = input.try_get_bits(REP_BITS[self.rep_symbol]) else {
                        return Ok(false);
                    };
                    let count = REP_MIN[self.rep_symbol] + bits as usize;
                    if self.ptr + count > total {
                        return Err(Self::corrupted(input, "code length run overflows the table"));
                    }
                    self.lengths[self.ptr..self.ptr + count].fill(self.last_len);
                    self.ptr += count;
                    self.step = Step::Lens;
                }
            }
        }
    }

    fn finish(&self, input: &BitReader) -> Result<bool> {
        if self.lengths[END_OF_BLOCK as usize] == 0 {
            return Err(Self::corrupted(input, "no code for end of block"));
        }
        Ok(true)
    }

    /// Literal/length tree of a completely decoded header.
    pub fn build_litlen_tree(&self) -> Result<HuffmanTree> {
        HuffmanTree::from_code_lengths(&self.lengths[..self.lit_count])
    }

    /// Distance tree of a completely decoded header.
    pub fn build_dist_tree(&self) -> Result<HuffmanTree> {
        HuffmanTree::from_code_lengths(&self.lengths[self.lit_count..self.lit_count + self.dist_count])
    }
}

impl Default for DynHeaderDecoder {
    fn default() -> Self {
        Self::new()
    }
}
