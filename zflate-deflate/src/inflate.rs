//! Streaming DEFLATE decompression with optional zlib framing.
//!
//! [`Inflater`] accepts compressed input in arbitrary chunks and produces
//! output into caller buffers. Decoding stops wherever the input runs out,
//! even in the middle of a code, and resumes on the next
//! [`set_input`](Inflater::set_input).
//!
//! It supports all three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes

use crate::config::MAX_MATCH;
use crate::dyn_header::DynHeaderDecoder;
use crate::huffman::{HuffmanTree, fixed_distance_tree, fixed_litlen_tree};
use crate::tables::{
    DIST_CODES, DISTANCE_BASE, DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_BASE, LENGTH_EXTRA_BITS,
};
use log::{debug, trace};
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::{DecompressStatus, Decompressor};
use zflate_core::{Adler32, BitReader, OutputWindow};

/// Compression method 8 (DEFLATE).
const DEFLATED: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Header,
    Dictionary,
    Blocks,
    StoredLen1,
    StoredLen2,
    Stored,
    DynHeader,
    Huffman,
    HuffmanLenBits,
    HuffmanDist,
    HuffmanDistBits,
    Checksum,
    Finished,
}

/// Trees of the block being decoded.
#[derive(Debug)]
enum Trees {
    None,
    Fixed,
    Dynamic {
        litlen: HuffmanTree,
        dist: HuffmanTree,
    },
}

/// DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    mode: Mode,
    raw: bool,
    /// Checksum read from the stream (dictionary id or trailer).
    read_adler: u32,
    needed_bits: u32,
    rep_length: usize,
    rep_dist: usize,
    uncompr_len: usize,
    is_last_block: bool,
    /// A block header has been read.
    started: bool,
    total_out: u64,
    total_supplied: u64,
    input: BitReader,
    window: OutputWindow,
    dyn_header: DynHeaderDecoder,
    trees: Trees,
    adler: Adler32,
}

impl Inflater {
    /// Create a decompressor for zlib-framed input.
    pub fn new() -> Self {
        Self::with_raw(false)
    }

    /// Create a decompressor for bare DEFLATE input.
    pub fn raw() -> Self {
        Self::with_raw(true)
    }

    fn with_raw(raw: bool) -> Self {
        Self {
            mode: if raw { Mode::Blocks } else { Mode::Header },
            raw,
            read_adler: 0,
            needed_bits: 0,
            rep_length: 0,
            rep_dist: 0,
            uncompr_len: 0,
            is_last_block: false,
            started: false,
            total_out: 0,
            total_supplied: 0,
            input: BitReader::new(),
            window: OutputWindow::new(),
            dyn_header: DynHeaderDecoder::new(),
            trees: Trees::None,
            adler: Adler32::new(),
        }
    }

    /// Prepare for a new, independent stream.
    pub fn reset(&mut self) {
        self.mode = if self.raw { Mode::Blocks } else { Mode::Header };
        self.read_adler = 0;
        self.needed_bits = 0;
        self.is_last_block = false;
        self.started = false;
        self.total_out = 0;
        self.total_supplied = 0;
        self.input.reset();
        self.window.reset();
        self.dyn_header = DynHeaderDecoder::new();
        self.trees = Trees::None;
        self.adler.reset();
    }

    /// Append compressed input.
    pub fn set_input(&mut self, data: &[u8]) {
        self.input.set_input(data);
        self.total_supplied += data.len() as u64;
    }

    /// Whether all supplied input has been read.
    pub fn is_needing_input(&self) -> bool {
        self.input.is_needing_input()
    }

    /// Whether decoding is blocked on [`set_dictionary`](Self::set_dictionary).
    pub fn is_needing_dictionary(&self) -> bool {
        self.mode == Mode::Dictionary && self.needed_bits == 0
    }

    /// Whether the stream is complete and all output has been taken.
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Finished && self.window.available() == 0
    }

    /// The dictionary id while one is needed, otherwise the Adler-32 of the
    /// output so far.
    pub fn adler(&self) -> u32 {
        if self.is_needing_dictionary() {
            self.read_adler
        } else {
            self.adler.value()
        }
    }

    /// Output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_supplied - self.remaining_input() as u64
    }

    /// Supplied bytes not yet consumed. After the stream is finished these
    /// are the bytes following it.
    pub fn remaining_input(&self) -> usize {
        self.input.available_bytes()
    }

    /// Supply the preset dictionary.
    ///
    /// For zlib input this is only valid while
    /// [`is_needing_dictionary`](Self::is_needing_dictionary), and the
    /// dictionary must match the id in the header. Raw input accepts a
    /// dictionary before the first block.
    pub fn set_dictionary(&mut self, dict: &[u8]) -> Result<()> {
        if self.raw && self.mode == Mode::Blocks && !self.started {
            self.window.copy_dict(dict)?;
            debug!("raw preset dictionary of {} bytes", dict.len());
            return Ok(());
        }

        if !self.is_needing_dictionary() {
            return Err(ZflateError::invalid_state("dictionary is not needed"));
        }

        self.adler.update(dict);
        if self.adler.value() != self.read_adler {
            let computed = self.adler.value();
            self.adler.reset();
            return Err(ZflateError::checksum_mismatch(self.read_adler, computed));
        }
        self.adler.reset();
        self.window.copy_dict(dict)?;
        self.mode = Mode::Blocks;
        debug!("preset dictionary of {} bytes accepted", dict.len());
        Ok(())
    }

    /// Decompress into `output`, returning the number of bytes written.
    ///
    /// Returns fewer bytes than requested when input runs out, a dictionary
    /// is needed, or the stream ends. An empty `output` still advances
    /// decoding by one step.
    pub fn inflate(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.is_empty() {
            if !self.is_finished() {
                self.decode()?;
            }
            return Ok(0);
        }

        let mut copied = 0;
        loop {
            // Output is withheld while the trailer is read, so "needs input
            // and not finished" always means more output can come.
            if self.mode != Mode::Checksum {
                let more = self.window.copy_output(&mut output[copied..]);
                if more > 0 {
                    self.adler.update(&output[copied..copied + more]);
                    copied += more;
                    self.total_out += more as u64;
                    if copied == output.len() {
                        return Ok(copied);
                    }
                }
            }

            if !(self.decode()? || (self.window.available() > 0 && self.mode != Mode::Checksum)) {
                break;
            }
        }

        Ok(copied)
    }

    fn corrupted(&self, message: impl Into<String>) -> ZflateError {
        ZflateError::corrupted(self.input.bytes_consumed(), message)
    }

    /// Run one decoding step. Returns whether another step may make
    /// progress without new input.
    fn decode(&mut self) -> Result<bool> {
        match self.mode {
            Mode::Header => self.decode_header(),
            Mode::Dictionary => self.decode_dict(),
            Mode::Checksum => self.decode_checksum(),
            Mode::Blocks => self.decode_block_header(),
            Mode::StoredLen1 => {
                let Some(len) = self.input.try_get_bits(16) else {
                    return Ok(false);
                };
                self.uncompr_len = len as usize;
                self.mode = Mode::StoredLen2;
                Ok(true)
            }
            Mode::StoredLen2 => {
                let Some(nlen) = self.input.try_get_bits(16) else {
                    return Ok(false);
                };
                if nlen as usize != self.uncompr_len ^ 0xFFFF {
                    return Err(self.corrupted(format!(
                        "stored block length {} does not match its complement {nlen:#06x}",
                        self.uncompr_len
                    )));
                }
                trace!("stored block of {} bytes", self.uncompr_len);
                self.mode = Mode::Stored;
                Ok(true)
            }
            Mode::Stored => {
                let more = self.window.copy_stored(&mut self.input, self.uncompr_len)?;
                self.uncompr_len -= more;
                if self.uncompr_len == 0 {
                    self.mode = Mode::Blocks;
                    return Ok(true);
                }
                Ok(!self.input.is_needing_input())
            }
            Mode::DynHeader => {
                if !self.dyn_header.decode(&mut self.input)? {
                    return Ok(false);
                }
                let litlen = self.dyn_header.build_litlen_tree()?;
                let dist = self.dyn_header.build_dist_tree()?;
                self.trees = Trees::Dynamic { litlen, dist };
                self.mode = Mode::Huffman;
                self.decode_huffman()
            }
            Mode::Huffman | Mode::HuffmanLenBits | Mode::HuffmanDist | Mode::HuffmanDistBits => {
                self.decode_huffman()
            }
            Mode::Finished => Ok(false),
        }
    }

    fn decode_header(&mut self) -> Result<bool> {
        let Some(bits) = self.input.peek_bits(16) else {
            return Ok(false);
        };
        self.input.drop_bits(16);

        // The header is big-endian.
        let header = (bits as u16).swap_bytes();
        if header % 31 != 0 {
            return Err(ZflateError::invalid_header(format!(
                "header check bits are wrong: {header:#06x}"
            )));
        }
        let method = ((header >> 8) & 0x0F) as u8;
        if u16::from(method) != DEFLATED {
            return Err(ZflateError::unsupported_method(method));
        }
        let cinfo = header >> 12;
        if cinfo > 7 {
            return Err(ZflateError::invalid_header(format!(
                "window size 2^{} exceeds 32 KB",
                cinfo + 8
            )));
        }

        if header & 0x20 == 0 {
            self.mode = Mode::Blocks;
        } else {
            self.mode = Mode::Dictionary;
            self.needed_bits = 32;
        }
        Ok(true)
    }

    /// Read the dictionary id. Always stops: the caller must supply the
    /// dictionary before decoding continues.
    fn decode_dict(&mut self) -> Result<bool> {
        while self.needed_bits > 0 {
            let Some(byte) = self.input.try_get_bits(8) else {
                return Ok(false);
            };
            self.read_adler = (self.read_adler << 8) | byte;
            self.needed_bits -= 8;
        }
        debug!("stream needs dictionary {:#010x}", self.read_adler);
        Ok(false)
    }

    fn decode_checksum(&mut self) -> Result<bool> {
        while self.needed_bits > 0 {
            let Some(byte) = self.input.try_get_bits(8) else {
                return Ok(false);
            };
            self.read_adler = (self.read_adler << 8) | byte;
            self.needed_bits -= 8;
        }

        if self.adler.value() != self.read_adler {
            return Err(ZflateError::checksum_mismatch(
                self.read_adler,
                self.adler.value(),
            ));
        }
        self.mode = Mode::Finished;
        Ok(false)
    }

    fn decode_block_header(&mut self) -> Result<bool> {
        if self.is_last_block {
            if self.raw {
                self.mode = Mode::Finished;
                return Ok(false);
            }
            // The trailer covers all output, so it is checked only once
            // everything has been handed out.
            if self.window.available() > 0 {
                return Ok(false);
            }
            self.input.skip_to_byte_boundary();
            self.needed_bits = 32;
            self.read_adler = 0;
            self.mode = Mode::Checksum;
            return Ok(true);
        }

        let Some(header) = self.input.try_get_bits(3) else {
            return Ok(false);
        };
        self.started = true;
        if header & 1 != 0 {
            self.is_last_block = true;
        }

        match header >> 1 {
            0 => {
                self.input.skip_to_byte_boundary();
                self.mode = Mode::StoredLen1;
            }
            1 => {
                trace!("static block, last={}", self.is_last_block);
                self.trees = Trees::Fixed;
                self.mode = Mode::Huffman;
            }
            2 => {
                trace!("dynamic block, last={}", self.is_last_block);
                self.dyn_header = DynHeaderDecoder::new();
                self.mode = Mode::DynHeader;
            }
            block_type => {
                return Err(self.corrupted(format!("unknown block type {block_type}")));
            }
        }
        Ok(true)
    }

    /// Decode literals and matches while the window has room for a
    /// maximum-length match.
    fn decode_huffman(&mut self) -> Result<bool> {
        let (litlen, dist): (&HuffmanTree, &HuffmanTree) = match &self.trees {
            Trees::Fixed => (fixed_litlen_tree(), fixed_distance_tree()),
            Trees::Dynamic { litlen, dist } => (litlen, dist),
            Trees::None => return Err(ZflateError::invalid_state("no Huffman trees for block")),
        };

        let mut free = self.window.free_space();
        while free >= MAX_MATCH {
            match self.mode {
                Mode::Huffman => {
                    let Some(symbol) = litlen.decode(&mut self.input)? else {
                        return Ok(false);
                    };
                    if symbol < END_OF_BLOCK {
                        self.window.write_byte(symbol as u8)?;
                        free -= 1;
                        continue;
                    }
                    if symbol == END_OF_BLOCK {
                        self.mode = Mode::Blocks;
                        return Ok(true);
                    }

                    let index = usize::from(symbol - END_OF_BLOCK - 1);
                    if index >= LENGTH_BASE.len() {
                        return Err(ZflateError::corrupted(
                            self.input.bytes_consumed(),
                            format!("invalid literal/length symbol {symbol}"),
                        ));
                    }
                    self.rep_length = usize::from(LENGTH_BASE[index]);
                    self.needed_bits = u32::from(LENGTH_EXTRA_BITS[index]);
                    self.mode = Mode::HuffmanLenBits;
                }
                Mode::HuffmanLenBits => {
                    if self.needed_bits > 0 {
                        let Some(extra) = self.input.try_get_bits(self.needed_bits) else {
                            return Ok(false);
                        };
                        self.rep_length += extra as usize;
                    }
                    self.mode = Mode::HuffmanDist;
                }
                Mode::HuffmanDist => {
                    let Some(symbol) = dist.decode(&mut self.input)? else {
                        return Ok(false);
                    };
                    let symbol = usize::from(symbol);
                    if symbol >= DIST_CODES {
                        return Err(ZflateError::corrupted(
                            self.input.bytes_consumed(),
                            format!("invalid distance symbol {symbol}"),
                        ));
                    }
                    self.rep_dist = usize::from(DISTANCE_BASE[symbol]);
                    self.needed_bits = u32::from(DISTANCE_EXTRA_BITS[symbol]);
                    self.mode = Mode::HuffmanDistBits;
                }
                Mode::HuffmanDistBits => {
                    if self.needed_bits > 0 {
                        let Some(extra) = self.input.try_get_bits(self.needed_bits) else {
                            return Ok(false);
                        };
                        self.rep_dist += extra as usize;
                    }
                    self.window.repeat(self.rep_length, self.rep_dist)?;
                    free -= self.rep_length;
                    self.mode = Mode::Huffman;
                }
                _ => return Err(ZflateError::invalid_state("not inside a Huffman block")),
            }
        }

        Ok(true)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        // Everything handed over is buffered, so all of it counts as consumed.
        self.set_input(input);
        let produced = self.inflate(output)?;

        let status = if self.is_finished() {
            DecompressStatus::Done
        } else if self.is_needing_dictionary() {
            DecompressStatus::NeedsDictionary
        } else if produced == output.len() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::NeedsInput
        };

        Ok((input.len(), produced, status))
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Inflater::is_finished(self)
    }
}

/// Decompress a raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::raw().decompress_all(data)
}
