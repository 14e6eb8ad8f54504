//! LZ77 match finding and block production for the compressor.
//!
//! Input is copied into a window of twice the DEFLATE window size. When the
//! current position gets close to the end, the upper half is moved down and
//! every stored position is rebased.
//!
//! `head` maps a hash of the next three bytes to the most recent position
//! with that hash; `prev[pos & WINDOW_MASK]` links each position to the
//! previous one with the same hash. Position 0 is never inserted, so a zero
//! link terminates a chain.

use crate::coder::HuffmanCoder;
use crate::config::{
    CompressFunction, HASH_MASK, HASH_SHIFT, HASH_SIZE, LevelConfig, MAX_BLOCK_SIZE, MAX_DIST,
    MAX_MATCH, MIN_LOOKAHEAD, MIN_MATCH, Strategy, TOO_FAR, WINDOW_MASK,
};
use log::trace;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::CompressionLevel;
use zflate_core::window::WINDOW_SIZE;
use zflate_core::{Adler32, BitWriter};

/// Uncompressed bytes of the current block, if they are still in the window.
fn block_data(window: &[u8], block_start: isize, len: usize) -> Option<&[u8]> {
    let start = usize::try_from(block_start).ok()?;
    window.get(start..start + len)
}

/// The compression engine.
#[derive(Debug)]
pub struct Engine {
    window: Vec<u8>,
    head: Vec<u16>,
    prev: Vec<u16>,
    /// Rolling hash of the bytes at `strstart`.
    ins_h: usize,

    match_start: isize,
    match_len: usize,
    /// The lazy matcher holds back the byte before `strstart`.
    prev_available: bool,

    /// Window offset of the first byte not yet flushed in a block. Negative
    /// once that byte has slid out of the window.
    block_start: isize,
    strstart: usize,
    lookahead: usize,

    config: LevelConfig,
    strategy: Strategy,

    input: Vec<u8>,
    input_off: usize,
    total_in: u64,
    adler: Adler32,

    huffman: HuffmanCoder,
}

impl Engine {
    /// Create an engine for `level` and `strategy`.
    pub fn new(level: CompressionLevel, strategy: Strategy) -> Self {
        Self {
            window: vec![0; 2 * WINDOW_SIZE],
            head: vec![0; HASH_SIZE],
            prev: vec![0; WINDOW_SIZE],
            ins_h: 0,
            match_start: 0,
            match_len: MIN_MATCH - 1,
            prev_available: false,
            // Position 0 cannot be a match source, so start at 1.
            block_start: 1,
            strstart: 1,
            lookahead: 0,
            config: LevelConfig::for_level(level),
            strategy,
            input: Vec::new(),
            input_off: 0,
            total_in: 0,
            adler: Adler32::new(),
            huffman: HuffmanCoder::new(),
        }
    }

    /// Compressed output waiting to be drained.
    pub fn pending(&self) -> &BitWriter {
        self.huffman.pending()
    }

    /// Mutable access to the pending output.
    pub fn pending_mut(&mut self) -> &mut BitWriter {
        self.huffman.pending_mut()
    }

    /// Adler-32 of all input and dictionary bytes so far.
    pub fn adler(&self) -> u32 {
        self.adler.value()
    }

    /// Restart the checksum.
    pub fn reset_adler(&mut self) {
        self.adler.reset();
    }

    /// Total input bytes taken into the window.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Change the strategy; takes effect at the next match decision.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Return to the initial state. The pending output is left alone.
    pub fn reset(&mut self) {
        self.huffman.reset();
        self.adler.reset();
        self.block_start = 1;
        self.strstart = 1;
        self.lookahead = 0;
        self.total_in = 0;
        self.prev_available = false;
        self.ins_h = 0;
        self.match_start = 0;
        self.match_len = MIN_MATCH - 1;
        self.head.fill(0);
        self.prev.fill(0);
        self.input.clear();
        self.input_off = 0;
    }

    /// Whether all input handed to [`set_input`](Self::set_input) has been
    /// moved into the window.
    pub fn needs_input(&self) -> bool {
        self.input_off == self.input.len()
    }

    /// Supply new input. Fails if the previous input was not consumed.
    pub fn set_input(&mut self, data: &[u8]) -> Result<()> {
        if !self.needs_input() {
            return Err(ZflateError::invalid_state(
                "previous input was not completely processed",
            ));
        }
        self.input.clear();
        self.input.extend_from_slice(data);
        self.input_off = 0;
        Ok(())
    }

    /// Preload the window with `dict`. Only the last [`MAX_DIST`] bytes are
    /// usable for matches; all of it enters the checksum.
    pub fn set_dictionary(&mut self, dict: &[u8]) {
        self.adler.update(dict);
        if dict.len() < MIN_MATCH {
            return;
        }

        let dict = &dict[dict.len().saturating_sub(MAX_DIST)..];
        self.window[self.strstart..self.strstart + dict.len()].copy_from_slice(dict);

        self.update_hash();
        for _ in 0..dict.len() - 2 {
            self.insert_string();
            self.strstart += 1;
        }
        self.strstart += 2;
        self.block_start = self.strstart as isize;
    }

    /// Switch to the tuning of `level`.
    ///
    /// When the block producer changes, whatever the old one has buffered is
    /// flushed as a non-final block first.
    pub fn set_level(&mut self, level: CompressionLevel) -> Result<()> {
        let config = LevelConfig::for_level(level);

        if config.function != self.config.function {
            match self.config.function {
                CompressFunction::Stored => {
                    if self.strstart as isize > self.block_start {
                        let len = self.block_len();
                        let stored = block_data(&self.window, self.block_start, len)
                            .ok_or_else(|| ZflateError::invalid_state("stored block left the window"))?;
                        self.huffman.flush_stored_block(stored, false);
                        self.block_start = self.strstart as isize;
                    }
                    self.update_hash();
                }
                CompressFunction::Fast => {
                    if self.strstart as isize > self.block_start {
                        self.flush_block(self.block_len(), false)?;
                    }
                }
                CompressFunction::Slow => {
                    if self.prev_available {
                        self.huffman.tally_lit(self.window[self.strstart - 1]);
                    }
                    if self.strstart as isize > self.block_start {
                        self.flush_block(self.block_len(), false)?;
                    }
                    self.prev_available = false;
                    self.match_len = MIN_MATCH - 1;
                }
            }
        }

        self.config = config;
        Ok(())
    }

    /// Run the block producer.
    ///
    /// With `flush` set, everything buffered is emitted once the input is
    /// exhausted; with `finish` set as well, that block is marked final.
    /// Blocks cut while input is still buffered are never final.
    /// Returns whether more progress is possible without new input.
    pub fn deflate(&mut self, flush: bool, finish: bool) -> Result<bool> {
        loop {
            self.fill_window();
            let can_flush = flush && self.needs_input();
            let can_finish = finish && can_flush;
            let progress = match self.config.function {
                CompressFunction::Stored => self.deflate_stored(can_flush, can_finish)?,
                CompressFunction::Fast => self.deflate_fast(can_flush, can_finish)?,
                CompressFunction::Slow => self.deflate_slow(can_flush, can_finish)?,
            };

            if !(self.huffman.pending().is_flushed() && progress) {
                return Ok(progress);
            }
        }
    }

    #[inline]
    fn block_len(&self) -> usize {
        (self.strstart as isize - self.block_start) as usize
    }

    fn flush_block(&mut self, len: usize, last_block: bool) -> Result<()> {
        let stored = block_data(&self.window, self.block_start, len);
        self.huffman.flush_block(stored, last_block)?;
        self.block_start += len as isize;
        Ok(())
    }

    fn fill_window(&mut self) {
        if self.strstart >= WINDOW_SIZE + MAX_DIST {
            self.slide_window();
        }

        if self.lookahead < MIN_LOOKAHEAD && !self.needs_input() {
            let more = (2 * WINDOW_SIZE - self.lookahead - self.strstart)
                .min(self.input.len() - self.input_off);
            let dst = self.strstart + self.lookahead;
            let src = &self.input[self.input_off..self.input_off + more];
            self.window[dst..dst + more].copy_from_slice(src);
            self.adler.update(src);

            self.input_off += more;
            self.total_in += more as u64;
            self.lookahead += more;
        }

        if self.lookahead >= MIN_MATCH {
            self.update_hash();
        }
    }

    #[inline]
    fn update_hash(&mut self) {
        self.ins_h = (usize::from(self.window[self.strstart]) << HASH_SHIFT)
            ^ usize::from(self.window[self.strstart + 1]);
    }

    /// Insert the string at `strstart` and return the previous head of its
    /// chain.
    #[inline]
    fn insert_string(&mut self) -> usize {
        let hash = ((self.ins_h << HASH_SHIFT)
            ^ usize::from(self.window[self.strstart + MIN_MATCH - 1]))
            & HASH_MASK;
        let match_head = self.head[hash];
        self.prev[self.strstart & WINDOW_MASK] = match_head;
        self.head[hash] = self.strstart as u16;
        self.ins_h = hash;
        usize::from(match_head)
    }

    fn slide_window(&mut self) {
        trace!("sliding window at total_in={}", self.total_in);

        self.window.copy_within(WINDOW_SIZE..2 * WINDOW_SIZE, 0);
        self.match_start -= WINDOW_SIZE as isize;
        self.strstart -= WINDOW_SIZE;
        self.block_start -= WINDOW_SIZE as isize;

        let rebase = |pos: &mut u16| {
            *pos = if usize::from(*pos) >= WINDOW_SIZE {
                *pos - WINDOW_SIZE as u16
            } else {
                0
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Search the chain starting at `cur_match` for a match longer than the
    /// current `match_len`. Candidates are visited newest first and only a
    /// strictly longer match replaces the best so far.
    fn find_longest_match(&mut self, mut cur_match: usize) -> bool {
        let scan = self.strstart;
        let max_len = MAX_MATCH.min(self.lookahead);
        let limit = scan.saturating_sub(MAX_DIST);
        let nice_length = self.config.nice_length.min(self.lookahead);
        let mut chain_length = self.config.max_chain;

        self.match_len = self.match_len.max(MIN_MATCH - 1);
        if self.match_len >= max_len {
            return false;
        }

        let window = &self.window;
        let mut best_len = self.match_len;
        let mut scan_end1 = window[scan + best_len - 1];
        let mut scan_end = window[scan + best_len];

        if best_len >= self.config.good_length {
            chain_length >>= 2;
        }

        loop {
            let m = cur_match;
            if window[m + best_len] == scan_end
                && window[m + best_len - 1] == scan_end1
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let len = 2 + window[m + 2..m + max_len]
                    .iter()
                    .zip(&window[scan + 2..scan + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    self.match_start = m as isize;
                    best_len = len;
                    if len >= nice_length {
                        break;
                    }
                    scan_end1 = window[scan + len - 1];
                    scan_end = window[scan + len];
                }
            }

            cur_match = usize::from(self.prev[cur_match & WINDOW_MASK]);
            chain_length = chain_length.saturating_sub(1);
            if cur_match <= limit || chain_length == 0 {
                break;
            }
        }

        self.match_len = best_len;
        best_len >= MIN_MATCH
    }

    fn deflate_stored(&mut self, flush: bool, finish: bool) -> Result<bool> {
        if !flush && self.lookahead == 0 {
            return Ok(false);
        }

        self.strstart += self.lookahead;
        self.lookahead = 0;

        let mut stored_len = self.block_len();
        let block_may_leave =
            self.block_start < WINDOW_SIZE as isize && stored_len >= MAX_DIST;
        if stored_len >= MAX_BLOCK_SIZE || block_may_leave || flush {
            let mut last_block = finish;
            if stored_len > MAX_BLOCK_SIZE {
                stored_len = MAX_BLOCK_SIZE;
                last_block = false;
            }

            let stored = block_data(&self.window, self.block_start, stored_len)
                .ok_or_else(|| ZflateError::invalid_state("stored block left the window"))?;
            self.huffman.flush_stored_block(stored, last_block);
            self.block_start += stored_len as isize;
            return Ok(!(last_block || stored_len == 0));
        }

        Ok(true)
    }

    /// Greedy matching: take the first acceptable match at each position.
    fn deflate_fast(&mut self, flush: bool, finish: bool) -> Result<bool> {
        if self.lookahead < MIN_LOOKAHEAD && !flush {
            return Ok(false);
        }

        while self.lookahead >= MIN_LOOKAHEAD || flush {
            if self.lookahead == 0 {
                self.flush_block(self.block_len(), finish)?;
                return Ok(false);
            }

            if self.strstart > 2 * WINDOW_SIZE - MIN_LOOKAHEAD {
                self.slide_window();
            }

            let mut found = false;
            if self.lookahead >= MIN_MATCH {
                let hash_head = self.insert_string();
                found = hash_head != 0
                    && self.strategy != Strategy::HuffmanOnly
                    && self.strstart - hash_head <= MAX_DIST
                    && self.find_longest_match(hash_head);
            }

            if found {
                let distance = (self.strstart as isize - self.match_start) as usize;
                let full = self.huffman.tally_dist(distance, self.match_len);
                self.lookahead -= self.match_len;

                if self.match_len <= self.config.max_lazy && self.lookahead >= MIN_MATCH {
                    for _ in 1..self.match_len {
                        self.strstart += 1;
                        self.insert_string();
                    }
                    self.strstart += 1;
                } else {
                    self.strstart += self.match_len;
                    if self.lookahead >= MIN_MATCH - 1 {
                        self.update_hash();
                    }
                }
                self.match_len = MIN_MATCH - 1;

                if !full {
                    continue;
                }
            } else {
                self.huffman.tally_lit(self.window[self.strstart]);
                self.strstart += 1;
                self.lookahead -= 1;
            }

            if self.huffman.is_full() {
                let last_block = finish && self.lookahead == 0;
                self.flush_block(self.block_len(), last_block)?;
                return Ok(!last_block);
            }
        }

        Ok(true)
    }

    /// Lazy matching: a match is only taken if the next position does not
    /// start a longer one.
    fn deflate_slow(&mut self, flush: bool, finish: bool) -> Result<bool> {
        if self.lookahead < MIN_LOOKAHEAD && !flush {
            return Ok(false);
        }

        while self.lookahead >= MIN_LOOKAHEAD || flush {
            if self.lookahead == 0 {
                if self.prev_available {
                    self.huffman.tally_lit(self.window[self.strstart - 1]);
                }
                self.prev_available = false;
                self.flush_block(self.block_len(), finish)?;
                return Ok(false);
            }

            if self.strstart >= 2 * WINDOW_SIZE - MIN_LOOKAHEAD {
                self.slide_window();
            }

            let prev_match = self.match_start;
            let prev_len = self.match_len;

            if self.lookahead >= MIN_MATCH {
                let hash_head = self.insert_string();
                if self.strategy != Strategy::HuffmanOnly
                    && hash_head != 0
                    && self.strstart - hash_head <= MAX_DIST
                    && self.find_longest_match(hash_head)
                {
                    let distance = self.strstart as isize - self.match_start;
                    let too_short = self.strategy == Strategy::Filtered
                        || (self.match_len == MIN_MATCH && distance > TOO_FAR as isize);
                    if self.match_len <= 5 && too_short {
                        self.match_len = MIN_MATCH - 1;
                    }
                }
            }

            if prev_len >= MIN_MATCH && self.match_len <= prev_len {
                let distance = (self.strstart as isize - 1 - prev_match) as usize;
                self.huffman.tally_dist(distance, prev_len);

                for _ in 0..prev_len - 2 {
                    self.strstart += 1;
                    self.lookahead -= 1;
                    if self.lookahead >= MIN_MATCH {
                        self.insert_string();
                    }
                }
                self.strstart += 1;
                self.lookahead -= 1;
                self.prev_available = false;
                self.match_len = MIN_MATCH - 1;
            } else {
                if self.prev_available {
                    self.huffman.tally_lit(self.window[self.strstart - 1]);
                }
                self.prev_available = true;
                self.strstart += 1;
                self.lookahead -= 1;
            }

            if self.huffman.is_full() {
                let mut len = self.block_len();
                if self.prev_available {
                    len -= 1;
                }
                let last_block = finish && self.lookahead == 0 && !self.prev_available;
                self.flush_block(len, last_block)?;
                return Ok(!last_block);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(engine: &mut Engine) -> Vec<u8> {
        let pending = engine.pending_mut();
        let mut out = vec![0u8; pending.pending_bytes()];
        let n = pending.flush(&mut out);
        out.truncate(n);
        out
    }

    /// Load `data` at position 1 and insert the first `upto` strings.
    fn engine_at(data: &[u8], upto: usize) -> Engine {
        let mut engine = Engine::new(CompressionLevel::BEST, Strategy::Default);
        engine.set_input(data).unwrap();
        engine.fill_window();
        for _ in 0..upto {
            engine.insert_string();
            engine.strstart += 1;
            engine.lookahead -= 1;
        }
        engine
    }

    #[test]
    fn test_equal_matches_prefer_newest() {
        let data = b"abcdeXabcdeYabcdeZ0123456789";
        let mut engine = engine_at(data, 12);
        let hash_head = engine.insert_string();
        assert_eq!(hash_head, 7);
        assert!(engine.find_longest_match(hash_head));
        assert_eq!(engine.match_len, 5);
        assert_eq!(engine.match_start, 7);
    }

    #[test]
    fn test_longer_older_match_wins() {
        let data = b"abcdefQabcdXabcdefZ0123456789";
        let mut engine = engine_at(data, 12);
        let hash_head = engine.insert_string();
        assert!(engine.find_longest_match(hash_head));
        assert_eq!(engine.match_len, 6);
        assert_eq!(engine.match_start, 1);
    }

    #[test]
    fn test_match_capped_by_lookahead() {
        let data = [7u8; 40];
        let mut engine = engine_at(&data, 1);
        let hash_head = engine.insert_string();
        assert!(engine.find_longest_match(hash_head));
        assert_eq!(engine.match_len, 39);
    }

    #[test]
    fn test_set_dictionary_positions() {
        let dict: Vec<u8> = (0..100u8).collect();
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.set_dictionary(&dict);
        assert_eq!(engine.strstart, 101);
        assert_eq!(engine.block_start, 101);
        assert_eq!(engine.adler(), Adler32::checksum(&dict));
        assert_eq!(&engine.window[1..101], &dict[..]);
    }

    #[test]
    fn test_short_dictionary_only_updates_checksum() {
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.set_dictionary(b"ab");
        assert_eq!(engine.strstart, 1);
        assert_eq!(engine.adler(), Adler32::checksum(b"ab"));
    }

    #[test]
    fn test_slide_window_rebases_positions() {
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.window[WINDOW_SIZE] = 0xAB;
        engine.strstart = WINDOW_SIZE + 10;
        engine.block_start = 5;
        engine.head[0] = 100;
        engine.head[1] = (WINDOW_SIZE + 5) as u16;
        engine.prev[3] = (WINDOW_SIZE + 9) as u16;

        engine.slide_window();

        assert_eq!(engine.window[0], 0xAB);
        assert_eq!(engine.strstart, 10);
        assert_eq!(engine.block_start, 5 - WINDOW_SIZE as isize);
        assert_eq!(engine.head[0], 0);
        assert_eq!(engine.head[1], 5);
        assert_eq!(engine.prev[3], 9);
    }

    #[test]
    fn test_set_input_requires_consumed_input() {
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.set_input(b"abc").unwrap();
        assert!(engine.set_input(b"def").is_err());
        engine.fill_window();
        assert!(engine.needs_input());
        assert!(engine.set_input(b"def").is_ok());
    }

    #[test]
    fn test_stored_level_writes_stored_block() {
        let data = b"hello stored world";
        let mut engine = Engine::new(CompressionLevel::NONE, Strategy::Default);
        engine.set_input(data).unwrap();
        assert!(!engine.deflate(true, true).unwrap());
        engine.pending_mut().align_to_byte();

        let out = drain(&mut engine);
        assert_eq!(out[0], 0x01);
        assert_eq!(u16::from_le_bytes([out[1], out[2]]) as usize, data.len());
        assert_eq!(&out[5..], data);
        assert_eq!(engine.total_in(), data.len() as u64);
    }

    #[test]
    fn test_needs_full_lookahead_without_flush() {
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.set_input(b"short input").unwrap();
        assert!(!engine.deflate(false, false).unwrap());
        assert!(engine.pending().is_flushed());
        assert_eq!(engine.pending().bit_count(), 0);
    }

    #[test]
    fn test_set_level_flushes_old_function() {
        let mut engine = Engine::new(CompressionLevel::NONE, Strategy::Default);
        engine.set_input(b"some bytes to keep").unwrap();
        engine.deflate(false, false).unwrap();
        assert!(engine.pending().is_flushed());

        engine.set_level(CompressionLevel::BEST).unwrap();
        engine.pending_mut().align_to_byte();
        let out = drain(&mut engine);
        // Non-final stored block with the buffered bytes.
        assert_eq!(out[0], 0x00);
        assert_eq!(&out[5..], b"some bytes to keep");
    }

    #[test]
    fn test_reset() {
        let mut engine = Engine::new(CompressionLevel::DEFAULT, Strategy::Default);
        engine.set_input(b"abcabcabc").unwrap();
        engine.deflate(true, true).unwrap();
        engine.reset();
        assert_eq!(engine.total_in(), 0);
        assert_eq!(engine.adler(), 1);
        assert_eq!(engine.strstart, 1);
        assert!(engine.head.iter().all(|&h| h == 0));
    }
}
