//! Streaming DEFLATE compression with optional zlib framing.
//!
//! [`Deflater`] is pull based: hand it input with
//! [`set_input`](Deflater::set_input), then call
//! [`deflate`](Deflater::deflate) with output buffers until it returns 0.
//! [`flush`](Deflater::flush) ends the current block so that everything
//! supplied so far can be decoded; [`finish`](Deflater::finish) ends the
//! stream.
//!
//! ```
//! use zflate_deflate::{Deflater, Inflater};
//! use zflate_core::CompressionLevel;
//!
//! let mut deflater = Deflater::new(CompressionLevel::DEFAULT);
//! deflater.set_input(b"hello hello hello").unwrap();
//! deflater.finish();
//!
//! let mut compressed = vec![0u8; 64];
//! let mut len = 0;
//! while !deflater.is_finished() {
//!     len += deflater.deflate(&mut compressed[len..]).unwrap();
//! }
//!
//! let mut inflater = Inflater::new();
//! inflater.set_input(&compressed[..len]);
//! let mut out = [0u8; 32];
//! let n = inflater.inflate(&mut out).unwrap();
//! assert_eq!(&out[..n], b"hello hello hello");
//! ```

use crate::config::{DeflateConfig, Strategy};
use crate::engine::Engine;
use log::debug;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};

/// Compression method 8 (DEFLATE) with a 32 KB window.
const ZLIB_CMF: u16 = 0x78;

/// Preset dictionary flag in the zlib header.
const PRESET_DICT: u16 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header not written yet.
    Init,
    /// Header not written yet, dictionary loaded.
    SetDict,
    Busy,
    /// Ending the current block, then back to `Busy`.
    Flushing,
    /// Ending the last block, then the trailer.
    Finishing,
    Finished,
    Closed,
}

/// What the caller asked for before the header went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    None,
    Flush,
    Finish,
}

/// DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    engine: Engine,
    config: DeflateConfig,
    state: State,
    request: Request,
    total_out: u64,
}

impl Deflater {
    /// Create a zlib-framed compressor at `level`.
    pub fn new(level: CompressionLevel) -> Self {
        Self::with_config(DeflateConfig::new(level))
    }

    /// Create a compressor that writes bare DEFLATE data.
    pub fn raw(level: CompressionLevel) -> Self {
        Self::with_config(DeflateConfig::new(level).with_raw(true))
    }

    /// Create a compressor from a full configuration.
    pub fn with_config(config: DeflateConfig) -> Self {
        Self {
            engine: Engine::new(config.level, config.strategy),
            config,
            state: State::Init,
            request: Request::None,
            total_out: 0,
        }
    }

    /// Prepare for a new, independent stream with the same settings.
    pub fn reset(&mut self) {
        self.state = State::Init;
        self.request = Request::None;
        self.total_out = 0;
        self.engine.pending_mut().reset();
        self.engine.reset();
    }

    /// Adler-32 of the input consumed so far.
    pub fn adler(&self) -> u32 {
        self.engine.adler()
    }

    /// Input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    /// Output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Current level.
    pub fn level(&self) -> CompressionLevel {
        self.config.level
    }

    /// Whether the trailer has been written and drained.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished && self.engine.pending().is_flushed()
    }

    /// Whether [`set_input`](Self::set_input) may be called.
    pub fn is_needing_input(&self) -> bool {
        self.engine.needs_input()
    }

    /// Supply the next input chunk.
    ///
    /// Fails after [`finish`](Self::finish) and while earlier input has not
    /// been consumed.
    pub fn set_input(&mut self, input: &[u8]) -> Result<()> {
        if self.is_finishing() {
            return Err(ZflateError::invalid_state("finish() already called"));
        }
        if self.state == State::Closed {
            return Err(ZflateError::invalid_state("deflater is closed"));
        }
        self.engine.set_input(input)
    }

    /// End the current block at the next [`deflate`](Self::deflate) so all
    /// input so far becomes decodable.
    pub fn flush(&mut self) {
        match self.state {
            State::Init | State::SetDict => {
                if self.request == Request::None {
                    self.request = Request::Flush;
                }
            }
            State::Busy => self.state = State::Flushing,
            _ => {}
        }
    }

    /// Declare the end of input.
    pub fn finish(&mut self) {
        match self.state {
            State::Init | State::SetDict => self.request = Request::Finish,
            State::Busy | State::Flushing => self.state = State::Finishing,
            _ => {}
        }
    }

    /// Refuse all further use until [`reset`](Self::reset).
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    /// Change the level. Buffered data is flushed first if the block
    /// producer changes.
    pub fn set_level(&mut self, level: CompressionLevel) -> Result<()> {
        if self.config.level != level {
            self.config.level = level;
            self.engine.set_level(level)?;
        }
        Ok(())
    }

    /// Change the strategy.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.config.strategy = strategy;
        self.engine.set_strategy(strategy);
    }

    /// Preload match history. Only valid before the first
    /// [`deflate`](Self::deflate) call.
    pub fn set_dictionary(&mut self, dict: &[u8]) -> Result<()> {
        if self.state != State::Init {
            return Err(ZflateError::invalid_state(
                "dictionary must be set before compression starts",
            ));
        }
        self.state = State::SetDict;
        self.engine.set_dictionary(dict);
        debug!("preset dictionary of {} bytes", dict.len());
        Ok(())
    }

    fn is_finishing(&self) -> bool {
        matches!(self.state, State::Finishing | State::Finished) || self.request == Request::Finish
    }

    fn write_header(&mut self) {
        let with_dict = self.state == State::SetDict;

        if self.config.raw {
            if with_dict {
                self.engine.reset_adler();
            }
        } else {
            let mut header = ZLIB_CMF << 8;
            // Level 0 shares FLEVEL 0 with levels 1 and 2.
            let level_flags = (u16::from(self.config.level.level().saturating_sub(1)) >> 1).min(3);
            header |= level_flags << 6;
            if with_dict {
                header |= PRESET_DICT;
            }
            header += 31 - (header % 31);

            debug!("zlib header {header:#06x}");
            self.engine.pending_mut().write_short_msb(header);
            if with_dict {
                let dict_adler = self.engine.adler();
                self.engine.reset_adler();
                let pending = self.engine.pending_mut();
                pending.write_short_msb((dict_adler >> 16) as u16);
                pending.write_short_msb(dict_adler as u16);
            }
        }

        self.state = match self.request {
            Request::None => State::Busy,
            Request::Flush => State::Flushing,
            Request::Finish => State::Finishing,
        };
        self.request = Request::None;
    }

    /// Compress into `output`, returning the number of bytes written.
    ///
    /// Returns 0 once no more output can be produced without new input (or
    /// after the stream is finished).
    pub fn deflate(&mut self, output: &mut [u8]) -> Result<usize> {
        if self.state == State::Closed {
            return Err(ZflateError::invalid_state("deflater is closed"));
        }
        if matches!(self.state, State::Init | State::SetDict) {
            self.write_header();
        }

        let mut written = 0;
        loop {
            let n = self.engine.pending_mut().flush(&mut output[written..]);
            written += n;
            self.total_out += n as u64;

            if written == output.len() || self.state == State::Finished {
                break;
            }

            let flushing = matches!(self.state, State::Flushing | State::Finishing);
            let finishing = self.state == State::Finishing;
            if self.engine.deflate(flushing, finishing)? {
                continue;
            }

            match self.state {
                State::Busy => return Ok(written),
                State::Flushing => {
                    if self.config.level != CompressionLevel::NONE {
                        // Empty static blocks push the last data bits out
                        // with 8 bits to spare for the decoder.
                        let pending = self.engine.pending_mut();
                        let mut needed_bits = 8 + ((8 - pending.bit_count()) & 7) as i32;
                        while needed_bits > 0 {
                            pending.write_bits(2, 10);
                            needed_bits -= 10;
                        }
                    }
                    self.state = State::Busy;
                }
                State::Finishing => {
                    let adler = self.engine.adler();
                    let pending = self.engine.pending_mut();
                    pending.align_to_byte();
                    if !self.config.raw {
                        pending.write_short_msb((adler >> 16) as u16);
                        pending.write_short_msb(adler as u16);
                    }
                    self.state = State::Finished;
                    debug!(
                        "stream finished: {} bytes in, {} bytes out",
                        self.engine.total_in(),
                        self.total_out + self.engine.pending().pending_bytes() as u64
                    );
                }
                _ => {}
            }
        }

        Ok(written)
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.is_finished() {
            return Ok((0, 0, CompressStatus::Done));
        }

        let mut consumed = 0;
        if !input.is_empty() && self.is_needing_input() && !self.is_finishing() {
            self.set_input(input)?;
            consumed = input.len();
        }

        if consumed == input.len() {
            match flush {
                FlushMode::None => {}
                FlushMode::Sync => self.flush(),
                FlushMode::Finish => self.finish(),
            }
        }

        let produced = self.deflate(output)?;
        let status = if self.is_finished() {
            CompressStatus::Done
        } else if produced == output.len() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        };

        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Deflater::is_finished(self)
    }
}

/// Compress `data` into a raw DEFLATE stream.
pub fn deflate(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    Deflater::raw(level).compress_all(data)
}
