//! Compressor configuration: engine constants, per-level tuning, strategy.

use zflate_core::traits::CompressionLevel;
use zflate_core::window::WINDOW_SIZE;

/// Shortest match the engine emits.
pub const MIN_MATCH: usize = 3;

/// Longest match DEFLATE can encode.
pub const MAX_MATCH: usize = 258;

/// Lookahead kept in front of the current position so a full-length match
/// and the next hash can always be evaluated.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Farthest back a match may start.
pub const MAX_DIST: usize = WINDOW_SIZE - MIN_LOOKAHEAD;

/// Mask for positions inside one window.
pub const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Memory level controlling the hash and tally sizes.
pub const MEM_LEVEL: u32 = 8;

/// Bits of the rolling hash.
pub const HASH_BITS: u32 = MEM_LEVEL + 7;

/// Number of hash chain heads.
pub const HASH_SIZE: usize = 1 << HASH_BITS;

/// Mask applied to the rolling hash.
pub const HASH_MASK: usize = HASH_SIZE - 1;

/// Shift applied per byte so that a hash covers exactly `MIN_MATCH` bytes.
pub const HASH_SHIFT: u32 = (HASH_BITS + MIN_MATCH as u32 - 1) / MIN_MATCH as u32;

/// Literal/match records buffered per block.
pub const TALLY_BUFFER_SIZE: usize = 1 << (MEM_LEVEL + 6);

/// Nominal size of the pending output buffer.
pub const PENDING_BUF_SIZE: usize = 1 << (MEM_LEVEL + 8);

/// Largest stored block the engine emits.
pub const MAX_BLOCK_SIZE: usize = if PENDING_BUF_SIZE - 5 < 65535 {
    PENDING_BUF_SIZE - 5
} else {
    65535
};

/// Length-3 matches farther back than this are emitted as literals by the
/// lazy matcher.
pub const TOO_FAR: usize = 4096;

/// Which block producer the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressFunction {
    /// Stored blocks only.
    Stored,
    /// Greedy matching.
    Fast,
    /// Lazy matching.
    Slow,
}

/// Match finder tuning for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Quarter the chain budget once a match at least this long is found.
    pub good_length: usize,
    /// Greedy: insert all positions of matches up to this length.
    /// Lazy: don't search for a better match once one this long is found.
    pub max_lazy: usize,
    /// Stop searching once a match this long is found.
    pub nice_length: usize,
    /// Maximum hash chain candidates examined per search.
    pub max_chain: usize,
    /// Block producer.
    pub function: CompressFunction,
}

impl LevelConfig {
    const fn new(
        good_length: usize,
        max_lazy: usize,
        nice_length: usize,
        max_chain: usize,
        function: CompressFunction,
    ) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            function,
        }
    }

    /// Tuning for `level`.
    pub fn for_level(level: CompressionLevel) -> Self {
        LEVELS[level.level() as usize]
    }
}

const LEVELS: [LevelConfig; 10] = {
    use CompressFunction::{Fast, Slow, Stored};
    [
        LevelConfig::new(0, 0, 0, 0, Stored),
        LevelConfig::new(4, 4, 8, 4, Fast),
        LevelConfig::new(4, 5, 16, 8, Fast),
        LevelConfig::new(4, 6, 32, 32, Fast),
        LevelConfig::new(4, 4, 16, 16, Fast),
        LevelConfig::new(8, 16, 32, 32, Slow),
        LevelConfig::new(8, 16, 128, 128, Slow),
        LevelConfig::new(8, 32, 128, 256, Slow),
        LevelConfig::new(32, 128, 258, 1024, Slow),
        LevelConfig::new(32, 258, 258, 4096, Slow),
    ]
};

/// Match selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Normal LZ77 matching.
    #[default]
    Default,
    /// Skip short matches; suits filtered image rows with small noisy values.
    Filtered,
    /// No matching at all, Huffman-code every byte as a literal.
    HuffmanOnly,
}

/// Deflater settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeflateConfig {
    /// Compression level.
    pub level: CompressionLevel,
    /// Match strategy.
    pub strategy: Strategy,
    /// Omit the zlib header and Adler-32 trailer.
    pub raw: bool,
}

impl DeflateConfig {
    /// zlib-framed stream at `level`.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Choose raw DEFLATE output.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_constants() {
        assert_eq!(MIN_LOOKAHEAD, 262);
        assert_eq!(MAX_DIST, 32506);
        assert_eq!(HASH_SIZE, 32768);
        assert_eq!(HASH_SHIFT, 5);
        assert_eq!(TALLY_BUFFER_SIZE, 16384);
        assert_eq!(MAX_BLOCK_SIZE, 65531);
    }

    #[test]
    fn test_level_table() {
        let stored = LevelConfig::for_level(CompressionLevel::NONE);
        assert_eq!(stored.function, CompressFunction::Stored);

        let fast = LevelConfig::for_level(CompressionLevel::new(3));
        assert_eq!(fast.function, CompressFunction::Fast);
        assert_eq!(fast.max_chain, 32);

        for level in 1..=9 {
            let expected = if level <= 4 { CompressFunction::Fast } else { CompressFunction::Slow };
            let config = LevelConfig::for_level(CompressionLevel::new(level));
            assert_eq!(config.function, expected, "level {level}");
        }

        let best = LevelConfig::for_level(CompressionLevel::BEST);
        assert_eq!(best.function, CompressFunction::Slow);
        assert_eq!(best.nice_length, MAX_MATCH);
        assert_eq!(best.max_chain, 4096);
    }

    #[test]
    fn test_config_builder() {
        let config = DeflateConfig::new(CompressionLevel::BEST)
            .with_strategy(Strategy::Filtered)
            .with_raw(true);
        assert_eq!(config.level, CompressionLevel::BEST);
        assert_eq!(config.strategy, Strategy::Filtered);
        assert!(config.raw);

        let default = DeflateConfig::default();
        assert_eq!(default.level, CompressionLevel::DEFAULT);
        assert!(!default.raw);
    }
}
