//! Adler-32 checksum (RFC 1950).
//!
//! Two running sums modulo 65521: `s1` is one plus the sum of all bytes,
//! `s2` is the sum of every intermediate `s1`. The value is `s2 << 16 | s1`.
//!
//! # Example
//!
//! ```
//! use zflate_core::checksum::Adler32;
//!
//! let mut adler = Adler32::new();
//! adler.update(b"Wikipedia");
//! assert_eq!(adler.value(), 0x11E6_0398);
//! ```

/// Largest prime smaller than 65536.
const MOD_ADLER: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(MOD_ADLER-1) fits in u32.
const NMAX: usize = 5552;

/// Running Adler-32 checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    /// Create a checksum over the empty sequence (value 1).
    pub fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Restore the initial state.
    pub fn reset(&mut self) {
        self.s1 = 1;
        self.s2 = 0;
    }

    /// Fold one byte into the checksum.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.s1 = (self.s1 + u32::from(byte)) % MOD_ADLER;
        self.s2 = (self.s2 + self.s1) % MOD_ADLER;
    }

    /// Fold a run of bytes into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                s1 += u32::from(byte);
                s2 += s1;
            }
            s1 %= MOD_ADLER;
            s2 %= MOD_ADLER;
        }

        self.s1 = s1;
        self.s2 = s2;
    }

    /// Current checksum value.
    #[inline]
    pub fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Compute the checksum of `data` in one call.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn test_empty() {
        assert_eq!(Adler32::new().value(), 1);
        assert_eq!(Adler32::checksum(&[]), 1);
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(Adler32::checksum(b"a"), 0x0062_0062);
        assert_eq!(Adler32::checksum(b"abc"), 0x024D_0127);
        assert_eq!(
            Adler32::checksum(b"The quick brown fox jumps over the lazy dog"),
            0x5BDC_0FDA
        );
    }

    #[test]
    fn test_large_input_matches_bytewise() {
        // Long runs of 0xFF exercise the deferred modulo.
        let data = vec![0xFFu8; 100_000];
        let mut bytewise = Adler32::new();
        for &b in &data {
            bytewise.update_byte(b);
        }
        assert_eq!(Adler32::checksum(&data), bytewise.value());
    }

    #[test]
    fn test_reset() {
        let mut adler = Adler32::new();
        adler.update(b"some data");
        adler.reset();
        assert_eq!(adler, Adler32::new());
    }

    quickcheck! {
        fn prop_chunk_invariant(data: Vec<u8>, split: usize) -> bool {
            let split = if data.is_empty() { 0 } else { split % data.len() };
            let mut chunked = Adler32::new();
            chunked.update(&data[..split]);
            chunked.update(&data[split..]);
            chunked.value() == Adler32::checksum(&data)
        }
    }
}
