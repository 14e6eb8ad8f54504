//! Code tables for DEFLATE (RFC 1951).
//!
//! Length and distance symbol mappings shared by the encoder and decoder,
//! the order in which bit-length code lengths are transmitted, and the
//! static ("fixed") Huffman code of block type 1 in both encoder form
//! (bit-reversed codes ready for the bit writer) and decoder form.

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Number of literal/length symbols that may appear in a block.
pub const LITLEN_CODES: usize = 286;

/// Number of distance symbols that may appear in a block.
pub const DIST_CODES: usize = 30;

/// Number of bit-length symbols.
pub const BITLEN_CODES: usize = 19;

/// Order of code length codes in dynamic block header (RFC 1951 Section 3.2.7).
pub const BIT_LENGTH_ORDER: [usize; BITLEN_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length code base values for symbols 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Number of extra bits for length symbols 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values for symbols 0-29.
pub const DISTANCE_BASE: [u16; DIST_CODES] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance symbols 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; DIST_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Reverse the low `length` bits of `code`.
///
/// DEFLATE transmits Huffman codes most significant bit first while the bit
/// writer is LSB-first, so codes are stored reversed.
pub const fn reverse_bits(code: u16, length: u32) -> u16 {
    if length == 0 {
        0
    } else {
        code.reverse_bits() >> (16 - length)
    }
}

/// Static literal/length code length of `symbol` (RFC 1951 Section 3.2.6).
const fn static_litlen_length(symbol: usize) -> u8 {
    match symbol {
        0..=143 => 8,
        144..=255 => 9,
        256..=279 => 7,
        _ => 8,
    }
}

/// Canonical static literal/length code of `symbol`, not reversed.
const fn static_litlen_code(symbol: usize) -> u16 {
    match symbol {
        0..=143 => 0x30 + symbol as u16,
        144..=255 => 0x190 + (symbol as u16 - 144),
        256..=279 => symbol as u16 - 256,
        _ => 0xC0 + (symbol as u16 - 280),
    }
}

const fn build_static_litlen_lengths() -> [u8; 288] {
    let mut lengths = [0u8; 288];
    let mut i = 0;
    while i < 288 {
        lengths[i] = static_litlen_length(i);
        i += 1;
    }
    lengths
}

const fn build_static_litlen_codes() -> [u16; LITLEN_CODES] {
    let mut codes = [0u16; LITLEN_CODES];
    let mut i = 0;
    while i < LITLEN_CODES {
        codes[i] = reverse_bits(static_litlen_code(i), static_litlen_length(i) as u32);
        i += 1;
    }
    codes
}

const fn build_static_dist_codes() -> [u16; DIST_CODES] {
    let mut codes = [0u16; DIST_CODES];
    let mut i = 0;
    while i < DIST_CODES {
        codes[i] = reverse_bits(i as u16, 5);
        i += 1;
    }
    codes
}

/// Static literal/length code lengths, including the two reserved symbols
/// 286 and 287 that complete the code.
pub const STATIC_LITLEN_LENGTHS: [u8; 288] = build_static_litlen_lengths();

/// Static literal/length codes, bit-reversed.
pub const STATIC_LITLEN_CODES: [u16; LITLEN_CODES] = build_static_litlen_codes();

/// Static distance code lengths. Symbols 30 and 31 complete the code.
pub const STATIC_DIST_LENGTHS: [u8; 32] = [5; 32];

/// Static distance codes, bit-reversed.
pub const STATIC_DIST_CODES: [u16; DIST_CODES] = build_static_dist_codes();

/// Map a match length (3-258) to `(symbol, extra bit count, extra value)`.
pub fn length_to_code(length: usize) -> (u16, u32, u32) {
    debug_assert!((3..=258).contains(&length), "Length out of range: {length}");

    let code = match length {
        3..=10 => length - 3 + 257,
        11..=18 => (length - 11) / 2 + 265,
        19..=34 => (length - 19) / 4 + 269,
        35..=66 => (length - 35) / 8 + 273,
        67..=130 => (length - 67) / 16 + 277,
        131..=257 => (length - 131) / 32 + 281,
        _ => 285,
    };

    let idx = code - 257;
    let extra_value = length - LENGTH_BASE[idx] as usize;
    (code as u16, LENGTH_EXTRA_BITS[idx] as u32, extra_value as u32)
}

/// Map a match distance (1-32768) to `(symbol, extra bit count, extra value)`.
pub fn distance_to_code(distance: usize) -> (u16, u32, u32) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "Distance out of range: {distance}"
    );

    // Symbols come in pairs per power of two above 4.
    let code = if distance <= 4 {
        distance - 1
    } else {
        let d = distance - 1;
        let msb = usize::BITS - 1 - d.leading_zeros();
        let second = (d >> (msb - 1)) & 1;
        (2 * msb + second as u32) as usize
    };

    let extra_value = distance - DISTANCE_BASE[code] as usize;
    (code as u16, DISTANCE_EXTRA_BITS[code] as u32, extra_value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_length(code: u16, extra: u32) -> usize {
        LENGTH_BASE[(code - 257) as usize] as usize + extra as usize
    }

    fn decode_distance(code: u16, extra: u32) -> usize {
        DISTANCE_BASE[code as usize] as usize + extra as usize
    }

    #[test]
    fn test_static_litlen_lengths() {
        assert_eq!(STATIC_LITLEN_LENGTHS[0], 8);
        assert_eq!(STATIC_LITLEN_LENGTHS[143], 8);
        assert_eq!(STATIC_LITLEN_LENGTHS[144], 9);
        assert_eq!(STATIC_LITLEN_LENGTHS[255], 9);
        assert_eq!(STATIC_LITLEN_LENGTHS[256], 7); // End of block
        assert_eq!(STATIC_LITLEN_LENGTHS[279], 7);
        assert_eq!(STATIC_LITLEN_LENGTHS[280], 8);
        assert_eq!(STATIC_LITLEN_LENGTHS[287], 8);
    }

    #[test]
    fn test_static_codes_are_reversed() {
        // 'A' (65) is 0x30 + 65 = 0b01110001 in 8 bits.
        assert_eq!(STATIC_LITLEN_CODES[65], 0b1000_1110);
        // End of block is seven zero bits.
        assert_eq!(STATIC_LITLEN_CODES[256], 0);
        // Symbol 144 is 0b110010000 in 9 bits.
        assert_eq!(STATIC_LITLEN_CODES[144], 0b0_0001_0011);
        assert_eq!(STATIC_DIST_CODES[1], 0b10000);
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b101, 3), 0b101);
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101010, 8), 0b01010101);
        assert_eq!(reverse_bits(0x1234, 0), 0);
    }

    #[test]
    fn test_length_to_code_roundtrip() {
        for length in 3..=258 {
            let (code, extra_bits, extra_value) = length_to_code(length);
            assert!(extra_value < (1 << extra_bits));
            assert_eq!(decode_length(code, extra_value), length);
        }
    }

    #[test]
    fn test_distance_to_code_roundtrip() {
        for distance in 1..=32768 {
            let (code, extra_bits, extra_value) = distance_to_code(distance);
            assert!(extra_value < (1 << extra_bits));
            assert_eq!(decode_distance(code, extra_value), distance);
        }
    }

    #[test]
    fn test_specific_codes() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(257), (284, 5, 30));
        assert_eq!(length_to_code(258), (285, 0, 0));

        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(7), (5, 1, 0));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
