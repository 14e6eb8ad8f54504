//! Edge case tests for DEFLATE and zlib compression.

use zflate_core::{Adler32, CompressionLevel, Compressor, ZflateError};
use zflate_deflate::{
    DeflateConfig, Deflater, Inflater, Strategy, deflate, inflate, zlib_compress, zlib_decompress,
};

fn level(n: u8) -> CompressionLevel {
    CompressionLevel::new(n)
}

/// xorshift bytes, incompressible for our purposes.
fn random_bytes(size: usize, mut seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        data.extend_from_slice(&seed.to_le_bytes());
    }
    data.truncate(size);
    data
}

fn text(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    pattern.iter().copied().cycle().take(size).collect()
}

#[test]
fn test_empty_input() {
    for n in 0..=9 {
        let compressed = deflate(b"", level(n)).unwrap();
        assert!(inflate(&compressed).unwrap().is_empty(), "level {n}");
    }
}

#[test]
fn test_single_byte() {
    let compressed = deflate(b"a", level(6)).unwrap();
    assert_eq!(compressed, [0x4B, 0x04, 0x00]);
    assert_eq!(inflate(&compressed).unwrap(), b"a");
}

#[test]
fn test_hello_reference_stream() {
    let compressed = zlib_compress(b"hello", CompressionLevel::DEFAULT).unwrap();
    assert_eq!(
        compressed,
        [0x78, 0x9C, 0xCB, 0x48, 0xCD, 0xC9, 0xC9, 0x07, 0x00, 0x06, 0x2C, 0x02, 0x15]
    );
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, level(6)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = deflate(&input, level(6)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    let input = vec![42u8; 258 * 10];
    let compressed = deflate(&input, level(9)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_alternating_pattern() {
    let input: Vec<u8> = (0..1000).map(|i| if i % 2 == 0 { b'A' } else { b'B' }).collect();
    let compressed = deflate(&input, level(6)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_large_input() {
    let input = text(1024 * 1024);
    for n in [1, 6, 9] {
        let compressed = zlib_compress(&input, level(n)).unwrap();
        let decompressed = zlib_decompress(&compressed).unwrap();
        assert_eq!(decompressed.len(), input.len());
        assert_eq!(decompressed, input, "level {n}");
    }
}

#[test]
fn test_large_random_input_all_levels() {
    let input = random_bytes(300_000, 0x9E37_79B9_7F4A_7C15);
    for n in 0..=9 {
        let compressed = zlib_compress(&input, level(n)).unwrap();
        assert_eq!(zlib_decompress(&compressed).unwrap(), input, "level {n}");
    }
}

#[test]
fn test_incompressible_size_bound() {
    for size in [1, 1000, 16384, 100_000, 1 << 20] {
        let input = random_bytes(size, size as u64 + 1);
        let bound = size + 5 * (size / 16384 + 2) + 6;
        for n in [0, 1, 6, 9] {
            let compressed = zlib_compress(&input, level(n)).unwrap();
            assert!(
                compressed.len() <= bound,
                "size {size} level {n}: {} > {bound}",
                compressed.len()
            );
        }
    }
}

#[test]
fn test_incremental_pattern() {
    let input: Vec<u8> = (0..=255u8).flat_map(|b| std::iter::repeat_n(b, 10)).collect();
    let compressed = deflate(&input, level(1)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";
    for n in 0..=9 {
        let compressed = deflate(input, level(n)).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), input, "level {n}");
        if n == 0 {
            // One stored block: 1 header byte, 4 length bytes.
            assert_eq!(compressed.len(), input.len() + 5);
        }
    }
}

#[test]
fn test_higher_levels_do_not_lose_to_level_one() {
    let input = text(200_000);
    let fast = zlib_compress(&input, level(1)).unwrap();
    let best = zlib_compress(&input, level(9)).unwrap();
    assert!(best.len() <= fast.len());
}

#[test]
fn test_strategies() {
    let mut input = text(50_000);
    input.extend(random_bytes(10_000, 7));
    input.extend((0..20_000u32).map(|i| (i % 5) as u8));

    for strategy in [Strategy::Default, Strategy::Filtered, Strategy::HuffmanOnly] {
        for n in [1, 6, 9] {
            let config = DeflateConfig::new(level(n)).with_strategy(strategy);
            let compressed = Deflater::with_config(config).compress_all(&input).unwrap();
            assert_eq!(
                zlib_decompress(&compressed).unwrap(),
                input,
                "{strategy:?} level {n}"
            );
        }
    }
}

#[test]
fn test_huffman_only_still_compresses_skewed_data() {
    let input: Vec<u8> = (0..10_000u32).map(|i| b"aaaaaaab"[(i % 8) as usize]).collect();
    let config = DeflateConfig::new(level(6)).with_strategy(Strategy::HuffmanOnly);
    let compressed = Deflater::with_config(config).compress_all(&input).unwrap();
    // No matches, but two symbols fit in very few bits each.
    assert!(compressed.len() < input.len() / 4);
    assert_eq!(zlib_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_binary_data() {
    let input: Vec<u8> = (0..=255).cycle().take(5000).collect();
    let compressed = deflate(&input, level(6)).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
}

#[test]
fn test_long_distance_match() {
    let mut input = random_bytes(32768, 3);
    let pattern = b"PATTERN_TO_MATCH_AT_THE_FAR_END";
    input[..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..].copy_from_slice(pattern);

    for n in [1, 9] {
        let compressed = deflate(&input, level(n)).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), input);
    }
}

#[test]
fn test_utf8_text() {
    let input = "Grüße aus Zürich! 日本語のテキスト。Ελληνικά. ".repeat(200);
    let compressed = zlib_compress(input.as_bytes(), level(6)).unwrap();
    assert_eq!(zlib_decompress(&compressed).unwrap(), input.as_bytes());
}

#[test]
fn test_trailer_bit_flips_are_detected() {
    let input = text(5000);
    let compressed = zlib_compress(&input, level(6)).unwrap();
    let expected = Adler32::checksum(&input);

    for byte in compressed.len() - 4..compressed.len() {
        for bit in 0..8 {
            let mut corrupt = compressed.clone();
            corrupt[byte] ^= 1 << bit;
            match zlib_decompress(&corrupt) {
                Err(ZflateError::ChecksumMismatch { computed, .. }) => {
                    assert_eq!(computed, expected);
                }
                other => panic!("byte {byte} bit {bit}: {other:?}"),
            }
        }
    }
}

#[test]
fn test_corrupt_body_is_an_error() {
    let input = text(5000);
    let compressed = zlib_compress(&input, level(6)).unwrap();
    let mut corrupt = compressed.clone();
    corrupt[compressed.len() / 2] ^= 0x55;
    assert!(zlib_decompress(&corrupt).is_err());
}

#[test]
fn test_deflater_reset_reuse() {
    let first = text(10_000);
    let second = random_bytes(3000, 11);

    let mut deflater = Deflater::new(level(6));
    let a = deflater.compress_all(&first).unwrap();
    deflater.reset();
    let b = deflater.compress_all(&second).unwrap();
    deflater.reset();
    let a_again = deflater.compress_all(&first).unwrap();

    assert_eq!(a, a_again);
    assert_eq!(a, zlib_compress(&first, level(6)).unwrap());
    assert_eq!(b, zlib_compress(&second, level(6)).unwrap());
}

#[test]
fn test_inflater_reset_reuse() {
    let first = zlib_compress(&text(10_000), level(9)).unwrap();
    let second = zlib_compress(b"second stream", level(1)).unwrap();

    let mut inflater = Inflater::new();
    let mut out = vec![0u8; 20_000];
    inflater.set_input(&first);
    let n = inflater.inflate(&mut out).unwrap();
    assert_eq!(&out[..n], &text(10_000)[..]);
    assert!(inflater.is_finished());

    inflater.reset();
    assert_eq!(inflater.total_out(), 0);
    inflater.set_input(&second);
    let n = inflater.inflate(&mut out).unwrap();
    assert_eq!(&out[..n], b"second stream");
    assert!(inflater.is_finished());
}

#[test]
fn test_set_level_mid_stream() {
    let input = text(100_000);
    let mut deflater = Deflater::new(level(0));
    let mut compressed = Vec::new();
    let mut buf = vec![0u8; 4096];

    for (i, chunk) in input.chunks(10_000).enumerate() {
        deflater.set_level(level((i % 10) as u8)).unwrap();
        deflater.set_input(chunk).unwrap();
        loop {
            let n = deflater.deflate(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            compressed.extend_from_slice(&buf[..n]);
        }
    }
    deflater.finish();
    while !deflater.is_finished() {
        let n = deflater.deflate(&mut buf).unwrap();
        compressed.extend_from_slice(&buf[..n]);
    }

    assert_eq!(zlib_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_set_strategy_mid_stream() {
    let input = text(60_000);
    let strategies = [Strategy::Default, Strategy::HuffmanOnly, Strategy::Filtered];
    let mut deflater = Deflater::new(level(6));
    let mut compressed = Vec::new();
    let mut buf = vec![0u8; 4096];

    for (i, chunk) in input.chunks(7_000).enumerate() {
        deflater.set_strategy(strategies[i % strategies.len()]);
        deflater.set_input(chunk).unwrap();
        loop {
            let n = deflater.deflate(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            compressed.extend_from_slice(&buf[..n]);
        }
    }
    deflater.finish();
    while !deflater.is_finished() {
        let n = deflater.deflate(&mut buf).unwrap();
        compressed.extend_from_slice(&buf[..n]);
    }

    assert_eq!(zlib_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_counters() {
    let input = text(70_000);
    let mut deflater = Deflater::new(level(6));
    let compressed = deflater.compress_all(&input).unwrap();
    assert_eq!(deflater.total_in(), input.len() as u64);
    assert_eq!(deflater.total_out(), compressed.len() as u64);
    assert_eq!(deflater.adler(), Adler32::checksum(&input));

    let mut inflater = Inflater::new();
    inflater.set_input(&compressed);
    let mut out = vec![0u8; input.len() + 1];
    let n = inflater.inflate(&mut out).unwrap();
    assert_eq!(n, input.len());
    assert!(inflater.is_finished());
    assert_eq!(inflater.total_out(), input.len() as u64);
    assert_eq!(inflater.total_in(), compressed.len() as u64);
    assert_eq!(inflater.adler(), Adler32::checksum(&input));
}

#[test]
fn test_misuse_is_rejected() {
    let mut deflater = Deflater::new(level(6));
    deflater.set_input(b"data").unwrap();
    let mut buf = [0u8; 64];
    deflater.deflate(&mut buf).unwrap();
    assert!(matches!(
        deflater.set_dictionary(b"too late"),
        Err(ZflateError::InvalidState { .. })
    ));

    deflater.finish();
    assert!(matches!(
        deflater.set_input(b"more"),
        Err(ZflateError::InvalidState { .. })
    ));

    deflater.close();
    assert!(matches!(
        deflater.deflate(&mut buf),
        Err(ZflateError::InvalidState { .. })
    ));

    let mut inflater = Inflater::new();
    assert!(matches!(
        inflater.set_dictionary(b"not asked for"),
        Err(ZflateError::InvalidState { .. })
    ));
}
