//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zflate_deflate::Inflater;

/// Chunk size for streaming file I/O.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb
}

/// Read a dictionary file if one was given.
pub fn read_dictionary(path: Option<&Path>) -> io::Result<Option<Vec<u8>>> {
    path.map(std::fs::read).transpose()
}

/// Default output path for `compress`: the input with `.zz` appended.
pub fn compressed_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".zz");
    PathBuf::from(name)
}

/// Default output path for `decompress`: strip `.zz`/`.zlib`, else append
/// `.out`.
pub fn decompressed_path(input: &Path) -> PathBuf {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some("zz" | "zlib") => input.with_extension(""),
        _ => {
            let mut name = input.as_os_str().to_owned();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

/// Space saved by compression, in percent.
pub fn space_savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

/// Decompress everything `reader` yields into `sink`, supplying `dict` when
/// the stream asks for it.
///
/// Returns the inflater so callers can report its counters and checksum.
pub fn inflate_to<R: Read>(
    mut reader: zflate_deflate::InflaterReader<R>,
    dict: Option<&[u8]>,
    mut sink: impl FnMut(&[u8]) -> io::Result<()>,
    pb: &ProgressBar,
) -> io::Result<Inflater> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match std::io::Read::read(&mut reader, &mut buf) {
            Ok(0) => break,
            Ok(n) => {
                sink(&buf[..n])?;
                pb.set_position(reader.inflater().total_in());
            }
            Err(e) if reader.inflater().is_needing_dictionary() => match dict {
                Some(dict) => {
                    log::debug!(
                        "supplying dictionary for id {:#010x}",
                        reader.inflater().adler()
                    );
                    reader.inflater_mut().set_dictionary(dict)?;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
    let (inflater, _) = reader.into_parts();
    Ok(inflater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert_eq!(compressed_path(Path::new("a/b.raw")), PathBuf::from("a/b.raw.zz"));
        assert_eq!(decompressed_path(Path::new("a/b.raw.zz")), PathBuf::from("a/b.raw"));
        assert_eq!(decompressed_path(Path::new("b.zlib")), PathBuf::from("b"));
        assert_eq!(decompressed_path(Path::new("b.bin")), PathBuf::from("b.bin.out"));
    }

    #[test]
    fn test_space_savings() {
        assert_eq!(space_savings(0, 10), 0.0);
        assert!((space_savings(200, 50) - 75.0).abs() < 1e-9);
    }
}
