//! Compress command implementation.

use crate::utils::{CHUNK_SIZE, compressed_path, create_progress_bar, read_dictionary, space_savings};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use zflate_core::CompressionLevel;
use zflate_deflate::{DeflateConfig, Deflater, DeflaterWriter, Strategy};

/// Settings for `zflate compress`.
pub struct CompressOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub level: u8,
    pub strategy: Strategy,
    pub raw: bool,
    pub dict: Option<PathBuf>,
    pub progress: bool,
}

pub fn cmd_compress(opts: &CompressOptions) -> Result<(), Box<dyn std::error::Error>> {
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| compressed_path(&opts.input));
    let input_len = std::fs::metadata(&opts.input)?.len();
    let mut reader = BufReader::new(File::open(&opts.input)?);

    let config = DeflateConfig::new(CompressionLevel::checked(opts.level)?)
        .with_strategy(opts.strategy)
        .with_raw(opts.raw);
    let mut deflater = Deflater::with_config(config);
    if let Some(dict) = read_dictionary(opts.dict.as_deref())? {
        deflater.set_dictionary(&dict)?;
    }

    let mut writer = DeflaterWriter::with_deflater(BufWriter::new(File::create(&output)?), deflater);
    let pb = create_progress_bar(input_len, opts.progress);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        pb.inc(n as u64);
    }
    let adler = writer.deflater().adler();
    writer.finish()?.flush()?;
    pb.finish_and_clear();

    let output_len = std::fs::metadata(&output)?.len();
    println!(
        "{} -> {}: {} -> {} bytes ({:.1}% saved)",
        opts.input.display(),
        output.display(),
        input_len,
        output_len,
        space_savings(input_len, output_len)
    );
    if !opts.raw {
        log::debug!("Adler-32 {adler:#010x}");
    }
    Ok(())
}
