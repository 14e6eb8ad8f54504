//! Decompress command implementation.

use crate::utils::{create_progress_bar, decompressed_path, inflate_to, read_dictionary};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use zflate_deflate::{Inflater, InflaterReader};

pub fn cmd_decompress(
    input: &Path,
    output: Option<&Path>,
    raw: bool,
    dict: Option<&Path>,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map_or_else(|| decompressed_path(input), Path::to_path_buf);
    let input_len = std::fs::metadata(input)?.len();
    let dict = read_dictionary(dict)?;

    let mut inflater = if raw { Inflater::raw() } else { Inflater::new() };
    if let (true, Some(dict)) = (raw, &dict) {
        // Raw streams carry no dictionary id; the dictionary goes in up front.
        inflater.set_dictionary(dict)?;
    }
    let reader = InflaterReader::with_inflater(BufReader::new(File::open(input)?), inflater);

    let mut writer = BufWriter::new(File::create(&output)?);
    let pb = create_progress_bar(input_len, progress);
    let inflater = inflate_to(reader, dict.as_deref(), |chunk| writer.write_all(chunk), &pb)?;
    writer.flush()?;
    pb.finish_and_clear();

    println!(
        "{} -> {}: {} -> {} bytes",
        input.display(),
        output.display(),
        inflater.total_in(),
        inflater.total_out()
    );
    if inflater.remaining_input() > 0 {
        log::warn!("ignoring data after the end of the compressed stream");
    }
    Ok(())
}
