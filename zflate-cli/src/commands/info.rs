//! Info command implementation.

use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zflate_deflate::{ZlibHeader, ZlibLevel};

#[derive(Debug, Serialize)]
struct InfoReport {
    file: String,
    size: u64,
    method: &'static str,
    window_size: usize,
    level_hint: &'static str,
    dictionary_id: Option<String>,
    header_size: usize,
}

fn level_hint(level: ZlibLevel) -> &'static str {
    match level {
        ZlibLevel::Fastest => "fastest",
        ZlibLevel::Fast => "fast",
        ZlibLevel::Default => "default",
        ZlibLevel::Maximum => "maximum",
    }
}

pub fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut head = Vec::with_capacity(6);
    File::open(input)?.take(6).read_to_end(&mut head)?;
    let header = ZlibHeader::parse(&head)?;

    let report = InfoReport {
        file: input.display().to_string(),
        size: std::fs::metadata(input)?.len(),
        method: "deflate",
        window_size: header.window_size,
        level_hint: level_hint(header.level),
        dictionary_id: header.dict_id.map(|id| format!("{id:#010x}")),
        header_size: header.size(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("zlib Stream Information");
    println!("=======================");
    println!("File: {}", report.file);
    println!("Size: {} bytes", report.size);
    println!("Method: {}", report.method);
    println!("Window size: {} bytes", report.window_size);
    println!("Level hint: {}", report.level_hint);
    match &report.dictionary_id {
        Some(id) => println!("Preset dictionary: {id}"),
        None => println!("Preset dictionary: none"),
    }
    Ok(())
}
