//! zflate CLI - streaming zlib/DEFLATE compression.
//!
//! A Pure Rust tool to compress, decompress, verify and inspect zlib streams
//! and raw DEFLATE data.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{CompressOptions, cmd_compress, cmd_decompress, cmd_info, cmd_test};
use log::LevelFilter;
use std::path::PathBuf;
use zflate_deflate::Strategy;

#[derive(Parser)]
#[command(name = "zflate")]
#[command(author, version, about = "Pure Rust zlib/DEFLATE compressor")]
#[command(long_about = "
zflate compresses and decompresses zlib (RFC 1950) streams and raw DEFLATE
(RFC 1951) data, with optional preset dictionaries.

Examples:
  zflate compress image.raw
  zflate compress -l 9 --strategy filtered scanlines.bin -o scanlines.zz
  zflate compress --dict common.dict message.txt
  zflate decompress image.raw.zz
  zflate decompress --raw --dict common.dict payload.deflate
  zflate test image.raw.zz
  zflate info --json image.raw.zz
")]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (default: input with ".zz" appended)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level, 0 (store) to 9 (best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Match strategy
        #[arg(short, long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Write raw DEFLATE data without the zlib header and trailer
        #[arg(long)]
        raw: bool,

        /// Preset dictionary file
        #[arg(short, long)]
        dict: Option<PathBuf>,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (default: input without ".zz"/".zlib", or with ".out")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input is raw DEFLATE data
        #[arg(long)]
        raw: bool,

        /// Preset dictionary file
        #[arg(short, long)]
        dict: Option<PathBuf>,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decode a file and verify its checksum without writing output
    #[command(alias = "t")]
    Test {
        /// File to test
        input: PathBuf,

        /// Input is raw DEFLATE data
        #[arg(long)]
        raw: bool,

        /// Preset dictionary file
        #[arg(short, long)]
        dict: Option<PathBuf>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Show the zlib header of a file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        input: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

/// Match strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Normal LZ77 matching
    Default,
    /// Prefer literals for short matches (filtered image data)
    Filtered,
    /// Huffman-code literals only
    HuffmanOnly,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            strategy,
            raw,
            dict,
            progress,
        } => cmd_compress(&CompressOptions {
            input,
            output,
            level,
            strategy: strategy.into(),
            raw,
            dict,
            progress,
        }),
        Commands::Decompress {
            input,
            output,
            raw,
            dict,
            progress,
        } => cmd_decompress(&input, output.as_deref(), raw, dict.as_deref(), progress),
        Commands::Test {
            input,
            raw,
            dict,
            json,
        } => cmd_test(&input, raw, dict.as_deref(), json),
        Commands::Info { input, json } => cmd_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
