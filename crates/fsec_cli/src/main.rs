use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Frame modes a compressed file on disk can be in — the raw/RLE passthrough
/// framing the core leaves to its caller (see the FSE crate's design notes).
const MODE_RAW: u8 = 0;
const MODE_RLE: u8 = 1;
const MODE_FSE: u8 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compresses a file with the FSE entropy coder
    Compress(CompressArgs),
    /// Decompresses a file produced by `compress`
    Decompress(DecompressArgs),
}

#[derive(Args)]
struct CompressArgs {
    /// Input file to compress
    input: PathBuf,

    /// Output file
    output: Option<PathBuf>,

    /// Table accuracy log; 0 picks one automatically
    #[arg(long, default_value_t = 0)]
    table_log: u8,

    /// Highest symbol value expected in the input; 0 defaults to 255
    #[arg(long, default_value_t = 0)]
    max_symbol_value: u8,
}

#[derive(Args)]
struct DecompressArgs {
    /// Input file to decompress
    input: PathBuf,

    /// Output file
    output: Option<PathBuf>,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let file_appender = tracing_appender::rolling::never("target", "dump.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .without_time()
        .with_level(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .without_time()
        .with_level(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .with(stdout_layer)
        .init();

    match cli.command {
        Commands::Compress(args) => compress_file(args),
        Commands::Decompress(args) => decompress_file(args),
    }
}

fn sibling_path(input: &Path, output: Option<PathBuf>, suffix: &str) -> PathBuf {
    output.unwrap_or_else(|| {
        let name = input
            .file_name()
            .expect("unnamed input file")
            .to_string_lossy()
            .into_owned();
        input.with_file_name(format!("{name}{suffix}"))
    })
}

fn compress_file(args: CompressArgs) -> miette::Result<()> {
    let src = std::fs::read(&args.input).into_diagnostic()?;
    let output = sibling_path(&args.input, args.output, ".fse");

    let mut dst = vec![0u8; src.len() + 64];
    let n = fsec_fse::compress_u8(&mut dst, &src, args.max_symbol_value, args.table_log)
        .into_diagnostic()?;

    let mut file = File::create(&output).into_diagnostic()?;
    file.write_all(&(src.len() as u64).to_le_bytes())
        .into_diagnostic()?;

    match n {
        0 => {
            file.write_all(&[MODE_RAW]).into_diagnostic()?;
            file.write_all(&src).into_diagnostic()?;
            tracing::debug!(bytes = src.len(), "incompressible at this table size, stored raw");
        }
        1 => {
            file.write_all(&[MODE_RLE]).into_diagnostic()?;
            file.write_all(&[src.first().copied().unwrap_or(0)])
                .into_diagnostic()?;
            tracing::debug!(bytes = src.len(), "single-symbol run, stored as RLE");
        }
        n => {
            file.write_all(&[MODE_FSE]).into_diagnostic()?;
            file.write_all(&dst[..n]).into_diagnostic()?;
            tracing::debug!(compressed = n, raw = src.len(), "stored FSE block");
        }
    }

    Ok(())
}

fn decompress_file(args: DecompressArgs) -> miette::Result<()> {
    let packed = std::fs::read(&args.input).into_diagnostic()?;
    let output = sibling_path(&args.input, args.output, ".out");

    if packed.len() < 9 {
        return Err(miette!("truncated frame: missing length/mode header"));
    }

    let (len_bytes, rest) = packed.split_at(8);
    let orig_len = u64::from_le_bytes(len_bytes.try_into().expect("split_at(8) guarantees this")) as usize;
    let (&mode, payload) = rest.split_first().expect("checked len >= 9 above");

    let mut dst = vec![0u8; orig_len];
    match mode {
        MODE_RAW => {
            if payload.len() != dst.len() {
                return Err(miette!(
                    "corrupt frame: raw payload is {} bytes, expected {}",
                    payload.len(),
                    dst.len()
                ));
            }
            dst.copy_from_slice(payload);
        }
        MODE_RLE => dst.fill(payload.first().copied().unwrap_or(0)),
        MODE_FSE => {
            fsec_fse::decompress_u8(&mut dst, payload).into_diagnostic()?;
        }
        other => return Err(miette!("unrecognized frame mode {other}")),
    }

    tracing::debug!(bytes = dst.len(), mode, "decompressed");
    File::create(&output)
        .into_diagnostic()?
        .write_all(&dst)
        .into_diagnostic()?;

    Ok(())
}
