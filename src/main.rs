use clap::{Parser, Subcommand};
use orgpack::archive::{detect_intent, pack, unpack, Intent, PackOptions};
use orgpack::codec::{CodecId, DEFAULT_ZSTD_LEVEL};
use orgpack::inspect::peek;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "orgpack",
    about = "The .orgpack asset container CLI",
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Without a subcommand: pack each directory, unpack each archive
    paths: Vec<PathBuf>,
    #[arg(short, long, default_value = "output.pak")]
    output: PathBuf,
    #[arg(short, long, default_value = "none", value_parser = parse_codec)]
    codec: CodecId,
    #[arg(short = 'C', long, default_value = "outputFolder")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory into an archive
    Pack {
        input: PathBuf,
        #[arg(short, long, default_value = "output.pak")]
        output: PathBuf,
        /// Codec: none (default), zstd, lz4
        #[arg(short, long, default_value = "none", value_parser = parse_codec)]
        codec: CodecId,
        /// Zstd compression level
        #[arg(short, long, default_value_t = DEFAULT_ZSTD_LEVEL,
              value_parser = clap::value_parser!(i32).range(1..=22))]
        level: i32,
    },
    /// Unpack an archive into a directory
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = "outputFolder")]
        output_dir: PathBuf,
    },
    /// Show the archive structure without extracting anything
    Peek {
        input: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Some(Commands::Pack { input, output, codec, level }) => {
            run_pack(&input, &output, &PackOptions { codec, level })?;
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Some(Commands::Unpack { input, output_dir }) => {
            run_unpack(&input, &output_dir)?;
        }

        // ── Peek ─────────────────────────────────────────────────────────────
        Some(Commands::Peek { input, json }) => {
            let report = peek(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_tree());
            }
        }

        // ── Auto-detect ──────────────────────────────────────────────────────
        None => {
            let opts = PackOptions { codec: cli.codec, ..PackOptions::default() };
            let mut failed = 0usize;
            for path in &cli.paths {
                let outcome = match detect_intent(path) {
                    Ok(Intent::Pack) => {
                        println!("Auto-packing folder: {}", path.display());
                        run_pack(path, &cli.output, &opts)
                    }
                    Ok(Intent::Unpack) => {
                        println!("Auto-unpacking archive: {}", path.display());
                        run_unpack(path, &cli.output_dir)
                    }
                    Ok(Intent::Skip) => {
                        warn!(path = %path.display(), "not a directory or archive, skipping");
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = outcome {
                    error!(path = %path.display(), error = %e, "failed");
                    failed += 1;
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} path(s) failed", cli.paths.len()).into());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn run_pack(input: &Path, output: &Path, opts: &PackOptions) -> orgpack::Result<()> {
    let summary = pack(input, output, opts)?;
    println!("Packed {} files into {}", summary.files_written, output.display());
    if !summary.skipped.is_empty() {
        println!("Skipped {} unreadable file(s)", summary.skipped.len());
    }
    Ok(())
}

fn run_unpack(input: &Path, output_dir: &Path) -> orgpack::Result<()> {
    let summary = unpack(input, output_dir)?;
    println!("Unpacked {} files to directory: {}", summary.files_extracted, output_dir.display());
    if !summary.skipped.is_empty() {
        println!("Skipped {} entries that could not be extracted", summary.skipped.len());
    }
    Ok(())
}

/// Unknown names and codecs this build cannot run are both rejected here,
/// before any file is touched.
fn parse_codec(s: &str) -> Result<CodecId, String> {
    let id = CodecId::from_name(s)
        .ok_or_else(|| format!("unknown codec '{s}' (expected none, zstd or lz4)"))?;
    id.ensure_available().map_err(|e| e.to_string())?;
    Ok(id)
}
