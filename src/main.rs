use clap::{Parser, Subcommand};
use amlres::codec::MAX_GZIP_LEVEL;
use amlres::image::{self, PackOptions};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "amlres", about = "Pack and unpack AML_RES! boot-logo images")]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every item as <name>.bmp plus config.json
    Unpack {
        input: PathBuf,
        /// Output directory (default: image path without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build an image from a directory written by `unpack`
    Pack {
        dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Compression level for items marked "gz" in config.json
        #[arg(long, default_value = "6", value_parser = clap::value_parser!(u8).range(0..=MAX_GZIP_LEVEL as i64))]
        gzip_level: u8,
        /// Payload alignment in bytes
        #[arg(long, default_value = "16", value_parser = clap::value_parser!(u32).range(1..))]
        alignment: u32,
    },
    /// Show the image header and item chain
    List {
        input: PathBuf,
    },
    /// Check the data segment CRC-32 against the header
    Verify {
        input: PathBuf,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (_, 0)    => LevelFilter::INFO,
        (_, 1)    => LevelFilter::DEBUG,
        _         => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output } => {
            let out_dir = output.unwrap_or_else(|| image::default_output_dir(&input));
            let sidecar = image::unpack_to_dir(&input, &out_dir)?;
            println!("Unpacked {} item(s) to: {}", sidecar.records.len(), out_dir.display());
        }

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { dir, output, gzip_level, alignment } => {
            let opts = PackOptions { gzip_level, alignment, ..PackOptions::default() };
            let container = image::pack_from_dir(&dir, &output, &opts)?;
            for item in &container.items {
                println!("  {} ({} bytes)", item.entry.name, item.entry.size);
            }
            println!("Created: {}", output.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let container = image::open(&input)?;
            let h = &container.header;
            println!("Image: {}", input.display());
            println!("  crc={:#010x} version={} size={} items={} align={}",
                     h.crc, h.version, h.total_size, h.item_count, h.alignment);
            println!("  {:<32} {:>10} {:>10} {:>6}", "Name", "Start", "Size", "Kind");
            for (item, asset) in container.items.iter().zip(image::describe(&container)) {
                let kind = match asset.record.format {
                    amlres::sidecar::AssetFormat::Gz  => "gz",
                    amlres::sidecar::AssetFormat::Bmp if asset.record.width.is_some() => "bmp",
                    amlres::sidecar::AssetFormat::Bmp => "?",
                };
                println!("  {:<32} {:>#10x} {:>10} {:>6}",
                         item.entry.name, item.entry.start, item.entry.size, kind);
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let header = image::verify(&input)?;
            println!("{}: crc {:#010x} OK ({} items)", input.display(), header.crc, header.item_count);
        }
    }

    Ok(())
}
