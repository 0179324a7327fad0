use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::scan::ScanArgs;
use commands::search::SearchArgs;
use commands::show::ShowArgs;

#[derive(Parser)]
#[command(name = "calshift")]
#[command(about = "Relocate calibration map addresses between firmware images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every map of a definition document in a target image
    Scan(ScanArgs),
    /// Resolve one map and print its values in both images
    Show(ShowArgs),
    /// Search a single image for a byte pattern
    Search(SearchArgs),
    /// Dump raw bytes of an image
    Hexdump {
        /// Image file
        #[arg(short, long)]
        file: std::path::PathBuf,
        /// Start offset (hex)
        #[arg(short, long)]
        address: String,
        /// Number of bytes
        #[arg(short, long, default_value = "256")]
        size: usize,
        /// Show the ASCII column
        #[arg(long)]
        ascii: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("calshift=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => commands::scan::run(args),
        Command::Show(args) => commands::show::run(args),
        Command::Search(args) => commands::search::run(args),
        Command::Hexdump {
            file,
            address,
            size,
            ascii,
        } => {
            let address = commands::hex_utils::parse_hex_address(&address)?;
            commands::hexdump::run(&file, address, size, ascii)
        }
    }
}
