mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keen64_hal::{bank::Variant, layout};
use tracing::Level;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Layout;

#[derive(Parser)]
#[command(name = "savetool")]
#[command(version, about = "keen64 SRAM save image tool", long_about = None)]
struct Cli {
    /// SRAM chip the image belongs to
    #[arg(long, value_enum, default_value_t = Chip::Sram768k)]
    chip: Chip,

    /// Episode whose save table to use (4, 5 or 6)
    #[arg(short, long, default_value_t = 4)]
    episode: u8,

    /// Image has no presence markers in front of each file
    #[arg(long)]
    no_markers: bool,

    /// Show debug output from the storage layer
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Chip {
    /// 256 Kbit, one 32 KiB window
    Sram256k,
    /// 768 Kbit, three banks
    Sram768k,
    /// 1 Mbit, four banks
    Sram1m,
}

#[derive(Subcommand)]
enum Commands {
    /// List the save files and whether each one exists in the image
    List {
        image: PathBuf,
    },

    /// Write a blank image, as a fresh cartridge would read
    Format {
        image: PathBuf,
    },

    /// Create a save file (zero-filled) if it does not exist yet
    Create {
        image: PathBuf,
        name: String,
    },

    /// Copy a save file out of the image
    Export {
        image: PathBuf,
        name: String,

        /// Output file (defaults to the save file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace a save file's contents, zero-padding to its size
    Import {
        image: PathBuf,
        name: String,
        input: PathBuf,
    },
}

fn setup_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .compact()
        .finish()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut variant = match cli.chip {
        Chip::Sram256k => Variant::SRAM_256K,
        Chip::Sram768k => Variant::SRAM_768K,
        Chip::Sram1m => Variant::SRAM_1M,
    };
    if cli.no_markers {
        variant = variant.without_markers();
    }
    let files = layout::episode_files(cli.episode)
        .with_context(|| format!("no save table for episode {}", cli.episode))?;
    let layout = Layout { variant, files };

    match cli.command {
        Commands::List { image } => {
            for file in commands::list(&layout, &image)? {
                println!(
                    "{:<16} {:>6} bytes @ {:#07x}  {}",
                    file.name,
                    file.size,
                    file.start,
                    if file.present { "present" } else { "-" }
                );
            }
        }
        Commands::Format { image } => commands::format(&layout, &image)?,
        Commands::Create { image, name } => commands::create(&layout, &image, &name)?,
        Commands::Export { image, name, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            commands::export(&layout, &image, &name, &output)?;
        }
        Commands::Import { image, name, input } => {
            commands::import(&layout, &image, &name, &input)?;
        }
    }
    Ok(())
}
