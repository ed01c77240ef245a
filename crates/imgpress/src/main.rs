//! ImgPress CLI - batch image conversion from the terminal.
//!
//! ImgPress takes files and folders, keeps the images it can convert, and
//! converts them one after another to a target format, quality and size,
//! reporting progress and the space saved.
//!
//! # Usage
//!
//! ```bash
//! # Convert a folder with the first shipped preset
//! imgpress convert ./photos
//!
//! # Pick a preset and override the quality
//! imgpress convert ./photos shot.heic --preset "High-efficiency AVIF" --quality 50
//!
//! # Manage saved presets
//! imgpress presets list
//!
//! # View configuration
//! imgpress config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// ImgPress - batch image conversion with presets.
#[derive(Parser, Debug)]
#[command(name = "imgpress")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert images to another format, quality or size
    Convert(cli::convert::ConvertArgs),

    /// Manage saved conversion presets
    Presets(cli::presets::PresetsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match imgpress_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imgpress config path`."
            );
            imgpress_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("ImgPress v{}", imgpress_core::VERSION);

    match cli.command {
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Presets(args) => cli::presets::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
