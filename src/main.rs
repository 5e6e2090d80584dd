//! Region Cropper
//!
//! Select a rectangular region of a video and export it as a new MP4,
//! optionally resized, with the original audio reattached.
//!
//! # Usage
//!
//! ```bash
//! cropper inspect --input clip.mov --canvas 800x500
//! cropper crop --input clip.mov --rect 100,100,500,400 --width 800
//! cropper crop --input clip.mov --drag 60,90:260,200 --canvas 800x500 --mode square
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use region_cropper::cli::{commands, Cli, Commands};
use region_cropper::utils::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    logging::init_logging(&config.logging)?;
    logging::log_system_info();
    region_cropper::init()?;

    match cli.command {
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(args)?;
        }
        Commands::Crop(args) => {
            info!("Executing crop command");
            commands::crop(args, &config)?;
        }
    }

    Ok(())
}
