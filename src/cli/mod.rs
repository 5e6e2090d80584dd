//! CLI module for the region cropper
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::CropperConfig;
use crate::domain::model::OverwritePolicy;
use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

/// Region Cropper
///
/// Select a rectangular region of a video and export it as a new MP4,
/// optionally resized, with the original audio reattached.
#[derive(Parser, Debug)]
#[command(name = "cropper")]
#[command(about = "Region Cropper - crop a region out of a video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file
    #[arg(long, global = true, env = "CROPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show video properties and, with a canvas, the preview fit
    Inspect(args::InspectArgs),
    /// Crop a region out of a video
    Crop(args::CropArgs),
}

impl Cli {
    /// Configuration with precedence CLI flags > environment > file > defaults
    pub fn resolve_config(&self) -> Result<CropperConfig> {
        let mut config = CropperConfig::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(level) = &self.log_level {
            config.logging.level = LogLevel::parse(level)?;
        }
        if let Some(format) = &self.log_format {
            config.logging.format = LogFormat::parse(format)?;
        }

        if let Commands::Crop(args) = &self.command {
            if let Some(policy) = &args.overwrite {
                config.output.overwrite = OverwritePolicy::parse(policy)?;
            }
            if let Some(crf) = args.crf {
                config.encoder.crf = crf;
            }
            if let Some(preset) = &args.preset {
                config.encoder.preset = preset.clone();
            }
            if let Some(threads) = args.threads {
                config.encoder.threads = threads;
            }
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_crop_with_rect() {
        let cli = Cli::try_parse_from([
            "cropper", "crop", "--input", "in.mp4", "--rect", "0,0,400,300", "--width", "800",
        ])
        .unwrap();
        match cli.command {
            Commands::Crop(args) => {
                assert_eq!(args.rect.as_deref(), Some("0,0,400,300"));
                assert_eq!(args.width.as_deref(), Some("800"));
                assert_eq!(args.mode, "free");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rect_and_drag_conflict() {
        let result = Cli::try_parse_from([
            "cropper", "crop", "--input", "in.mp4", "--rect", "0,0,4,4", "--drag", "1,1:5,5", "--canvas", "800x500",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_crf_range_is_enforced() {
        let result = Cli::try_parse_from(["cropper", "crop", "--input", "in.mp4", "--rect", "0,0,4,4", "--crf", "60"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "cropper",
            "--log-level",
            "debug",
            "crop",
            "--input",
            "in.mp4",
            "--rect",
            "0,0,4,4",
            "--overwrite",
            "rename",
            "--crf",
            "28",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.output.overwrite, OverwritePolicy::Rename);
        assert_eq!(config.encoder.crf, 28);
    }
}
