//! Layered configuration: defaults < config file < environment < CLI flags

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::OverwritePolicy;
use crate::engine::{EncoderSettings, PRESETS};
use crate::error::{CropperError, CropperResult};
use crate::streams::audio::DEFAULT_DRIFT_WARNING_MS;
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "cropper.toml";

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "CROPPER_CONFIG";

/// Encoder section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub preset: String,
    pub crf: u8,
    /// Zero means one thread per core
    pub threads: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            crf: 23,
            threads: 0,
        }
    }
}

/// Output section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub overwrite: OverwritePolicy,
    pub faststart: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            overwrite: OverwritePolicy::Always,
            faststart: true,
        }
    }
}

/// Audio section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Drift in milliseconds above which a warning is raised
    pub drift_warning_ms: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            drift_warning_ms: DEFAULT_DRIFT_WARNING_MS,
        }
    }
}

/// Progress section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Frames between progress reports
    pub interval: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval: 10 }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropperConfig {
    pub logging: LoggingConfig,
    pub encoder: EncoderConfig,
    pub output: OutputConfig,
    pub audio: AudioConfig,
    pub progress: ProgressConfig,
}

impl CropperConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> CropperResult<Self> {
        toml::from_str(content).map_err(|e| CropperError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Load a config file that must exist
    pub fn from_file(path: &Path) -> CropperResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CropperError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    /// Defaults, then the first config file found, then the process environment.
    ///
    /// `explicit` (from `--config`) and `CROPPER_CONFIG` must point at a readable
    /// file; `cropper.toml` in the working directory is optional.
    pub fn load(explicit: Option<&Path>) -> CropperResult<Self> {
        let mut config = match Self::locate(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = from_env {
            return Some(path);
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.is_file().then_some(local)
    }

    /// Apply `CROPPER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> CropperResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = 0;

        if let Some(value) = lookup("CROPPER_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CROPPER_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CROPPER_OVERWRITE") {
            self.output.overwrite = OverwritePolicy::parse(&value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CROPPER_CRF") {
            self.encoder.crf = value.trim().parse().map_err(|e| CropperError::Config {
                message: format!("Invalid CRF value '{}': {}", value, e),
            })?;
            overrides += 1;
        }
        if let Some(value) = lookup("CROPPER_PRESET") {
            self.encoder.preset = value.trim().to_string();
            overrides += 1;
        }

        if overrides > 0 {
            debug!("Applied {} environment variable overrides", overrides);
        }
        Ok(())
    }

    pub fn validate(&self) -> CropperResult<()> {
        if self.encoder.crf > 51 {
            return Err(CropperError::Config {
                message: format!("CRF value {} is invalid (must be 0-51)", self.encoder.crf),
            });
        }
        if !PRESETS.contains(&self.encoder.preset.as_str()) {
            return Err(CropperError::Config {
                message: format!(
                    "Unknown preset '{}' (expected one of: {})",
                    self.encoder.preset,
                    PRESETS.join(", ")
                ),
            });
        }
        if self.progress.interval == 0 {
            return Err(CropperError::Config {
                message: "Progress interval must be at least one frame".to_string(),
            });
        }
        if !self.audio.drift_warning_ms.is_finite() || self.audio.drift_warning_ms < 0.0 {
            return Err(CropperError::Config {
                message: format!(
                    "Drift warning threshold {} must be a non-negative number of milliseconds",
                    self.audio.drift_warning_ms
                ),
            });
        }
        Ok(())
    }

    /// Encoder settings described by this config
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings::default()
            .with_preset(self.encoder.preset.clone())
            .with_crf(self.encoder.crf)
            .with_threads(self.encoder.threads)
            .with_faststart(self.output.faststart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CropperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.progress.interval, 10);
        assert_eq!(config.output.overwrite, OverwritePolicy::Always);
        assert_eq!(config.encoder.crf, 23);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CropperConfig::from_toml(
            r#"
            [encoder]
            crf = 18

            [output]
            overwrite = "rename"

            [audio]
            drift_warning_ms = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(config.encoder.crf, 18);
        assert_eq!(config.encoder.preset, "medium");
        assert_eq!(config.output.overwrite, OverwritePolicy::Rename);
        assert!(config.output.faststart);
        assert_eq!(config.audio.drift_warning_ms, 40.0);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = CropperConfig::from_toml("[encoder\ncrf = ").unwrap_err();
        assert!(matches!(err, CropperError::Config { .. }));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = CropperConfig::from_toml("[encoder]\ncrf = 18\npreset = \"slow\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("CROPPER_CRF", "30"),
            ("CROPPER_OVERWRITE", "never"),
            ("CROPPER_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.encoder.crf, 30);
        assert_eq!(config.encoder.preset, "slow");
        assert_eq!(config.output.overwrite, OverwritePolicy::Never);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = CropperConfig::default();
        let result = config.apply_env(|key| (key == "CROPPER_CRF").then(|| "high".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CropperConfig::default();
        config.encoder.crf = 60;
        assert!(config.validate().is_err());

        let mut config = CropperConfig::default();
        config.encoder.preset = "warp".to_string();
        assert!(config.validate().is_err());

        let mut config = CropperConfig::default();
        config.progress.interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[progress]\ninterval = 25\n").unwrap();

        let located = CropperConfig::locate(Some(&path), Some(PathBuf::from("/elsewhere.toml")));
        assert_eq!(located, Some(path.clone()));

        let config = CropperConfig::from_file(&path).unwrap();
        assert_eq!(config.progress.interval, 25);

        assert!(CropperConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_encoder_settings_follow_config() {
        let mut config = CropperConfig::default();
        config.encoder.preset = "veryfast".to_string();
        config.encoder.threads = 3;
        config.output.faststart = false;

        let settings = config.encoder_settings();
        assert_eq!(settings.preset, "veryfast");
        assert_eq!(settings.threads, 3);
        assert!(!settings.faststart);
    }
}
