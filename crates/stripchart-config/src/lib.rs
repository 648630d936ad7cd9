//! Configuration management for stripchart.
//!
//! Loads configuration from TOML files. Every section is optional and falls back
//! to its defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use stripchart_core::{CHANNEL_HEIGHT_CM, DEFAULT_DPI, DEFAULT_PALETTE};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chart: ChartConfig,
    pub label: LabelConfig,
    pub segments: SegmentConfig,
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations.
    ///
    /// Searches in order:
    /// 1. `./stripchart.toml`
    /// 2. `<config dir>/stripchart/config.toml`
    ///
    /// Returns default config if no usable file is found.
    pub fn load_default() -> Self {
        for path in Self::search_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Candidate config file locations, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_path()];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stripchart").join("config.toml"));
        }
        paths
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("stripchart.toml")
    }

    /// Reject values the renderer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chart = &self.chart;
        if chart.history_length < 2 {
            return Err(ConfigError::Invalid {
                field: "chart.history_length",
                reason: format!("must be at least 2, got {}", chart.history_length),
            });
        }
        positive("chart.channel_height_cm", chart.channel_height_cm)?;
        positive("chart.dpi", chart.dpi)?;
        positive("chart.amplitude", chart.amplitude)?;
        positive("label.font_size", self.label.font_size)?;
        if !self.segments.threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "segments.threshold",
                reason: "must be finite".to_string(),
            });
        }
        positive("demo.sample_rate", self.demo.sample_rate)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

/// Chart layout and appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Samples kept per channel.
    pub history_length: usize,
    /// Physical height of one channel row.
    pub channel_height_cm: f32,
    /// Assumed backing-store pixel density.
    pub dpi: f32,
    /// Sample value drawn at the edge of a row (half the row height).
    pub amplitude: f32,
    /// Clear color.
    pub background: String,
    /// Separator line color.
    pub grid_color: String,
    /// Channel colors in discovery order.
    pub palette: Vec<String>,
    /// Grow the surface height as channels are discovered.
    pub dynamic_rows: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            history_length: 1000,
            channel_height_cm: CHANNEL_HEIGHT_CM,
            dpi: DEFAULT_DPI,
            amplitude: 1.0,
            background: "#FFFFFF".to_string(),
            grid_color: "#999999".to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            dynamic_rows: false,
        }
    }
}

/// Channel name badge appearance. Sizes are logical pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub font_size: f32,
    /// Distance from the left edge of the surface.
    pub left_offset: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub corner_radius: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            left_offset: 8.0,
            padding_x: 6.0,
            padding_y: 2.0,
            corner_radius: 4.0,
        }
    }
}

/// Gated drawing: split traces into runs by each batch's leading sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub enabled: bool,
    /// Leading samples at or above this value mark a "signal present" run.
    pub threshold: f32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.5,
        }
    }
}

/// Synthetic source used by the viewer binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub channels: usize,
    /// Samples per second per channel.
    pub sample_rate: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            channels: 8,
            sample_rate: 250.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chart.history_length, 1000);
        assert_eq!(config.chart.channel_height_cm, 3.0);
        assert_eq!(config.chart.palette.len(), 20);
        assert_eq!(config.chart.palette[0], "#F2645A");
        assert!(!config.segments.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r##"
[chart]
history_length = 512
background = "#000000"
dynamic_rows = true

[segments]
enabled = true
threshold = 0.25
"##;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.chart.history_length, 512);
        assert_eq!(config.chart.background, "#000000");
        assert!(config.chart.dynamic_rows);
        // untouched fields keep defaults
        assert_eq!(config.chart.dpi, 96.0);
        assert_eq!(config.label.font_size, 14.0);
        assert!(config.segments.enabled);
        assert_eq!(config.segments.threshold, 0.25);
    }

    #[test]
    fn test_rejects_short_history() {
        let err = Config::parse("[chart]\nhistory_length = 1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "chart.history_length", .. }
        ));
    }

    #[test]
    fn test_rejects_non_positive_sizes() {
        assert!(Config::parse("[chart]\nchannel_height_cm = 0.0\n").is_err());
        assert!(Config::parse("[chart]\namplitude = -2.0\n").is_err());
        assert!(Config::parse("[label]\nfont_size = 0.0\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stripchart.toml");

        let mut config = Config::default();
        config.chart.history_length = 250;
        config.label.left_offset = 12.0;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
