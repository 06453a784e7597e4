use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::export::{ExportSettings, SliceStrategy};
use crate::render::raster::MAX_CAPTURE_SCALE;
use crate::render::template::Theme;

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Device pixels per CSS px during capture.
    pub capture_scale: u32,
    /// 0 disables the capture timeout.
    pub capture_timeout_secs: u64,
    pub slice_strategy: SliceStrategy,
    pub default_theme: Theme,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let capture_scale = var("CAPTURE_SCALE", "2")
            .parse::<u32>()
            .context("CAPTURE_SCALE must be a positive integer")?;
        if !(1..=MAX_CAPTURE_SCALE).contains(&capture_scale) {
            bail!("CAPTURE_SCALE must be between 1 and {MAX_CAPTURE_SCALE}, got {capture_scale}");
        }

        Ok(Config {
            port: var("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
            capture_scale,
            capture_timeout_secs: var("CAPTURE_TIMEOUT_SECS", "30")
                .parse::<u64>()
                .context("CAPTURE_TIMEOUT_SECS must be a non-negative integer")?,
            slice_strategy: var("SLICE_STRATEGY", "crop")
                .parse::<SliceStrategy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid SLICE_STRATEGY")?,
            default_theme: var("DEFAULT_THEME", "classic")
                .parse::<Theme>()
                .map_err(anyhow::Error::msg)
                .context("Invalid DEFAULT_THEME")?,
        })
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            capture_scale: self.capture_scale,
            capture_timeout: (self.capture_timeout_secs > 0)
                .then(|| Duration::from_secs(self.capture_timeout_secs)),
            slice_strategy: self.slice_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.capture_scale, 2);
        assert_eq!(config.slice_strategy, SliceStrategy::Crop);
        assert_eq!(config.default_theme, Theme::Classic);

        let settings = config.export_settings();
        assert_eq!(settings.capture_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("CAPTURE_SCALE", "3"),
            ("CAPTURE_TIMEOUT_SECS", "0"),
            ("SLICE_STRATEGY", "offset"),
            ("DEFAULT_THEME", "modern"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.slice_strategy, SliceStrategy::Offset);
        assert_eq!(config.default_theme, Theme::Modern);

        let settings = config.export_settings();
        assert_eq!(settings.capture_scale, 3);
        assert_eq!(settings.capture_timeout, None);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(config_from(&[("CAPTURE_SCALE", "0")]).is_err());
        assert!(config_from(&[("CAPTURE_SCALE", "8")]).is_err());
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
        assert!(config_from(&[("SLICE_STRATEGY", "tile")]).is_err());
    }
}
