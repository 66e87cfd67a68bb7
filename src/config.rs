//! Configuration management for the `SpotMap` engine
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings.

use crate::SpotMapError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `SpotMap` engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotMapConfig {
    /// Viewport synchronisation tuning
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Facility radii
    #[serde(default)]
    pub proximity: ProximityConfig,
    /// Duplicate submission thresholds
    #[serde(default)]
    pub duplicates: DuplicateConfig,
    /// Spot repository connection
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Debounce and skip thresholds for viewport changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Debounce for mouse/trackpad driven changes
    #[serde(default = "default_pointer_debounce_ms")]
    pub pointer_debounce_ms: u64,
    /// Debounce for touch devices, where gestures emit longer bursts
    #[serde(default = "default_touch_debounce_ms")]
    pub touch_debounce_ms: u64,
    /// Slack in degrees when testing whether a viewport lies inside the last one
    #[serde(default = "default_containment_epsilon")]
    pub containment_epsilon_deg: f64,
    /// Edge movement, as a fraction of the viewport span, below which a pan is ignored
    #[serde(default = "default_pan_threshold_ratio")]
    pub pan_threshold_ratio: f64,
    /// Span of the viewport seeded from the user's position
    #[serde(default = "default_seed_span")]
    pub seed_span_deg: f64,
}

/// Radius in meters within which a facility counts as nearby
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "default_toilet_radius")]
    pub toilet_radius_m: f64,
    #[serde(default = "default_convenience_radius")]
    pub convenience_radius_m: f64,
    #[serde(default = "default_bath_radius")]
    pub bath_radius_m: f64,
}

/// Distance thresholds used by the duplicate submission guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Same name and prefecture within this distance is a duplicate
    #[serde(default = "default_same_name_radius")]
    pub same_name_radius_m: f64,
    /// Any entry within this distance is a duplicate
    #[serde(default = "default_too_close_radius")]
    pub too_close_radius_m: f64,
}

/// HTTP spot repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of the spot API; the in-memory repository is used when unset
    pub base_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_repository_timeout")]
    pub timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_pointer_debounce_ms() -> u64 {
    500
}

fn default_touch_debounce_ms() -> u64 {
    800
}

fn default_containment_epsilon() -> f64 {
    1e-4
}

fn default_pan_threshold_ratio() -> f64 {
    0.05
}

fn default_seed_span() -> f64 {
    0.5
}

fn default_toilet_radius() -> f64 {
    1_000.0
}

fn default_convenience_radius() -> f64 {
    10_000.0
}

fn default_bath_radius() -> f64 {
    20_000.0
}

fn default_same_name_radius() -> f64 {
    100.0
}

fn default_too_close_radius() -> f64 {
    10.0
}

fn default_repository_timeout() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            pointer_debounce_ms: default_pointer_debounce_ms(),
            touch_debounce_ms: default_touch_debounce_ms(),
            containment_epsilon_deg: default_containment_epsilon(),
            pan_threshold_ratio: default_pan_threshold_ratio(),
            seed_span_deg: default_seed_span(),
        }
    }
}

impl ViewportConfig {
    #[must_use]
    pub fn pointer_debounce(&self) -> Duration {
        Duration::from_millis(self.pointer_debounce_ms)
    }

    #[must_use]
    pub fn touch_debounce(&self) -> Duration {
        Duration::from_millis(self.touch_debounce_ms)
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            toilet_radius_m: default_toilet_radius(),
            convenience_radius_m: default_convenience_radius(),
            bath_radius_m: default_bath_radius(),
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            same_name_radius_m: default_same_name_radius(),
            too_close_radius_m: default_too_close_radius(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_repository_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SpotMapConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SPOTMAP_VIEWPORT__POINTER_DEBOUNCE_MS=300 and friends
        builder = builder.add_source(
            Environment::with_prefix("SPOTMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SpotMapConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spotmap").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.viewport.pointer_debounce_ms == 0 {
            self.viewport.pointer_debounce_ms = default_pointer_debounce_ms();
        }
        if self.viewport.touch_debounce_ms == 0 {
            self.viewport.touch_debounce_ms = default_touch_debounce_ms();
        }
        if self.viewport.seed_span_deg == 0.0 {
            self.viewport.seed_span_deg = default_seed_span();
        }
        if self.repository.timeout_seconds == 0 {
            self.repository.timeout_seconds = default_repository_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_viewport()?;
        self.validate_radii()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_viewport(&self) -> Result<()> {
        let viewport = &self.viewport;
        if viewport.pointer_debounce_ms > 10_000 || viewport.touch_debounce_ms > 10_000 {
            return Err(SpotMapError::config("Debounce intervals cannot exceed 10000 ms").into());
        }

        if !(viewport.containment_epsilon_deg >= 0.0 && viewport.containment_epsilon_deg < 1.0) {
            return Err(SpotMapError::config(
                "Containment epsilon must be within [0, 1) degrees",
            )
            .into());
        }

        if !(viewport.pan_threshold_ratio > 0.0 && viewport.pan_threshold_ratio < 1.0) {
            return Err(
                SpotMapError::config("Pan threshold ratio must be within (0, 1)").into(),
            );
        }

        if !(viewport.seed_span_deg > 0.0 && viewport.seed_span_deg <= 180.0) {
            return Err(SpotMapError::config("Seed span must be within (0, 180] degrees").into());
        }

        Ok(())
    }

    fn validate_radii(&self) -> Result<()> {
        let radii = [
            ("toilet_radius_m", self.proximity.toilet_radius_m),
            ("convenience_radius_m", self.proximity.convenience_radius_m),
            ("bath_radius_m", self.proximity.bath_radius_m),
            ("same_name_radius_m", self.duplicates.same_name_radius_m),
            ("too_close_radius_m", self.duplicates.too_close_radius_m),
        ];
        for (name, value) in radii {
            if !(value.is_finite() && value > 0.0) {
                return Err(SpotMapError::config(format!(
                    "{name} must be a positive distance in meters, got {value}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SpotMapError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SpotMapError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if let Some(base_url) = &self.repository.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(SpotMapError::config(
                    "Repository base URL must be a valid HTTP or HTTPS URL",
                )
                .into());
            }
        }

        Ok(())
    }
}
