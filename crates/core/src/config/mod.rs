use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, ScopeError};

/// Top-level configuration structure for the scope.
///
/// Every section falls back to its defaults, so a config file only needs to
/// name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub queue: QueueConfig,
    pub history: HistoryConfig,
    pub zoom: ZoomConfig,
    pub render: RenderConfig,
    /// Consumer tick rate in Hz.
    pub tick_hz: u32,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            history: HistoryConfig::default(),
            zoom: ZoomConfig::default(),
            render: RenderConfig::default(),
            tick_hz: 60,
        }
    }
}

impl ScopeConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded scope configuration");
        Ok(config)
    }

    /// Checks that the buffers and zoom ranges describe a usable scope.
    ///
    /// Called by every constructor that allocates from the config so that a
    /// bad capacity fails at startup instead of on the render path.
    pub fn validate(&self) -> Result<()> {
        self.queue.validate()?;
        self.history.validate()?;
        self.zoom.validate()?;
        self.render.validate()?;
        if self.tick_hz == 0 {
            return Err(ScopeError::invalid("tick_hz must be at least 1"));
        }
        Ok(())
    }
}

/// Sizing of the producer → consumer queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

impl QueueConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ScopeError::invalid("queue capacity must be non-zero"));
        }
        Ok(())
    }
}

/// Sizing of the raw history ring and its min/max overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of raw loudness samples retained.
    pub capacity: usize,
    /// Raw samples folded into one overview entry.
    pub decimation: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        // 2^20 blocks is roughly three hours of 512-sample blocks at 48 kHz.
        Self {
            capacity: 1 << 20,
            decimation: 64,
        }
    }
}

impl HistoryConfig {
    /// Number of entries in the overview ring.
    pub fn overview_capacity(&self) -> usize {
        self.capacity / self.decimation.max(1)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ScopeError::invalid("history capacity must be non-zero"));
        }
        if self.decimation == 0 {
            return Err(ScopeError::invalid("decimation factor must be non-zero"));
        }
        if self.capacity % self.decimation != 0 {
            return Err(format!(
                "decimation factor {} does not divide history capacity {}",
                self.decimation, self.capacity
            )
            .into());
        }
        Ok(())
    }
}

/// Ranges and start values of the two zoom parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Pixels per raw sample.
    pub time_min: f64,
    pub time_max: f64,
    pub time_default: f64,
    pub amplitude_min: f32,
    pub amplitude_max: f32,
    pub amplitude_default: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            time_min: 0.0001,
            time_max: 50.0,
            time_default: 5.0,
            amplitude_min: 0.5,
            amplitude_max: 10.0,
            amplitude_default: 1.0,
        }
    }
}

impl ZoomConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.time_min.is_finite() && self.time_min > 0.0) {
            return Err(ScopeError::invalid("time zoom minimum must be positive"));
        }
        if !(self.time_max.is_finite() && self.time_max >= self.time_min) {
            return Err(format!(
                "time zoom range [{}, {}] is inverted",
                self.time_min, self.time_max
            )
            .into());
        }
        if !(self.amplitude_min.is_finite() && self.amplitude_min > 0.0) {
            return Err(ScopeError::invalid(
                "amplitude zoom minimum must be positive",
            ));
        }
        if !(self.amplitude_max.is_finite() && self.amplitude_max >= self.amplitude_min) {
            return Err(format!(
                "amplitude zoom range [{}, {}] is inverted",
                self.amplitude_min, self.amplitude_max
            )
            .into());
        }
        if !(self.time_default.is_finite() && self.amplitude_default.is_finite()) {
            return Err(ScopeError::invalid("zoom defaults must be finite"));
        }
        Ok(())
    }
}

/// Geometry tuning for the viewport renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Time zoom below which envelopes are read from the overview ring.
    pub pyramid_threshold: f64,
    /// Minimum envelope height in pixels.
    pub min_band_thickness: f32,
    /// Fraction of the half-height a full-scale value reaches.
    pub vertical_margin: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pyramid_threshold: 1.0 / 64.0,
            min_band_thickness: 1.5,
            vertical_margin: 0.9,
        }
    }
}

impl RenderConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.pyramid_threshold > 0.0 && self.pyramid_threshold <= 1.0) {
            return Err(ScopeError::invalid(
                "pyramid threshold must lie in (0, 1]",
            ));
        }
        if !(self.min_band_thickness.is_finite() && self.min_band_thickness >= 0.0) {
            return Err(ScopeError::invalid(
                "minimum band thickness must be non-negative",
            ));
        }
        if !(self.vertical_margin > 0.0 && self.vertical_margin <= 1.0) {
            return Err(ScopeError::invalid("vertical margin must lie in (0, 1]"));
        }
        Ok(())
    }
}
