use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{channel::Sentinel, palette::Color, Result, SoundPainterError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stand-in for non-finite samples, shared by producer and consumer.
    pub sentinel: Sentinel,
    pub audio: AudioConfig,
    pub sampler: SamplerConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Parses a JSON document; missing fields fall back to their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;

        if !(self.sampler.tick_rate_hz.is_finite() && self.sampler.tick_rate_hz > 0.0) {
            return Err(SoundPainterError::InvalidInput(
                "sampler tick rate must be positive",
            ));
        }
        if self.sampler.initial_color.parse::<Color>().is_err() {
            return Err(SoundPainterError::InvalidInput(
                "sampler initial color is not a valid color",
            ));
        }

        let render = &self.render;
        if render.width == 0 || render.height == 0 {
            return Err(SoundPainterError::InvalidInput(
                "render surface must have a non-zero size",
            ));
        }
        if !(render.paint_rate_hz.is_finite() && render.paint_rate_hz > 0.0) {
            return Err(SoundPainterError::InvalidInput(
                "paint rate must be positive",
            ));
        }
        if !(render.gradient_step > 0.0 && render.gradient_step <= 1.0) {
            return Err(SoundPainterError::InvalidInput(
                "gradient step must lie in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&render.alpha) {
            return Err(SoundPainterError::InvalidInput("alpha must lie in [0, 1]"));
        }

        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analysis window W. Fixed for the lifetime of a capture session.
    pub window_size: usize,
    /// Time constant blending each spectrum with the previous one.
    pub smoothing: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_size: 128,
            smoothing: 0.8,
        }
    }
}

impl AudioConfig {
    pub const MIN_WINDOW: usize = 32;
    pub const MAX_WINDOW: usize = 32_768;

    pub fn validate(&self) -> Result<()> {
        if !self.window_size.is_power_of_two()
            || !(Self::MIN_WINDOW..=Self::MAX_WINDOW).contains(&self.window_size)
        {
            return Err(SoundPainterError::InvalidInput(
                "window size must be a power of two between 32 and 32768",
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(SoundPainterError::InvalidInput(
                "smoothing must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Producer loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub tick_rate_hz: f32,
    /// Value the dominant color slot reports before the first write.
    pub initial_color: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            initial_color: "#000".to_string(),
        }
    }
}

/// Consumer loop and surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub paint_rate_hz: f32,
    /// Horizontal distance between neighbouring lanes, in pixels.
    pub lane_offset: f32,
    pub gradient_step: f32,
    pub alpha: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            paint_rate_hz: 30.0,
            lane_offset: 100.0,
            gradient_step: 0.1,
            alpha: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "sentinel": "negative_one", "render": { "width": 320 } }"#)
                .unwrap();

        assert_eq!(config.sentinel, Sentinel::NegativeOne);
        assert_eq!(config.render.width, 320);
        assert_eq!(config.render.height, 400);
        assert_eq!(config.audio.window_size, 128);
        assert_eq!(config.sampler.initial_color, "#000");
    }

    #[test]
    fn rejects_window_that_is_not_a_power_of_two() {
        let err = AppConfig::from_json_str(r#"{ "audio": { "window_size": 100 } }"#).unwrap_err();
        assert!(matches!(err, SoundPainterError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unparsable_initial_color() {
        let mut config = AppConfig::default();
        config.sampler.initial_color = "chartreuse-ish".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = AppConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, SoundPainterError::Config(_)));
    }
}
