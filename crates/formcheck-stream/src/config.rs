//! Engine configuration.
//!
//! Values come from an optional file and `FORMCHECK_*` environment variables,
//! nested keys separated by `__` (e.g. `FORMCHECK_DRIVER__STALL_TIMEOUT_MS`).

use std::time::Duration;

use formcheck_core::{ConfidenceGate, Error, Result, SmoothingParams, DEFAULT_ALPHA};
use formcheck_rules::{AnalyzerConfig, ExerciseKind};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "FORMCHECK";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub exercise: ExerciseKind,

    pub smoothing: SmoothingConfig,

    pub frame: FrameConfig,

    pub driver: DriverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the newest sample, in (0, 1]
    pub alpha: f64,

    /// Minimum confidence for a sample to update the smoothed position
    pub min_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Input image width (pixels)
    pub width: f64,

    /// Input image height (pixels)
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Broadcast buffer for published outputs
    pub output_queue_size: usize,

    /// Pending reset/stop requests
    pub control_queue_size: usize,

    /// How long to wait for a frame before logging a stall (milliseconds)
    pub stall_timeout_ms: u64,

    /// Display refresh interval; 0 disables pacing (milliseconds)
    pub refresh_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exercise: ExerciseKind::Squat,
            smoothing: SmoothingConfig::default(),
            frame: FrameConfig::default(),
            driver: DriverConfig::default(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            min_confidence: ConfidenceGate::SMOOTHING.threshold,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            output_queue_size: 64,
            control_queue_size: 8,
            stall_timeout_ms: 500,
            refresh_interval_ms: 16, // ~60Hz
        }
    }
}

impl DriverConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_ms > 0).then(|| Duration::from_millis(self.refresh_interval_ms))
    }
}

impl EngineConfig {
    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()
            .map_err(config_error)?;

        Self::finish(settings)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()
            .map_err(config_error)?;

        Self::finish(settings)
    }

    /// Parse an inline TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(config_error)?;

        Self::finish(settings)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn finish(settings: config::Config) -> Result<Self> {
        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let alpha = self.smoothing.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::Config(format!(
                "smoothing.alpha must be in (0, 1], got {alpha}"
            )));
        }

        let min_confidence = self.smoothing.min_confidence;
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(Error::Config(format!(
                "smoothing.min_confidence must be in [0, 1], got {min_confidence}"
            )));
        }

        if !(self.frame.width > 0.0 && self.frame.height > 0.0) {
            return Err(Error::Config(format!(
                "frame size must be positive, got {}x{}",
                self.frame.width, self.frame.height
            )));
        }

        if self.driver.output_queue_size == 0 || self.driver.control_queue_size == 0 {
            return Err(Error::Config("driver queue sizes must be non-zero".into()));
        }

        if self.driver.stall_timeout_ms == 0 {
            return Err(Error::Config("driver.stall_timeout_ms must be non-zero".into()));
        }

        Ok(())
    }

    pub fn to_analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            exercise: self.exercise,
            smoothing: SmoothingParams {
                alpha: self.smoothing.alpha,
                gate: ConfidenceGate::at_least(self.smoothing.min_confidence),
            },
            frame_width: self.frame.width,
        }
    }
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exercise, ExerciseKind::Squat);
        assert_eq!(config.driver.refresh_interval(), Some(Duration::from_millis(16)));

        let analyzer = config.to_analyzer_config();
        assert_eq!(analyzer, AnalyzerConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            exercise = "pushup"

            [driver]
            refresh_interval_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.exercise, ExerciseKind::Pushup);
        assert_eq!(config.driver.refresh_interval(), None);
        assert_eq!(config.driver.stall_timeout_ms, 500);
        assert_eq!(config.frame.width, 640.0);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let err = EngineConfig::from_toml_str("[smoothing]\nalpha = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = EngineConfig {
            smoothing: SmoothingConfig {
                alpha: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exercise_spellings_match_parser() {
        for name in ["pushup", "push-up", "push_up"] {
            let config = EngineConfig::from_toml_str(&format!("exercise = \"{name}\"\n")).unwrap();
            assert_eq!(config.exercise, name.parse::<ExerciseKind>().unwrap());
        }
    }

    #[test]
    fn test_unknown_exercise_rejected() {
        assert!(EngineConfig::from_toml_str("exercise = \"burpee\"\n").is_err());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let config = EngineConfig {
            driver: DriverConfig {
                output_queue_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_min_confidence_flows_into_gate() {
        let config = EngineConfig {
            smoothing: SmoothingConfig {
                alpha: 0.5,
                min_confidence: 0.3,
            },
            ..Default::default()
        };
        let analyzer = config.to_analyzer_config();
        assert_eq!(analyzer.smoothing.alpha, 0.5);
        assert!(analyzer.smoothing.gate.passes(0.3));
        assert!(!analyzer.smoothing.gate.passes(0.29));
    }
}
