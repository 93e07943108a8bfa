use serde::{Deserialize, Serialize};
use thiserror::Error;
use viewport_sense_protocol::Breakpoint;

use crate::breakpoints::Breakpoints;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the xs threshold must be 0, got {0}")]
    NonZeroBase(u32),
    #[error("breakpoint {tier} ({value}px) must be wider than {previous} ({previous_value}px)")]
    Unordered {
        tier: Breakpoint,
        value: u32,
        previous: Breakpoint,
        previous_value: u32,
    },
    #[error("visibility threshold must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("near-edge margin must be a non-negative number, got {0}")]
    Margin(f64),
}

/// Engine tuning. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub breakpoints: Breakpoints,
    /// Distance (px) from the top/bottom under which scroll reports
    /// `isNearTop` / `isNearBottom`.
    pub near_edge_margin: f64,
    /// Visibility threshold used when a caller does not pass one.
    pub visibility_threshold: f64,
    /// Quiet interval for resize-driven projections. `None` delivers on
    /// every resize event.
    pub resize_debounce_ms: Option<u32>,
    /// How long copy feedback stays in the "copied" state.
    pub copy_reset_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            breakpoints: Breakpoints::default(),
            near_edge_margin: 100.0,
            visibility_threshold: 0.5,
            resize_debounce_ms: None,
            copy_reset_ms: 2000,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bp = &self.breakpoints;
        if bp.xs != 0 {
            return Err(ConfigError::NonZeroBase(bp.xs));
        }
        for pair in Breakpoint::ALL.windows(2) {
            let (previous, tier) = (pair[0], pair[1]);
            if bp.threshold(tier) <= bp.threshold(previous) {
                return Err(ConfigError::Unordered {
                    tier,
                    value: bp.threshold(tier),
                    previous,
                    previous_value: bp.threshold(previous),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::Threshold(self.visibility_threshold));
        }
        if !(self.near_edge_margin.is_finite() && self.near_edge_margin >= 0.0) {
            return Err(ConfigError::Margin(self.near_edge_margin));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = EngineConfig::from_json(b"{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_breakpoints_keep_other_defaults() {
        let config =
            EngineConfig::from_json(br#"{"breakpoints": {"2xl": 1600}, "resizeDebounceMs": 50}"#)
                .unwrap();
        assert_eq!(config.breakpoints.xxl, 1600);
        assert_eq!(config.breakpoints.lg, 1024);
        assert_eq!(config.resize_debounce_ms, Some(50));
        assert_eq!(config.copy_reset_ms, 2000);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let err = EngineConfig::from_json(br#"{"breakpoints": {"md": 600}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Unordered {
                tier: Breakpoint::Md,
                previous: Breakpoint::Sm,
                ..
            }
        ));
    }

    #[test]
    fn rejects_gap_below_first_tier() {
        let err = EngineConfig::from_json(br#"{"breakpoints": {"xs": 10}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonZeroBase(10)));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = EngineConfig::from_json(br#"{"visibilityThreshold": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Threshold(_)));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            EngineConfig::from_json(b"{"),
            Err(ConfigError::Json(_))
        ));
    }
}
