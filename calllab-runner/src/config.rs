//! Runner configuration (TOML) and input loading.
//!
//! ```toml
//! [simulator]
//! initial_capital = 10000.0
//! max_concurrent_positions = 25
//! intrabar_policy = "stop_first"
//!
//! [grid]
//! tp_mults = [1.5, 2.0, 3.0]
//! sl_mults = [0.8, 0.9]
//! max_hold_hrs = [12.0, 24.0, 48.0]
//!
//! [filter]
//! filter_collapsed = true
//! filter_extreme = true
//!
//! [search]
//! parallel = true
//! max_threads = 8
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use calllab_core::validation::validate_config;
use calllab_core::{Call, CandlesByCallId, SimulatorConfig, ValidationError};

use crate::grouped::{CallerFilter, GroupedHold};
use crate::per_caller::ExtremeThresholds;
use crate::sweep::{GridSearch, ParamGrid};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse runner TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize runner TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("invalid [{section}] setting `{field}`: {reason}")]
    Setting {
        section: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}

/// Caller filter settings as they appear in the `[filter]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub filter_collapsed: bool,
    pub filter_extreme: bool,
    pub extreme_sl_below: f64,
    pub extreme_tp_above: f64,
    pub grouped_hold: GroupedHold,
}

impl Default for FilterSettings {
    fn default() -> Self {
        let thresholds = ExtremeThresholds::default();
        Self {
            filter_collapsed: true,
            filter_extreme: true,
            extreme_sl_below: thresholds.sl_below,
            extreme_tp_above: thresholds.tp_above,
            grouped_hold: GroupedHold::Mean,
        }
    }
}

impl FilterSettings {
    pub fn to_filter(&self) -> CallerFilter {
        CallerFilter {
            filter_collapsed: self.filter_collapsed,
            filter_extreme: self.filter_extreme,
            thresholds: ExtremeThresholds {
                sl_below: self.extreme_sl_below,
                tp_above: self.extreme_tp_above,
            },
            hold: self.grouped_hold,
        }
    }
}

/// Search executor settings (`[search]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub parallel: bool,
    /// Dedicated pool size; the global rayon pool when absent.
    pub max_threads: Option<usize>,
    pub keep_all_results: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
            keep_all_results: false,
        }
    }
}

/// Everything a grid search, per-caller or grouped evaluation needs
/// besides the calls and candles themselves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub simulator: SimulatorConfig,
    pub grid: ParamGrid,
    pub filter: FilterSettings,
    pub search: SearchSettings,
}

impl RunnerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read runner config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("load runner config {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(&self.simulator)?;
        self.grid.validate()?;

        let f = &self.filter;
        if !(f.extreme_sl_below.is_finite() && f.extreme_tp_above.is_finite()) {
            return Err(ConfigError::Setting {
                section: "filter",
                field: "extreme_sl_below/extreme_tp_above",
                reason: "thresholds must be finite",
            });
        }
        if self.search.max_threads == Some(0) {
            return Err(ConfigError::Setting {
                section: "search",
                field: "max_threads",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// A grid search executor configured from `[search]`.
    pub fn grid_search(&self) -> GridSearch {
        GridSearch::from_settings(&self.search)
    }
}

/// Read a JSON call list and a JSON map of call id → candle path.
pub fn load_inputs(
    calls_path: &Path,
    candles_path: &Path,
) -> anyhow::Result<(Vec<Call>, CandlesByCallId)> {
    let raw = std::fs::read_to_string(calls_path)
        .with_context(|| format!("read calls {}", calls_path.display()))?;
    let calls: Vec<Call> = serde_json::from_str(&raw)
        .with_context(|| format!("parse calls {}", calls_path.display()))?;

    let raw = std::fs::read_to_string(candles_path)
        .with_context(|| format!("read candles {}", candles_path.display()))?;
    let candles: CandlesByCallId = serde_json::from_str(&raw)
        .with_context(|| format!("parse candles {}", candles_path.display()))?;

    Ok((calls, candles))
}
