//! Strategy configuration.
//!
//! Supplied once at engine construction, from code or TOML. Every field has
//! a default, so a partial file only overrides what it names. Validation
//! happens here, before the first bar; nothing in per-bar processing can
//! fail because of configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::PriceSource;
use crate::indicators::{AtrSmoothing, HullVariant};
use crate::session::SessionWindow;

/// Upper bound on every window length, effective Hull length included.
pub const MAX_LENGTH: usize = 100_000;

/// Errors raised while loading or validating a [`StrategyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be >= 1, got {value}")]
    NonPositiveLength { field: &'static str, value: usize },

    #[error("{field} must be <= {max}, got {value}")]
    LengthTooLarge {
        field: &'static str,
        value: f64,
        max: usize,
    },

    #[error("{field} must be finite and > 0, got {value}")]
    NonPositiveValue { field: &'static str, value: f64 },

    #[error("stc.fast_length ({fast}) must be shorter than stc.slow_length ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },

    #[error("stc.alpha must be in (0, 1], got {0}")]
    AlphaOutOfRange(f64),

    #[error("{field} must be in [0, 100], got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    #[error("effective hull length {effective} is too short for {variant:?} (needs >= {min})")]
    HullTooShort {
        variant: HullVariant,
        effective: usize,
        min: usize,
    },

    #[error("{field} must be an hour in 0..={max}, got {value}")]
    SessionHour {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("session start and end are both {0}: the window is empty")]
    EmptySession(u32),

    #[error("breakeven.offset_atr must be finite and >= 0, got {0}")]
    NegativeOffset(f64),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// UT-Bot trailing stop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UtBotConfig {
    /// ATR loss multiplier (UT "key value").
    pub key_value: f64,
    pub atr_period: usize,
    pub atr_smoothing: AtrSmoothing,
    /// Use the Heikin-Ashi close (OHLC4) instead of the close as source.
    pub use_heikin_ashi_source: bool,
}

impl Default for UtBotConfig {
    fn default() -> Self {
        Self {
            key_value: 2.0,
            atr_period: 4,
            atr_smoothing: AtrSmoothing::Simple,
            use_heikin_ashi_source: false,
        }
    }
}

/// Schaff Trend Cycle parameters and gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StcConfig {
    pub length: usize,
    pub fast_length: usize,
    pub slow_length: usize,
    pub alpha: f64,
    /// Long entries need `stc > long_threshold`.
    pub long_threshold: f64,
    /// Short entries need `stc > short_threshold`.
    pub short_threshold: f64,
}

impl Default for StcConfig {
    fn default() -> Self {
        Self {
            length: 80,
            fast_length: 27,
            slow_length: 50,
            alpha: 0.5,
            long_threshold: 25.0,
            short_threshold: 75.0,
        }
    }
}

/// Bracket sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    /// Stop distance beyond the bar extreme, in ATRs.
    pub atr_multiplier: f64,
    /// Target distance in multiples of the stop distance; also the minimum R.
    pub reward_risk_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            atr_multiplier: 0.4,
            reward_risk_ratio: 2.5,
        }
    }
}

/// Hull trend filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HullConfig {
    pub source: PriceSource,
    pub variant: HullVariant,
    pub length: usize,
    pub length_multiplier: f64,
}

impl HullConfig {
    /// `length × length_multiplier`, truncated.
    pub fn effective_length(&self) -> usize {
        (self.length as f64 * self.length_multiplier) as usize
    }
}

impl Default for HullConfig {
    fn default() -> Self {
        Self {
            source: PriceSource::Close,
            variant: HullVariant::Hma,
            length: 40,
            length_multiplier: 1.0,
        }
    }
}

/// Entry session window, UTC hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub start_hour_utc: u32,
    pub end_hour_utc: u32,
}

impl SessionConfig {
    pub fn window(&self) -> SessionWindow {
        SessionWindow::new(self.start_hour_utc, self.end_hour_utc)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_hour_utc: 0,
            end_hour_utc: 16,
        }
    }
}

/// How often the breakeven rule may move the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakevenMode {
    /// Move the stop once, then never again.
    #[default]
    Once,
    /// Latch the level once, then restate it on every bar the trigger
    /// still holds, for executors that need the exit instruction re-sent.
    Reissue,
}

/// Breakeven stop rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakevenConfig {
    /// Open profit, in R, that arms the rule.
    pub trigger_r: f64,
    /// New stop = entry ± offset_atr × ATR, on the profitable side.
    pub offset_atr: f64,
    pub mode: BreakevenMode,
}

impl Default for BreakevenConfig {
    fn default() -> Self {
        Self {
            trigger_r: 1.0,
            offset_atr: 0.1,
            mode: BreakevenMode::Once,
        }
    }
}

/// What a validated signal does when a position in the same direction is
/// already open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameDirection {
    /// Keep the open position with its bracket and breakeven state.
    #[default]
    Ignore,
    /// Close the open position and open the new bracket.
    Replace,
}

/// Position handling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionConfig {
    pub same_direction: SameDirection,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    pub ut: UtBotConfig,
    pub stc: StcConfig,
    pub risk: RiskConfig,
    pub hull: HullConfig,
    pub session: SessionConfig,
    pub breakeven: BreakevenConfig,
    pub position: PositionConfig,
}

fn require_length(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositiveLength { field, value });
    }
    require_at_most(field, value as f64)
}

fn require_at_most(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= MAX_LENGTH as f64 {
        Ok(())
    } else {
        Err(ConfigError::LengthTooLarge {
            field,
            value,
            max: MAX_LENGTH,
        })
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveValue { field, value })
    }
}

fn require_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { field, value })
    }
}

fn require_hour(field: &'static str, value: u32, max: u32) -> Result<(), ConfigError> {
    if value <= max {
        Ok(())
    } else {
        Err(ConfigError::SessionHour { field, value, max })
    }
}

impl StrategyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every rule; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("ut.key_value", self.ut.key_value)?;
        require_length("ut.atr_period", self.ut.atr_period)?;

        require_length("stc.length", self.stc.length)?;
        require_length("stc.fast_length", self.stc.fast_length)?;
        require_length("stc.slow_length", self.stc.slow_length)?;
        if self.stc.fast_length >= self.stc.slow_length {
            return Err(ConfigError::FastNotBelowSlow {
                fast: self.stc.fast_length,
                slow: self.stc.slow_length,
            });
        }
        if !(self.stc.alpha > 0.0 && self.stc.alpha <= 1.0) {
            return Err(ConfigError::AlphaOutOfRange(self.stc.alpha));
        }
        require_threshold("stc.long_threshold", self.stc.long_threshold)?;
        require_threshold("stc.short_threshold", self.stc.short_threshold)?;

        require_positive("risk.atr_multiplier", self.risk.atr_multiplier)?;
        require_positive("risk.reward_risk_ratio", self.risk.reward_risk_ratio)?;

        require_length("hull.length", self.hull.length)?;
        require_positive("hull.length_multiplier", self.hull.length_multiplier)?;
        require_at_most(
            "hull effective length",
            self.hull.length as f64 * self.hull.length_multiplier,
        )?;
        let effective = self.hull.effective_length();
        let min = self.hull.variant.min_length();
        if effective < min {
            return Err(ConfigError::HullTooShort {
                variant: self.hull.variant,
                effective,
                min,
            });
        }

        // a window opening at hour 24 would never contain a bar
        require_hour("session.start_hour_utc", self.session.start_hour_utc, 23)?;
        require_hour("session.end_hour_utc", self.session.end_hour_utc, 24)?;
        if self.session.start_hour_utc == self.session.end_hour_utc {
            return Err(ConfigError::EmptySession(self.session.start_hour_utc));
        }

        require_positive("breakeven.trigger_r", self.breakeven.trigger_r)?;
        if !(self.breakeven.offset_atr.is_finite() && self.breakeven.offset_atr >= 0.0) {
            return Err(ConfigError::NegativeOffset(self.breakeven.offset_atr));
        }
        Ok(())
    }

    /// Bars before every indicator can produce a value (ignoring zero-range
    /// delays in the STC).
    pub fn warmup_bars(&self) -> usize {
        use crate::indicators::{HullSmoother, SeriesIndicator, StcOscillator};
        let atr = self.ut.atr_period - 1;
        let hull = HullSmoother::new(self.hull.variant, self.hull.effective_length()).lookback();
        let stc = StcOscillator::new(
            self.stc.length,
            self.stc.fast_length,
            self.stc.slow_length,
            self.stc.alpha,
        )
        .lookback();
        atr.max(hull).max(stc)
    }
}
