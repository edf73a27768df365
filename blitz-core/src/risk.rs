//! Bracket sizing for a prospective entry.
//!
//! Long:  stop = low − atr × m,  target = close + (close − stop) × ratio
//! Short: stop = high + atr × m, target = close − (stop − close) × ratio
//!
//! R-multiple is the realized reward/risk of those levels measured from the
//! close. A zero or negative risk distance has no R and yields no quote.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};

/// Which side of a bracket a bar reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Touch {
    Stop,
    Target,
}

/// Stop and target for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketLevels {
    pub direction: Direction,
    pub stop: f64,
    pub target: f64,
}

impl BracketLevels {
    /// Whether the bar's range reached either level. When both were reached
    /// inside one bar the path is unknown, so the stop is reported.
    pub fn touched_by(&self, bar: &Bar) -> Option<Touch> {
        let (stop_hit, target_hit) = match self.direction {
            Direction::Long => (bar.low <= self.stop, bar.high >= self.target),
            Direction::Short => (bar.high >= self.stop, bar.low <= self.target),
        };
        if stop_hit {
            Some(Touch::Stop)
        } else if target_hit {
            Some(Touch::Target)
        } else {
            None
        }
    }

    /// Price at which the touched side would be taken.
    pub fn level(&self, touch: Touch) -> f64 {
        match touch {
            Touch::Stop => self.stop,
            Touch::Target => self.target,
        }
    }
}

/// A priced bracket for entry at the bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskQuote {
    pub entry: f64,
    pub levels: BracketLevels,
    pub r_multiple: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCalculator {
    atr_multiplier: f64,
    reward_ratio: f64,
}

impl RiskCalculator {
    pub fn new(atr_multiplier: f64, reward_ratio: f64) -> Self {
        Self {
            atr_multiplier,
            reward_ratio,
        }
    }

    pub fn reward_ratio(&self) -> f64 {
        self.reward_ratio
    }

    /// Price the bracket for `direction` on a closed bar. `None` when the
    /// risk distance is not strictly positive.
    pub fn quote(&self, direction: Direction, bar: &Bar, atr: f64) -> Option<RiskQuote> {
        let entry = bar.close;
        let pad = atr * self.atr_multiplier;
        let (stop, target, reward, risk) = match direction {
            Direction::Long => {
                let stop = bar.low - pad;
                let target = entry + (entry - stop) * self.reward_ratio;
                (stop, target, target - entry, entry - stop)
            }
            Direction::Short => {
                let stop = bar.high + pad;
                let target = entry - (stop - entry) * self.reward_ratio;
                (stop, target, entry - target, stop - entry)
            }
        };

        if risk.is_nan() || risk <= 0.0 {
            return None;
        }
        let r_multiple = reward / risk;
        if !r_multiple.is_finite() {
            return None;
        }

        Some(RiskQuote {
            entry,
            levels: BracketLevels {
                direction,
                stop,
                target,
            },
            r_multiple,
        })
    }
}
