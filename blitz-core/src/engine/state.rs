//! Persisted per-bar state, threaded explicitly through the fold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::{Position, TradeIdGen};
use crate::indicators::{HullSmoother, StcOscillator, TrailingStopTracker, VolatilityTracker};
use crate::lifecycle::TradeState;

/// Everything that carries over from one bar to the next.
///
/// Cloneable and serializable so a run can be checkpointed and resumed, and
/// so tests can hand-craft a state and feed it one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Bars accepted so far; also the index the next bar will get.
    pub bars_seen: usize,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub volatility: VolatilityTracker,
    pub trailing: TrailingStopTracker,
    pub hull: HullSmoother,
    pub stc: StcOscillator,
    pub trade_ids: TradeIdGen,
    pub trade: TradeState,
}

impl EngineState {
    /// Fresh state for a validated config.
    pub(crate) fn new(config: &StrategyConfig) -> Self {
        Self {
            bars_seen: 0,
            last_timestamp: None,
            volatility: VolatilityTracker::new(config.ut.atr_period, config.ut.atr_smoothing),
            trailing: TrailingStopTracker::new(config.ut.key_value),
            hull: HullSmoother::new(config.hull.variant, config.hull.effective_length()),
            stc: StcOscillator::new(
                config.stc.length,
                config.stc.fast_length,
                config.stc.slow_length,
                config.stc.alpha,
            ),
            trade_ids: TradeIdGen::new(),
            trade: TradeState::Flat,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.trade.position()
    }
}
