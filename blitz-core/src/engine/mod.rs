//! Signal engine: folds closed bars into signals and trade events.
//!
//! Per bar, in order:
//!
//! 1. Reject bars that are void, inconsistent, or not after the previous bar
//! 2. Apply an external exit notice, if one came with the bar
//! 3. Update ATR, the UT trailing stop, the Hull line and the STC
//! 4. Evaluate breakeven on the position that was open before this bar
//! 5. Validate both directions; on a signal, open, reverse, or apply the
//!    same-direction policy
//!
//! A rejected bar leaves the state exactly as it was.

pub mod loop_runner;
pub mod state;

pub use loop_runner::{run, RunOutput};
pub use state::EngineState;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{heikin_ashi_close, Bar, PriceSource};
use crate::events::{BarMarkers, EngineEvent};
use crate::indicators::SeriesIndicator;
use crate::lifecycle::{BreakevenRule, ExitNotice, TradeLifecycleManager};
use crate::validator::{BarContext, SignalValidator, Verdict};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bar {index} at {timestamp} is not after the previous bar at {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has a non-finite price")]
    VoidBar {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has inconsistent OHLC (high {high}, low {low})")]
    InsaneBar {
        index: usize,
        timestamp: DateTime<Utc>,
        high: f64,
        low: f64,
    },
}

/// Indicator values after a bar, for display and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub atr: Option<f64>,
    pub ut_stop: Option<f64>,
    pub hull: Option<f64>,
    pub stc: Option<f64>,
}

/// Everything one bar produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarOutput {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub indicators: IndicatorSnapshot,
    pub long: Verdict,
    pub short: Verdict,
    pub events: Vec<EngineEvent>,
}

impl BarOutput {
    pub fn valid_long(&self) -> bool {
        self.long.is_valid()
    }

    pub fn valid_short(&self) -> bool {
        self.short.is_valid()
    }

    pub fn markers(&self) -> BarMarkers {
        BarMarkers {
            bar_index: self.bar_index,
            valid_long: self.valid_long(),
            valid_short: self.valid_short(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: StrategyConfig,
    validator: SignalValidator,
    lifecycle: TradeLifecycleManager,
    state: EngineState,
}

impl Engine {
    pub fn new(config: StrategyConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let state = EngineState::new(&config);
        Ok(Self {
            validator: SignalValidator::new(&config),
            lifecycle: TradeLifecycleManager::new(
                BreakevenRule::from(&config.breakeven),
                config.position.same_direction,
            ),
            state,
            config,
        })
    }

    /// Resume from a checkpointed state produced under the same config.
    pub fn with_state(config: StrategyConfig, state: EngineState) -> Result<Self, EngineError> {
        let mut engine = Self::new(config)?;
        engine.state = state;
        Ok(engine)
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn initial_state(&self) -> EngineState {
        EngineState::new(&self.config)
    }

    pub fn step(&mut self, bar: &Bar) -> Result<BarOutput, EngineError> {
        self.step_with_exit(bar, None)
    }

    /// Process a bar, first applying an exit the executor reported for it.
    pub fn step_with_exit(
        &mut self,
        bar: &Bar,
        exit: Option<ExitNotice>,
    ) -> Result<BarOutput, EngineError> {
        let (next, output) = self.advance(&self.state, bar, exit)?;
        self.state = next;
        Ok(output)
    }

    /// The pure transition `(state, bar) → (state', output)`.
    pub fn advance(
        &self,
        state: &EngineState,
        bar: &Bar,
        exit: Option<ExitNotice>,
    ) -> Result<(EngineState, BarOutput), EngineError> {
        check_bar(state, bar)?;

        let mut next = state.clone();
        let bar_index = next.bars_seen;
        let mut events = Vec::new();

        if let Some(notice) = exit {
            let closed = self.lifecycle.close(
                &mut next.trade,
                notice.reason,
                notice.level,
                bar_index,
                bar.timestamp,
            );
            events.extend(closed.map(EngineEvent::PositionClosed));
        }

        let atr = next.volatility.update(bar);
        let ut_source = if self.config.ut.use_heikin_ashi_source {
            heikin_ashi_close(bar)
        } else {
            bar.close
        };
        let trailing = next.trailing.update(ut_source, atr);
        let hull = next.hull.update(self.hull_source().of(bar));
        let stc = next.stc.update(bar.close);

        let adjustment = self.lifecycle.on_bar(&mut next.trade, bar, bar_index, atr);
        events.extend(adjustment.map(EngineEvent::StopAdjusted));

        let ctx = BarContext {
            bar,
            bar_index,
            atr,
            trailing,
            hull,
            stc,
        };
        let validation = self.validator.validate(&ctx, &mut next.trade_ids);
        if let Some(signal) = validation.signal {
            debug!(
                trade = %signal.trade_id,
                direction = %signal.direction,
                bar = bar_index,
                r = signal.r_multiple,
                "signal validated"
            );
            let closed = self.lifecycle.on_signal(&mut next.trade, &signal);
            events.extend(closed.map(EngineEvent::PositionClosed));
            events.push(EngineEvent::Signal(signal));
        }

        next.bars_seen += 1;
        next.last_timestamp = Some(bar.timestamp);

        let output = BarOutput {
            bar_index,
            timestamp: bar.timestamp,
            indicators: IndicatorSnapshot {
                atr,
                ut_stop: trailing.stop,
                hull,
                stc,
            },
            long: validation.long,
            short: validation.short,
            events,
        };
        Ok((next, output))
    }

    fn hull_source(&self) -> PriceSource {
        self.config.hull.source
    }
}

fn check_bar(state: &EngineState, bar: &Bar) -> Result<(), EngineError> {
    let index = state.bars_seen;
    let err = if bar.is_void() {
        Some(EngineError::VoidBar {
            index,
            timestamp: bar.timestamp,
        })
    } else if !bar.is_sane() {
        Some(EngineError::InsaneBar {
            index,
            timestamp: bar.timestamp,
            high: bar.high,
            low: bar.low,
        })
    } else {
        state
            .last_timestamp
            .filter(|previous| bar.timestamp <= *previous)
            .map(|previous| EngineError::NonIncreasingTimestamp {
                index,
                timestamp: bar.timestamp,
                previous,
            })
    };

    match err {
        Some(err) => {
            warn!(%err, "bar rejected");
            Err(err)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::events::ExitReason;
    use crate::indicators::{make_bars, make_ohlc_bars};
    use chrono::Duration;

    fn engine() -> Engine {
        Engine::new(StrategyConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let mut config = StrategyConfig::default();
        config.stc.alpha = 0.0;
        assert!(matches!(
            Engine::new(config),
            Err(EngineError::Config(ConfigError::AlphaOutOfRange(_)))
        ));
    }

    #[test]
    fn advance_is_pure() {
        let engine = engine();
        let state = engine.initial_state();
        let bars = make_bars(&[100.0, 101.0]);
        let (a, out_a) = engine.advance(&state, &bars[0], None).unwrap();
        let (b, out_b) = engine.advance(&state, &bars[0], None).unwrap();
        assert_eq!(a, b);
        assert_eq!(out_a, out_b);
        assert_eq!(state.bars_seen, 0);
        assert_eq!(a.bars_seen, 1);
        assert_eq!(a.last_timestamp, Some(bars[0].timestamp));
    }

    #[test]
    fn non_increasing_timestamp_leaves_state_unchanged() {
        let mut engine = engine();
        let bars = make_bars(&[100.0, 101.0]);
        engine.step(&bars[1]).unwrap();
        let before = engine.state().clone();

        let err = engine.step(&bars[0]).unwrap_err();
        assert!(matches!(err, EngineError::NonIncreasingTimestamp { index: 1, .. }));
        let err = engine.step(&bars[1]).unwrap_err();
        assert!(matches!(err, EngineError::NonIncreasingTimestamp { .. }));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn void_and_insane_bars_are_rejected() {
        let mut engine = engine();
        let mut bar = make_bars(&[100.0]).remove(0);
        bar.close = f64::NAN;
        assert!(matches!(engine.step(&bar), Err(EngineError::VoidBar { .. })));

        let mut bar = make_bars(&[100.0]).remove(0);
        bar.low = bar.high + 1.0;
        assert!(matches!(engine.step(&bar), Err(EngineError::InsaneBar { .. })));
        assert_eq!(engine.state().bars_seen, 0);
    }

    #[test]
    fn warmup_bars_never_validate() {
        let mut engine = engine();
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        for bar in make_bars(&closes) {
            let out = engine.step(&bar).unwrap();
            // STC needs far more than 60 bars with the default lengths
            assert_eq!(out.indicators.stc, None);
            assert!(!out.valid_long() && !out.valid_short());
            assert!(out.events.is_empty());
        }
    }

    #[test]
    fn exit_notice_on_flat_engine_is_ignored() {
        let mut engine = engine();
        let bar = make_bars(&[100.0]).remove(0);
        let out = engine
            .step_with_exit(
                &bar,
                Some(ExitNotice {
                    reason: ExitReason::External,
                    level: None,
                }),
            )
            .unwrap();
        assert!(out.events.is_empty());
    }

    #[test]
    fn heikin_ashi_source_feeds_the_trailing_stop() {
        let mut config = StrategyConfig::default();
        config.ut.use_heikin_ashi_source = true;
        config.ut.atr_period = 1;
        config.ut.key_value = 1.0;
        let engine = Engine::new(config).unwrap();
        let bar = &make_ohlc_bars(&[(10.0, 12.0, 8.0, 11.0)])[0];
        let (_, out) = engine.advance(&engine.initial_state(), bar, None).unwrap();
        // source = ohlc4 = 10.25, first branch flips up: 10.25 - 1 * 4
        assert_eq!(out.indicators.ut_stop, Some(6.25));
    }

    #[test]
    fn crafted_state_with_open_position_gets_breakeven() {
        let mut config = StrategyConfig::default();
        config.ut.atr_period = 1;
        let engine = Engine::new(config).unwrap();
        let bars = make_ohlc_bars(&[(100.0, 100.5, 99.5, 100.0), (100.0, 104.5, 100.0, 104.0)]);
        let (mut state, _) = engine.advance(&engine.initial_state(), &bars[0], None).unwrap();
        state.trade = crate::lifecycle::TradeState::Open(crate::domain::Position::open(
            state.trade_ids.next_id(),
            Direction::Long,
            100.0,
            96.0,
            110.0,
            0,
        ));

        let (next, out) = engine.advance(&state, &bars[1], None).unwrap();
        // TR = max(4.5, 4.5, 0) = 4.5, level = 100 + 0.1 * 4.5
        let stop = next.position().unwrap().stop_price;
        assert!((stop - 100.45).abs() < 1e-12);
        assert!(matches!(out.events[0], EngineEvent::StopAdjusted(_)));
    }

    #[test]
    fn timestamps_may_have_gaps() {
        let mut engine = engine();
        let mut bars = make_bars(&[100.0, 101.0]);
        bars[1].timestamp = bars[0].timestamp + Duration::days(30);
        engine.step(&bars[0]).unwrap();
        engine.step(&bars[1]).unwrap();
        assert_eq!(engine.state().bars_seen, 2);
    }
}
