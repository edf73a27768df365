//! Signal validation: every gate must pass on the same closed bar.
//!
//! Gates are checked in a fixed order and the first failure is reported, so
//! the per-bar diagnostics are deterministic:
//!
//! 1. trailing-stop trigger in the direction
//! 2. all filter inputs defined (Hull line, STC, ATR)
//! 3. close on the trend side of the Hull line
//! 4. STC above the direction's threshold
//! 5. candle body in the direction
//! 6. bracket priced with a positive risk distance
//! 7. R-multiple at least the reward/risk ratio (exact comparison)
//! 8. bar hour inside the session window

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::StrategyConfig;
use crate::domain::{Bar, Direction, TradeIdGen};
use crate::events::SignalEvent;
use crate::indicators::TrailingStopReading;
use crate::risk::{RiskCalculator, RiskQuote};
use crate::session::SessionWindow;

/// The first gate a candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    NoTrigger,
    Warmup,
    HullFilter,
    StcFilter,
    CandleFilter,
    RiskUndefined,
    RewardRisk,
    Session,
}

/// Outcome of validating one direction on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Validated,
    Rejected(Gate),
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        matches!(self, Verdict::Validated)
    }
}

/// Everything the validator reads for one closed bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar: &'a Bar,
    pub bar_index: usize,
    pub atr: Option<f64>,
    pub trailing: TrailingStopReading,
    pub hull: Option<f64>,
    pub stc: Option<f64>,
}

/// Per-bar result: both verdicts plus the signal, if one fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub long: Verdict,
    pub short: Verdict,
    pub signal: Option<SignalEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalValidator {
    risk: RiskCalculator,
    long_threshold: f64,
    short_threshold: f64,
    session: SessionWindow,
}

impl SignalValidator {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            risk: RiskCalculator::new(config.risk.atr_multiplier, config.risk.reward_risk_ratio),
            long_threshold: config.stc.long_threshold,
            short_threshold: config.stc.short_threshold,
            session: config.session.window(),
        }
    }

    /// Run every gate for `direction`; on success returns the priced bracket.
    pub fn check(&self, direction: Direction, ctx: &BarContext<'_>) -> Result<RiskQuote, Gate> {
        let triggered = match direction {
            Direction::Long => ctx.trailing.long_trigger,
            Direction::Short => ctx.trailing.short_trigger,
        };
        if !triggered {
            return Err(Gate::NoTrigger);
        }

        let (Some(hull), Some(stc), Some(atr)) = (ctx.hull, ctx.stc, ctx.atr) else {
            return Err(Gate::Warmup);
        };
        let bar = ctx.bar;

        let (trend_ok, stc_ok, candle_ok) = match direction {
            Direction::Long => (bar.close > hull, stc > self.long_threshold, bar.is_bullish()),
            Direction::Short => (bar.close < hull, stc > self.short_threshold, bar.is_bearish()),
        };
        if !trend_ok {
            return Err(Gate::HullFilter);
        }
        if !stc_ok {
            return Err(Gate::StcFilter);
        }
        if !candle_ok {
            return Err(Gate::CandleFilter);
        }

        let quote = self
            .risk
            .quote(direction, bar, atr)
            .ok_or(Gate::RiskUndefined)?;
        if quote.r_multiple < self.risk.reward_ratio() {
            return Err(Gate::RewardRisk);
        }

        if !self.session.contains(bar.hour_utc()) {
            return Err(Gate::Session);
        }
        Ok(quote)
    }

    /// Validate both directions and, if one passes, issue the next trade ID.
    ///
    /// Both directions cannot pass together: their triggers need the source
    /// on opposite sides of the same stop.
    pub fn validate(&self, ctx: &BarContext<'_>, ids: &mut TradeIdGen) -> Validation {
        let long = self.check(Direction::Long, ctx);
        let short = self.check(Direction::Short, ctx);

        let verdict = |r: &Result<RiskQuote, Gate>| match r {
            Ok(_) => Verdict::Validated,
            Err(gate) => Verdict::Rejected(*gate),
        };
        let (long_verdict, short_verdict) = (verdict(&long), verdict(&short));

        for (direction, result) in [(Direction::Long, &long), (Direction::Short, &short)] {
            if let Err(gate) = result {
                if *gate != Gate::NoTrigger {
                    trace!(bar = ctx.bar_index, %direction, ?gate, "trigger rejected");
                }
            }
        }

        let signal = long
            .map(|q| (Direction::Long, q))
            .or_else(|_| short.map(|q| (Direction::Short, q)))
            .ok()
            .map(|(direction, quote)| SignalEvent {
                trade_id: ids.next_id(),
                direction,
                entry_price: quote.entry,
                initial_stop: quote.levels.stop,
                initial_target: quote.levels.target,
                r_multiple: quote.r_multiple,
                bar_index: ctx.bar_index,
                timestamp: ctx.bar.timestamp,
            });

        Validation {
            long: long_verdict,
            short: short_verdict,
            signal,
        }
    }
}
