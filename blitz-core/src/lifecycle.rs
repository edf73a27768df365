//! Trade lifecycle: Flat → Open → (closed) → Flat.
//!
//! Entries come from validated signals. While open, the breakeven rule may
//! move the stop once to `entry ± offset × ATR` after open profit reaches the
//! trigger R. Exits are reported by the execution collaborator; this module
//! never decides that a level was filled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BreakevenConfig, BreakevenMode, SameDirection};
use crate::domain::{Bar, Position};
use crate::events::{ExitReason, PositionClosedEvent, SignalEvent, StopAdjustmentEvent};
use crate::risk::BracketLevels;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum TradeState {
    #[default]
    Flat,
    Open(Position),
}

impl TradeState {
    pub fn position(&self) -> Option<&Position> {
        match self {
            TradeState::Flat => None,
            TradeState::Open(p) => Some(p),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, TradeState::Flat)
    }

    /// Live bracket of the open position.
    pub fn bracket(&self) -> Option<BracketLevels> {
        self.position().map(|p| BracketLevels {
            direction: p.direction,
            stop: p.stop_price,
            target: p.target_price,
        })
    }
}

/// An exit reported by the execution side, applied before the next bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitNotice {
    pub reason: ExitReason,
    pub level: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakevenRule {
    pub trigger_r: f64,
    pub offset_atr: f64,
    pub mode: BreakevenMode,
}

impl BreakevenRule {
    pub fn level(&self, position: &Position, atr: f64) -> f64 {
        position.entry_price + position.direction.sign() * self.offset_atr * atr
    }
}

impl From<&BreakevenConfig> for BreakevenRule {
    fn from(config: &BreakevenConfig) -> Self {
        Self {
            trigger_r: config.trigger_r,
            offset_atr: config.offset_atr,
            mode: config.mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLifecycleManager {
    rule: BreakevenRule,
    same_direction: SameDirection,
}

impl TradeLifecycleManager {
    pub fn new(rule: BreakevenRule, same_direction: SameDirection) -> Self {
        Self {
            rule,
            same_direction,
        }
    }

    /// Close the open position, if any.
    pub fn close(
        &self,
        state: &mut TradeState,
        reason: ExitReason,
        exit_level: Option<f64>,
        bar_index: usize,
        timestamp: DateTime<Utc>,
    ) -> Option<PositionClosedEvent> {
        let TradeState::Open(position) = std::mem::take(state) else {
            return None;
        };
        debug!(
            trade = %position.trade_id,
            direction = %position.direction,
            ?reason,
            ?exit_level,
            bar = bar_index,
            "position closed"
        );
        Some(PositionClosedEvent {
            trade_id: position.trade_id,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_level,
            reason,
            bar_index,
            timestamp,
        })
    }

    /// Evaluate the breakeven rule on a closed bar.
    pub fn on_bar(
        &self,
        state: &mut TradeState,
        bar: &Bar,
        bar_index: usize,
        atr: Option<f64>,
    ) -> Option<StopAdjustmentEvent> {
        let TradeState::Open(position) = state else {
            return None;
        };
        let atr = atr?;
        let open_r = position.open_r(bar.close)?;
        if open_r < self.rule.trigger_r {
            return None;
        }

        let previous_stop = position.stop_price;
        if position.breakeven_applied {
            return match self.rule.mode {
                BreakevenMode::Once => None,
                BreakevenMode::Reissue => Some(StopAdjustmentEvent {
                    trade_id: position.trade_id,
                    direction: position.direction,
                    previous_stop,
                    new_stop: previous_stop,
                    bar_index,
                    timestamp: bar.timestamp,
                }),
            };
        }

        let level = self.rule.level(position, atr);
        if !position.is_tighter_stop(level) {
            return None;
        }
        position.stop_price = level;
        position.breakeven_applied = true;
        debug!(
            trade = %position.trade_id,
            open_r,
            previous_stop,
            new_stop = level,
            bar = bar_index,
            "breakeven stop applied"
        );
        Some(StopAdjustmentEvent {
            trade_id: position.trade_id,
            direction: position.direction,
            previous_stop,
            new_stop: level,
            bar_index,
            timestamp: bar.timestamp,
        })
    }

    /// Open the bracket described by `signal`.
    ///
    /// An opposite-direction position is closed first (`Reversed`). A
    /// same-direction position is either kept as is, leaving the signal
    /// without a bracket, or closed (`Replaced`), per [`SameDirection`].
    pub fn on_signal(
        &self,
        state: &mut TradeState,
        signal: &SignalEvent,
    ) -> Option<PositionClosedEvent> {
        let open = state.position().map(|p| (p.direction, p.trade_id));
        let closed = match open {
            None => None,
            Some((direction, held)) if direction == signal.direction => {
                if self.same_direction == SameDirection::Ignore {
                    debug!(
                        trade = %signal.trade_id,
                        held = %held,
                        bar = signal.bar_index,
                        "same-direction signal ignored, position kept"
                    );
                    return None;
                }
                self.close(state, ExitReason::Replaced, None, signal.bar_index, signal.timestamp)
            }
            Some(_) => self.close(
                state,
                ExitReason::Reversed,
                None,
                signal.bar_index,
                signal.timestamp,
            ),
        };

        *state = TradeState::Open(Position::open(
            signal.trade_id,
            signal.direction,
            signal.entry_price,
            signal.initial_stop,
            signal.initial_target,
            signal.bar_index,
        ));
        debug!(
            trade = %signal.trade_id,
            direction = %signal.direction,
            entry = signal.entry_price,
            stop = signal.initial_stop,
            target = signal.initial_target,
            r = signal.r_multiple,
            bar = signal.bar_index,
            "position opened"
        );
        closed
    }
}
