//! Output events consumed by rendering and execution collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Direction, TradeId};

/// A validated entry with its bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub trade_id: TradeId,
    pub direction: Direction,
    pub entry_price: f64,
    pub initial_stop: f64,
    pub initial_target: f64,
    pub r_multiple: f64,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// The open position's stop moved (or, in reissue mode, was restated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopAdjustmentEvent {
    pub trade_id: TradeId,
    pub direction: Direction,
    pub previous_stop: f64,
    pub new_stop: f64,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopTouched,
    TargetTouched,
    /// Closed by an opposite-direction signal.
    Reversed,
    /// Closed by a same-direction signal under the replace policy.
    Replaced,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub trade_id: TradeId,
    pub direction: Direction,
    pub entry_price: f64,
    /// Level reported by the executor; `None` when the close was not a
    /// level touch.
    pub exit_level: Option<f64>,
    pub reason: ExitReason,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    Signal(SignalEvent),
    StopAdjusted(StopAdjustmentEvent),
    PositionClosed(PositionClosedEvent),
}

impl EngineEvent {
    pub fn bar_index(&self) -> usize {
        match self {
            EngineEvent::Signal(e) => e.bar_index,
            EngineEvent::StopAdjusted(e) => e.bar_index,
            EngineEvent::PositionClosed(e) => e.bar_index,
        }
    }

    pub fn trade_id(&self) -> TradeId {
        match self {
            EngineEvent::Signal(e) => e.trade_id,
            EngineEvent::StopAdjusted(e) => e.trade_id,
            EngineEvent::PositionClosed(e) => e.trade_id,
        }
    }
}

/// Per-bar display markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarMarkers {
    pub bar_index: usize,
    pub valid_long: bool,
    pub valid_short: bool,
}
