//! ATR trailing stop (UT-Bot ratchet) and its cross events.
//!
//! The stop trails `loss = key * ATR` behind the source. While the source
//! stays on one side of the previous stop for two bars, the stop may only
//! move toward price; otherwise it flips to the other side.
//!
//! Warmup: no stop exists until ATR is available. The first computed stop
//! compares against a previous stop of 0.0 (see [`RATCHET_SEED`]), which
//! decides the first branch. That seed is a value for the ratchet only; cross
//! detection still treats the missing previous stop as "no cross".

use serde::{Deserialize, Serialize};

/// Previous-stop value used by the ratchet before any stop exists.
pub const RATCHET_SEED: f64 = 0.0;

/// Which rule produced the new stop, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatchetBranch {
    /// Source above the stop on this and the previous bar: `max(prev, src - loss)`.
    TrailUp,
    /// Source below the stop on this and the previous bar: `min(prev, src + loss)`.
    TrailDown,
    /// Source moved above the stop: reset to `src - loss`.
    FlipUp,
    /// Anything else: reset to `src + loss`.
    FlipDown,
}

/// One ratchet step. `prev_source` of `None` fails every comparison it takes
/// part in.
pub fn ratchet(
    prev_stop: f64,
    prev_source: Option<f64>,
    source: f64,
    loss: f64,
) -> (f64, RatchetBranch) {
    let prev_above = prev_source.is_some_and(|p| p > prev_stop);
    let prev_below = prev_source.is_some_and(|p| p < prev_stop);

    if source > prev_stop && prev_above {
        (prev_stop.max(source - loss), RatchetBranch::TrailUp)
    } else if source < prev_stop && prev_below {
        (prev_stop.min(source + loss), RatchetBranch::TrailDown)
    } else if source > prev_stop {
        (source - loss, RatchetBranch::FlipUp)
    } else {
        (source + loss, RatchetBranch::FlipDown)
    }
}

/// Persisted tracker state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopState {
    /// `None` until the first stop is computed.
    pub prev_stop: Option<f64>,
    /// `None` before the first bar.
    pub prev_source: Option<f64>,
}

/// Per-bar output of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopReading {
    pub stop: Option<f64>,
    pub branch: Option<RatchetBranch>,
    /// Source crossed from <= to > the stop.
    pub cross_up: bool,
    /// Stop crossed from <= to > the source.
    pub cross_down: bool,
    /// Cross up with the source above the stop on the same bar.
    pub long_trigger: bool,
    /// Cross down with the source below the stop on the same bar.
    pub short_trigger: bool,
}

impl TrailingStopReading {
    fn warming_up() -> Self {
        Self {
            stop: None,
            branch: None,
            cross_up: false,
            cross_down: false,
            long_trigger: false,
            short_trigger: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopTracker {
    key: f64,
    state: TrailingStopState,
}

impl TrailingStopTracker {
    pub fn new(key: f64) -> Self {
        Self::with_state(key, TrailingStopState::default())
    }

    /// Resume from a persisted state.
    pub fn with_state(key: f64, state: TrailingStopState) -> Self {
        Self { key, state }
    }

    pub fn state(&self) -> &TrailingStopState {
        &self.state
    }

    /// Advance one bar. With `atr == None` the source is still remembered so
    /// the first real stop sees the correct previous source.
    pub fn update(&mut self, source: f64, atr: Option<f64>) -> TrailingStopReading {
        let prev_source = self.state.prev_source;
        self.state.prev_source = Some(source);

        let Some(atr) = atr else {
            return TrailingStopReading::warming_up();
        };

        let prev_stop = self.state.prev_stop;
        let (stop, branch) = ratchet(
            prev_stop.unwrap_or(RATCHET_SEED),
            prev_source,
            source,
            self.key * atr,
        );
        self.state.prev_stop = Some(stop);

        let (cross_up, cross_down) = match (prev_source, prev_stop) {
            (Some(ps), Some(pst)) => (
                ps <= pst && source > stop,
                pst <= ps && stop > source,
            ),
            _ => (false, false),
        };

        TrailingStopReading {
            stop: Some(stop),
            branch: Some(branch),
            cross_up,
            cross_down,
            long_trigger: cross_up && source > stop,
            short_trigger: cross_down && source < stop,
        }
    }
}
