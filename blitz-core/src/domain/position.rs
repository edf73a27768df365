use serde::{Deserialize, Serialize};
use std::fmt;

use super::TradeId;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1.0 for long, -1.0 for short. Multiplying a price move by this gives
    /// the move in the trade-favorable sense.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// The single open bracket position (netted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub trade_id: TradeId,
    pub direction: Direction,
    pub entry_price: f64,
    /// Stop at entry; the breakeven rule measures R against this, not the
    /// current stop.
    pub initial_stop: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub opened_at_bar_index: usize,
    /// Set once the breakeven rule has moved the stop.
    pub breakeven_applied: bool,
}

impl Position {
    pub fn open(
        trade_id: TradeId,
        direction: Direction,
        entry_price: f64,
        stop_price: f64,
        target_price: f64,
        bar_index: usize,
    ) -> Self {
        Self {
            trade_id,
            direction,
            entry_price,
            initial_stop: stop_price,
            stop_price,
            target_price,
            opened_at_bar_index: bar_index,
            breakeven_applied: false,
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Distance between entry and the initial stop (1R), always positive for
    /// a well-formed bracket.
    pub fn initial_risk(&self) -> f64 {
        (self.entry_price - self.initial_stop) * self.direction.sign()
    }

    /// Open profit at `price` in R units. `None` when the initial risk is not
    /// positive.
    pub fn open_r(&self, price: f64) -> Option<f64> {
        let risk = self.initial_risk();
        if risk > 0.0 {
            Some((price - self.entry_price) * self.direction.sign() / risk)
        } else {
            None
        }
    }

    /// Whether `candidate` is a strictly tighter stop than the current one.
    pub fn is_tighter_stop(&self, candidate: f64) -> bool {
        match self.direction {
            Direction::Long => candidate > self.stop_price,
            Direction::Short => candidate < self.stop_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_open_r() {
        let pos = Position::open(TradeId(1), Direction::Long, 100.0, 96.0, 110.0, 5);
        assert_eq!(pos.initial_risk(), 4.0);
        assert_eq!(pos.open_r(104.0), Some(1.0));
        assert_eq!(pos.open_r(98.0), Some(-0.5));
    }

    #[test]
    fn short_open_r() {
        let pos = Position::open(TradeId(1), Direction::Short, 100.0, 104.0, 90.0, 5);
        assert_eq!(pos.initial_risk(), 4.0);
        assert_eq!(pos.open_r(92.0), Some(2.0));
    }

    #[test]
    fn degenerate_risk_has_no_r() {
        let pos = Position::open(TradeId(1), Direction::Long, 100.0, 100.0, 110.0, 0);
        assert_eq!(pos.open_r(105.0), None);
    }

    #[test]
    fn tighter_stop_by_side() {
        let long = Position::open(TradeId(1), Direction::Long, 100.0, 96.0, 110.0, 0);
        assert!(long.is_tighter_stop(97.0));
        assert!(!long.is_tighter_stop(95.0));
        let short = Position::open(TradeId(2), Direction::Short, 100.0, 104.0, 90.0, 0);
        assert!(short.is_tighter_stop(103.0));
        assert!(!short.is_tighter_stop(104.0));
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Long.to_string(), "long");
    }
}
