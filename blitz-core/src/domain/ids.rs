use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade identifier. Issued once per bar with a validated signal, shared by
/// both directions, never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic trade-ID counter owned by the engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIdGen {
    last: u64,
}

impl TradeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the new ID. The first ID is 1.
    pub fn next_id(&mut self) -> TradeId {
        self.last += 1;
        TradeId(self.last)
    }

    /// The most recently issued ID, if any.
    pub fn last(&self) -> Option<TradeId> {
        (self.last > 0).then_some(TradeId(self.last))
    }
}
