//! Whole-slice replay: fold every bar through a fresh engine.

use serde::{Deserialize, Serialize};

use super::{Engine, EngineError, EngineState};
use crate::config::StrategyConfig;
use crate::domain::Bar;
use crate::events::{BarMarkers, EngineEvent, SignalEvent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub events: Vec<EngineEvent>,
    pub markers: Vec<BarMarkers>,
    pub final_state: EngineState,
}

impl RunOutput {
    pub fn signals(&self) -> impl Iterator<Item = &SignalEvent> {
        self.events.iter().filter_map(|e| match e {
            EngineEvent::Signal(s) => Some(s),
            _ => None,
        })
    }
}

/// Replay `bars` from a fresh state. Stops at the first rejected bar.
///
/// Exits are not simulated here; positions only close by reversal, or by
/// replacement under [`SameDirection::Replace`](crate::config::SameDirection).
pub fn run(config: &StrategyConfig, bars: &[Bar]) -> Result<RunOutput, EngineError> {
    let mut engine = Engine::new(config.clone())?;
    let mut events = Vec::new();
    let mut markers = Vec::with_capacity(bars.len());

    for bar in bars {
        let output = engine.step(bar)?;
        markers.push(output.markers());
        events.extend(output.events);
    }

    Ok(RunOutput {
        events,
        markers,
        final_state: engine.state().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn empty_input_gives_empty_output() {
        let out = run(&StrategyConfig::default(), &[]).unwrap();
        assert!(out.events.is_empty());
        assert!(out.markers.is_empty());
        assert_eq!(out.final_state.bars_seen, 0);
    }

    #[test]
    fn one_marker_per_bar() {
        let closes: Vec<f64> = (0..25).map(|i| 50.0 + i as f64).collect();
        let out = run(&StrategyConfig::default(), &make_bars(&closes)).unwrap();
        assert_eq!(out.markers.len(), 25);
        assert_eq!(out.markers[24].bar_index, 24);
        assert_eq!(out.signals().count(), 0);
    }

    #[test]
    fn stops_at_first_bad_bar() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].timestamp = bars[0].timestamp;
        assert!(run(&StrategyConfig::default(), &bars).is_err());
    }
}
