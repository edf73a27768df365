//! Replay executor: drives the engine over a bar file and stands in for the
//! execution side.
//!
//! With exit simulation on, each bar is first checked against the open
//! bracket (stop wins when both levels were touched) and the resulting exit
//! is handed to the engine together with that bar.

use anyhow::Result;
use blitz_core::config::StrategyConfig;
use blitz_core::domain::{Bar, Direction};
use blitz_core::engine::{Engine, EngineError};
use blitz_core::events::{EngineEvent, ExitReason};
use blitz_core::fingerprint::{config_fingerprint, EventStreamHasher, Fingerprint};
use blitz_core::lifecycle::ExitNotice;
use blitz_core::risk::Touch;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub bars: usize,
    /// Bars before every indicator is defined; no signal can precede this.
    pub warmup_bars: usize,
    pub rejected_bars: usize,
    pub long_signals: usize,
    pub short_signals: usize,
    pub stop_adjustments: usize,
    pub closes: BTreeMap<String, usize>,
    pub open_at_end: bool,
    pub config_fingerprint: Fingerprint,
    pub events_fingerprint: Fingerprint,
}

impl ReplaySummary {
    pub fn signals(&self) -> usize {
        self.long_signals + self.short_signals
    }
}

fn exit_for(engine: &Engine, bar: &Bar) -> Option<ExitNotice> {
    let levels = engine.state().trade.bracket()?;
    let touch = levels.touched_by(bar)?;
    let reason = match touch {
        Touch::Stop => ExitReason::StopTouched,
        Touch::Target => ExitReason::TargetTouched,
    };
    Some(ExitNotice {
        reason,
        level: Some(levels.level(touch)),
    })
}

/// Replay `bars`, writing one JSON event per line to `out`.
///
/// Bars the engine rejects are skipped and counted; the run continues.
pub fn replay<W: Write>(
    config: &StrategyConfig,
    bars: &[Bar],
    simulate_exits: bool,
    out: &mut W,
) -> Result<ReplaySummary> {
    let mut engine = Engine::new(config.clone())?;
    let mut hasher = EventStreamHasher::new();
    let mut summary = ReplaySummary {
        bars: 0,
        warmup_bars: config.warmup_bars(),
        rejected_bars: 0,
        long_signals: 0,
        short_signals: 0,
        stop_adjustments: 0,
        closes: BTreeMap::new(),
        open_at_end: false,
        config_fingerprint: config_fingerprint(config)?,
        events_fingerprint: hasher.finish(),
    };
    info!(
        config = summary.config_fingerprint.short(),
        bars = bars.len(),
        warmup = summary.warmup_bars,
        "replay started"
    );
    if bars.len() <= summary.warmup_bars {
        warn!(
            bars = bars.len(),
            warmup = summary.warmup_bars,
            "not enough bars to leave warm-up, no signals possible"
        );
    }

    for bar in bars {
        let exit = if simulate_exits {
            exit_for(&engine, bar)
        } else {
            None
        };
        let output = match engine.step_with_exit(bar, exit) {
            Ok(output) => output,
            Err(err @ (EngineError::VoidBar { .. } | EngineError::InsaneBar { .. })) => {
                warn!(%err, "skipping bar");
                summary.rejected_bars += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        summary.bars += 1;

        for event in &output.events {
            let line = hasher.push(event)?;
            writeln!(out, "{line}")?;
            match event {
                EngineEvent::Signal(s) => match s.direction {
                    Direction::Long => summary.long_signals += 1,
                    Direction::Short => summary.short_signals += 1,
                },
                EngineEvent::StopAdjusted(_) => summary.stop_adjustments += 1,
                EngineEvent::PositionClosed(c) => {
                    *summary.closes.entry(format!("{:?}", c.reason)).or_default() += 1;
                }
            }
        }
    }
    out.flush()?;

    summary.open_at_end = engine.state().position().is_some();
    summary.events_fingerprint = hasher.finish();
    info!(
        events = hasher.count(),
        fingerprint = summary.events_fingerprint.short(),
        "replay finished"
    );
    Ok(summary)
}
