//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Trailing-stop ratchet never loosens while price stays on one side
//! 2. STC stays in [0, 100]; zero-range bars repeat the previous stage value
//! 3. Identical input replays to identical output
//! 4. Trade IDs run 1, 2, 3, ... with no gaps
//! 5. No signal has an R-multiple below the configured ratio
//! 6. Breakeven tightens the stop past entry, once per trade
//! 7. Reversals and replacements are paired with the new signal
//! 8. Same-direction signals leave the open trade alone unless replacing
//! 9. No signal fires before the configured warm-up

use blitz_core::config::{BreakevenMode, SameDirection, StrategyConfig};
use blitz_core::domain::{Bar, Direction, TradeId};
use blitz_core::engine::run;
use blitz_core::events::{EngineEvent, ExitReason};
use blitz_core::indicators::{ratchet, RatchetBranch, SeriesIndicator, StcOscillator};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

// ── Strategies (proptest) ────────────────────────────────────────────

fn fast_config() -> StrategyConfig {
    let mut config = StrategyConfig::default();
    config.ut.atr_period = 3;
    config.ut.key_value = 1.0;
    config.stc.length = 5;
    config.stc.fast_length = 3;
    config.stc.slow_length = 8;
    config.hull.length = 8;
    config.risk.reward_risk_ratio = 1.5;
    config.session.start_hour_utc = 0;
    config.session.end_hour_utc = 24;
    config
}

/// Hourly random-walk bars built from (move, upper wick, lower wick, body).
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(
        (-2.0..2.0_f64, 0.0..1.0_f64, 0.0..1.0_f64, -1.5..1.5_f64),
        20..max_len,
    )
    .prop_map(|steps| {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut price = 100.0_f64;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (step, up, down, body))| {
                price = (price + step).max(5.0);
                let close = price;
                let open = (close - body).max(1.0);
                let high = open.max(close) + up;
                let low = (open.min(close) - down).max(0.5);
                Bar::new(start + Duration::hours(i as i64), open, high, low, close)
            })
            .collect()
    })
}

// ── 1. Ratchet monotonicity ──────────────────────────────────────────

proptest! {
    #[test]
    fn ratchet_never_loosens_in_uptrend(
        prev_stop in 1.0..100.0_f64,
        prev_gap in 0.01..20.0_f64,
        gap in 0.01..20.0_f64,
        loss in 0.0..30.0_f64,
    ) {
        let (stop, branch) = ratchet(prev_stop, Some(prev_stop + prev_gap), prev_stop + gap, loss);
        prop_assert_eq!(branch, RatchetBranch::TrailUp);
        prop_assert!(stop >= prev_stop);
    }

    #[test]
    fn ratchet_never_loosens_in_downtrend(
        prev_stop in 50.0..100.0_f64,
        prev_gap in 0.01..20.0_f64,
        gap in 0.01..20.0_f64,
        loss in 0.0..30.0_f64,
    ) {
        let (stop, branch) = ratchet(prev_stop, Some(prev_stop - prev_gap), prev_stop - gap, loss);
        prop_assert_eq!(branch, RatchetBranch::TrailDown);
        prop_assert!(stop <= prev_stop);
    }
}

// ── 2. STC bounds and carry-forward ──────────────────────────────────

proptest! {
    #[test]
    fn stc_is_bounded(closes in prop::collection::vec(1.0..200.0_f64, 1..300)) {
        let mut stc = StcOscillator::new(10, 3, 8, 0.5);
        for close in closes {
            if let Some(v) = stc.update(close) {
                prop_assert!((-1e-9..=100.0 + 1e-9).contains(&v), "stc {} out of range", v);
            }
        }
    }

    /// MACD drawn from a tiny alphabet so flat windows are common.
    #[test]
    fn stc1_carries_forward_on_flat_window(macd in prop::collection::vec(0u8..3, 1..200)) {
        let len = 3;
        let mut stc = StcOscillator::new(len, 1, 2, 0.5);
        let mut window = VecDeque::new();
        for m in macd {
            let prev = stc.state().stc1;
            stc.update_macd(f64::from(m));
            window.push_back(m);
            if window.len() > len {
                window.pop_front();
            }
            let flat = window.len() == len && window.iter().all(|&x| x == window[0]);
            if flat {
                prop_assert_eq!(stc.state().stc1, prev);
            }
        }
    }
}

// ── 3–7. Engine-level invariants ─────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_is_deterministic(bars in arb_bars(300)) {
        let a = run(&fast_config(), &bars).unwrap();
        let b = run(&fast_config(), &bars).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&a.events).unwrap(),
            serde_json::to_string(&b.events).unwrap()
        );
        prop_assert_eq!(a.markers, b.markers);
    }

    #[test]
    fn trade_ids_are_gapless(bars in arb_bars(400)) {
        let out = run(&fast_config(), &bars).unwrap();
        for (i, signal) in out.signals().enumerate() {
            prop_assert_eq!(signal.trade_id, TradeId(i as u64 + 1));
        }
        let issued = out.signals().count() as u64;
        prop_assert_eq!(out.final_state.trade_ids.last().map(|t| t.0).unwrap_or(0), issued);
    }

    #[test]
    fn signals_meet_reward_risk(bars in arb_bars(400)) {
        let config = fast_config();
        let out = run(&config, &bars).unwrap();
        for signal in out.signals() {
            prop_assert!(signal.r_multiple >= config.risk.reward_risk_ratio);
        }
        // markers agree with emitted signals
        let marked = out.markers.iter().filter(|m| m.valid_long || m.valid_short).count();
        prop_assert_eq!(marked, out.signals().count());
    }

    #[test]
    fn breakeven_only_tightens_once(bars in arb_bars(400)) {
        let out = run(&fast_config(), &bars).unwrap();
        let entries: HashMap<TradeId, f64> =
            out.signals().map(|s| (s.trade_id, s.entry_price)).collect();
        let mut moved: HashMap<TradeId, usize> = HashMap::new();

        for event in &out.events {
            if let EngineEvent::StopAdjusted(adj) = event {
                let entry = entries[&adj.trade_id];
                let sign = adj.direction.sign();
                // tighter than before, and on the profitable side of entry
                prop_assert!((adj.new_stop - adj.previous_stop) * sign > 0.0);
                prop_assert!((adj.new_stop - entry) * sign >= 0.0);
                *moved.entry(adj.trade_id).or_default() += 1;
            }
        }
        prop_assert!(moved.values().all(|&n| n == 1));
    }

    #[test]
    fn reissue_never_changes_the_level(bars in arb_bars(400)) {
        let mut config = fast_config();
        config.breakeven.mode = BreakevenMode::Reissue;
        let out = run(&config, &bars).unwrap();
        let mut latched: HashMap<TradeId, f64> = HashMap::new();
        for event in &out.events {
            if let EngineEvent::StopAdjusted(adj) = event {
                let level = *latched.entry(adj.trade_id).or_insert(adj.new_stop);
                prop_assert_eq!(adj.new_stop, level);
            }
        }
    }

    #[test]
    fn closes_are_paired_with_new_signals(bars in arb_bars(400)) {
        let mut config = fast_config();
        config.position.same_direction = SameDirection::Replace;
        let out = run(&config, &bars).unwrap();
        for pair in out.events.windows(2) {
            if let EngineEvent::PositionClosed(closed) = &pair[0] {
                let EngineEvent::Signal(next) = &pair[1] else {
                    return Err(TestCaseError::fail("close not followed by a signal"));
                };
                prop_assert_eq!(next.bar_index, closed.bar_index);
                match closed.reason {
                    ExitReason::Reversed => {
                        prop_assert_eq!(next.direction, closed.direction.opposite())
                    }
                    ExitReason::Replaced => prop_assert_eq!(next.direction, closed.direction),
                    other => {
                        return Err(TestCaseError::fail(format!("unexpected reason {other:?}")))
                    }
                }
            }
        }
        // the last event can never be a bare close: no exits are simulated
        if let Some(EngineEvent::PositionClosed(_)) = out.events.last() {
            return Err(TestCaseError::fail("dangling close"));
        }
    }

    #[test]
    fn same_direction_signals_keep_the_open_trade(bars in arb_bars(400)) {
        let out = run(&fast_config(), &bars).unwrap();
        let mut open: Option<(TradeId, Direction)> = None;
        for event in &out.events {
            match event {
                EngineEvent::PositionClosed(closed) => {
                    prop_assert_eq!(closed.reason, ExitReason::Reversed);
                    prop_assert_eq!(Some(closed.trade_id), open.map(|(id, _)| id));
                    open = None;
                }
                EngineEvent::Signal(signal) => match open {
                    Some((_, direction)) if direction == signal.direction => {}
                    _ => open = Some((signal.trade_id, signal.direction)),
                },
                EngineEvent::StopAdjusted(adj) => {
                    prop_assert_eq!(Some(adj.trade_id), open.map(|(id, _)| id));
                }
            }
        }
        let held = out.final_state.position().map(|p| p.trade_id);
        prop_assert_eq!(held, open.map(|(id, _)| id));
    }

    #[test]
    fn no_signal_before_warmup(bars in arb_bars(400)) {
        let config = fast_config();
        let warmup = config.warmup_bars();
        let out = run(&config, &bars).unwrap();
        for signal in out.signals() {
            prop_assert!(signal.bar_index >= warmup, "signal at {} < {}", signal.bar_index, warmup);
        }
    }
}
