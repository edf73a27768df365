//! Streaming indicator implementations.
//!
//! Every indicator consumes one closed bar (or one value) at a time and
//! carries its own state, so the engine can fold bars without ever looking
//! back into history or forward into unclosed bars. Warmup is explicit:
//! outputs are `None` until the indicator's lookback is satisfied.

pub mod atr;
pub mod ema;
pub mod hull;
pub mod stc;
pub mod trailing_stop;
pub mod window;
pub mod wma;

pub use atr::{true_range, AtrSmoothing, VolatilityTracker};
pub use ema::Ema;
pub use hull::{HullSmoother, HullVariant};
pub use stc::{StcOscillator, StcState};
pub use trailing_stop::{
    ratchet, RatchetBranch, TrailingStopReading, TrailingStopState, TrailingStopTracker,
    RATCHET_SEED,
};
pub use window::RollingWindow;
pub use wma::Wma;

/// Single-series streaming indicator.
///
/// # Look-ahead contamination guard
/// `update` sees exactly one new value; the output for input t can only
/// depend on inputs 0..=t.
pub trait SeriesIndicator {
    /// Number of inputs consumed before the first `Some` output
    /// (the first valid output is at input index `lookback()`).
    fn lookback(&self) -> usize;

    /// Feed the next value; returns the current output, `None` during warmup.
    fn update(&mut self, value: f64) -> Option<f64>;
}

/// Feed a whole series through an indicator and collect every output.
pub fn compute<I, S>(indicator: &mut I, values: S) -> Vec<Option<f64>>
where
    I: SeriesIndicator + ?Sized,
    S: IntoIterator<Item = f64>,
{
    values.into_iter().map(|v| indicator.update(v)).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLC: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, one day apart
/// at 00:00 UTC.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&data)
}

/// Create bars from (open, high, low, close) tuples, one day apart.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            crate::domain::Bar::new(base + Duration::days(i as i64), open, high, low, close)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_bars_shapes() {
        let bars = make_bars(&[10.0, 12.0]);
        assert_eq!(bars[1].open, 10.0);
        assert_eq!(bars[1].high, 13.0);
        assert_eq!(bars[1].low, 9.0);
        assert!(bars.iter().all(|b| b.is_sane()));
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn compute_collects_every_output() {
        let out = compute(&mut Ema::new(2), [1.0, 3.0, 5.0]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(2.0));
    }
}
