//! Average True Range (ATR): the volatility tracker.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! bar has no previous close and uses high-low.
//! Smoothing is either a plain average of the last `period` true ranges or
//! Wilder's RMA (alpha = 1/period) seeded with that average.
//! Lookback: period - 1 (valid from the `period`-th bar).

use serde::{Deserialize, Serialize};

use super::window::RollingWindow;
use crate::domain::Bar;

/// How true ranges are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtrSmoothing {
    /// Arithmetic mean of the window.
    #[default]
    Simple,
    /// Wilder's running average.
    Wilder,
}

/// True range of a bar given the previous close, if there is one.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    match prev_close {
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        None => high - low,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityTracker {
    period: usize,
    smoothing: AtrSmoothing,
    window: RollingWindow,
    prev_close: Option<f64>,
    atr: Option<f64>,
}

impl VolatilityTracker {
    pub fn new(period: usize, smoothing: AtrSmoothing) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            smoothing,
            window: RollingWindow::new(period),
            prev_close: None,
            atr: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// Current ATR; `None` during warmup.
    pub fn atr(&self) -> Option<f64> {
        self.atr
    }

    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tr = true_range(bar.high, bar.low, self.prev_close);
        self.prev_close = Some(bar.close);

        self.atr = match (self.smoothing, self.atr) {
            (AtrSmoothing::Wilder, Some(prev)) => {
                let alpha = 1.0 / self.period as f64;
                Some(alpha * tr + (1.0 - alpha) * prev)
            }
            _ => {
                self.window.push(tr);
                self.window
                    .is_full()
                    .then(|| self.window.sum() / self.period as f64)
            }
        };
        self.atr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    fn sample() -> Vec<Bar> {
        make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10 (no prev close)
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, 1, 8) = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = max(6, 4, 2) = 6
            (101.0, 106.0, 100.0, 105.0), // TR = max(6, 5, 1) = 6
        ])
    }

    #[test]
    fn true_range_basic() {
        assert_eq!(true_range(105.0, 95.0, None), 10.0);
        assert_eq!(true_range(108.0, 100.0, Some(102.0)), 8.0);
        // Gap up: prev close 100, bar 108-115
        assert_eq!(true_range(115.0, 108.0, Some(100.0)), 15.0);
    }

    #[test]
    fn simple_atr_period_3() {
        let mut atr = VolatilityTracker::new(3, AtrSmoothing::Simple);
        let out: Vec<_> = sample().iter().map(|b| atr.update(b)).collect();
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert_approx(out[2].unwrap(), 27.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(out[3].unwrap(), 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(out[4].unwrap(), 21.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_atr_period_3() {
        let mut atr = VolatilityTracker::new(3, AtrSmoothing::Wilder);
        let out: Vec<_> = sample().iter().map(|b| atr.update(b)).collect();
        // Seed = mean(10, 8, 9) = 9
        // ATR[3] = (1/3)*6 + (2/3)*9 = 8
        // ATR[4] = (1/3)*6 + (2/3)*8 = 22/3
        assert!(out[1].is_none());
        assert_approx(out[2].unwrap(), 9.0, DEFAULT_EPSILON);
        assert_approx(out[3].unwrap(), 8.0, DEFAULT_EPSILON);
        assert_approx(out[4].unwrap(), 22.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn period_1_is_true_range() {
        let mut atr = VolatilityTracker::new(1, AtrSmoothing::Simple);
        let out: Vec<_> = sample().iter().map(|b| atr.update(b)).collect();
        assert_eq!(out, vec![Some(10.0), Some(8.0), Some(9.0), Some(6.0), Some(6.0)]);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(VolatilityTracker::new(14, AtrSmoothing::Simple).lookback(), 13);
    }
}
