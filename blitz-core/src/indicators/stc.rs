//! Schaff Trend Cycle (STC).
//!
//! A MACD line (EMA fast − EMA slow) is normalized twice by a stochastic over
//! `length` values, each normalization followed by exponential smoothing with
//! `alpha`:
//!
//! 1. `stc1 = (macd − lowest) / (highest − lowest) × 100`
//! 2. `stc2 = stc2' + alpha × (stc1 − stc2')`, first value `stc2 = stc1`
//! 3. `stc3` = stochastic of `stc2`
//! 4. `stc4 = stc4' + alpha × (stc3 − stc4')`, first value `stc4 = stc3`
//!
//! When a stochastic range is zero the stage keeps its previous value
//! instead of dividing by zero. The output is `stc4`.

use serde::{Deserialize, Serialize};

use super::ema::Ema;
use super::window::RollingWindow;
use super::SeriesIndicator;

/// The four persisted stage values; `None` until each stage first resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StcState {
    pub stc1: Option<f64>,
    pub stc2: Option<f64>,
    pub stc3: Option<f64>,
    pub stc4: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StcOscillator {
    fast: Ema,
    slow: Ema,
    alpha: f64,
    macd_window: RollingWindow,
    stc2_window: RollingWindow,
    state: StcState,
}

/// Stochastic position of `value` within a full window, or `None` when the
/// window is still filling or its range is not positive.
fn stochastic(value: f64, window: &RollingWindow) -> Option<f64> {
    let lowest = window.lowest()?;
    let range = window.highest()? - lowest;
    (range > 0.0).then(|| (value - lowest) / range * 100.0)
}

/// Exponential smoothing step; the first input seeds the series.
fn smooth(prev: Option<f64>, x: f64, alpha: f64) -> f64 {
    match prev {
        Some(p) => p + alpha * (x - p),
        None => x,
    }
}

impl StcOscillator {
    pub fn new(length: usize, fast: usize, slow: usize, alpha: f64) -> Self {
        assert!(length >= 1, "STC length must be >= 1");
        assert!(alpha > 0.0 && alpha <= 1.0, "STC alpha must be in (0, 1]");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            alpha,
            macd_window: RollingWindow::new(length),
            stc2_window: RollingWindow::new(length),
            state: StcState::default(),
        }
    }

    pub fn state(&self) -> &StcState {
        &self.state
    }

    /// Current output (`stc4`).
    pub fn value(&self) -> Option<f64> {
        self.state.stc4
    }
}

impl SeriesIndicator for StcOscillator {
    /// Minimum bars before the output can exist: MACD, then two full
    /// stochastic windows. Zero-range windows can delay it further.
    fn lookback(&self) -> usize {
        let macd = self.fast.lookback().max(self.slow.lookback());
        macd + 2 * (self.macd_window.capacity() - 1)
    }

    fn update(&mut self, close: f64) -> Option<f64> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        match (fast, slow) {
            (Some(fast), Some(slow)) => self.update_macd(fast - slow),
            _ => None,
        }
    }
}

impl StcOscillator {
    /// Run the stochastic and smoothing stages on one MACD value.
    pub fn update_macd(&mut self, macd: f64) -> Option<f64> {
        self.macd_window.push(macd);
        if !self.macd_window.is_full() {
            return None;
        }

        let prev = self.state;
        let stc1 = stochastic(macd, &self.macd_window).or(prev.stc1);
        let stc2 = stc1.map(|s1| smooth(prev.stc2, s1, self.alpha));

        let mut stc3 = prev.stc3;
        if let Some(s2) = stc2 {
            self.stc2_window.push(s2);
            if self.stc2_window.is_full() {
                stc3 = stochastic(s2, &self.stc2_window).or(prev.stc3);
            }
        }
        let stc4 = stc3.map(|s3| smooth(prev.stc4, s3, self.alpha));

        self.state = StcState {
            stc1,
            stc2,
            stc3,
            stc4,
        };
        stc4
    }
}
