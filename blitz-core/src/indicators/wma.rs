//! Weighted Moving Average (WMA).
//!
//! Linear weights 1..=period, newest value weighted highest.
//! Lookback: period - 1.

use serde::{Deserialize, Serialize};

use super::window::RollingWindow;
use super::SeriesIndicator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wma {
    window: RollingWindow,
    norm: f64,
}

impl Wma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "WMA period must be >= 1");
        Self {
            window: RollingWindow::new(period),
            norm: (period * (period + 1)) as f64 / 2.0,
        }
    }
}

impl SeriesIndicator for Wma {
    fn lookback(&self) -> usize {
        self.window.capacity() - 1
    }

    fn update(&mut self, x: f64) -> Option<f64> {
        self.window.push(x);
        if !self.window.is_full() {
            return None;
        }
        let weighted: f64 = self
            .window
            .iter()
            .enumerate()
            .map(|(i, v)| v * (i + 1) as f64)
            .sum();
        Some(weighted / self.norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, compute, DEFAULT_EPSILON};

    #[test]
    fn wma_3_known_values() {
        // (1*10 + 2*11 + 3*12) / 6 = 68/6
        let out = compute(&mut Wma::new(3), [10.0, 11.0, 12.0, 13.0]);
        assert!(out[1].is_none());
        assert_approx(out[2].unwrap(), 68.0 / 6.0, DEFAULT_EPSILON);
        assert_approx(out[3].unwrap(), 74.0 / 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wma_1_is_identity() {
        let out = compute(&mut Wma::new(1), [4.0, 5.0]);
        assert_eq!(out, vec![Some(4.0), Some(5.0)]);
    }
}
