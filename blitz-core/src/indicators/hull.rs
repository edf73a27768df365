//! Hull moving average family: the trend filter line.
//!
//! - HMA:  WMA(2*WMA(src, n/2) - WMA(src, n), round(sqrt(n)))
//! - EHMA: the same shape built from EMAs
//! - THMA: WMA(3*WMA(src, b/3) - WMA(src, b/2) - WMA(src, b), b) with b = n/2
//!
//! Sub-lengths use integer division. Output is `None` until every stage
//! has filled its window.

use serde::{Deserialize, Serialize};

use super::ema::Ema;
use super::wma::Wma;
use super::SeriesIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HullVariant {
    #[default]
    Hma,
    Ehma,
    Thma,
}

impl HullVariant {
    /// Shortest effective length for which every sub-window is at least 1.
    pub fn min_length(self) -> usize {
        match self {
            HullVariant::Hma | HullVariant::Ehma => 2,
            HullVariant::Thma => 6,
        }
    }
}

/// Moving-average kernel shared by the HMA and EHMA shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Kernel {
    Weighted(Wma),
    Exponential(Ema),
}

impl Kernel {
    fn new(variant: HullVariant, period: usize) -> Self {
        match variant {
            HullVariant::Ehma => Kernel::Exponential(Ema::new(period)),
            HullVariant::Hma | HullVariant::Thma => Kernel::Weighted(Wma::new(period)),
        }
    }

    fn lookback(&self) -> usize {
        match self {
            Kernel::Weighted(w) => w.lookback(),
            Kernel::Exponential(e) => e.lookback(),
        }
    }

    fn update(&mut self, x: f64) -> Option<f64> {
        match self {
            Kernel::Weighted(w) => w.update(x),
            Kernel::Exponential(e) => e.update(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Stages {
    /// HMA / EHMA: fast = n/2, slow = n, smooth = round(sqrt(n)).
    Hull {
        fast: Kernel,
        slow: Kernel,
        smooth: Kernel,
    },
    /// THMA over base b: third = b/3, half = b/2, full = b, smooth = b.
    Triple {
        third: Wma,
        half: Wma,
        full: Wma,
        smooth: Wma,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullSmoother {
    variant: HullVariant,
    length: usize,
    stages: Stages,
}

impl HullSmoother {
    /// `length` is the effective length (configured length × multiplier).
    pub fn new(variant: HullVariant, length: usize) -> Self {
        assert!(
            length >= variant.min_length(),
            "{variant:?} length must be >= {}",
            variant.min_length()
        );
        let stages = match variant {
            HullVariant::Hma | HullVariant::Ehma => {
                let sqrt_len = ((length as f64).sqrt().round() as usize).max(1);
                Stages::Hull {
                    fast: Kernel::new(variant, length / 2),
                    slow: Kernel::new(variant, length),
                    smooth: Kernel::new(variant, sqrt_len),
                }
            }
            HullVariant::Thma => {
                let base = length / 2;
                Stages::Triple {
                    third: Wma::new(base / 3),
                    half: Wma::new(base / 2),
                    full: Wma::new(base),
                    smooth: Wma::new(base),
                }
            }
        };
        Self {
            variant,
            length,
            stages,
        }
    }

    pub fn variant(&self) -> HullVariant {
        self.variant
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl SeriesIndicator for HullSmoother {
    fn lookback(&self) -> usize {
        match &self.stages {
            Stages::Hull { slow, smooth, .. } => slow.lookback() + smooth.lookback(),
            Stages::Triple { full, smooth, .. } => full.lookback() + smooth.lookback(),
        }
    }

    fn update(&mut self, x: f64) -> Option<f64> {
        match &mut self.stages {
            Stages::Hull { fast, slow, smooth } => {
                let f = fast.update(x);
                let s = slow.update(x);
                match (f, s) {
                    (Some(f), Some(s)) => smooth.update(2.0 * f - s),
                    _ => None,
                }
            }
            Stages::Triple {
                third,
                half,
                full,
                smooth,
            } => {
                let a = third.update(x);
                let b = half.update(x);
                let c = full.update(x);
                match (a, b, c) {
                    (Some(a), Some(b), Some(c)) => smooth.update(3.0 * a - b - c),
                    _ => None,
                }
            }
        }
    }
}
