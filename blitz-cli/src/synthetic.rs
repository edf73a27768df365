//! Seeded random-walk bars for demos and smoke runs.

use blitz_core::domain::Bar;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `count` hourly bars starting at `start`. Same seed, same bars.
pub fn generate(count: usize, seed: u64, start: DateTime<Utc>) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    // slow drift that flips sign now and then, so trends form
    let mut drift = 0.0_f64;

    for i in 0..count {
        if rng.gen_bool(0.02) {
            drift = rng.gen_range(-0.004..0.004);
        }
        let ret: f64 = drift + rng.gen_range(-0.01..0.01);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.006));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.006));

        bars.push(Bar::new(start + Duration::hours(i as i64), open, high, low, close));
        price = close;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn deterministic_per_seed() {
        assert_eq!(generate(200, 42, start()), generate(200, 42, start()));
        assert_ne!(generate(200, 42, start()), generate(200, 43, start()));
    }

    #[test]
    fn bars_are_sane_and_hourly() {
        let bars = generate(500, 1, start());
        assert!(bars.iter().all(|b| b.is_sane()));
        for pair in bars.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::hours(1));
            assert_eq!(pair[1].open, pair[0].close);
        }
    }
}
