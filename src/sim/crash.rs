//! Crash-point generation
//!
//! Each round draws one uniform percentile `p` in `[0, 100)` and maps it to the
//! multiplier at which the round ends. The tail is heavy: median around 2x, with
//! arbitrarily large values as `p` approaches 100.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::INSTANT_CRASH_PERCENT;
use crate::round2;

/// Map a percentile draw to a crash multiplier using the default instant-crash floor
#[inline]
pub fn crash_point_from_draw(p: f64) -> f64 {
    crash_point_with_floor(p, INSTANT_CRASH_PERCENT)
}

/// Map a percentile draw to a crash multiplier.
///
/// Draws below `instant_percent` crash at exactly 1.00x. Everything else
/// becomes `round2(99 / (100 - p))`, uncapped.
pub fn crash_point_with_floor(p: f64, instant_percent: f64) -> f64 {
    if p < instant_percent {
        return 1.0;
    }
    round2(99.0 / (100.0 - p)).max(1.0)
}

/// Draw a crash multiplier from any RNG
pub fn generate_crash_point<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let p: f64 = rng.random_range(0.0..100.0);
    crash_point_from_draw(p)
}

/// Supplies the hidden crash multiplier for each new round
pub trait CrashSource {
    fn next_crash_point(&mut self) -> f64;
}

/// Production source: seeded PCG so a session can be replayed from its seed
#[derive(Debug, Clone)]
pub struct SeededCrashSource {
    rng: Pcg32,
    instant_percent: f64,
}

impl SeededCrashSource {
    pub fn new(seed: u64) -> Self {
        Self::with_floor(seed, INSTANT_CRASH_PERCENT)
    }

    pub fn with_floor(seed: u64, instant_percent: f64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            instant_percent,
        }
    }
}

impl CrashSource for SeededCrashSource {
    fn next_crash_point(&mut self) -> f64 {
        let p: f64 = self.rng.random_range(0.0..100.0);
        let crash = crash_point_with_floor(p, self.instant_percent);
        log::debug!("Crash draw p={:.4} -> {:.2}x", p, crash);
        crash
    }
}

/// Scripted source: replays the given multipliers in order, repeating the last one
#[derive(Debug, Clone)]
pub struct FixedCrashSource {
    queue: VecDeque<f64>,
    last: f64,
}

impl FixedCrashSource {
    pub fn new(points: impl IntoIterator<Item = f64>) -> Self {
        let queue: VecDeque<f64> = points.into_iter().map(|p| p.max(1.0)).collect();
        let last = queue.back().copied().unwrap_or(1.0);
        Self { queue, last }
    }

    /// Always crash at the same multiplier
    pub fn constant(point: f64) -> Self {
        Self::new([point])
    }
}

impl CrashSource for FixedCrashSource {
    fn next_crash_point(&mut self) -> f64 {
        match self.queue.pop_front() {
            Some(point) => {
                self.last = point;
                point
            }
            None => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_instant_crash_floor() {
        assert_eq!(crash_point_from_draw(0.0), 1.0);
        assert_eq!(crash_point_from_draw(2.999), 1.0);
    }

    #[test]
    fn test_known_draws() {
        // 99 / 97 = 1.0206...
        assert_eq!(crash_point_from_draw(3.0), 1.02);
        assert_eq!(crash_point_from_draw(50.5), 2.0);
        assert_eq!(crash_point_from_draw(90.1), 10.0);
        assert_eq!(crash_point_from_draw(99.01), 100.0);
    }

    #[test]
    fn test_no_cap_near_100() {
        assert!(crash_point_from_draw(99.9999) > 10_000.0);
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = SeededCrashSource::new(42);
        let mut b = SeededCrashSource::new(42);
        for _ in 0..50 {
            assert_eq!(a.next_crash_point(), b.next_crash_point());
        }
    }

    #[test]
    fn test_fixed_source_repeats_last() {
        let mut source = FixedCrashSource::new([2.0, 3.5]);
        assert_eq!(source.next_crash_point(), 2.0);
        assert_eq!(source.next_crash_point(), 3.5);
        assert_eq!(source.next_crash_point(), 3.5);
    }

    #[test]
    fn test_distribution_median_near_two() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut draws: Vec<f64> = (0..10_000).map(|_| generate_crash_point(&mut rng)).collect();
        draws.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = draws[draws.len() / 2];
        assert!((1.8..2.2).contains(&median), "median was {}", median);

        let instant = draws.iter().filter(|&&d| d == 1.0).count() as f64 / draws.len() as f64;
        assert!((0.02..0.045).contains(&instant), "instant share was {}", instant);
    }

    proptest! {
        #[test]
        fn prop_below_floor_is_exactly_one(p in 0.0f64..3.0) {
            prop_assert_eq!(crash_point_from_draw(p), 1.0);
        }

        #[test]
        fn prop_above_floor_matches_formula(p in 3.0f64..99.99) {
            let crash = crash_point_from_draw(p);
            prop_assert_eq!(crash, round2(99.0 / (100.0 - p)));
            prop_assert!(crash >= 1.0);
        }

        #[test]
        fn prop_monotonic_in_draw(p in 3.0f64..99.0, step in 0.01f64..1.0) {
            let lower = 99.0 / (100.0 - p);
            let upper = 99.0 / (100.0 - (p + step));
            prop_assert!(upper > lower);
            prop_assert!(crash_point_from_draw(p + step) >= crash_point_from_draw(p));
        }
    }
}
