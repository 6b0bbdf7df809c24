//! Round clock: elapsed flight time -> multiplier
//!
//! Samples are always derived from absolute elapsed time since take-off, never
//! from the previous sample, so uneven frame gaps (throttled or backgrounded tabs)
//! cannot accumulate rounding drift.

use serde::{Deserialize, Serialize};

use crate::round2;

/// Multiplier after `elapsed_secs` of flight: `round2(e^(k * t))`
#[inline]
pub fn multiplier_at(elapsed_secs: f64, growth_rate: f64) -> f64 {
    let t = elapsed_secs.max(0.0);
    round2((growth_rate * t).exp())
}

/// Seconds of flight needed to reach `multiplier` (inverse of `multiplier_at`, unrounded)
pub fn seconds_to_reach(multiplier: f64, growth_rate: f64) -> f64 {
    if multiplier <= 1.0 || growth_rate <= 0.0 {
        return 0.0;
    }
    multiplier.ln() / growth_rate
}

/// Clock anchored at the flight start timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundClock {
    /// Wall-clock time (ms) the flight started
    pub started_at_ms: f64,
    pub growth_rate: f64,
}

impl RoundClock {
    pub fn new(started_at_ms: f64, growth_rate: f64) -> Self {
        Self {
            started_at_ms,
            growth_rate,
        }
    }

    /// Elapsed flight time in seconds at `now_ms`
    #[inline]
    pub fn elapsed_secs(&self, now_ms: f64) -> f64 {
        ((now_ms - self.started_at_ms) / 1000.0).max(0.0)
    }

    /// Multiplier at `now_ms`
    #[inline]
    pub fn sample(&self, now_ms: f64) -> f64 {
        multiplier_at(self.elapsed_secs(now_ms), self.growth_rate)
    }
}
