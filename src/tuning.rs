//! Data-driven game balance
//!
//! Every timing and limit the round engine uses, defaulting to `consts`.

use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Balance for a fresh session
    pub initial_balance: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    /// Bet size before the player edits it
    pub default_bet: f64,
    /// Exponential growth coefficient per second
    pub growth_rate: f64,
    /// Countdown before take-off (ms)
    pub start_delay_ms: f64,
    /// Crash display time before returning to idle (ms)
    pub reset_delay_ms: f64,
    /// Percent of rounds that crash instantly at 1.00x
    pub instant_crash_percent: f64,
    /// Max round history entries
    pub history_len: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_balance: INITIAL_BALANCE,
            min_bet: MIN_BET,
            max_bet: MAX_BET,
            default_bet: DEFAULT_BET,
            growth_rate: GROWTH_RATE,
            start_delay_ms: PRE_START_DELAY_MS,
            reset_delay_ms: RESET_DELAY_MS,
            instant_crash_percent: INSTANT_CRASH_PERCENT,
            history_len: MAX_HISTORY,
        }
    }
}

impl Tuning {
    /// Repair values that would break the round engine
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if !self.growth_rate.is_finite() || self.growth_rate <= 0.0 {
            log::warn!("Invalid growth rate {}, using default", self.growth_rate);
            self.growth_rate = defaults.growth_rate;
        }
        if !self.max_bet.is_finite() || self.max_bet <= 0.0 {
            self.max_bet = defaults.max_bet;
        }
        if !self.min_bet.is_finite() || self.min_bet < 0.0 || self.min_bet > self.max_bet {
            log::warn!(
                "Invalid min bet {} (max {}), using default",
                self.min_bet,
                self.max_bet
            );
            self.min_bet = defaults.min_bet.min(self.max_bet);
        }
        self.default_bet = if self.default_bet.is_finite() {
            self.default_bet.clamp(0.0, self.max_bet)
        } else {
            defaults.default_bet.min(self.max_bet)
        };
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            self.initial_balance = defaults.initial_balance;
        }
        self.start_delay_ms = self.start_delay_ms.max(0.0);
        self.reset_delay_ms = self.reset_delay_ms.max(0.0);
        if self.instant_crash_percent.is_finite() {
            self.instant_crash_percent = self.instant_crash_percent.clamp(0.0, 100.0);
        } else {
            log::warn!(
                "Invalid instant-crash percent {}, using default",
                self.instant_crash_percent
            );
            self.instant_crash_percent = defaults.instant_crash_percent;
        }
        self.history_len = self.history_len.max(1);
        self
    }
}
