//! SkyHigh Sim - a crash-game simulator
//!
//! Core modules:
//! - `sim`: Round engine (crash generator, clock, state machine, ledger)
//! - `engine`: State container driving `sim` from a frame pump
//! - `history`: Bounded list of crashed rounds
//! - `advisory`: Display-only strategy text (networked + fallback)
//! - `persistence`: Balance load/save
//! - `platform`: Browser/native platform abstraction
//! - `tuning`: Data-driven game balance

pub mod advisory;
pub mod engine;
pub mod history;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use engine::{Engine, Snapshot};
pub use history::{HistoryEntry, RoundHistory};
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Balance granted when nothing is persisted
    pub const INITIAL_BALANCE: f64 = 1000.0;
    /// Bet limits
    pub const MIN_BET: f64 = 10.0;
    pub const MAX_BET: f64 = 5000.0;
    /// Bet size on first launch
    pub const DEFAULT_BET: f64 = 100.0;
    /// Quick-pick bet sizes shown under the bet input
    pub const BET_PRESETS: [f64; 4] = [50.0, 100.0, 200.0, 500.0];

    /// Exponential growth coefficient (multiplier = e^(k * seconds))
    pub const GROWTH_RATE: f64 = 0.05;
    /// Countdown between placing a bet and take-off
    pub const PRE_START_DELAY_MS: f64 = 3000.0;
    /// Time the crash is shown before the round returns to idle
    pub const RESET_DELAY_MS: f64 = 4000.0;

    /// Draws below this percentile crash instantly at 1.00x
    pub const INSTANT_CRASH_PERCENT: f64 = 3.0;

    /// Round history length
    pub const MAX_HISTORY: usize = 20;
    /// Number of recent rounds sent to the advisor
    pub const ADVISORY_WINDOW: usize = 10;

    /// Nominal frame interval used by the headless driver (~60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;
}

/// Round to 2 decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a multiplier the way the HUD shows it ("1.50x")
pub fn format_multiplier(value: f64) -> String {
    format!("{:.2}x", value)
}
