//! Round engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time is injected by the caller, never read from a wall clock
//! - Crash draws come from an injected source (seeded RNG in production)
//! - No rendering, storage or network dependencies

pub mod clock;
pub mod crash;
pub mod ledger;
pub mod state;
pub mod tick;

pub use clock::{RoundClock, multiplier_at, seconds_to_reach};
pub use crash::{
    CrashSource, FixedCrashSource, SeededCrashSource, crash_point_from_draw,
    crash_point_with_floor, generate_crash_point,
};
pub use ledger::{Ledger, parse_bet_input};
pub use state::{
    BetRejection, GameEvent, GameState, PendingTimer, RoundState, RoundStatus, TimerKind,
};
pub use tick::{Command, TickInput, tick};
