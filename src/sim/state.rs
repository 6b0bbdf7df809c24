//! Round state and core simulation types
//!
//! `GameState` is the single owner of round status. Everything outside `sim`
//! reads copies of it; only `tick` mutates it.

use serde::{Deserialize, Serialize};

use super::clock::RoundClock;
use super::crash::{CrashSource, SeededCrashSource};
use super::ledger::Ledger;
use crate::history::RoundHistory;
use crate::tuning::Tuning;

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Waiting for a bet
    #[default]
    Idle,
    /// Bet placed, countdown to take-off
    Starting,
    /// Multiplier climbing
    Flying,
    /// Round over, crash value on display
    Crashed,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Idle => "IDLE",
            RoundStatus::Starting => "STARTING",
            RoundStatus::Flying => "FLYING",
            RoundStatus::Crashed => "CRASHED",
        }
    }

    /// Bet size may be edited and a new bet placed
    pub fn accepts_bets(&self) -> bool {
        matches!(self, RoundStatus::Idle | RoundStatus::Crashed)
    }
}

/// Per-round values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub status: RoundStatus,
    /// Displayed multiplier (frozen at the crash value once crashed)
    pub current_multiplier: f64,
    /// Hidden crash target, drawn at bet placement
    pub crash_multiplier: f64,
    pub is_cashed_out: bool,
    /// Multiplier locked in at cash-out (0 when not cashed out)
    pub cash_out_multiplier: f64,
    /// Round number of the current/last round (0 before the first bet)
    pub round_id: u64,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            status: RoundStatus::Idle,
            current_multiplier: 1.0,
            crash_multiplier: 1.0,
            is_cashed_out: false,
            cash_out_multiplier: 0.0,
            round_id: 0,
        }
    }
}

/// Which delayed transition a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Starting -> Flying
    Start,
    /// Crashed -> Idle
    Reset,
}

/// One-shot delayed transition, bound to the round that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub kind: TimerKind,
    pub due_ms: f64,
    pub round_id: u64,
}

/// Why a bet request was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetRejection {
    RoundInProgress,
    BelowMinimum,
    AboveMaximum,
    InsufficientBalance,
}

/// Things that happened during a tick (for logging, sound, HUD flashes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BetPlaced { round_id: u64, stake: f64 },
    BetRejected { reason: BetRejection },
    BetChanged { amount: f64 },
    BetEditRejected,
    FlightStarted { round_id: u64 },
    CashedOut { round_id: u64, multiplier: f64, winnings: f64 },
    CashOutRejected,
    /// Cash-out window closed; `cashed_out` tells whether the player got out in time
    Crashed { round_id: u64, multiplier: f64, cashed_out: bool },
    RoundReset { round_id: u64 },
}

/// Complete game state
pub struct GameState {
    pub tuning: Tuning,
    pub round: RoundState,
    pub ledger: Ledger,
    pub history: RoundHistory,
    /// Anchored at take-off, `None` outside a flight
    pub clock: Option<RoundClock>,
    /// At most one delayed transition is pending at a time
    pub timer: Option<PendingTimer>,
    /// Time of the last tick (ms)
    pub time_ms: f64,
    crash_source: Box<dyn CrashSource>,
}

impl GameState {
    /// Create a fresh session with a seeded crash source
    pub fn new(seed: u64, balance: f64, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let source = SeededCrashSource::with_floor(seed, tuning.instant_crash_percent);
        Self::with_source(balance, tuning, Box::new(source))
    }

    /// Create a session with an explicit crash source
    pub fn with_source(balance: f64, tuning: Tuning, crash_source: Box<dyn CrashSource>) -> Self {
        let tuning = tuning.sanitized();
        Self {
            round: RoundState::default(),
            ledger: Ledger::new(balance, tuning.default_bet),
            history: RoundHistory::with_capacity(tuning.history_len),
            clock: None,
            timer: None,
            time_ms: 0.0,
            crash_source,
            tuning,
        }
    }

    pub fn status(&self) -> RoundStatus {
        self.round.status
    }

    /// Draw the hidden crash multiplier for a new round
    pub(crate) fn draw_crash_point(&mut self) -> f64 {
        self.crash_source.next_crash_point().max(1.0)
    }

    /// Schedule a delayed transition for the current round, replacing any pending one
    pub(crate) fn schedule(&mut self, kind: TimerKind, due_ms: f64) {
        if let Some(old) = self.timer.replace(PendingTimer {
            kind,
            due_ms,
            round_id: self.round.round_id,
        }) {
            log::debug!("Cancelled pending {:?} timer of round {}", old.kind, old.round_id);
        }
    }

    /// Drop pending timers and stop sampling (teardown)
    pub fn cancel_timers(&mut self) {
        self.timer = None;
        self.clock = None;
    }
}
