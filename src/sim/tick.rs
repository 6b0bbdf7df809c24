//! Round state machine tick
//!
//! Advances the round to `now_ms`. Order within one tick:
//! 1. fire due timers (Crashed -> Idle, Starting -> Flying)
//! 2. sample the clock and apply the crash check
//! 3. apply queued commands in FIFO order against the resulting state
//!
//! A cash-out that shares a tick with the crash-determining sample is therefore
//! rejected, and one processed in any earlier tick is honoured.

use serde::{Deserialize, Serialize};

use super::clock::RoundClock;
use super::state::{BetRejection, GameEvent, GameState, RoundStatus, TimerKind};

/// Player requests, queued between ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Stake the current bet on the next round
    PlaceBet,
    /// Lock in winnings at the current multiplier
    CashOut,
    /// Edit the bet size (clamped; ignored mid-round)
    SetBet(f64),
}

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Commands in arrival order
    pub commands: Vec<Command>,
}

impl TickInput {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// Advance the game state to `now_ms`
pub fn tick(state: &mut GameState, input: &TickInput, now_ms: f64) -> Vec<GameEvent> {
    let mut events = Vec::new();
    state.time_ms = now_ms;

    fire_timers(state, now_ms, &mut events);

    if state.round.status == RoundStatus::Flying {
        sample_flight(state, now_ms, &mut events);
    }

    for command in &input.commands {
        apply_command(state, *command, now_ms, &mut events);
    }

    events
}

fn fire_timers(state: &mut GameState, now_ms: f64, events: &mut Vec<GameEvent>) {
    let Some(timer) = state.timer else {
        return;
    };
    if now_ms < timer.due_ms {
        return;
    }
    state.timer = None;

    if timer.round_id != state.round.round_id {
        log::warn!(
            "Dropping stale {:?} timer from round {} (current round {})",
            timer.kind,
            timer.round_id,
            state.round.round_id
        );
        return;
    }

    match (timer.kind, state.round.status) {
        (TimerKind::Start, RoundStatus::Starting) => {
            // Anchor at the deadline so a late frame does not shift the curve
            state.clock = Some(RoundClock::new(timer.due_ms, state.tuning.growth_rate));
            state.round.status = RoundStatus::Flying;
            state.round.current_multiplier = 1.0;
            log::info!("Round {} took off", state.round.round_id);
            events.push(GameEvent::FlightStarted {
                round_id: state.round.round_id,
            });
        }
        (TimerKind::Reset, RoundStatus::Crashed) => {
            state.round.status = RoundStatus::Idle;
            log::debug!("Round {} reset to idle", state.round.round_id);
            events.push(GameEvent::RoundReset {
                round_id: state.round.round_id,
            });
        }
        (kind, status) => {
            log::warn!("Ignoring {:?} timer in {:?}", kind, status);
        }
    }
}

fn sample_flight(state: &mut GameState, now_ms: f64, events: &mut Vec<GameEvent>) {
    let Some(clock) = state.clock else {
        return;
    };
    let next = clock.sample(now_ms);

    if next >= state.round.crash_multiplier {
        crash(state, now_ms, events);
    } else if next > state.round.current_multiplier {
        state.round.current_multiplier = next;
    }
}

fn crash(state: &mut GameState, now_ms: f64, events: &mut Vec<GameEvent>) {
    let round = &mut state.round;
    round.status = RoundStatus::Crashed;
    round.current_multiplier = round.crash_multiplier;
    state.clock = None;

    state
        .history
        .record(round.round_id, round.crash_multiplier, now_ms);

    log::info!(
        "Round {} crashed at {:.2}x{}",
        round.round_id,
        round.crash_multiplier,
        if round.is_cashed_out {
            format!(" (cashed out at {:.2}x)", round.cash_out_multiplier)
        } else {
            String::new()
        }
    );
    events.push(GameEvent::Crashed {
        round_id: round.round_id,
        multiplier: round.crash_multiplier,
        cashed_out: round.is_cashed_out,
    });

    let due = now_ms + state.tuning.reset_delay_ms;
    state.schedule(TimerKind::Reset, due);
}

fn apply_command(state: &mut GameState, command: Command, now_ms: f64, events: &mut Vec<GameEvent>) {
    match command {
        Command::PlaceBet => place_bet(state, now_ms, events),
        Command::CashOut => cash_out(state, events),
        Command::SetBet(amount) => set_bet(state, amount, events),
    }
}

fn place_bet(state: &mut GameState, now_ms: f64, events: &mut Vec<GameEvent>) {
    let ledger = &state.ledger;
    let tuning = &state.tuning;

    let rejection = if !state.round.status.accepts_bets() {
        Some(BetRejection::RoundInProgress)
    } else if ledger.current_bet < tuning.min_bet {
        Some(BetRejection::BelowMinimum)
    } else if ledger.current_bet > tuning.max_bet {
        Some(BetRejection::AboveMaximum)
    } else if ledger.balance < ledger.current_bet {
        Some(BetRejection::InsufficientBalance)
    } else {
        None
    };

    if let Some(reason) = rejection {
        log::debug!("Bet ignored: {:?}", reason);
        events.push(GameEvent::BetRejected { reason });
        return;
    }

    state.ledger.debit_bet();
    let crash_multiplier = state.draw_crash_point();

    let round = &mut state.round;
    round.round_id += 1;
    round.status = RoundStatus::Starting;
    round.current_multiplier = 1.0;
    round.crash_multiplier = crash_multiplier;
    round.is_cashed_out = false;
    round.cash_out_multiplier = 0.0;
    state.clock = None;

    let round_id = round.round_id;
    let stake = state.ledger.current_bet;
    // Replaces any pending reset from the previous round
    state.schedule(TimerKind::Start, now_ms + state.tuning.start_delay_ms);

    log::info!(
        "Round {} bet {:.2}, balance now {:.2}",
        round_id,
        stake,
        state.ledger.balance
    );
    events.push(GameEvent::BetPlaced { round_id, stake });
}

fn cash_out(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let round = &mut state.round;
    if round.status != RoundStatus::Flying || round.is_cashed_out {
        events.push(GameEvent::CashOutRejected);
        return;
    }

    let multiplier = round.current_multiplier;
    round.is_cashed_out = true;
    round.cash_out_multiplier = multiplier;
    let winnings = state.ledger.credit_win(multiplier);

    log::info!(
        "Round {} cashed out at {:.2}x for {:.2}",
        round.round_id,
        multiplier,
        winnings
    );
    events.push(GameEvent::CashedOut {
        round_id: round.round_id,
        multiplier,
        winnings,
    });
}

fn set_bet(state: &mut GameState, amount: f64, events: &mut Vec<GameEvent>) {
    if !state.round.status.accepts_bets() {
        events.push(GameEvent::BetEditRejected);
        return;
    }
    state.ledger.set_bet(amount, &state.tuning);
    events.push(GameEvent::BetChanged {
        amount: state.ledger.current_bet,
    });
}
