//! Game engine: the one place round state lives
//!
//! The driver (animation frame loop, headless simulator or test) calls
//! `frame(now_ms)` once per frame. Player requests are queued with `request`
//! and applied by the next frame, after the crash check. Observers receive
//! `Snapshot` copies, never references into the live state.

use std::collections::VecDeque;

use serde::Serialize;

use crate::advisory::{Advisor, Insight, InsightFuture, with_fallback};
use crate::consts::ADVISORY_WINDOW;
use crate::history::RoundHistory;
use crate::persistence::{BalanceStore, load_balance};
use crate::sim::{
    Command, CrashSource, GameEvent, GameState, RoundStatus, SeededCrashSource, TickInput,
    parse_bet_input, tick,
};
use crate::tuning::Tuning;

/// Read-only view handed to renderers and bet controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: RoundStatus,
    pub current_multiplier: f64,
    /// Revealed only once the round has crashed
    pub crash_multiplier: Option<f64>,
    pub is_cashed_out: bool,
    pub cash_out_multiplier: f64,
    pub balance: f64,
    pub current_bet: f64,
    pub round_id: u64,
    /// Bet button enabled
    pub can_place_bet: bool,
    /// Cash-out button enabled
    pub can_cash_out: bool,
}

impl Snapshot {
    fn of(state: &GameState) -> Self {
        let round = &state.round;
        Self {
            status: round.status,
            current_multiplier: round.current_multiplier,
            crash_multiplier: (round.status == RoundStatus::Crashed)
                .then_some(round.crash_multiplier),
            is_cashed_out: round.is_cashed_out,
            cash_out_multiplier: round.cash_out_multiplier,
            balance: state.ledger.balance,
            current_bet: state.ledger.current_bet,
            round_id: round.round_id,
            can_place_bet: round.status.accepts_bets() && state.ledger.can_place(&state.tuning),
            can_cash_out: round.status == RoundStatus::Flying && !round.is_cashed_out,
        }
    }

    /// What the cash-out button would pay right now
    pub fn potential_payout(&self) -> f64 {
        self.current_bet * self.current_multiplier
    }
}

type Listener = Box<dyn FnMut(&Snapshot)>;

/// Owns the game state and its collaborators
pub struct Engine {
    state: GameState,
    queue: VecDeque<Command>,
    store: Box<dyn BalanceStore>,
    advisor: Box<dyn Advisor>,
    listeners: Vec<Listener>,
    last_snapshot: Snapshot,
    saved_balance: f64,
    insight: Option<Insight>,
    /// Newest history entry advice has been requested for
    advised_round: Option<u64>,
    running: bool,
}

impl Engine {
    /// Create an engine, loading the balance once from `store`
    pub fn new(
        tuning: Tuning,
        store: Box<dyn BalanceStore>,
        advisor: Box<dyn Advisor>,
        crash_source: Box<dyn CrashSource>,
    ) -> Self {
        let tuning = tuning.sanitized();
        let balance = load_balance(store.as_ref(), tuning.initial_balance);
        let state = GameState::with_source(balance, tuning, crash_source);
        let last_snapshot = Snapshot::of(&state);

        Self {
            state,
            queue: VecDeque::new(),
            store,
            advisor,
            listeners: Vec::new(),
            last_snapshot,
            saved_balance: balance,
            insight: None,
            advised_round: None,
            running: true,
        }
    }

    /// Create an engine with seeded crash draws
    pub fn seeded(
        seed: u64,
        tuning: Tuning,
        store: Box<dyn BalanceStore>,
        advisor: Box<dyn Advisor>,
    ) -> Self {
        let tuning = tuning.sanitized();
        let source = SeededCrashSource::with_floor(seed, tuning.instant_crash_percent);
        Self::new(tuning, store, advisor, Box::new(source))
    }

    /// Queue a player request for the next frame
    pub fn request(&mut self, command: Command) {
        if !self.running {
            log::debug!("Engine stopped, dropping {:?}", command);
            return;
        }
        self.queue.push_back(command);
    }

    pub fn place_bet(&mut self) {
        self.request(Command::PlaceBet);
    }

    pub fn cash_out(&mut self) {
        self.request(Command::CashOut);
    }

    pub fn set_bet(&mut self, amount: f64) {
        self.request(Command::SetBet(amount));
    }

    /// Bet edit from raw input text
    pub fn set_bet_text(&mut self, text: &str) {
        self.set_bet(parse_bet_input(text));
    }

    /// Advance to `now_ms`, applying queued requests
    pub fn frame(&mut self, now_ms: f64) -> Vec<GameEvent> {
        if !self.running {
            return Vec::new();
        }

        let input = TickInput::new(self.queue.drain(..).collect());
        let events = tick(&mut self.state, &input, now_ms);

        self.persist_balance();

        let snapshot = Snapshot::of(&self.state);
        if snapshot != self.last_snapshot {
            self.last_snapshot = snapshot;
            for listener in &mut self.listeners {
                listener(&snapshot);
            }
        }

        events
    }

    fn persist_balance(&mut self) {
        let balance = self.state.ledger.balance;
        if balance == self.saved_balance {
            return;
        }
        self.saved_balance = balance;
        if let Err(e) = self.store.save(balance) {
            log::warn!("Failed to save balance {:.2}: {}", balance, e);
        }
    }

    /// Register an observer called after every frame that changed the snapshot
    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Current snapshot (polling)
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(&self.state)
    }

    pub fn history(&self) -> &RoundHistory {
        &self.state.history
    }

    pub fn tuning(&self) -> &Tuning {
        &self.state.tuning
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Ask for fresh advisory text when idle with new history.
    ///
    /// Returns at most one request per crashed round; errors resolve to the
    /// fallback insight.
    pub fn take_advice_request(&mut self) -> Option<InsightFuture> {
        if !self.running || self.state.status() != RoundStatus::Idle {
            return None;
        }
        let latest = self.state.history.latest()?.id;
        if self.advised_round == Some(latest) {
            return None;
        }
        self.advised_round = Some(latest);

        let recent = self.state.history.recent_multipliers(ADVISORY_WINDOW);
        log::debug!("Requesting advice from '{}' for {:?}", self.advisor.name(), recent);
        Some(with_fallback(self.advisor.name(), self.advisor.advise(recent)))
    }

    /// Store advisory text for display
    pub fn set_insight(&mut self, insight: Insight) {
        self.insight = Some(insight);
    }

    pub fn insight(&self) -> Option<&Insight> {
        self.insight.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Teardown: cancel pending timers, drop queued requests, ignore further frames
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.queue.clear();
        self.state.cancel_timers();
        log::info!("Engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::tests::{BrokenAdvisor, resolve};
    use crate::advisory::{FallbackAdvisor, fallback_insight};
    use crate::persistence::MemoryStore;
    use crate::sim::FixedCrashSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    const START: f64 = 3000.0;
    const AT_1_50: f64 = START + 8110.0;
    const AT_2_00: f64 = START + 13870.0;

    fn engine_with(store: &MemoryStore, crash: f64) -> Engine {
        Engine::new(
            Tuning::default(),
            Box::new(store.clone()),
            Box::new(FallbackAdvisor),
            Box::new(FixedCrashSource::constant(crash)),
        )
    }

    #[test]
    fn test_end_to_end_cash_out() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        assert_eq!(engine.snapshot().balance, 1000.0);

        engine.place_bet();
        engine.frame(0.0);
        let snap = engine.snapshot();
        assert_eq!(snap.balance, 900.0);
        assert_eq!(snap.status, RoundStatus::Starting);
        assert_eq!(store.load(), Some(900.0));

        engine.frame(START);
        assert_eq!(engine.snapshot().status, RoundStatus::Flying);
        assert_eq!(engine.snapshot().current_multiplier, 1.0);

        engine.frame(AT_1_50);
        assert_eq!(engine.snapshot().current_multiplier, 1.5);
        assert!(engine.snapshot().can_cash_out);
        engine.cash_out();
        engine.frame(AT_1_50 + 1.0);
        let snap = engine.snapshot();
        assert_eq!(snap.balance, 1050.0);
        assert!(snap.is_cashed_out);
        assert!(!snap.can_cash_out);
        assert_eq!(store.load(), Some(1050.0));

        engine.frame(AT_2_00);
        let snap = engine.snapshot();
        assert_eq!(snap.status, RoundStatus::Crashed);
        assert_eq!(snap.current_multiplier, 2.0);
        assert_eq!(snap.crash_multiplier, Some(2.0));
        assert_eq!(engine.history().entries()[0].multiplier, 2.0);

        engine.frame(AT_2_00 + 4000.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Idle);
        assert_eq!(engine.snapshot().balance, 1050.0);
    }

    #[test]
    fn test_end_to_end_no_cash_out() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        engine.place_bet();
        engine.frame(0.0);

        let mut now = 0.0;
        while engine.snapshot().status != RoundStatus::Crashed {
            now += 1000.0 / 60.0;
            engine.frame(now);
        }
        assert_eq!(engine.snapshot().current_multiplier, 2.0);
        assert_eq!(engine.snapshot().balance, 900.0);
        assert_eq!(store.load(), Some(900.0));
    }

    #[test]
    fn test_loads_persisted_balance_once() {
        let store = MemoryStore::with_raw("40");
        let mut engine = engine_with(&store, 2.0);
        assert_eq!(engine.snapshot().balance, 40.0);
        assert!(!engine.snapshot().can_place_bet);

        engine.place_bet();
        engine.frame(0.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Idle);
        assert_eq!(engine.snapshot().balance, 40.0);
        // Nothing changed, nothing written
        assert_eq!(store.raw().as_deref(), Some("40"));
    }

    #[test]
    fn test_malformed_balance_uses_initial() {
        let store = MemoryStore::with_raw("lots of coins");
        let engine = engine_with(&store, 2.0);
        assert_eq!(engine.snapshot().balance, 1000.0);
    }

    #[test]
    fn test_crash_value_hidden_until_crash() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 3.0);
        engine.place_bet();
        engine.frame(0.0);
        assert_eq!(engine.snapshot().crash_multiplier, None);
        engine.frame(START + 1000.0);
        assert_eq!(engine.snapshot().crash_multiplier, None);
    }

    #[test]
    fn test_observers_get_snapshots_on_change() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        let seen: Rc<RefCell<Vec<RoundStatus>>> = Rc::default();
        {
            let seen = seen.clone();
            engine.subscribe(move |snap| seen.borrow_mut().push(snap.status));
        }

        engine.frame(0.0);
        assert!(seen.borrow().is_empty());

        engine.place_bet();
        engine.frame(0.0);
        engine.frame(100.0);
        engine.frame(START);
        assert_eq!(
            *seen.borrow(),
            vec![RoundStatus::Starting, RoundStatus::Flying]
        );
    }

    #[test]
    fn test_bet_text_edit() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        engine.set_bet_text("750abc");
        engine.frame(0.0);
        assert_eq!(engine.snapshot().current_bet, 750.0);
        engine.set_bet_text("nope");
        engine.frame(0.0);
        assert_eq!(engine.snapshot().current_bet, 0.0);
        assert!(!engine.snapshot().can_place_bet);
    }

    #[test]
    fn test_advice_requested_once_per_idle_round() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 1.2);
        assert!(engine.take_advice_request().is_none());

        engine.place_bet();
        engine.frame(0.0);
        engine.frame(START);
        engine.frame(START + 5000.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Crashed);
        assert!(engine.take_advice_request().is_none());

        engine.frame(START + 9000.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Idle);
        let mut pending = engine.take_advice_request().expect("advice due");
        engine.set_insight(resolve(pending.as_mut()));
        assert_eq!(engine.insight(), Some(&fallback_insight()));
        assert!(engine.take_advice_request().is_none());
    }

    #[test]
    fn test_broken_advisor_falls_back() {
        let mut engine = Engine::new(
            Tuning::default(),
            Box::new(MemoryStore::new()),
            Box::new(BrokenAdvisor),
            Box::new(FixedCrashSource::constant(1.0)),
        );
        engine.place_bet();
        engine.frame(0.0);
        engine.frame(START);
        engine.frame(START + 4000.0);
        let mut pending = engine.take_advice_request().expect("advice due");
        assert_eq!(resolve(pending.as_mut()), fallback_insight());
        // Advice never touches the round
        assert_eq!(engine.snapshot().balance, 900.0);
    }

    #[test]
    fn test_shutdown_cancels_pending_round() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        engine.place_bet();
        engine.frame(0.0);
        engine.shutdown();

        engine.cash_out();
        let events = engine.frame(START + 20_000.0);
        assert!(events.is_empty());
        assert_eq!(engine.snapshot().status, RoundStatus::Starting);
        assert!(engine.state().timer.is_none());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_long_pause_catches_up_on_next_frame() {
        let store = MemoryStore::new();
        let mut engine = engine_with(&store, 2.0);
        engine.place_bet();
        engine.frame(0.0);
        engine.frame(START);
        engine.frame(START + 1000.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Flying);

        // Hidden page: no frames for two minutes, then a late cash-out
        let resumed_at = START + 120_000.0;
        engine.cash_out();
        engine.frame(resumed_at);
        let snap = engine.snapshot();
        assert_eq!(snap.status, RoundStatus::Crashed);
        assert_eq!(snap.current_multiplier, 2.0);
        assert!(!snap.is_cashed_out);
        assert_eq!(snap.balance, 900.0);

        engine.frame(resumed_at + 4000.0);
        assert_eq!(engine.snapshot().status, RoundStatus::Idle);
        assert!(engine.is_running());
    }

    fn play_round(engine: &mut Engine, now: &mut f64) {
        engine.place_bet();
        let round = engine.snapshot().round_id + 1;
        loop {
            *now += 50.0;
            engine.frame(*now);
            let snap = engine.snapshot();
            if snap.round_id == round && snap.status == RoundStatus::Idle {
                break;
            }
        }
    }

    #[test]
    fn test_seeded_engine_repairs_instant_floor() {
        // Find a seed whose draws include an instant crash early on
        let (seed, rounds) = (0..100u64)
            .find_map(|seed| {
                let mut source = SeededCrashSource::new(seed);
                (1..=30)
                    .find(|_| source.next_crash_point() == 1.0)
                    .map(|rounds| (seed, rounds))
            })
            .expect("an instant crash within 30 draws");

        let tuning = Tuning {
            instant_crash_percent: f64::NAN,
            ..Default::default()
        };
        let mut engine = Engine::seeded(
            seed,
            tuning,
            Box::new(MemoryStore::with_raw("1000000")),
            Box::new(FallbackAdvisor),
        );
        let mut now = 0.0;
        for _ in 0..rounds {
            play_round(&mut engine, &mut now);
        }
        assert_eq!(engine.history().latest().map(|e| e.multiplier), Some(1.0));
    }

    #[test]
    fn test_seeded_engines_agree() {
        let engine = || {
            Engine::seeded(
                7,
                Tuning::default(),
                Box::new(MemoryStore::new()),
                Box::new(FallbackAdvisor),
            )
        };
        let (mut a, mut b) = (engine(), engine());
        let mut now = 0.0;
        for round in 1..=5u64 {
            a.place_bet();
            b.place_bet();
            loop {
                now += 50.0;
                a.frame(now);
                b.frame(now);
                assert_eq!(a.snapshot(), b.snapshot());
                let snap = a.snapshot();
                if snap.round_id == round && snap.status == RoundStatus::Idle {
                    break;
                }
            }
        }
        assert_eq!(a.history(), b.history());
        assert_eq!(a.history().len(), 5);
    }
}
