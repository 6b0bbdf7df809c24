//! SkyHigh Sim entry point
//!
//! On wasm this is the browser driver: DOM controls feed engine commands and a
//! `requestAnimationFrame` loop pumps `Engine::frame`. Natively it is a headless
//! autoplay simulator running the same engine on a virtual 60 Hz clock.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlInputElement, KeyboardEvent, MouseEvent, PageTransitionEvent};

    use skyhigh::advisory::{Insight, advisor_from_settings};
    use skyhigh::consts::BET_PRESETS;
    use skyhigh::persistence::LocalStorageStore;
    use skyhigh::sim::{GameEvent, RoundStatus};
    use skyhigh::{Engine, Settings, Snapshot, format_multiplier, platform};

    /// Game instance holding all state
    struct Game {
        engine: Engine,
        settings: Settings,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, settings: Settings) -> Self {
            let engine = Engine::seeded(
                seed,
                settings.tuning(),
                Box::new(LocalStorageStore::default()),
                advisor_from_settings(&settings),
            );
            Self {
                engine,
                settings,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Advance the engine to `now`
        fn update(&mut self, now: f64, time: f64) -> Vec<GameEvent> {
            let events = self.engine.frame(now);

            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }

            events
        }

        /// Space / primary button: bet when idle, cash out when flying
        fn primary_action(&mut self) {
            match self.engine.snapshot().status {
                RoundStatus::Idle | RoundStatus::Crashed => self.engine.place_bet(),
                RoundStatus::Flying => self.engine.cash_out(),
                RoundStatus::Starting => {}
            }
        }
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_disabled(document: &Document, id: &str, disabled: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = if disabled {
                el.set_attribute("disabled", "")
            } else {
                el.remove_attribute("disabled")
            };
        }
    }

    /// Redraw controls and the multiplier readout from a snapshot
    fn render_snapshot(snap: &Snapshot) {
        let Some(document) = document() else {
            return;
        };

        set_text(&document, "balance", &format!("{:.2}", snap.balance));
        set_text(&document, "panel-balance", &format!("{:.2}", snap.balance));

        if let Some(stage) = document.get_element_by_id("stage") {
            let _ = stage.set_attribute("data-status", snap.status.as_str());
        }

        match snap.status {
            RoundStatus::Starting => set_text(&document, "multiplier", "READY?"),
            _ => set_text(&document, "multiplier", &format_multiplier(snap.current_multiplier)),
        }

        let (label, disabled) = match snap.status {
            RoundStatus::Idle | RoundStatus::Crashed => {
                if snap.current_bet > snap.balance {
                    ("Insufficient".to_string(), true)
                } else {
                    ("Bet".to_string(), !snap.can_place_bet)
                }
            }
            RoundStatus::Starting => ("Wait for Round...".to_string(), true),
            RoundStatus::Flying if snap.is_cashed_out => ("CASHED OUT".to_string(), true),
            RoundStatus::Flying => (format!("Cash Out {:.2}", snap.potential_payout()), false),
        };
        set_text(&document, "action-btn", &label);
        set_disabled(&document, "action-btn", disabled);

        let editable = snap.status.accepts_bets();
        set_disabled(&document, "bet-input", !editable);
        for preset in BET_PRESETS {
            set_disabled(&document, &format!("preset-{}", preset), !editable);
        }
        if let Some(input) = document
            .get_element_by_id("bet-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            // Keep the field in sync with the clamped value
            if input.value().parse::<f64>().ok() != Some(snap.current_bet) {
                input.set_value(&format!("{}", snap.current_bet));
            }
        }
    }

    fn render_history(engine: &Engine) {
        let Some(document) = document() else {
            return;
        };
        let Some(bar) = document.get_element_by_id("history") else {
            return;
        };
        if engine.history().is_empty() {
            bar.set_inner_html("<span class=\"history-empty\">No history yet...</span>");
            return;
        }
        let html: String = engine
            .history()
            .entries()
            .iter()
            .map(|entry| {
                let class = if entry.is_high() { "chip high" } else { "chip" };
                format!(
                    "<div class=\"{}\" data-round=\"{}\">{}</div>",
                    class,
                    entry.id,
                    format_multiplier(entry.multiplier)
                )
            })
            .collect();
        bar.set_inner_html(&html);
    }

    fn render_insight(insight: &Insight) {
        let Some(document) = document() else {
            return;
        };
        set_text(&document, "insight-sentiment", &insight.sentiment);
        set_text(&document, "insight-recommendation", &insight.recommendation);
        set_text(&document, "insight-risk", insight.risk_level.as_str());
        if let Some(el) = document.get_element_by_id("insight-risk") {
            let _ = el.set_attribute("data-risk", insight.risk_level.as_str());
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialised".into());
        }

        log::info!("SkyHigh Sim starting...");

        let settings = Settings::load();
        let seed = platform::session_seed();
        let game = Rc::new(RefCell::new(Game::new(seed, settings)));
        log::info!("Session seeded with {}", seed);

        {
            let mut g = game.borrow_mut();
            g.engine.subscribe(render_snapshot);
            render_snapshot(&g.engine.snapshot());
            render_history(&g.engine);
        }

        if let Some(document) = document() {
            if let Some(loading) = document.get_element_by_id("loading") {
                let _ = loading.set_attribute("class", "hidden");
            }
        }

        setup_controls(game.clone());
        setup_keyboard(game.clone());
        setup_teardown(game.clone());

        request_animation_frame(game);

        log::info!("SkyHigh Sim running!");
    }

    fn setup_controls(game: Rc<RefCell<Game>>) {
        let Some(document) = document() else {
            return;
        };

        // Bet / cash-out button
        if let Some(btn) = document.get_element_by_id("action-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().primary_action();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Bet amount input
        if let Some(input) = document
            .get_element_by_id("bet-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            let game = game.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().engine.set_bet_text(&input_clone.value());
            });
            let _ = input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Preset buttons
        for preset in BET_PRESETS {
            if let Some(btn) = document.get_element_by_id(&format!("preset-{}", preset)) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    game.borrow_mut().engine.set_bet(preset);
                });
                let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            if !g.settings.keyboard_shortcuts {
                return;
            }
            if event.key() == " " {
                event.prevent_default();
                g.primary_action();
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Stop the loop and cancel pending round timers when the page is discarded.
    ///
    /// A page kept in the back/forward cache only pauses: animation frames stop
    /// while it is hidden and the next frame after `pageshow` catches the round up
    /// from absolute time.
    fn setup_teardown(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: PageTransitionEvent| {
            if event.persisted() {
                log::info!("Page cached, pausing");
                return;
            }
            game.borrow_mut().engine.shutdown();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            if !g.engine.is_running() {
                log::info!("Frame loop stopped");
                return;
            }

            let events = g.update(platform::now_ms(), time);
            for event in &events {
                if let GameEvent::Crashed { .. } = event {
                    render_history(&g.engine);
                }
            }

            if g.settings.show_fps {
                if let Some(document) = document() {
                    set_text(&document, "fps", &g.fps.to_string());
                }
            }

            if let Some(pending) = g.engine.take_advice_request() {
                let game = game.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let insight = pending.await;
                    render_insight(&insight);
                    game.borrow_mut().engine.set_insight(insight);
                });
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    headless::run(std::env::args().skip(1).collect());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll, Waker};

    use skyhigh::advisory::advisor_from_settings;
    use skyhigh::consts::FRAME_MS;
    use skyhigh::persistence::FileStore;
    use skyhigh::sim::{CrashSource, FixedCrashSource, GameEvent, RoundStatus, SeededCrashSource};
    use skyhigh::{Engine, Settings, format_multiplier, platform};

    /// Balance file used when `SKYHIGH_BALANCE_FILE` is unset
    const DEFAULT_BALANCE_FILE: &str = "skyhigh_balance.txt";

    /// Safety cap on frames per round (10 minutes of flight)
    const MAX_FRAMES_PER_ROUND: u32 = 60 * 60 * 10;

    struct Options {
        rounds: u32,
        cash_out_at: f64,
        seed: u64,
        /// Crash every round at this multiplier instead of drawing
        fixed_crash: Option<f64>,
    }

    impl Options {
        /// `skyhigh [rounds] [cash_out_at] [seed] [fixed_crash]`
        fn parse(args: &[String]) -> Self {
            Self {
                rounds: args.first().and_then(|s| s.parse().ok()).unwrap_or(10),
                cash_out_at: args.get(1).and_then(|s| s.parse().ok()).unwrap_or(2.0),
                seed: args
                    .get(2)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(platform::session_seed),
                fixed_crash: args
                    .get(3)
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|m| m.is_finite() && *m >= 1.0),
            }
        }
    }

    /// Resolve an already-ready future (native advisors never hit the network)
    fn poll_ready<F: Future + ?Sized>(mut future: Pin<&mut F>) -> Option<F::Output> {
        let mut cx = Context::from_waker(Waker::noop());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(value) => Some(value),
            Poll::Pending => None,
        }
    }

    pub fn run(args: Vec<String>) {
        let options = Options::parse(&args);
        let settings = Settings::load();
        let path = std::env::var("SKYHIGH_BALANCE_FILE")
            .unwrap_or_else(|_| DEFAULT_BALANCE_FILE.to_string());

        log::info!("SkyHigh Sim (headless) starting with seed {}", options.seed);

        let tuning = settings.tuning();
        let source: Box<dyn CrashSource> = match options.fixed_crash {
            Some(m) => {
                log::info!("Every round crashes at {}", format_multiplier(m));
                Box::new(FixedCrashSource::constant(m))
            }
            None => Box::new(SeededCrashSource::with_floor(
                options.seed,
                tuning.instant_crash_percent,
            )),
        };
        let mut engine = Engine::new(
            tuning,
            Box::new(FileStore::new(path)),
            advisor_from_settings(&settings),
            source,
        );
        engine.subscribe(|snap| {
            log::debug!(
                "{} {} balance={:.2}",
                snap.status.as_str(),
                format_multiplier(snap.current_multiplier),
                snap.balance
            );
        });

        let start_balance = engine.snapshot().balance;
        let mut now = platform::now_ms();
        let mut played = 0u32;
        let mut wins = 0u32;

        for _ in 0..options.rounds {
            if !engine.snapshot().can_place_bet {
                println!("Balance too low for another bet, stopping.");
                break;
            }
            engine.place_bet();
            played += 1;

            let mut frames = 0u32;
            loop {
                let events = engine.frame(now);
                now += FRAME_MS;
                frames += 1;

                for event in &events {
                    match event {
                        GameEvent::CashedOut {
                            multiplier,
                            winnings,
                            ..
                        } => {
                            wins += 1;
                            println!("  cashed out at {} for {:.2}", format_multiplier(*multiplier), winnings);
                        }
                        GameEvent::Crashed {
                            round_id,
                            multiplier,
                            cashed_out,
                        } => {
                            println!(
                                "Round {:>3} crashed at {:>8}{}",
                                round_id,
                                format_multiplier(*multiplier),
                                if *cashed_out { "" } else { "  (lost)" }
                            );
                        }
                        _ => {}
                    }
                }

                let snap = engine.snapshot();
                if snap.can_cash_out && snap.current_multiplier >= options.cash_out_at {
                    engine.cash_out();
                }
                if snap.status == RoundStatus::Idle || frames > MAX_FRAMES_PER_ROUND {
                    break;
                }
            }

            if let Some(mut pending) = engine.take_advice_request() {
                if let Some(insight) = poll_ready(pending.as_mut()) {
                    log::info!(
                        "Advisor: {} / {} (risk {})",
                        insight.sentiment,
                        insight.recommendation,
                        insight.risk_level.as_str()
                    );
                    engine.set_insight(insight);
                }
            }
        }

        engine.shutdown();

        let end_balance = engine.snapshot().balance;
        println!();
        println!("Rounds played: {}", played);
        println!("Cash-outs:     {}", wins);
        println!(
            "Balance:       {:.2} -> {:.2} ({:+.2})",
            start_balance,
            end_balance,
            end_balance - start_balance
        );
        let recent: Vec<String> = engine
            .history()
            .entries()
            .iter()
            .take(10)
            .map(|e| format_multiplier(e.multiplier))
            .collect();
        println!("Recent crashes: {}", recent.join(" "));
    }
}
