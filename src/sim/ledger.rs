//! Session ledger: balance and bet size
//!
//! Only the round state machine settles against the ledger. Bet edits are
//! clamped, never rejected with an error.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Balance and current bet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub balance: f64,
    pub current_bet: f64,
}

impl Ledger {
    pub fn new(balance: f64, current_bet: f64) -> Self {
        Self {
            balance: balance.max(0.0),
            current_bet,
        }
    }

    /// Clamp a requested bet into `[0, max_bet]` (non-finite input becomes 0)
    pub fn clamp_bet(amount: f64, max_bet: f64) -> f64 {
        if !amount.is_finite() {
            return 0.0;
        }
        amount.clamp(0.0, max_bet)
    }

    /// Store a clamped bet size
    pub fn set_bet(&mut self, amount: f64, tuning: &Tuning) {
        self.current_bet = Self::clamp_bet(amount, tuning.max_bet);
    }

    /// Whether the current bet can be placed with the current balance
    pub fn can_place(&self, tuning: &Tuning) -> bool {
        self.current_bet >= tuning.min_bet
            && self.current_bet <= tuning.max_bet
            && self.balance >= self.current_bet
    }

    /// Take the stake out of the balance
    pub(crate) fn debit_bet(&mut self) {
        self.balance = (self.balance - self.current_bet).max(0.0);
    }

    /// Pay out the stake at `multiplier`, returns the amount credited
    pub(crate) fn credit_win(&mut self, multiplier: f64) -> f64 {
        let winnings = self.current_bet * multiplier;
        self.balance += winnings;
        winnings
    }
}

/// Parse raw bet-input text like a numeric field: integer part only, junk becomes 0
pub fn parse_bet_input(text: &str) -> f64 {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    // Parsed as f64 so digit strings past i64 still clamp instead of reading as 0
    text[..end].parse::<f64>().unwrap_or(0.0)
}
