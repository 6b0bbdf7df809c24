//! Player settings and preferences
//!
//! Read from LocalStorage, separately from the balance. The page that hosts the
//! game owns writing them.

use serde::{Deserialize, Serialize};

use crate::advisory::gemini::DEFAULT_MODEL;
use crate::consts::DEFAULT_BET;
use crate::tuning::Tuning;

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Advisor ===
    /// Ask the networked advisor for strategy text
    pub advisor_enabled: bool,
    /// Gemini model name
    pub advisor_model: String,
    /// Gemini API key (empty = fallback advisor)
    pub advisor_api_key: String,

    // === Betting ===
    /// Bet size restored on launch
    pub default_bet: f64,
    /// Space bar bets when idle and cashes out when flying
    pub keyboard_shortcuts: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            advisor_enabled: false,
            advisor_model: DEFAULT_MODEL.to_string(),
            advisor_api_key: String::new(),

            default_bet: DEFAULT_BET,
            keyboard_shortcuts: true,

            show_fps: false,
        }
    }
}

impl Settings {
    /// Tuning with the player's preferred starting bet applied
    pub fn tuning(&self) -> Tuning {
        Tuning {
            default_bet: self.default_bet,
            ..Tuning::default()
        }
        .sanitized()
    }

    /// Parse settings JSON, falling back to defaults on junk
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings: {}", e);
                Self::default()
            }
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "skyhigh_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                log::info!("Loaded settings from LocalStorage");
                return Self::from_json(&json);
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Native: settings come from the environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let mut settings = Self::default();
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            settings.advisor_api_key = key;
            settings.advisor_enabled = true;
        }
        settings
    }
}
