//! Advisory text ("AI strategy insight")
//!
//! Display-only commentary on recent crash multipliers. It never feeds back into
//! round outcomes, and any failure is replaced by a fixed neutral insight.

pub mod gemini;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;

pub use gemini::{GeminiAdvisor, GeminiConfig};

/// Risk label shown next to the recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Case-insensitive parse
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "med" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// One piece of advisory text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub sentiment: String,
    pub recommendation: String,
    pub risk_level: RiskLevel,
}

/// Neutral insight substituted whenever the advisor fails
pub fn fallback_insight() -> Insight {
    Insight {
        sentiment: "The data is hazy.".to_string(),
        recommendation: "Trust your gut, pilot!".to_string(),
        risk_level: RiskLevel::Medium,
    }
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisor is not available on this platform or has no credentials")]
    Unavailable,
    #[error("network request failed: {0}")]
    Network(String),
    #[error("advisor returned HTTP {0}")]
    Status(u16),
    #[error("could not parse advisor response: {0}")]
    Parse(String),
    #[error("advisor response had no text")]
    MissingText,
}

impl From<serde_json::Error> for AdvisoryError {
    fn from(e: serde_json::Error) -> Self {
        AdvisoryError::Parse(e.to_string())
    }
}

/// Pending advisor call
pub type AdviceFuture = Pin<Box<dyn Future<Output = Result<Insight, AdvisoryError>>>>;

/// Pending advisor call with the fallback already applied
pub type InsightFuture = Pin<Box<dyn Future<Output = Insight>>>;

/// Advisory capability
pub trait Advisor {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Comment on recent crash multipliers (newest first)
    fn advise(&self, recent: Vec<f64>) -> AdviceFuture;
}

/// Deterministic advisor that always returns the neutral insight
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAdvisor;

impl Advisor for FallbackAdvisor {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn advise(&self, _recent: Vec<f64>) -> AdviceFuture {
        Box::pin(std::future::ready(Ok(fallback_insight())))
    }
}

/// Swallow advisor errors, substituting the neutral insight
pub fn with_fallback(name: &'static str, pending: AdviceFuture) -> InsightFuture {
    Box::pin(async move {
        match pending.await {
            Ok(insight) => insight,
            Err(e) => {
                log::warn!("Advisor '{}' failed, using fallback: {}", name, e);
                fallback_insight()
            }
        }
    })
}

/// Pick the advisor the settings ask for
pub fn advisor_from_settings(settings: &Settings) -> Box<dyn Advisor> {
    if settings.advisor_enabled && !settings.advisor_api_key.trim().is_empty() {
        log::info!("Using Gemini advisor ({})", settings.advisor_model);
        Box::new(GeminiAdvisor::new(GeminiConfig {
            api_key: settings.advisor_api_key.clone(),
            model: settings.advisor_model.clone(),
            ..Default::default()
        }))
    } else {
        log::info!("Using fallback advisor");
        Box::new(FallbackAdvisor)
    }
}
