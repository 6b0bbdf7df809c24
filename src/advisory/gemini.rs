//! Gemini-backed advisor
//!
//! Sends the recent history to the `generateContent` endpoint with a JSON
//! response schema and reads the insight out of the first candidate's text.
//! The request itself goes through `fetch` on wasm; native builds have no
//! network client and report `Unavailable`.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{AdviceFuture, Advisor, AdvisoryError, Insight, RiskLevel};
use crate::consts::ADVISORY_WINDOW;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL, the model and `:generateContent` are appended
    pub endpoint: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

/// Prompt for the recent multipliers (at most `ADVISORY_WINDOW` of them)
pub fn build_prompt(recent: &[f64]) -> String {
    let history = recent
        .iter()
        .take(ADVISORY_WINDOW)
        .map(|m| format!("{:.2}", m))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze this aviator game history: [{}]. \
         Provide a playful \"AI Strategy Insight\" for a simulation. \
         Do not give real financial advice. \
         Include a sentiment, a recommendation, and a risk level.",
        history
    )
}

/// Request body asking for structured JSON output
pub fn request_body(recent: &[f64]) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": build_prompt(recent) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "sentiment": { "type": "STRING" },
                    "recommendation": { "type": "STRING" },
                    "riskLevel": {
                        "type": "STRING",
                        "description": "One of: Low, Medium, High"
                    }
                },
                "required": ["sentiment", "recommendation", "riskLevel"]
            }
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInsight {
    sentiment: String,
    recommendation: String,
    risk_level: String,
}

/// Parse the insight JSON the model produced
pub fn parse_insight(text: &str) -> Result<Insight, AdvisoryError> {
    let raw: RawInsight = serde_json::from_str(text.trim())?;
    let risk_level = RiskLevel::parse(&raw.risk_level)
        .ok_or_else(|| AdvisoryError::Parse(format!("unknown risk level '{}'", raw.risk_level)))?;
    Ok(Insight {
        sentiment: raw.sentiment,
        recommendation: raw.recommendation,
        risk_level,
    })
}

/// Pull the candidate text out of a `generateContent` response and parse it
pub fn parse_response(body: &str) -> Result<Insight, AdvisoryError> {
    let value: Value = serde_json::from_str(body)?;
    let text = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or(AdvisoryError::MissingText)?;
    parse_insight(text)
}

/// Networked advisor
#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    config: GeminiConfig,
}

impl GeminiAdvisor {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

impl Advisor for GeminiAdvisor {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn advise(&self, recent: Vec<f64>) -> AdviceFuture {
        if self.config.api_key.trim().is_empty() {
            return Box::pin(std::future::ready(Err(AdvisoryError::Unavailable)));
        }
        let url = self.config.url();
        let body = request_body(&recent).to_string();
        Box::pin(fetch_insight(url, body))
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_insight(url: String, body: String) -> Result<Insight, AdvisoryError> {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    fn js_err(e: JsValue) -> AdvisoryError {
        AdvisoryError::Network(format!("{:?}", e))
    }

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(&body));

    let request = Request::new_with_str_and_init(&url, &opts).map_err(js_err)?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(js_err)?;

    let window = web_sys::window().ok_or(AdvisoryError::Unavailable)?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_err)?;
    let response: Response = response.dyn_into().map_err(js_err)?;
    if !response.ok() {
        return Err(AdvisoryError::Status(response.status()));
    }

    let text = JsFuture::from(response.text().map_err(js_err)?)
        .await
        .map_err(js_err)?
        .as_string()
        .ok_or(AdvisoryError::MissingText)?;
    parse_response(&text)
}

#[cfg(not(target_arch = "wasm32"))]
async fn fetch_insight(_url: String, _body: String) -> Result<Insight, AdvisoryError> {
    Err(AdvisoryError::Unavailable)
}
