use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opportunity categories produced by the job service, in tab order.
pub const CATEGORIES: [&str; 3] = ["Real", "Value", "Logic"];

/// Category shown when the client starts.
pub const DEFAULT_CATEGORY: &str = "Real";

/// Model providers the job service knows about. Any other string is still sent as-is.
pub const KNOWN_MODELS: [&str; 2] = ["openai", "gemini"];

/// Source label used when an opportunity does not name its origin.
pub const DEFAULT_SOURCE: &str = "LLM";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub completion_delay: Duration,
    pub refresh_delay: Duration,
    pub initial_category: String,
    /// Whether a run that had already finished before launch is loaded like a fresh completion.
    pub show_finished_on_launch: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:214".into(),
            user_agent: format!("arbitrage-watch/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(2000),
            completion_delay: Duration::from_millis(1000),
            refresh_delay: Duration::from_millis(1000),
            initial_category: DEFAULT_CATEGORY.into(),
            show_finished_on_launch: true,
        }
    }
}

/// Opaque, timestamp-derived label of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunIdentifier(String);

impl RunIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot returned by `GET /api/status`. Superseded by every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub results_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfitPotential {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProfitPotential {
    /// Sort weight: higher sorts first.
    pub fn priority(self) -> u8 {
        match self {
            ProfitPotential::High => 3,
            ProfitPotential::Medium => 2,
            ProfitPotential::Low => 1,
            ProfitPotential::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProfitPotential::High => "High",
            ProfitPotential::Medium => "Medium",
            ProfitPotential::Low => "Low",
            ProfitPotential::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default)]
    pub market_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profit_potential: ProfitPotential,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub source: Option<String>,
}

impl Opportunity {
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }
}

/// Payload of `GET /api/results/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    View(Box<crate::controller::DashboardView>),
    /// Blocking notice the user has to acknowledge.
    Alert(String),
    /// Status line text, such as the outcome of a history reload.
    Info(String),
    ResultsLoaded {
        run: RunIdentifier,
        results: RunResults,
    },
    LoadFailed {
        run: RunIdentifier,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_falls_back_to_llm() {
        let opp: Opportunity = serde_json::from_value(serde_json::json!({
            "type": "Real",
            "market_title": "Will it rain?",
            "description": "YES + NO < 1",
            "profit_potential": "High",
            "confidence": 0.9
        }))
        .unwrap();
        assert_eq!(opp.source, None);
        assert_eq!(opp.source_label(), "LLM");
        assert_eq!(opp.category, "Real");
    }

    #[test]
    fn explicit_source_is_kept() {
        let opp: Opportunity = serde_json::from_value(serde_json::json!({
            "type": "Logic",
            "profit_potential": "Low",
            "confidence": 0.2,
            "source": "Algo"
        }))
        .unwrap();
        assert_eq!(opp.source_label(), "Algo");
        assert_eq!(opp.market_title, "");
    }

    #[test]
    fn missing_opportunities_defaults_to_empty() {
        let results: RunResults = serde_json::from_str("{}").unwrap();
        assert!(results.opportunities.is_empty());
    }

    #[test]
    fn unknown_profit_tier_does_not_reject_payload() {
        let results: RunResults = serde_json::from_value(serde_json::json!({
            "opportunities": [
                { "type": "Value", "profit_potential": "Huge", "confidence": 0.5 },
                { "type": "Value", "confidence": 0.5 }
            ]
        }))
        .unwrap();
        assert_eq!(results.opportunities.len(), 2);
        assert_eq!(
            results.opportunities[0].profit_potential,
            ProfitPotential::Unknown
        );
        assert_eq!(
            results.opportunities[1].profit_potential,
            ProfitPotential::Unknown
        );
    }

    #[test]
    fn status_with_null_results_dir() {
        let status: JobStatus = serde_json::from_value(serde_json::json!({
            "is_running": false,
            "progress": 0,
            "current_step": "Idle",
            "results_dir": null
        }))
        .unwrap();
        assert_eq!(status.results_dir, None);
        assert_eq!(status.current_step, "Idle");
    }

    #[test]
    fn run_identifier_serializes_as_plain_string() {
        let ids: Vec<RunIdentifier> =
            serde_json::from_str(r#"["results_20240101_120000","b"]"#).unwrap();
        assert_eq!(ids[0].as_str(), "results_20240101_120000");
        assert_eq!(ids[1].to_string(), "b");
    }
}
