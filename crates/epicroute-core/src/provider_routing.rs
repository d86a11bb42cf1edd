//! Provider Routing Table
//!
//! Static configuration mapping a task domain to an execution profile
//! (provider, model, temperature, token budget, system instructions, rate
//! limit) with a one-level fallback chain. The core only decides which
//! profile to use; it never calls a provider.
//!
//! Also hosts the worker roster (epic type to worker tables) and the
//! injected provider-health capability.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::epic_interpreter::EpicType;

/// Provider identifier constants
pub mod providers {
    pub const ANTHROPIC: &str = "anthropic";
    pub const OPENAI: &str = "openai";
}

/// Model identifier constants for easy reference
pub mod models {
    pub const OPUS: &str = "claude-opus-4-20250514";
    pub const SONNET: &str = "claude-sonnet-4-20250514";
    pub const HAIKU: &str = "claude-3-5-haiku-20241022";
    pub const GPT4O: &str = "gpt-4o";
    pub const GPT4O_MINI: &str = "gpt-4o-mini";
}

/// Execution profile for one task domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Task category this profile serves
    pub domain: String,
    pub provider: String,
    pub model: String,
    /// 0.0-2.0
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub rate_limit_per_minute: u32,
    /// At most one level deep
    pub fallback: Option<Box<ProviderProfile>>,
}

impl ProviderProfile {
    pub fn new(
        domain: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            provider: provider.into(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 4096,
            system_prompt: String::new(),
            rate_limit_per_minute: 60,
            fallback: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.rate_limit_per_minute = requests_per_minute;
        self
    }

    pub fn with_fallback(mut self, fallback: ProviderProfile) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Stable identity string, e.g. `anthropic/claude-sonnet-4-20250514`
    pub fn identity(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

/// Injected health/rate-limit view over provider profiles
///
/// Health state lives outside the routing core so the decision logic stays
/// testable without a process-global singleton.
pub trait ProviderHealth: Send + Sync {
    /// Whether the given profile can currently accept work
    fn is_available(&self, profile: &ProviderProfile) -> bool;
}

/// Health view that reports every provider as available
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl ProviderHealth for AlwaysAvailable {
    fn is_available(&self, _profile: &ProviderProfile) -> bool {
        true
    }
}

/// Static domain-to-profile routing table
///
/// Pure lookup; unknown domains resolve to the default profile so routing
/// never blocks on configuration gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRoutingTable {
    profiles: Vec<ProviderProfile>,
    default_profile: ProviderProfile,
}

impl ProviderRoutingTable {
    pub fn new(profiles: Vec<ProviderProfile>, default_profile: ProviderProfile) -> Self {
        Self {
            profiles,
            default_profile,
        }
    }

    pub fn resolve(&self, domain: &str) -> &ProviderProfile {
        match self.profiles.iter().find(|p| p.domain == domain) {
            Some(profile) => profile,
            None => {
                debug!(domain, "no profile for domain, using default");
                &self.default_profile
            }
        }
    }

    pub fn profiles(&self) -> &[ProviderProfile] {
        &self.profiles
    }

    pub fn default_profile(&self) -> &ProviderProfile {
        &self.default_profile
    }
}

impl Default for ProviderRoutingTable {
    fn default() -> Self {
        let profiles = vec![
            ProviderProfile::new("foundation", providers::ANTHROPIC, models::SONNET)
                .with_temperature(0.2)
                .with_system_prompt(
                    "You are an infrastructure specialist. Plan project scaffolding, \
                     tooling, and environment setup.",
                )
                .with_fallback(
                    ProviderProfile::new("foundation", providers::OPENAI, models::GPT4O)
                        .with_temperature(0.2),
                ),
            ProviderProfile::new("development", providers::ANTHROPIC, models::SONNET)
                .with_temperature(0.3)
                .with_system_prompt(
                    "You are a senior backend engineer. Implement features with tests.",
                )
                .with_fallback(
                    ProviderProfile::new("development", providers::OPENAI, models::GPT4O)
                        .with_temperature(0.3),
                ),
            ProviderProfile::new("architecture", providers::ANTHROPIC, models::OPUS)
                .with_temperature(0.2)
                .with_max_tokens(8192)
                .with_system_prompt(
                    "You are a systems architect. Weigh tradeoffs and design for \
                     scalability and migration safety.",
                )
                .with_rate_limit(30)
                .with_fallback(
                    ProviderProfile::new("architecture", providers::OPENAI, models::GPT4O)
                        .with_temperature(0.2)
                        .with_max_tokens(8192),
                ),
            ProviderProfile::new("intelligence", providers::OPENAI, models::GPT4O)
                .with_temperature(0.4)
                .with_system_prompt(
                    "You are an ML engineer. Design classifiers, models, and \
                     evaluation pipelines.",
                )
                .with_fallback(
                    ProviderProfile::new("intelligence", providers::ANTHROPIC, models::OPUS)
                        .with_temperature(0.4),
                ),
            ProviderProfile::new("ui", providers::OPENAI, models::GPT4O_MINI)
                .with_temperature(0.7)
                .with_system_prompt(
                    "You are a frontend engineer. Build accessible, responsive \
                     interfaces.",
                )
                .with_rate_limit(120)
                .with_fallback(
                    ProviderProfile::new("ui", providers::ANTHROPIC, models::HAIKU)
                        .with_temperature(0.7),
                ),
            ProviderProfile::new("integration", providers::ANTHROPIC, models::SONNET)
                .with_temperature(0.3)
                .with_system_prompt(
                    "You are an integration engineer. Wire external systems together \
                     with robust error handling.",
                )
                .with_fallback(
                    ProviderProfile::new("integration", providers::OPENAI, models::GPT4O)
                        .with_temperature(0.3),
                ),
        ];

        let default_profile = ProviderProfile::new("general", providers::ANTHROPIC, models::HAIKU)
            .with_temperature(0.5)
            .with_system_prompt("You are a capable generalist engineer.")
            .with_rate_limit(120)
            .with_fallback(
                ProviderProfile::new("general", providers::OPENAI, models::GPT4O_MINI)
                    .with_temperature(0.5),
            );

        Self::new(profiles, default_profile)
    }
}

/// Worker tables: which worker leads an epic type, and which workers
/// complement it when more agents are recommended
///
/// Tuned data, kept configurable so routing can be recalibrated without
/// redeploying the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRoster {
    primaries: Vec<(EpicType, String)>,
    complements: Vec<(EpicType, Vec<String>)>,
    default_worker: String,
}

impl WorkerRoster {
    pub fn new(
        primaries: Vec<(EpicType, String)>,
        complements: Vec<(EpicType, Vec<String>)>,
        default_worker: impl Into<String>,
    ) -> Self {
        Self {
            primaries,
            complements,
            default_worker: default_worker.into(),
        }
    }

    /// Primary worker for an epic type
    pub fn primary_for(&self, epic_type: EpicType) -> &str {
        self.primaries
            .iter()
            .find(|(t, _)| *t == epic_type)
            .map(|(_, worker)| worker.as_str())
            .unwrap_or(&self.default_worker)
    }

    /// Ordered complementary workers for an epic type
    pub fn complements_for(&self, epic_type: EpicType) -> &[String] {
        self.complements
            .iter()
            .find(|(t, _)| *t == epic_type)
            .map(|(_, workers)| workers.as_slice())
            .unwrap_or(&[])
    }
}

fn roster_entry(epic_type: EpicType, workers: &[&str]) -> (EpicType, Vec<String>) {
    (
        epic_type,
        workers.iter().map(|w| (*w).to_string()).collect(),
    )
}

impl Default for WorkerRoster {
    fn default() -> Self {
        let primaries = vec![
            (EpicType::Foundation, "infrastructure-agent".to_string()),
            (EpicType::Development, "backend-agent".to_string()),
            (EpicType::Architecture, "architecture-agent".to_string()),
            (EpicType::Intelligence, "ml-agent".to_string()),
            (EpicType::Ui, "frontend-agent".to_string()),
            (EpicType::Integration, "integration-agent".to_string()),
        ];

        let complements = vec![
            roster_entry(
                EpicType::Foundation,
                &["devops-agent", "config-agent", "test-agent"],
            ),
            roster_entry(
                EpicType::Development,
                &["api-agent", "test-agent", "docs-agent"],
            ),
            roster_entry(
                EpicType::Architecture,
                &["backend-agent", "database-agent", "devops-agent", "test-agent"],
            ),
            roster_entry(
                EpicType::Intelligence,
                &["data-agent", "backend-agent", "test-agent"],
            ),
            roster_entry(EpicType::Ui, &["design-agent", "test-agent"]),
            roster_entry(
                EpicType::Integration,
                &["api-agent", "devops-agent", "test-agent"],
            ),
            roster_entry(EpicType::General, &["test-agent"]),
        ];

        Self::new(primaries, complements, "generalist-agent")
    }
}
