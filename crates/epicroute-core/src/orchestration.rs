//! Orchestration Service
//!
//! Top-level composition: classify the work item, preserve its context,
//! run strategic reasoning, derive the routing recommendation, and
//! assemble the externally visible result plus processing metrics. No
//! step may fail; every step has a safe degraded default.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context_store::ContextStore;
use crate::epic_interpreter::{
    EpicAnalysis, EpicClassifier, EpicType, WeightedKeywordClassifier,
};
use crate::provider_routing::{
    AlwaysAvailable, ProviderHealth, ProviderRoutingTable, WorkerRoster,
};
use crate::strategic_reasoning::{
    MonitoringLevel, RiskLevel, StrategicAnalysis, StrategicReasoningEngine,
};
use crate::work_item::{AnalysisMode, WorkItemInput};

/// How the routed workers should execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Sequential,
    Parallel,
    /// Parallel discovery, sequential commit; used for multi-agent work
    /// at high risk
    Hybrid,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which worker(s) should take the epic, and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRecommendation {
    pub primary: String,
    /// Ordered; may be empty
    pub secondary: Vec<String>,
    pub reasoning: String,
    pub execution_strategy: ExecutionStrategy,
    pub monitoring_required: bool,
}

/// Analysis-derived insights surfaced alongside the routing decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsights {
    /// Always equal to the classification confidence
    pub interpretation_accuracy: f64,
    pub complexity_assessment: String,
    pub suggested_approach: String,
    pub risk_factors: Vec<String>,
    pub success_predictors: Vec<String>,
}

/// Per-call processing metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationMetrics {
    pub processing_time_ms: u64,
    /// Invariant: equals `epic_analysis.confidence`, by construction
    pub confidence_score: f64,
    /// Fallback profiles substituted during provider selection
    pub fallbacks_used: Vec<String>,
    pub provider_used: String,
}

/// The sole externally returned artifact of an orchestration call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub epic_analysis: EpicAnalysis,
    pub routing_recommendation: RoutingRecommendation,
    pub ai_insights: AiInsights,
    pub orchestration_metrics: OrchestrationMetrics,
}

/// The Orchestration Service
///
/// Stateless per call; the only persistent state is the context store.
/// The classifier and provider-health view are injected capabilities so
/// both can be replaced without touching the routing logic.
pub struct EpicOrchestrator {
    classifier: Box<dyn EpicClassifier>,
    context: ContextStore,
    engine: StrategicReasoningEngine,
    providers: ProviderRoutingTable,
    roster: WorkerRoster,
    health: Box<dyn ProviderHealth>,
}

impl EpicOrchestrator {
    pub fn new() -> Self {
        Self {
            classifier: Box::new(WeightedKeywordClassifier::new()),
            context: ContextStore::new(),
            engine: StrategicReasoningEngine::new(),
            providers: ProviderRoutingTable::default(),
            roster: WorkerRoster::default(),
            health: Box::new(AlwaysAvailable),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn EpicClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_health(mut self, health: Box<dyn ProviderHealth>) -> Self {
        self.health = health;
        self
    }

    pub fn with_providers(mut self, providers: ProviderRoutingTable) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_roster(mut self, roster: WorkerRoster) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_engine(mut self, engine: StrategicReasoningEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_context_store(mut self, context: ContextStore) -> Self {
        self.context = context;
        self
    }

    /// The context store, for callers that correlate repeated analyses
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn providers(&self) -> &ProviderRoutingTable {
        &self.providers
    }

    /// Produce a routing decision for a work item
    ///
    /// Infallible by design: degraded input flows through as a
    /// low-confidence generic classification rather than an error.
    pub async fn orchestrate_epic(&self, input: &WorkItemInput) -> OrchestrationResult {
        let started = Instant::now();
        let request = normalize(input);
        info!(
            issue = request.issue_number,
            mode = %request.analysis_mode,
            "orchestrating epic"
        );

        let analysis = self.classifier.analyze(&request).await;
        self.context
            .store_context(request.issue_number, request.clone(), analysis.clone());

        let strategic = self.engine.perform_strategic_analysis(&request, &analysis);

        let routing = self.derive_routing(request.analysis_mode, &analysis, &strategic);
        let (provider_used, fallbacks_used) =
            self.select_provider(request.analysis_mode, analysis.epic_type);

        let ai_insights = build_insights(&analysis, &strategic, &routing);

        let processing_time_ms = started.elapsed().as_millis() as u64;
        debug!(
            issue = request.issue_number,
            epic_type = %analysis.epic_type,
            primary = %routing.primary,
            processing_time_ms,
            "orchestration complete"
        );

        let orchestration_metrics = OrchestrationMetrics {
            processing_time_ms,
            confidence_score: analysis.confidence,
            fallbacks_used,
            provider_used,
        };

        OrchestrationResult {
            epic_analysis: analysis,
            routing_recommendation: routing,
            ai_insights,
            orchestration_metrics,
        }
    }

    /// Worker selection per the fixed tables, scoped by analysis mode
    fn derive_routing(
        &self,
        mode: AnalysisMode,
        analysis: &EpicAnalysis,
        strategic: &StrategicAnalysis,
    ) -> RoutingRecommendation {
        let primary = self.roster.primary_for(analysis.epic_type).to_string();
        let resources = &strategic.resource_optimization;
        let risk = &strategic.risk_assessment;
        let monitoring_required = resources.monitoring_level != MonitoringLevel::Standard;

        match mode {
            AnalysisMode::EpicInterpretation => RoutingRecommendation {
                reasoning: format!(
                    "{} epic (confidence {:.2}) interpreted; routed to {} for single-worker execution",
                    analysis.epic_type, analysis.confidence, primary
                ),
                primary,
                secondary: Vec::new(),
                execution_strategy: ExecutionStrategy::Sequential,
                monitoring_required,
            },
            AnalysisMode::AgentRouting | AnalysisMode::FullOrchestration => {
                let secondary: Vec<String> = if resources.recommended_agents > 1 {
                    self.roster
                        .complements_for(analysis.epic_type)
                        .iter()
                        .take(resources.recommended_agents as usize - 1)
                        .cloned()
                        .collect()
                } else {
                    Vec::new()
                };

                let execution_strategy =
                    if resources.recommended_agents > 1 && risk.level == RiskLevel::High {
                        ExecutionStrategy::Hybrid
                    } else if resources.parallel_execution {
                        ExecutionStrategy::Parallel
                    } else {
                        ExecutionStrategy::Sequential
                    };

                let reasoning = format!(
                    "{} epic (confidence {:.2}) at {} complexity with {} risk; {} leads {} supporting worker(s) under {} execution",
                    analysis.epic_type,
                    analysis.confidence,
                    analysis.complexity_level,
                    risk.level,
                    primary,
                    secondary.len(),
                    execution_strategy
                );

                RoutingRecommendation {
                    primary,
                    secondary,
                    reasoning,
                    execution_strategy,
                    monitoring_required,
                }
            }
        }
    }

    /// Resolve the provider for the epic's domain, consulting health only
    /// in full orchestration
    fn select_provider(&self, mode: AnalysisMode, epic_type: EpicType) -> (String, Vec<String>) {
        let profile = self.providers.resolve(epic_type.as_str());

        match mode {
            AnalysisMode::EpicInterpretation | AnalysisMode::AgentRouting => {
                (profile.identity(), Vec::new())
            }
            AnalysisMode::FullOrchestration => {
                if self.health.is_available(profile) {
                    return (profile.identity(), Vec::new());
                }

                match &profile.fallback {
                    Some(fallback) => {
                        // Substitute the fallback even if it is itself
                        // unhealthy; the call never blocks on provider state.
                        warn!(
                            primary = %profile.identity(),
                            fallback = %fallback.identity(),
                            available = self.health.is_available(fallback),
                            "primary provider unavailable, substituting fallback"
                        );
                        (fallback.identity(), vec![fallback.identity()])
                    }
                    None => {
                        warn!(
                            primary = %profile.identity(),
                            "primary provider unavailable and no fallback configured"
                        );
                        (profile.identity(), Vec::new())
                    }
                }
            }
        }
    }
}

impl Default for EpicOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim text fields and drop empty labels; degraded values flow through
fn normalize(input: &WorkItemInput) -> WorkItemInput {
    WorkItemInput {
        issue_number: input.issue_number,
        title: input.title.trim().to_string(),
        body: input.body.trim().to_string(),
        labels: input
            .labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect(),
        assignees: input.assignees.clone(),
        analysis_mode: input.analysis_mode,
    }
}

fn build_insights(
    analysis: &EpicAnalysis,
    strategic: &StrategicAnalysis,
    routing: &RoutingRecommendation,
) -> AiInsights {
    let resources = &strategic.resource_optimization;

    let mut success_predictors = vec![format!(
        "{} predicted success (score {}/100)",
        analysis.success_prediction, analysis.success_score
    )];
    if analysis.confidence >= 0.7 {
        success_predictors.push("strong classification signal from matched vocabulary".to_string());
    }
    if !strategic.risk_assessment.mitigation_strategies.is_empty() {
        success_predictors.push("mitigations identified for every detected risk factor".to_string());
    }
    if routing.monitoring_required {
        success_predictors.push(format!(
            "{} monitoring in place during execution",
            resources.monitoring_level
        ));
    }

    AiInsights {
        interpretation_accuracy: analysis.confidence,
        complexity_assessment: format!(
            "{} complexity (score {}/100)",
            analysis.complexity_level, analysis.complexity_score
        ),
        suggested_approach: format!(
            "{} execution with {} worker(s), ~{} minutes",
            routing.execution_strategy,
            1 + routing.secondary.len(),
            resources.estimated_duration_minutes
        ),
        risk_factors: strategic.risk_assessment.factors.clone(),
        success_predictors,
    }
}

/// Render the fixed-format human-readable summary block
///
/// The `Type:`, `Confidence:`, `Primary Agent:`, and `Processing Time:`
/// lines are a stable contract; downstream tooling greps for them.
pub fn generate_orchestration_summary(result: &OrchestrationResult) -> String {
    let analysis = &result.epic_analysis;
    let routing = &result.routing_recommendation;
    let metrics = &result.orchestration_metrics;

    let mut out = String::new();
    let _ = writeln!(out, "Epic Orchestration Summary");
    let _ = writeln!(out, "Type: {}", analysis.epic_type);
    let _ = writeln!(out, "Confidence: {:.1}%", analysis.confidence * 100.0);
    let _ = writeln!(
        out,
        "Complexity: {} ({}/100)",
        analysis.complexity_level, analysis.complexity_score
    );
    let _ = writeln!(out, "Primary Agent: {}", routing.primary);
    if !routing.secondary.is_empty() {
        let _ = writeln!(out, "Secondary Agents: {}", routing.secondary.join(", "));
    }
    let _ = writeln!(out, "Strategy: {}", routing.execution_strategy);
    let _ = writeln!(out, "Provider: {}", metrics.provider_used);
    if !metrics.fallbacks_used.is_empty() {
        let _ = writeln!(out, "Fallbacks Used: {}", metrics.fallbacks_used.join(", "));
    }
    let _ = writeln!(out, "Processing Time: {}ms", metrics.processing_time_ms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_routing::ProviderProfile;

    /// Health view that reports a single provider as down
    struct ProviderDown(&'static str);

    impl ProviderHealth for ProviderDown {
        fn is_available(&self, profile: &ProviderProfile) -> bool {
            profile.provider != self.0
        }
    }

    fn foundation_input(mode: AnalysisMode) -> WorkItemInput {
        WorkItemInput::new(
            55,
            "Project Foundation Setup",
            "Establish the infrastructure and base configuration.",
        )
        .with_labels(vec![
            "setup".to_string(),
            "infrastructure".to_string(),
            "foundation".to_string(),
        ])
        .with_mode(mode)
    }

    // ==================== Orchestration Flow Tests ====================

    #[tokio::test]
    async fn test_confidence_passthrough_invariant() {
        let orchestrator = EpicOrchestrator::new();
        let input = foundation_input(AnalysisMode::FullOrchestration);
        let result = orchestrator.orchestrate_epic(&input).await;

        assert_eq!(
            result.orchestration_metrics.confidence_score,
            result.epic_analysis.confidence
        );
        assert_eq!(
            result.ai_insights.interpretation_accuracy,
            result.epic_analysis.confidence
        );
    }

    #[tokio::test]
    async fn test_context_stored_after_orchestration() {
        let orchestrator = EpicOrchestrator::new();
        let input = foundation_input(AnalysisMode::FullOrchestration);
        orchestrator.orchestrate_epic(&input).await;

        let entry = orchestrator.context().get_context(55).expect("stored");
        assert_eq!(entry.analysis.epic_type, EpicType::Foundation);
    }

    #[tokio::test]
    async fn test_interpretation_mode_routes_single_worker() {
        let orchestrator = EpicOrchestrator::new();
        let input = foundation_input(AnalysisMode::EpicInterpretation);
        let result = orchestrator.orchestrate_epic(&input).await;

        assert!(result.routing_recommendation.secondary.is_empty());
        assert_eq!(
            result.routing_recommendation.execution_strategy,
            ExecutionStrategy::Sequential
        );
    }

    #[tokio::test]
    async fn test_routing_mode_adds_secondaries_when_recommended() {
        let body = "\
Implement the feature endpoint and backend service for the new search
capability, including query parsing, result ranking, pagination support,
and consistent error responses across the whole api surface.

- [ ] schema
- [ ] endpoint
- [ ] service wiring
- [ ] docs

## Acceptance Criteria
- returns 200
- handles errors
- paginates results
";
        let input = WorkItemInput::new(56, "Implement feature api", body)
            .with_labels(vec![
                "feature".to_string(),
                "api".to_string(),
                "backend".to_string(),
            ])
            .with_mode(AnalysisMode::AgentRouting);

        let orchestrator = EpicOrchestrator::new();
        let result = orchestrator.orchestrate_epic(&input).await;

        let routing = &result.routing_recommendation;
        assert_eq!(routing.primary, "backend-agent");
        assert!(!routing.secondary.is_empty());
        assert_eq!(routing.execution_strategy, ExecutionStrategy::Parallel);
        assert!(routing.monitoring_required);
    }

    #[tokio::test]
    async fn test_hybrid_strategy_for_multi_agent_high_risk() {
        let body = format!(
            "{}\n- [ ] inventory dependencies\n- [ ] rehearse migration\n- [ ] stage rollout\n- [ ] verify production\n",
            "Large-scale migration of the critical production database with breaking dependency changes. "
                .repeat(30)
        );
        let input = WorkItemInput::new(57, "Critical production migration", body)
            .with_labels(vec![
                "critical".to_string(),
                "migration".to_string(),
                "dependencies".to_string(),
            ])
            .with_mode(AnalysisMode::FullOrchestration);

        let orchestrator = EpicOrchestrator::new();
        let result = orchestrator.orchestrate_epic(&input).await;

        assert_eq!(
            result.routing_recommendation.execution_strategy,
            ExecutionStrategy::Hybrid
        );
        assert!(!result.routing_recommendation.secondary.is_empty());
        assert!(result.ai_insights.risk_factors.contains(&"migration".to_string()));
    }

    // ==================== Provider Selection Tests ====================

    #[tokio::test]
    async fn test_healthy_provider_no_fallbacks() {
        let orchestrator = EpicOrchestrator::new();
        let input = foundation_input(AnalysisMode::FullOrchestration);
        let result = orchestrator.orchestrate_epic(&input).await;

        assert!(result.orchestration_metrics.fallbacks_used.is_empty());
        assert!(result
            .orchestration_metrics
            .provider_used
            .starts_with("anthropic/"));
    }

    #[tokio::test]
    async fn test_unavailable_primary_substitutes_fallback() {
        let orchestrator =
            EpicOrchestrator::new().with_health(Box::new(ProviderDown("anthropic")));
        let input = foundation_input(AnalysisMode::FullOrchestration);
        let result = orchestrator.orchestrate_epic(&input).await;

        assert!(result
            .orchestration_metrics
            .provider_used
            .starts_with("openai/"));
        assert_eq!(result.orchestration_metrics.fallbacks_used.len(), 1);
    }

    #[tokio::test]
    async fn test_routing_modes_skip_health_consultation() {
        let orchestrator =
            EpicOrchestrator::new().with_health(Box::new(ProviderDown("anthropic")));
        let input = foundation_input(AnalysisMode::AgentRouting);
        let result = orchestrator.orchestrate_epic(&input).await;

        assert!(result
            .orchestration_metrics
            .provider_used
            .starts_with("anthropic/"));
        assert!(result.orchestration_metrics.fallbacks_used.is_empty());
    }

    // ==================== Summary Rendering Tests ====================

    #[tokio::test]
    async fn test_summary_contains_contract_substrings() {
        let orchestrator = EpicOrchestrator::new();
        let input = foundation_input(AnalysisMode::FullOrchestration);
        let result = orchestrator.orchestrate_epic(&input).await;

        let summary = generate_orchestration_summary(&result);
        assert!(summary.contains("Type: foundation"));
        assert!(summary.contains(&format!(
            "Confidence: {:.1}%",
            result.epic_analysis.confidence * 100.0
        )));
        assert!(summary.contains("Primary Agent: infrastructure-agent"));
        assert!(summary.contains(&format!(
            "Processing Time: {}ms",
            result.orchestration_metrics.processing_time_ms
        )));
    }

    #[tokio::test]
    async fn test_degenerate_input_still_produces_full_result() {
        let orchestrator = EpicOrchestrator::new();
        let input = WorkItemInput::new(-1, "", "");
        let result = orchestrator.orchestrate_epic(&input).await;

        assert_eq!(result.epic_analysis.epic_type, EpicType::General);
        assert!(result.epic_analysis.confidence > 0.0);
        assert!(!result.routing_recommendation.primary.is_empty());
        assert!(!result.orchestration_metrics.provider_used.is_empty());

        let summary = generate_orchestration_summary(&result);
        assert!(summary.contains("Type: general"));
    }
}
