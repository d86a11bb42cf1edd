//! Strategic Reasoning Engine
//!
//! Derives risk, resource, and recommendation output from a work item's
//! classification. Pure with respect to its inputs: the engine depends on
//! the classification shape only, never on the classifier itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::epic_interpreter::{ComplexityLevel, EpicAnalysis};
use crate::work_item::WorkItemInput;

/// Assessed risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// One step up the ladder; never past High
    pub fn escalate(&self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    fn base_score(&self) -> u32 {
        match self {
            Self::Low => 20,
            Self::Medium => 50,
            Self::High => 75,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monitoring intensity for routed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringLevel {
    Standard,
    Enhanced,
    Intensive,
}

impl MonitoringLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Enhanced => "enhanced",
            Self::Intensive => "intensive",
        }
    }
}

impl std::fmt::Display for MonitoringLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a fallback provider should be engaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    Immediate,
    Delayed,
}

impl FallbackStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Delayed => "delayed",
        }
    }
}

impl std::fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority attached to a strategic recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

/// Risk assessment for a work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// 0-100, monotonic in level and matched factors
    pub score: u32,
    /// Matched risk-escalation terms, in vocabulary order
    pub factors: Vec<String>,
    /// Mitigations for the matched factors, first-match order, deduped
    pub mitigation_strategies: Vec<String>,
}

/// Resource plan for executing a work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOptimization {
    pub recommended_agents: u32,
    pub parallel_execution: bool,
    pub monitoring_level: MonitoringLevel,
    pub fallback_strategy: FallbackStrategy,
    pub estimated_duration_minutes: u32,
}

/// A single ranked recommendation with its triggering evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicRecommendation {
    pub priority: RecommendationPriority,
    pub category: String,
    pub action: String,
    pub reasoning: String,
    pub expected_impact: String,
}

/// Full output of the reasoning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicAnalysis {
    pub risk_assessment: RiskAssessment,
    pub resource_optimization: ResourceOptimization,
    pub strategic_recommendations: Vec<StrategicRecommendation>,
}

/// Tuned constants for the reasoning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Terms in labels or body that escalate risk one level
    pub risk_terms: Vec<String>,
    /// Mitigation playbook, looked up per matched risk term
    pub mitigations: Vec<(String, String)>,
    /// Points added to the risk score per matched factor
    pub score_per_factor: u32,
    /// Complexity score at which a medium epic gets a third agent
    pub third_agent_threshold: u32,
    /// Complexity score at which a high epic gets a fifth agent
    pub fifth_agent_threshold: u32,
    /// Complexity score that triggers the resource-allocation recommendation
    pub resource_recommendation_threshold: u32,
    /// Fixed duration floor in minutes
    pub base_minutes: u32,
    /// Minutes added per complexity point
    pub minutes_per_complexity_point: f64,
    /// Coordination overhead per additional agent
    pub coordination_minutes_per_agent: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            risk_terms: vec![
                "critical".to_string(),
                "migration".to_string(),
                "production".to_string(),
                "dependencies".to_string(),
                "security".to_string(),
                "breaking".to_string(),
            ],
            mitigations: vec![
                (
                    "critical".to_string(),
                    "Stage the rollout behind a feature flag with a rehearsed rollback path"
                        .to_string(),
                ),
                (
                    "migration".to_string(),
                    "Take a verified backup and dry-run the migration against a copy first"
                        .to_string(),
                ),
                (
                    "production".to_string(),
                    "Schedule the change in a low-traffic window with on-call coverage".to_string(),
                ),
                (
                    "dependencies".to_string(),
                    "Pin dependency versions and audit the lockfile diff before merging"
                        .to_string(),
                ),
                (
                    "security".to_string(),
                    "Require a security-focused review before any merge".to_string(),
                ),
                (
                    "breaking".to_string(),
                    "Publish a deprecation notice and ship a compatibility shim".to_string(),
                ),
            ],
            score_per_factor: 5,
            third_agent_threshold: 50,
            fifth_agent_threshold: 85,
            resource_recommendation_threshold: 67,
            base_minutes: 30,
            minutes_per_complexity_point: 1.2,
            coordination_minutes_per_agent: 15,
        }
    }
}

/// The Strategic Reasoning Engine
#[derive(Debug, Clone, Default)]
pub struct StrategicReasoningEngine {
    config: StrategyConfig,
}

impl StrategicReasoningEngine {
    pub fn new() -> Self {
        Self {
            config: StrategyConfig::default(),
        }
    }

    pub fn with_config(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Derive risk, resource, and recommendation output for a classified
    /// work item
    pub fn perform_strategic_analysis(
        &self,
        input: &WorkItemInput,
        analysis: &EpicAnalysis,
    ) -> StrategicAnalysis {
        let risk_assessment = self.assess_risk(input, analysis);
        let resource_optimization = self.optimize_resources(analysis, &risk_assessment);
        let strategic_recommendations =
            self.recommend(analysis, &risk_assessment, &resource_optimization);

        StrategicAnalysis {
            risk_assessment,
            resource_optimization,
            strategic_recommendations,
        }
    }

    /// Complexity-derived baseline, escalated one step when any
    /// risk-escalation term matches labels or body. Escalation never
    /// de-escalates and the ceiling is High.
    fn assess_risk(&self, input: &WorkItemInput, analysis: &EpicAnalysis) -> RiskAssessment {
        let baseline = match analysis.complexity_level {
            ComplexityLevel::Low => RiskLevel::Low,
            ComplexityLevel::Medium => RiskLevel::Medium,
            ComplexityLevel::High => RiskLevel::High,
        };

        let body_lower = input.body.to_lowercase();
        let label_lower: Vec<String> = input.labels.iter().map(|l| l.to_lowercase()).collect();

        let factors: Vec<String> = self
            .config
            .risk_terms
            .iter()
            .filter(|term| {
                label_lower.iter().any(|label| label.contains(term.as_str()))
                    || contains_term(&body_lower, term)
            })
            .cloned()
            .collect();

        let level = if factors.is_empty() {
            baseline
        } else {
            let escalated = baseline.escalate();
            if escalated != baseline {
                debug!(
                    issue = input.issue_number,
                    from = %baseline,
                    to = %escalated,
                    factors = ?factors,
                    "risk escalated by matched factors"
                );
            }
            escalated
        };

        let score =
            (level.base_score() + factors.len() as u32 * self.config.score_per_factor).min(100);

        let mut seen = HashSet::new();
        let mitigation_strategies: Vec<String> = factors
            .iter()
            .filter_map(|factor| {
                self.config
                    .mitigations
                    .iter()
                    .find(|(term, _)| term == factor)
                    .map(|(_, mitigation)| mitigation.clone())
            })
            .filter(|mitigation| seen.insert(mitigation.clone()))
            .collect();

        RiskAssessment {
            level,
            score,
            factors,
            mitigation_strategies,
        }
    }

    fn optimize_resources(
        &self,
        analysis: &EpicAnalysis,
        risk: &RiskAssessment,
    ) -> ResourceOptimization {
        let recommended_agents = match analysis.complexity_level {
            ComplexityLevel::Low => 1,
            ComplexityLevel::Medium => {
                if analysis.complexity_score >= self.config.third_agent_threshold {
                    3
                } else {
                    2
                }
            }
            ComplexityLevel::High => {
                if analysis.complexity_score >= self.config.fifth_agent_threshold {
                    5
                } else {
                    4
                }
            }
        };

        // High-risk work runs sequentially to simplify failure attribution
        let parallel_execution = recommended_agents > 1 && risk.level != RiskLevel::High;

        let monitoring_level = match risk.level {
            RiskLevel::Low => MonitoringLevel::Standard,
            RiskLevel::Medium => MonitoringLevel::Enhanced,
            RiskLevel::High => MonitoringLevel::Intensive,
        };

        let fallback_strategy = if risk.level == RiskLevel::High {
            FallbackStrategy::Immediate
        } else {
            FallbackStrategy::Delayed
        };

        let estimated_duration_minutes = self.config.base_minutes
            + (analysis.complexity_score as f64 * self.config.minutes_per_complexity_point) as u32
            + (recommended_agents - 1) * self.config.coordination_minutes_per_agent;

        ResourceOptimization {
            recommended_agents,
            parallel_execution,
            monitoring_level,
            fallback_strategy,
            estimated_duration_minutes,
        }
    }

    /// Fixed rule set evaluated in priority order. Delivery Strategy and
    /// Quality Assurance always fire; the other categories fire only on
    /// their triggering evidence.
    fn recommend(
        &self,
        analysis: &EpicAnalysis,
        risk: &RiskAssessment,
        resources: &ResourceOptimization,
    ) -> Vec<StrategicRecommendation> {
        let mut recommendations = Vec::new();

        if !risk.factors.is_empty() {
            recommendations.push(StrategicRecommendation {
                priority: RecommendationPriority::High,
                category: "Risk Mitigation".to_string(),
                action: "Apply the listed mitigations before execution starts".to_string(),
                reasoning: format!(
                    "Risk factors detected in the work item: {}",
                    risk.factors.join(", ")
                ),
                expected_impact: "Lower failure probability on the riskiest steps".to_string(),
            });
        }

        let delivery_action = if resources.parallel_execution {
            format!(
                "Fan the work out across {} agents in parallel",
                resources.recommended_agents
            )
        } else if resources.recommended_agents > 1 {
            format!(
                "Stage {} agents sequentially with explicit handoffs",
                resources.recommended_agents
            )
        } else {
            "Execute with a single agent end to end".to_string()
        };
        recommendations.push(StrategicRecommendation {
            priority: RecommendationPriority::High,
            category: "Delivery Strategy".to_string(),
            action: delivery_action,
            reasoning: format!(
                "{} epic at {} complexity (score {}) with {} risk",
                analysis.epic_type, analysis.complexity_level, analysis.complexity_score, risk.level
            ),
            expected_impact: "Throughput matched to the shape of the work".to_string(),
        });

        if analysis.complexity_score >= self.config.resource_recommendation_threshold {
            recommendations.push(StrategicRecommendation {
                priority: RecommendationPriority::Medium,
                category: "Resource Allocation".to_string(),
                action: "Reserve additional review bandwidth for this epic".to_string(),
                reasoning: format!(
                    "Complexity score {} is at or above the {} threshold",
                    analysis.complexity_score, self.config.resource_recommendation_threshold
                ),
                expected_impact: "Review latency stays flat under heavier change volume"
                    .to_string(),
            });
        }

        recommendations.push(StrategicRecommendation {
            priority: RecommendationPriority::Medium,
            category: "Quality Assurance".to_string(),
            action: format!(
                "Gate completion on {} monitoring checks",
                resources.monitoring_level
            ),
            reasoning: format!(
                "{} risk level maps to {} monitoring",
                risk.level, resources.monitoring_level
            ),
            expected_impact: "Regressions surface before the work is marked done".to_string(),
        });

        recommendations
    }
}

/// Word-boundary term match over lowercased text
fn contains_term(text: &str, term: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .any(|token| token.trim_matches('-') == term)
}
