//! Epicroute Core - epic interpretation and task routing
//!
//! This crate provides the decision-making core of the orchestrator:
//! - Weighted-keyword epic classification
//! - Context preservation keyed by work-item identity
//! - Strategic reasoning (risk, resources, recommendations)
//! - Provider routing with fallback chains
//! - Performance threshold monitoring
//! - The orchestration service composing the above

pub mod context_store;
pub mod epic_interpreter;
pub mod error;
pub mod orchestration;
pub mod performance_monitor;
pub mod provider_routing;
pub mod strategic_reasoning;
pub mod work_item;

pub use error::{Error, Result};
pub use work_item::{AnalysisMode, WorkItemInput};

// Re-export interpreter types
pub use epic_interpreter::{
    ComplexityLevel, EpicAnalysis, EpicClassifier, EpicType, InterpreterConfig, SuccessPrediction,
    TypeVocabulary, WeightedKeywordClassifier, WeightedTerm,
};

// Re-export context store types
pub use context_store::{ContextEntry, ContextStore, DEFAULT_CONTEXT_CAPACITY};

// Re-export strategic reasoning types
pub use strategic_reasoning::{
    FallbackStrategy, MonitoringLevel, RecommendationPriority, ResourceOptimization,
    RiskAssessment, RiskLevel, StrategicAnalysis, StrategicReasoningEngine,
    StrategicRecommendation, StrategyConfig,
};

// Re-export provider routing types
pub use provider_routing::{
    AlwaysAvailable, ProviderHealth, ProviderProfile, ProviderRoutingTable, WorkerRoster,
};

// Re-export performance monitor types
pub use performance_monitor::{
    MetricObservation, MetricSummary, MetricThreshold, PerformanceMonitor, ThresholdDirection,
    ThresholdReport, DEFAULT_METRIC_WINDOW,
};

// Re-export orchestration types
pub use orchestration::{
    generate_orchestration_summary, AiInsights, EpicOrchestrator, ExecutionStrategy,
    OrchestrationMetrics, OrchestrationResult, RoutingRecommendation,
};
