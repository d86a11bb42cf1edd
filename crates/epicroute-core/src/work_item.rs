//! Work item input types
//!
//! A work item is the raw, already-fetched description of an epic: free text
//! plus labels and assignees, keyed by the issue number of the source ticket.
//! The orchestrator never talks to the ticket source itself.

use serde::{Deserialize, Serialize};

/// Analysis depth requested for a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Classify the epic and route to the primary worker only
    EpicInterpretation,
    /// Classify and derive the full worker routing
    AgentRouting,
    /// Full pipeline including provider health and fallback handling
    FullOrchestration,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EpicInterpretation => "epic-interpretation",
            Self::AgentRouting => "agent-routing",
            Self::FullOrchestration => "full-orchestration",
        }
    }
}

impl Default for AnalysisMode {
    fn default() -> Self {
        Self::FullOrchestration
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epic-interpretation" => Ok(Self::EpicInterpretation),
            "agent-routing" => Ok(Self::AgentRouting),
            "full-orchestration" => Ok(Self::FullOrchestration),
            _ => Err(crate::Error::InvalidAnalysisMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw work item as received from the issue source
///
/// Fields are best-effort: the issue number may be negative and title/body
/// may be empty. Degraded input flows through classification rather than
/// aborting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemInput {
    /// Stable identity used to correlate repeated analyses
    pub issue_number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub analysis_mode: AnalysisMode,
}

impl WorkItemInput {
    pub fn new(issue_number: i64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            issue_number,
            title: title.into(),
            body: body.into(),
            labels: Vec::new(),
            assignees: Vec::new(),
            analysis_mode: AnalysisMode::default(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = assignees;
        self
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.analysis_mode = mode;
        self
    }

    /// Whether the item carries any classifiable text
    pub fn is_empty_text(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }
}
