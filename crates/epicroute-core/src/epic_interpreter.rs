//! Epic Interpreter
//!
//! Classifies free-text work items into epic types using weighted keyword
//! vocabularies, and derives complexity and success-prediction scores from
//! the text structure. The classifier is best-effort and never fails: empty
//! input degrades to a low-confidence generic classification.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::work_item::WorkItemInput;

// Pre-compiled patterns for body structure parsing (hot path per analysis)
static CHECKLIST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*]\s*\[[ xX]\]").unwrap());
static ACCEPTANCE_HEADING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:#{1,6}\s*|\*\*)acceptance criteria").unwrap());
static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s").unwrap());
static BULLET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+\.)\s+\S").unwrap());

/// Epic classification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicType {
    Foundation,
    Development,
    Architecture,
    Intelligence,
    Ui,
    Integration,
    /// Fallback when no vocabulary matches
    General,
}

impl EpicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::Development => "development",
            Self::Architecture => "architecture",
            Self::Intelligence => "intelligence",
            Self::Ui => "ui",
            Self::Integration => "integration",
            Self::General => "general",
        }
    }

    /// All classifiable types, in tie-breaking order
    pub fn all() -> [EpicType; 6] {
        [
            Self::Foundation,
            Self::Development,
            Self::Architecture,
            Self::Intelligence,
            Self::Ui,
            Self::Integration,
        ]
    }
}

impl std::str::FromStr for EpicType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foundation" => Ok(Self::Foundation),
            "development" => Ok(Self::Development),
            "architecture" => Ok(Self::Architecture),
            "intelligence" => Ok(Self::Intelligence),
            "ui" => Ok(Self::Ui),
            "integration" => Ok(Self::Integration),
            "general" => Ok(Self::General),
            _ => Err(crate::Error::InvalidEpicType(s.to_string())),
        }
    }
}

impl std::fmt::Display for EpicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucketed complexity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucketed success prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPrediction {
    Low,
    Medium,
    High,
}

impl SuccessPrediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for SuccessPrediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying a single work item
///
/// Created once per orchestration call and never mutated; re-analysis
/// produces a new instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicAnalysis {
    pub epic_type: EpicType,
    /// Classification confidence in (0.0, 1.0]; never exactly zero
    pub confidence: f64,
    /// Matched vocabulary terms of the winning type, in match order
    pub keywords: Vec<String>,
    pub complexity_level: ComplexityLevel,
    /// 0-100
    pub complexity_score: u32,
    pub success_prediction: SuccessPrediction,
    /// 0-100
    pub success_score: u32,
    /// Checklist items detected in the body
    pub task_count: u32,
    /// Bullets under an "Acceptance Criteria" heading
    pub acceptance_criteria_count: u32,
}

/// A vocabulary term with its classification weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

/// Weighted vocabulary for one epic type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeVocabulary {
    pub epic_type: EpicType,
    pub terms: Vec<WeightedTerm>,
}

/// Tuned constants for the weighted-keyword classifier
///
/// All values are empirically tuned data, kept out of the classification
/// logic so they can be recalibrated without touching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Per-type weighted vocabulary, in tie-breaking order
    pub vocabulary: Vec<TypeVocabulary>,
    /// Accumulated score at which confidence saturates to 1.0
    pub confidence_saturation: f64,
    /// Confidence assigned when no vocabulary matches
    pub baseline_confidence: f64,
    /// Complexity score assigned to items with no text
    pub baseline_complexity: u32,
    /// Scores below this bucket as low
    pub medium_threshold: u32,
    /// Scores below this bucket as medium, at or above as high
    pub high_threshold: u32,
    /// Terms that add to the complexity score when present
    pub complexity_terms: Vec<String>,
    /// Weight of (inverted) complexity in the success score
    pub success_complexity_weight: f64,
    /// Weight of confidence in the success score
    pub success_confidence_weight: f64,
}

fn vocab(epic_type: EpicType, terms: &[(&str, f64)]) -> TypeVocabulary {
    TypeVocabulary {
        epic_type,
        terms: terms
            .iter()
            .map(|(term, weight)| WeightedTerm {
                term: (*term).to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            vocabulary: vec![
                vocab(
                    EpicType::Foundation,
                    &[
                        ("foundation", 4.0),
                        ("setup", 3.0),
                        ("infrastructure", 3.0),
                        ("scaffold", 2.5),
                        ("bootstrap", 2.5),
                        ("base", 2.0),
                        ("configuration", 2.0),
                        ("tooling", 1.5),
                        ("environment", 1.5),
                    ],
                ),
                vocab(
                    EpicType::Development,
                    &[
                        ("feature", 3.0),
                        ("implement", 2.5),
                        ("endpoint", 2.0),
                        ("api", 2.0),
                        ("bug", 2.0),
                        ("backend", 2.0),
                        ("refactor", 2.0),
                        ("fix", 1.5),
                        ("service", 1.5),
                        ("logic", 1.5),
                    ],
                ),
                vocab(
                    EpicType::Architecture,
                    &[
                        ("architecture", 4.0),
                        ("migration", 3.0),
                        ("schema", 2.5),
                        ("scalability", 2.5),
                        ("design", 2.5),
                        ("database", 2.0),
                        ("structure", 2.0),
                        ("pattern", 1.5),
                    ],
                ),
                vocab(
                    EpicType::Intelligence,
                    &[
                        ("nlp", 3.0),
                        ("ai", 3.0),
                        ("ml", 3.0),
                        ("intelligence", 3.0),
                        ("classifier", 2.5),
                        ("model", 2.5),
                        ("learning", 2.5),
                        ("prediction", 2.0),
                        ("reasoning", 2.0),
                    ],
                ),
                vocab(
                    EpicType::Ui,
                    &[
                        ("frontend", 3.0),
                        ("ui", 3.0),
                        ("ux", 2.5),
                        ("component", 2.0),
                        ("layout", 2.0),
                        ("dashboard", 2.0),
                        ("render", 2.0),
                        ("style", 1.5),
                        ("display", 1.5),
                    ],
                ),
                vocab(
                    EpicType::Integration,
                    &[
                        ("integration", 4.0),
                        ("webhook", 2.5),
                        ("connector", 2.5),
                        ("third-party", 2.5),
                        ("sync", 2.0),
                        ("external", 2.0),
                        ("pipeline", 2.0),
                        ("plugin", 2.0),
                    ],
                ),
            ],
            confidence_saturation: 10.0,
            baseline_confidence: 0.3,
            baseline_complexity: 20,
            medium_threshold: 34,
            high_threshold: 67,
            complexity_terms: vec![
                "migration".to_string(),
                "dependencies".to_string(),
                "critical".to_string(),
                "breaking".to_string(),
                "security".to_string(),
                "refactor".to_string(),
                "performance".to_string(),
            ],
            success_complexity_weight: 0.6,
            success_confidence_weight: 0.4,
        }
    }
}

/// Classification capability over a single `analyze` contract
///
/// The bundled implementation is vocabulary-weighted; a model-backed
/// classifier can replace it without touching the orchestration service.
#[async_trait]
pub trait EpicClassifier: Send + Sync {
    async fn analyze(&self, input: &WorkItemInput) -> EpicAnalysis;
}

/// The bundled weighted-vocabulary classifier
#[derive(Debug, Clone, Default)]
pub struct WeightedKeywordClassifier {
    config: InterpreterConfig,
}

impl WeightedKeywordClassifier {
    pub fn new() -> Self {
        Self {
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self { config }
    }

    /// Classify a work item; synchronous core of the async contract
    pub fn classify(&self, input: &WorkItemInput) -> EpicAnalysis {
        let tokens = tokenize(input);

        let (epic_type, confidence, keywords) = self.classify_type(&tokens, input.is_empty_text());
        let (complexity_score, task_count, acceptance_criteria_count) =
            self.score_complexity(input, &tokens);
        let complexity_level = self.bucket(complexity_score);

        let success_score = self.score_success(complexity_score, confidence);
        let success_prediction = match self.bucket(success_score) {
            ComplexityLevel::Low => SuccessPrediction::Low,
            ComplexityLevel::Medium => SuccessPrediction::Medium,
            ComplexityLevel::High => SuccessPrediction::High,
        };

        debug!(
            issue = input.issue_number,
            epic_type = %epic_type,
            confidence,
            complexity_score,
            "classified work item"
        );

        EpicAnalysis {
            epic_type,
            confidence,
            keywords,
            complexity_level,
            complexity_score,
            success_prediction,
            success_score,
            task_count,
            acceptance_criteria_count,
        }
    }

    fn classify_type(
        &self,
        tokens: &HashSet<String>,
        empty_text: bool,
    ) -> (EpicType, f64, Vec<String>) {
        let mut best: Option<(EpicType, f64, Vec<String>)> = None;

        for entry in &self.config.vocabulary {
            let mut score = 0.0;
            let mut matched = Vec::new();
            for term in &entry.terms {
                if tokens.contains(term.term.as_str()) {
                    score += term.weight;
                    matched.push(term.term.clone());
                }
            }
            if score > 0.0 && best.as_ref().map(|(_, s, _)| score > *s).unwrap_or(true) {
                best = Some((entry.epic_type, score, matched));
            }
        }

        match best {
            Some((epic_type, score, matched)) => {
                let confidence = (score / self.config.confidence_saturation).clamp(0.0, 1.0);
                (epic_type, confidence, matched)
            }
            None => {
                // Nothing matched (possibly empty input): generic fallback
                // with low but non-zero confidence.
                let confidence = if empty_text {
                    self.config.baseline_confidence * 0.5
                } else {
                    self.config.baseline_confidence
                };
                (EpicType::General, confidence.max(0.05), Vec::new())
            }
        }
    }

    fn score_complexity(&self, input: &WorkItemInput, tokens: &HashSet<String>) -> (u32, u32, u32) {
        let task_count = CHECKLIST_REGEX.find_iter(&input.body).count() as u32;
        let acceptance_criteria_count = count_acceptance_criteria(&input.body);

        if input.is_empty_text() && input.labels.is_empty() {
            return (self.config.baseline_complexity, 0, 0);
        }

        let body_len = input.body.trim().len();
        let length_component = match body_len {
            0 => 0,
            1..=199 => 5,
            200..=499 => 10,
            500..=999 => 15,
            1000..=1999 => 20,
            _ => 25,
        };

        let label_component = (input.labels.len() as u32 * 5).min(15);

        let term_component = self
            .config
            .complexity_terms
            .iter()
            .filter(|term| tokens.contains(term.as_str()))
            .count() as u32
            * 8;
        let term_component = term_component.min(25);

        let task_component = (task_count * 2).min(20);
        let criteria_component = (acceptance_criteria_count * 2).min(15);

        let score = (length_component
            + label_component
            + term_component
            + task_component
            + criteria_component)
            .min(100);

        (score, task_count, acceptance_criteria_count)
    }

    fn score_success(&self, complexity_score: u32, confidence: f64) -> u32 {
        let inverted_complexity = (100 - complexity_score.min(100)) as f64;
        let score = self.config.success_complexity_weight * inverted_complexity
            + self.config.success_confidence_weight * confidence * 100.0;
        (score.round() as u32).min(100)
    }

    fn bucket(&self, score: u32) -> ComplexityLevel {
        if score < self.config.medium_threshold {
            ComplexityLevel::Low
        } else if score < self.config.high_threshold {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::High
        }
    }
}

#[async_trait]
impl EpicClassifier for WeightedKeywordClassifier {
    async fn analyze(&self, input: &WorkItemInput) -> EpicAnalysis {
        self.classify(input)
    }
}

/// Case-insensitive token set over title, body, and labels
///
/// Hyphenated terms are kept whole so vocabulary entries like "third-party"
/// match as a single token.
fn tokenize(input: &WorkItemInput) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let sources = input
        .labels
        .iter()
        .map(String::as_str)
        .chain([input.title.as_str(), input.body.as_str()]);

    for source in sources {
        for token in source.split(|c: char| !c.is_alphanumeric() && c != '-') {
            let token = token.trim_matches('-');
            if !token.is_empty() {
                tokens.insert(token.to_lowercase());
            }
        }
    }

    tokens
}

fn count_acceptance_criteria(body: &str) -> u32 {
    let mut count = 0;
    let mut in_section = false;

    for line in body.lines() {
        if ACCEPTANCE_HEADING_REGEX.is_match(line.trim_start()) {
            in_section = true;
            continue;
        }
        if in_section {
            if HEADING_REGEX.is_match(line) {
                in_section = false;
            } else if BULLET_REGEX.is_match(line) {
                count += 1;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(input: &WorkItemInput) -> EpicAnalysis {
        WeightedKeywordClassifier::new().classify(input)
    }

    // ==================== Type Classification Tests ====================

    #[test]
    fn test_foundation_scenario() {
        let input = WorkItemInput::new(
            101,
            "Project Foundation Setup",
            "Establish the infrastructure and base configuration for the project.",
        )
        .with_labels(vec![
            "setup".to_string(),
            "infrastructure".to_string(),
            "foundation".to_string(),
        ]);

        let analysis = classify(&input);
        assert_eq!(analysis.epic_type, EpicType::Foundation);
        assert!(analysis.confidence > 0.5);
        assert!(analysis.keywords.contains(&"foundation".to_string()));
        assert!(analysis.keywords.contains(&"infrastructure".to_string()));
    }

    #[test]
    fn test_intelligence_classification() {
        let input = WorkItemInput::new(
            102,
            "NLP classifier for issue triage",
            "Train an ml model for prediction of issue categories.",
        );

        let analysis = classify(&input);
        assert_eq!(analysis.epic_type, EpicType::Intelligence);
    }

    #[test]
    fn test_token_matching_has_word_boundaries() {
        // "maintain" and "email" must not match the "ai" vocabulary term
        let input = WorkItemInput::new(103, "Maintain email templates", "");
        let analysis = classify(&input);
        assert_ne!(analysis.epic_type, EpicType::Intelligence);
    }

    #[test]
    fn test_keywords_preserve_match_order() {
        let input = WorkItemInput::new(104, "foundation setup", "bootstrap the environment");
        let analysis = classify(&input);
        // Vocabulary scan order: foundation before setup before bootstrap
        assert_eq!(
            analysis.keywords,
            vec!["foundation", "setup", "bootstrap", "environment"]
        );
    }

    // ==================== Degraded Input Tests ====================

    #[test]
    fn test_empty_input_defaults() {
        let input = WorkItemInput::new(-1, "", "");
        let analysis = classify(&input);

        assert_eq!(analysis.epic_type, EpicType::General);
        assert!(analysis.confidence > 0.0);
        assert!(analysis.confidence < 0.5);
        assert_eq!(analysis.complexity_score, 20);
        assert_eq!(analysis.complexity_level, ComplexityLevel::Low);
        assert!(analysis.keywords.is_empty());
    }

    #[test]
    fn test_unmatched_text_falls_back_to_general() {
        let input = WorkItemInput::new(105, "Miscellaneous chores", "Tidy things up a little.");
        let analysis = classify(&input);

        assert_eq!(analysis.epic_type, EpicType::General);
        assert!(analysis.confidence > 0.0);
    }

    // ==================== Complexity Scoring Tests ====================

    #[test]
    fn test_complexity_terms_raise_score() {
        let plain = WorkItemInput::new(106, "Add feature", "Implement the new endpoint.");
        let risky = WorkItemInput::new(
            106,
            "Add feature",
            "Implement the new endpoint. Requires a critical migration and new dependencies.",
        );

        let plain_score = classify(&plain).complexity_score;
        let risky_score = classify(&risky).complexity_score;
        assert!(risky_score > plain_score);
    }

    #[test]
    fn test_checklist_tasks_counted() {
        let body = "\
Work plan:
- [ ] create schema
- [x] write endpoint
- [ ] add tests
";
        let input = WorkItemInput::new(107, "Implement feature", body);
        let analysis = classify(&input);
        assert_eq!(analysis.task_count, 3);
    }

    #[test]
    fn test_acceptance_criteria_counted() {
        let body = "\
Some intro text.

## Acceptance Criteria
- endpoint returns 200
- results are paginated
- errors are logged

## Notes
- unrelated bullet
";
        let input = WorkItemInput::new(108, "Implement feature", body);
        let analysis = classify(&input);
        assert_eq!(analysis.acceptance_criteria_count, 3);
    }

    #[test]
    fn test_complexity_score_capped_at_100() {
        let body = format!(
            "{} migration dependencies critical breaking security performance\n{}",
            "x".repeat(3000),
            "- [ ] task\n".repeat(40)
        );
        let input = WorkItemInput::new(109, "Big refactor", body).with_labels(vec![
            "a".into(),
            "b".into(),
            "c".into(),
            "d".into(),
        ]);

        let analysis = classify(&input);
        assert!(analysis.complexity_score <= 100);
    }

    // ==================== Success Prediction Tests ====================

    #[test]
    fn test_success_inversely_tracks_complexity() {
        let simple = WorkItemInput::new(110, "Fix typo in setup docs", "Small fix.");
        let complex = WorkItemInput::new(
            110,
            "Critical migration",
            format!(
                "{} migration dependencies critical security breaking",
                "details ".repeat(300)
            ),
        )
        .with_labels(vec!["migration".into(), "critical".into(), "database".into()]);

        let simple_analysis = classify(&simple);
        let complex_analysis = classify(&complex);
        assert!(simple_analysis.success_score > complex_analysis.success_score);
    }

    #[test]
    fn test_epic_type_string_roundtrip() {
        use std::str::FromStr;
        for epic_type in EpicType::all() {
            assert_eq!(EpicType::from_str(epic_type.as_str()).unwrap(), epic_type);
        }
        assert_eq!(EpicType::from_str("general").unwrap(), EpicType::General);
        assert!(EpicType::from_str("gui").is_err());
    }

    // ==================== Classifier Contract Tests ====================

    #[tokio::test]
    async fn test_async_contract_matches_sync_classify() {
        let classifier = WeightedKeywordClassifier::new();
        let input = WorkItemInput::new(111, "Project Foundation Setup", "infrastructure work");

        let from_trait = EpicClassifier::analyze(&classifier, &input).await;
        let from_sync = classifier.classify(&input);
        assert_eq!(from_trait.epic_type, from_sync.epic_type);
        assert_eq!(from_trait.complexity_score, from_sync.complexity_score);
    }
}
