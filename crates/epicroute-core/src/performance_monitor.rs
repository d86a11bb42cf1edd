//! Performance Monitor
//!
//! Metrics ledger independent of the orchestration path: records named
//! numeric observations over time and evaluates the latest values against
//! a threshold table. Per-name history is a bounded window; a breach is a
//! reporting condition, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Observations retained per metric name
pub const DEFAULT_METRIC_WINDOW: usize = 256;

/// A single timestamped observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricObservation {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Latest value plus metadata for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub latest: f64,
    pub observation_count: usize,
    pub first_recorded_at: DateTime<Utc>,
    pub last_recorded_at: DateTime<Utc>,
}

/// Which side of the target passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    AtLeast,
    AtMost,
}

/// A named target for a metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub name: String,
    pub target: f64,
    pub direction: ThresholdDirection,
}

impl MetricThreshold {
    pub fn at_least(name: impl Into<String>, target: f64) -> Self {
        Self {
            name: name.into(),
            target,
            direction: ThresholdDirection::AtLeast,
        }
    }

    pub fn at_most(name: impl Into<String>, target: f64) -> Self {
        Self {
            name: name.into(),
            target,
            direction: ThresholdDirection::AtMost,
        }
    }

    fn passes(&self, value: f64) -> bool {
        match self.direction {
            ThresholdDirection::AtLeast => value >= self.target,
            ThresholdDirection::AtMost => value <= self.target,
        }
    }
}

/// Result of evaluating recorded metrics against the threshold table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub meets_thresholds: bool,
    /// Fraction of checked metrics passing; 1.0 when nothing was checked
    pub overall_score: f64,
    pub failed_thresholds: Vec<String>,
}

/// Append-only metrics ledger with bounded per-name history
pub struct PerformanceMonitor {
    window: usize,
    thresholds: Vec<MetricThreshold>,
    ledger: RwLock<HashMap<String, VecDeque<MetricObservation>>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            window: DEFAULT_METRIC_WINDOW,
            thresholds: default_thresholds(),
            ledger: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_thresholds(mut self, thresholds: Vec<MetricThreshold>) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Append a timestamped observation for a named metric
    pub fn record_metric(&self, name: &str, value: f64) {
        let mut ledger = self.ledger.write().expect("metric ledger lock poisoned");
        let history = ledger.entry(name.to_string()).or_default();
        history.push_back(MetricObservation {
            value,
            recorded_at: Utc::now(),
        });
        if history.len() > self.window {
            history.pop_front();
        }
        debug!(metric = name, value, "recorded metric");
    }

    /// Latest value plus metadata for every recorded metric
    pub fn get_performance_summary(&self) -> HashMap<String, MetricSummary> {
        let ledger = self.ledger.read().expect("metric ledger lock poisoned");
        ledger
            .iter()
            .filter_map(|(name, history)| {
                let first = history.front()?;
                let last = history.back()?;
                Some((
                    name.clone(),
                    MetricSummary {
                        name: name.clone(),
                        latest: last.value,
                        observation_count: history.len(),
                        first_recorded_at: first.recorded_at,
                        last_recorded_at: last.recorded_at,
                    },
                ))
            })
            .collect()
    }

    /// Evaluate the latest value of each known metric against its target
    ///
    /// Metrics with no recorded value are excluded from scoring, never
    /// treated as failing.
    pub fn check_performance_thresholds(&self) -> ThresholdReport {
        let ledger = self.ledger.read().expect("metric ledger lock poisoned");

        let mut checked = 0usize;
        let mut passed = 0usize;
        let mut failed_thresholds = Vec::new();

        for threshold in &self.thresholds {
            let Some(latest) = ledger
                .get(&threshold.name)
                .and_then(|history| history.back())
            else {
                continue;
            };

            checked += 1;
            if threshold.passes(latest.value) {
                passed += 1;
            } else {
                warn!(
                    metric = %threshold.name,
                    value = latest.value,
                    target = threshold.target,
                    "metric below target"
                );
                failed_thresholds.push(threshold.name.clone());
            }
        }

        let overall_score = if checked == 0 {
            1.0
        } else {
            passed as f64 / checked as f64
        };

        ThresholdReport {
            meets_thresholds: failed_thresholds.is_empty(),
            overall_score,
            failed_thresholds,
        }
    }

    /// Latest values in Prometheus text exposition format, sorted by name
    pub fn to_prometheus(&self) -> String {
        let mut summaries: Vec<MetricSummary> =
            self.get_performance_summary().into_values().collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        for summary in summaries {
            let _ = writeln!(out, "{} {}", summary.name, summary.latest);
        }
        out
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn default_thresholds() -> Vec<MetricThreshold> {
    vec![
        MetricThreshold::at_least("nlp_accuracy", 0.95),
        MetricThreshold::at_least("routing_success", 0.90),
        MetricThreshold::at_least("context_preservation", 0.92),
        MetricThreshold::at_most("response_time_ms", 2000.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecorded_metrics_are_excluded() {
        let monitor = PerformanceMonitor::new();
        let report = monitor.check_performance_thresholds();

        assert!(report.meets_thresholds);
        assert_eq!(report.overall_score, 1.0);
        assert!(report.failed_thresholds.is_empty());
    }

    #[test]
    fn test_failing_metrics_are_named() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("nlp_accuracy", 0.90);
        monitor.record_metric("routing_success", 0.85);

        let report = monitor.check_performance_thresholds();
        assert!(!report.meets_thresholds);
        assert!(report
            .failed_thresholds
            .contains(&"nlp_accuracy".to_string()));
        assert!(report
            .failed_thresholds
            .contains(&"routing_success".to_string()));
        assert_eq!(report.overall_score, 0.0);
    }

    #[test]
    fn test_passing_metrics_score_above_two_thirds() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("nlp_accuracy", 0.98);
        monitor.record_metric("routing_success", 0.95);

        let report = monitor.check_performance_thresholds();
        assert!(report.meets_thresholds);
        assert!(report.overall_score > 0.67);
    }

    #[test]
    fn test_latest_value_wins() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("nlp_accuracy", 0.50);
        monitor.record_metric("nlp_accuracy", 0.99);

        let report = monitor.check_performance_thresholds();
        assert!(report.meets_thresholds);

        let summary = monitor.get_performance_summary();
        let entry = summary.get("nlp_accuracy").expect("recorded metric");
        assert_eq!(entry.latest, 0.99);
        assert_eq!(entry.observation_count, 2);
    }

    #[test]
    fn test_at_most_direction() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("response_time_ms", 3500.0);
        let report = monitor.check_performance_thresholds();
        assert!(report
            .failed_thresholds
            .contains(&"response_time_ms".to_string()));

        monitor.record_metric("response_time_ms", 120.0);
        let report = monitor.check_performance_thresholds();
        assert!(report.meets_thresholds);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let monitor = PerformanceMonitor::new().with_window(3);
        for i in 0..10 {
            monitor.record_metric("nlp_accuracy", i as f64 / 10.0);
        }

        let summary = monitor.get_performance_summary();
        let entry = summary.get("nlp_accuracy").expect("recorded metric");
        assert_eq!(entry.observation_count, 3);
        assert_eq!(entry.latest, 0.9);
    }

    #[test]
    fn test_prometheus_export_is_sorted() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("routing_success", 0.91);
        monitor.record_metric("nlp_accuracy", 0.97);

        let text = monitor.to_prometheus();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["nlp_accuracy 0.97", "routing_success 0.91"]);
    }

    #[test]
    fn test_partial_failure_scores_fraction() {
        let monitor = PerformanceMonitor::new();
        monitor.record_metric("nlp_accuracy", 0.99);
        monitor.record_metric("routing_success", 0.50);

        let report = monitor.check_performance_thresholds();
        assert!(!report.meets_thresholds);
        assert_eq!(report.overall_score, 0.5);
        assert_eq!(report.failed_thresholds, vec!["routing_success"]);
    }
}
