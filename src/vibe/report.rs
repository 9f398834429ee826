//! Report structures produced by the harness.
//!
//! These are the interchange format for reporting/CLI collaborators:
//! plain serde types, JSON-serializable, no rendering here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stats::TimingStats;

/// Aggregated outcome for one corpus phrase across all iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseSummary {
    pub phrase: String,
    pub expected: String,
    pub iterations: usize,
    /// Iterations on which the expected skill activated.
    pub correct: usize,
    /// Percentage form of `correct / iterations`.
    pub success_rate: f64,
    /// Percentage of iterations with fully matching extracted parameters;
    /// 100 when the phrase has no parameter expectations.
    pub param_success_rate: f64,
    /// Whether the expected skill activated on a strict majority of
    /// iterations; feeds the overall verdict.
    pub majority_correct: bool,
    /// Unexpected skills that also activated, with activation counts.
    pub secondary_activations: BTreeMap<String, usize>,
    /// Error summaries recorded against the expected skill, one per
    /// failing iteration.
    pub failures: Vec<String>,
    pub timing: TimingStats,
}

/// Aggregated outcome for one skill across all of its phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSummary {
    pub name: String,
    pub phrases: usize,
    pub correct: usize,
    pub total: usize,
    pub success_rate: f64,
    pub timing: TimingStats,
}

/// One full harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibeReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Free-form label, typically the model under test.
    pub label: String,
    pub iterations: usize,
    pub pass_threshold: f64,
    pub phrases: Vec<PhraseSummary>,
    pub skills: Vec<SkillSummary>,
    pub overall_timing: TimingStats,
    /// Fraction of phrases whose expected skill activated on the majority
    /// of iterations.
    pub success_fraction: f64,
    pub passed: bool,
}

impl VibeReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Ranked comparison across several gateway/model configurations running
/// the same corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub runs: Vec<VibeReport>,
    /// Label of the run with the lowest mean latency.
    pub fastest: Option<String>,
    /// Label of the run with the highest consistency score.
    pub most_consistent: Option<String>,
    /// Label of the run with the highest success fraction.
    pub most_accurate: Option<String>,
}

impl ModelComparison {
    /// Rank completed runs. Runs with no timing data are never "fastest".
    pub fn rank(runs: Vec<VibeReport>) -> Self {
        let fastest = runs
            .iter()
            .filter(|r| r.overall_timing.count > 0)
            .min_by(|a, b| {
                a.overall_timing
                    .mean
                    .partial_cmp(&b.overall_timing.mean)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.label.clone());
        let most_consistent = runs
            .iter()
            .max_by(|a, b| {
                a.overall_timing
                    .consistency_score
                    .partial_cmp(&b.overall_timing.consistency_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.label.clone());
        let most_accurate = runs
            .iter()
            .max_by(|a, b| {
                a.success_fraction
                    .partial_cmp(&b.success_fraction)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.label.clone());
        Self {
            runs,
            fastest,
            most_consistent,
            most_accurate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(label: &str, mean: f64, consistency: f64, success: f64) -> VibeReport {
        let mut timing = TimingStats::from_times(&[mean]);
        timing.consistency_score = consistency;
        VibeReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            label: label.into(),
            iterations: 5,
            pass_threshold: 0.6,
            phrases: Vec::new(),
            skills: Vec::new(),
            overall_timing: timing,
            success_fraction: success,
            passed: success >= 0.6,
        }
    }

    #[test]
    fn test_rankings() {
        let comparison = ModelComparison::rank(vec![
            report("small", 0.4, 70.0, 0.8),
            report("large", 2.0, 95.0, 1.0),
        ]);
        assert_eq!(comparison.fastest.as_deref(), Some("small"));
        assert_eq!(comparison.most_consistent.as_deref(), Some("large"));
        assert_eq!(comparison.most_accurate.as_deref(), Some("large"));
    }

    #[test]
    fn test_report_serializes() {
        let json = report("m", 1.0, 90.0, 1.0).to_json().unwrap();
        assert!(json.contains("\"label\": \"m\""));
        assert!(json.contains("success_fraction"));
    }
}
