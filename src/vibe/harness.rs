//! Consistency & timing analysis harness.
//!
//! Drives the Selection/Execution engine over a labeled phrase corpus,
//! N iterations per phrase, and folds the trial records into per-phrase
//! and per-skill summaries plus an overall verdict. The harness consumes
//! only the engine's public contract and adds no nondeterminism of its
//! own: given the same gateway responses, the same corpus produces the
//! same correctness numbers.
//!
//! Trial failures are recorded against their phrase, never aborting the
//! corpus: a bad trial degrades the scores instead of halting the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::engine::AnalysisEngine;
use crate::params::{self, ParamValue};
use crate::skill::Skill;

use super::report::{ModelComparison, PhraseSummary, SkillSummary, VibeReport};
use super::stats::TimingStats;

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// One labeled corpus entry.
#[derive(Debug, Clone)]
pub struct VibeCase {
    pub phrase: String,
    /// Name of the skill that must activate.
    pub expected: String,
    /// Expected extracted-parameter values, textual form.
    pub expected_params: BTreeMap<String, String>,
}

impl VibeCase {
    pub fn new(phrase: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            expected: expected.into(),
            expected_params: BTreeMap::new(),
        }
    }

    pub fn expecting_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.expected_params.insert(name.into(), value.into());
        self
    }
}

/// Build the default corpus: every skill's vibe phrases, labeled with that
/// skill, parameter expectations derived from the phrase text.
pub fn corpus_from_skills(skills: &[Skill]) -> Vec<VibeCase> {
    let mut corpus = Vec::new();
    for skill in skills {
        for phrase in &skill.vibe_test_phrases {
            corpus.push(VibeCase {
                phrase: phrase.clone(),
                expected: skill.name.clone(),
                expected_params: derive_expected_params(skill, phrase),
            });
        }
    }
    corpus
}

static EXPR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*[+\-*/]\s*\d+(?:\.\d+)?").expect("expression pattern")
});

/// Inspect a phrase for values the extraction stage ought to recover:
/// an arithmetic expression for an `expression` parameter, the first
/// number for a required numeric parameter.
pub fn derive_expected_params(skill: &Skill, phrase: &str) -> BTreeMap<String, String> {
    let mut expected = BTreeMap::new();
    for spec in &skill.parameters {
        if spec.name == "expression" {
            if let Some(m) = EXPR_RE.find(phrase) {
                expected.insert(spec.name.clone(), m.as_str().to_string());
            }
        } else if spec.required && spec.kind == crate::skill::ParamKind::Number {
            if let Some(n) = params::extract_number(phrase) {
                expected.insert(spec.name.clone(), n.to_string());
            }
        }
    }
    expected
}

// ---------------------------------------------------------------------------
// Trial records
// ---------------------------------------------------------------------------

/// Raw outcome of one trial; aggregated into summaries, then discarded.
#[derive(Debug, Clone)]
pub struct TrialRecord {
    pub phrase: String,
    pub expected: String,
    pub activated: bool,
    pub false_positives: Vec<String>,
    /// `None` when the phrase carries no parameter expectations.
    pub params_matched: Option<bool>,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Iterations per phrase.
    pub iterations: usize,
    /// Minimum fraction of majority-correct phrases for an overall pass.
    pub pass_threshold: f64,
    /// Label stamped on the report, typically the model name.
    pub label: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            pass_threshold: 0.6,
            label: String::new(),
        }
    }
}

/// Runs trial loops against one engine.
pub struct VibeHarness {
    engine: Arc<AnalysisEngine>,
    config: HarnessConfig,
}

impl VibeHarness {
    pub fn new(engine: Arc<AnalysisEngine>, config: HarnessConfig) -> Self {
        Self { engine, config }
    }

    /// Default corpus from the engine's registry.
    pub fn corpus(&self) -> Vec<VibeCase> {
        corpus_from_skills(&self.engine.registry().snapshot(None))
    }

    /// Run the default corpus.
    pub async fn run(&self) -> VibeReport {
        let corpus = self.corpus();
        self.run_corpus(&corpus).await
    }

    /// Run an explicit corpus. Each trial is a full dispatch cycle with
    /// the entire registry active.
    pub async fn run_corpus(&self, corpus: &[VibeCase]) -> VibeReport {
        let iterations = self.config.iterations.max(1);
        let mut phrase_summaries = Vec::with_capacity(corpus.len());
        let mut all_times = Vec::new();

        for case in corpus {
            let mut trials = Vec::with_capacity(iterations);
            for _ in 0..iterations {
                let trial = self.run_trial(case).await;
                all_times.push(trial.elapsed_secs);
                trials.push(trial);
            }
            phrase_summaries.push(summarize_phrase(case, &trials));
        }

        let skills = summarize_skills(&phrase_summaries);
        let majority = phrase_summaries.iter().filter(|p| p.majority_correct).count();
        let success_fraction = if phrase_summaries.is_empty() {
            0.0
        } else {
            majority as f64 / phrase_summaries.len() as f64
        };
        let passed = success_fraction + 1e-9 >= self.config.pass_threshold;

        tracing::info!(
            phrases = phrase_summaries.len(),
            success_fraction,
            passed,
            "vibe harness run complete"
        );

        VibeReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            label: self.config.label.clone(),
            iterations,
            pass_threshold: self.config.pass_threshold,
            phrases: phrase_summaries,
            skills,
            overall_timing: TimingStats::from_times(&all_times),
            success_fraction,
            passed,
        }
    }

    async fn run_trial(&self, case: &VibeCase) -> TrialRecord {
        let report = self.engine.dispatch(&case.phrase).await;

        let activated_names = report.activated();
        let activated = activated_names.contains(&case.expected.as_str());
        let false_positives: Vec<String> = activated_names
            .iter()
            .filter(|n| **n != case.expected)
            .map(|n| n.to_string())
            .collect();

        let params_matched = if case.expected_params.is_empty() {
            None
        } else {
            let actual = report
                .outcomes
                .get(&case.expected)
                .map(|r| &r.params);
            Some(match actual {
                Some(actual) if activated => case
                    .expected_params
                    .iter()
                    .all(|(name, expected)| {
                        actual
                            .get(name)
                            .map_or(false, |value| param_matches(value, expected))
                    }),
                _ => false,
            })
        };

        let error = report
            .outcomes
            .get(&case.expected)
            .and_then(|r| r.error.clone());

        TrialRecord {
            phrase: case.phrase.clone(),
            expected: case.expected.clone(),
            activated,
            false_positives,
            params_matched,
            elapsed_secs: report.elapsed.as_secs_f64(),
            error,
        }
    }
}

/// Does an extracted value satisfy its textual expectation? Numbers match
/// within a small tolerance, text ignores whitespace and case.
fn param_matches(actual: &ParamValue, expected: &str) -> bool {
    match actual {
        ParamValue::Number(n) => expected
            .trim()
            .parse::<f64>()
            .map(|e| (n - e).abs() < 1e-3)
            .unwrap_or(false),
        ParamValue::Text(s) => normalize(s) == normalize(expected),
        ParamValue::Flag(b) => {
            params::extract_bool(expected).map_or(false, |e| e == *b)
        }
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn summarize_phrase(case: &VibeCase, trials: &[TrialRecord]) -> PhraseSummary {
    let iterations = trials.len();
    let correct = trials.iter().filter(|t| t.activated).count();

    let mut secondary: BTreeMap<String, usize> = BTreeMap::new();
    for trial in trials {
        for name in &trial.false_positives {
            *secondary.entry(name.clone()).or_insert(0) += 1;
        }
    }

    let with_expectations = trials.iter().filter(|t| t.params_matched.is_some()).count();
    let param_success_rate = if with_expectations == 0 {
        100.0
    } else {
        let matched = trials
            .iter()
            .filter(|t| t.params_matched == Some(true))
            .count();
        matched as f64 / with_expectations as f64 * 100.0
    };

    let times: Vec<f64> = trials.iter().map(|t| t.elapsed_secs).collect();

    PhraseSummary {
        phrase: case.phrase.clone(),
        expected: case.expected.clone(),
        iterations,
        correct,
        success_rate: if iterations == 0 {
            0.0
        } else {
            correct as f64 / iterations as f64 * 100.0
        },
        param_success_rate,
        majority_correct: iterations > 0 && (correct as f64 / iterations as f64) > 0.5,
        secondary_activations: secondary,
        failures: trials.iter().filter_map(|t| t.error.clone()).collect(),
        timing: TimingStats::from_times(&times),
    }
}

fn summarize_skills(phrases: &[PhraseSummary]) -> Vec<SkillSummary> {
    let mut grouped: BTreeMap<&str, Vec<&PhraseSummary>> = BTreeMap::new();
    for phrase in phrases {
        grouped.entry(&phrase.expected).or_default().push(phrase);
    }

    grouped
        .into_iter()
        .map(|(name, group)| {
            let total: usize = group.iter().map(|p| p.iterations).sum();
            let correct: usize = group.iter().map(|p| p.correct).sum();
            let times: Vec<f64> = group
                .iter()
                .flat_map(|p| {
                    // Phrase timings are already aggregated; reconstruct a
                    // weighted sample from the means for the skill view.
                    std::iter::repeat(p.timing.mean).take(p.iterations)
                })
                .collect();
            SkillSummary {
                name: name.to_string(),
                phrases: group.len(),
                correct,
                total,
                success_rate: if total == 0 {
                    0.0
                } else {
                    correct as f64 / total as f64 * 100.0
                },
                timing: TimingStats::from_times(&times),
            }
        })
        .collect()
}

/// Run the same corpus against several engines (e.g. one per model) and
/// rank the outcomes. Runs are sequential so they never contend for the
/// gateway.
pub async fn compare_models(
    engines: Vec<(String, Arc<AnalysisEngine>)>,
    mut config: HarnessConfig,
    corpus: &[VibeCase],
) -> ModelComparison {
    let mut runs = Vec::with_capacity(engines.len());
    for (label, engine) in engines {
        config.label = label;
        let harness = VibeHarness::new(engine, config.clone());
        runs.push(harness.run_corpus(corpus).await);
    }
    ModelComparison::rank(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{builtin_skills, ParamKind, ParamSpec, SkillRole};

    #[test]
    fn test_corpus_covers_every_phrase() {
        let skills = builtin_skills();
        let corpus = corpus_from_skills(&skills);
        let total: usize = skills.iter().map(|s| s.vibe_test_phrases.len()).sum();
        assert_eq!(corpus.len(), total);
    }

    #[test]
    fn test_derive_expected_expression() {
        let skill = Skill::new(
            "calculate",
            "arith",
            SkillRole::Mathematics,
            "fn execute(expression) { log(expression); }",
        )
        .with_parameters(vec![ParamSpec::required(
            "expression",
            ParamKind::String,
            "expr",
        )]);
        let expected = derive_expected_params(&skill, "calculate 5 + 3");
        assert_eq!(expected["expression"], "5 + 3");
    }

    #[test]
    fn test_derive_expected_number() {
        let skill = Skill::new(
            "square_root",
            "sqrt",
            SkillRole::Mathematics,
            "fn execute(number) { log(\"x\"); }",
        )
        .with_parameters(vec![ParamSpec::required(
            "number",
            ParamKind::Number,
            "the number",
        )]);
        let expected = derive_expected_params(&skill, "find the square root of 144");
        assert_eq!(expected["number"], "144");

        let none = derive_expected_params(&skill, "square root of something");
        assert!(none.is_empty());
    }

    #[test]
    fn test_param_matches_number_tolerance() {
        assert!(param_matches(&ParamValue::Number(144.0), "144"));
        assert!(param_matches(&ParamValue::Number(144.0005), "144"));
        assert!(!param_matches(&ParamValue::Number(145.0), "144"));
    }

    #[test]
    fn test_param_matches_text_ignores_spacing() {
        assert!(param_matches(&ParamValue::Text("2 + 2".into()), "2+2"));
        assert!(!param_matches(&ParamValue::Text("2 + 3".into()), "2+2"));
    }

    #[test]
    fn test_majority_rule() {
        let case = VibeCase::new("p", "s");
        let trial = |activated: bool| TrialRecord {
            phrase: "p".into(),
            expected: "s".into(),
            activated,
            false_positives: Vec::new(),
            params_matched: None,
            elapsed_secs: 0.1,
            error: None,
        };
        let summary = summarize_phrase(
            &case,
            &[trial(true), trial(true), trial(true), trial(false), trial(false)],
        );
        assert!(summary.majority_correct);
        assert_eq!(summary.correct, 3);

        let summary = summarize_phrase(&case, &[trial(true), trial(false)]);
        assert!(!summary.majority_correct);
    }
}
