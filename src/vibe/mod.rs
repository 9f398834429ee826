//! Consistency & timing analysis ("vibe tests").
//!
//! Everything here treats the engine as a black box: corpus in, trial
//! records out, statistics recomputed fresh per run.

mod harness;
mod report;
mod stats;

pub use harness::{
    compare_models, corpus_from_skills, derive_expected_params, HarnessConfig, TrialRecord,
    VibeCase, VibeHarness,
};
pub use report::{ModelComparison, PhraseSummary, SkillSummary, VibeReport};
pub use stats::{PerformanceCategory, TimingStats};
