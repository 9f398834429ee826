//! Selection/Execution engine: response parsing, prompt construction, and
//! the per-utterance dispatch cycle.

mod dispatch;
pub mod parser;
pub mod prompts;

pub use dispatch::{AnalysisEngine, DispatchReport, EngineConfig, SkillReport, SkillState};
pub use parser::Verdict;
