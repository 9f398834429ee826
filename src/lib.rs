//! # metareason
//!
//! Model-driven skill dispatch: natural-language requests are routed to
//! registered skills by a language model acting as intent classifier and
//! parameter extractor, executed in an isolated scripting sandbox, and the
//! captured output folded back into a conversation context. A consistency
//! and timing harness repeatedly drives the dispatcher to measure how
//! reliably a nondeterministic decision-maker behaves.
//!
//! Module map:
//!
//! - [`gateway`]: the language-model backend contract plus an Ollama
//!   client and a scripted test double
//! - [`skill`]: skill data model, validation, built-ins, and the registry
//! - [`params`]: pure free-text to typed-value coercion
//! - [`sandbox`]: Rhai execution sandbox with a compiled-AST arena
//! - [`engine`]: activation/extraction/execution dispatch cycle
//! - [`vibe`]: trial harness, timing statistics, and reports
//! - [`server`]: axum skill-editing surface
//! - [`config`] / [`error`]: runtime settings and the error taxonomy

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod params;
pub mod sandbox;
pub mod server;
pub mod skill;
pub mod vibe;

pub use engine::{AnalysisEngine, DispatchReport, EngineConfig};
pub use gateway::{CompletionOptions, Gateway, OllamaGateway, ScriptedGateway};
pub use sandbox::Sandbox;
pub use skill::{Skill, SkillRegistry};
pub use vibe::{HarnessConfig, VibeHarness, VibeReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
