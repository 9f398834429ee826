//! Selection/Execution engine.
//!
//! One dispatch cycle takes an utterance through, per registered skill, an
//! independent state machine:
//!
//! ```text
//! Pending -> Activating -> Extracting -> Executing -> Done
//!                 |             |             |
//!                 v             v             v
//!              Skipped       Failed        Failed
//! ```
//!
//! Activation queries fan out concurrently up to a bounded limit; outcomes
//! merge into a name-keyed map, so the final activation set is identical
//! regardless of response arrival order. Every per-skill failure is
//! isolated: a cycle is best-effort across independent skills.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, ParamError, SkillFailure};
use crate::gateway::{CompletionOptions, Gateway};
use crate::params::{self, ParamMap};
use crate::sandbox::Sandbox;
use crate::skill::{Skill, SkillRegistry, SkillRole};

use super::parser::{self, Verdict};
use super::prompts;

// ---------------------------------------------------------------------------
// Per-skill outcome
// ---------------------------------------------------------------------------

/// Where a skill's state machine ended up for one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillState {
    Pending,
    Activating,
    Extracting,
    Executing,
    Done,
    Skipped,
    Failed,
}

/// Final record for one skill in one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillReport {
    pub name: String,
    pub state: SkillState,
    /// Stage the machine was in when it failed; `None` unless `Failed`.
    pub failed_at: Option<SkillState>,
    /// Coerced parameters the skill was (or would have been) called with.
    #[serde(default)]
    pub params: ParamMap,
    /// Log lines captured from execution (only ever present on `Done`).
    pub logs: Vec<String>,
    /// Error summary (only ever present on `Failed`).
    pub error: Option<String>,
}

impl SkillReport {
    fn done(name: &str, params: ParamMap, logs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            state: SkillState::Done,
            failed_at: None,
            params,
            logs,
            error: None,
        }
    }

    fn skipped(name: &str) -> Self {
        Self {
            name: name.into(),
            state: SkillState::Skipped,
            failed_at: None,
            params: ParamMap::new(),
            logs: Vec::new(),
            error: None,
        }
    }

    fn failed(name: &str, stage: SkillState, failure: SkillFailure) -> Self {
        Self {
            name: name.into(),
            state: SkillState::Failed,
            failed_at: Some(stage),
            params: ParamMap::new(),
            logs: Vec::new(),
            error: Some(failure.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Aggregated outcome of one dispatch cycle, keyed by skill name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub utterance: String,
    pub outcomes: BTreeMap<String, SkillReport>,
    pub elapsed: Duration,
}

impl DispatchReport {
    /// Names of skills that activated and completed.
    pub fn done(&self) -> impl Iterator<Item = &SkillReport> {
        self.outcomes.values().filter(|r| r.state == SkillState::Done)
    }

    /// Names of skills that failed at some stage.
    pub fn failed(&self) -> impl Iterator<Item = &SkillReport> {
        self.outcomes
            .values()
            .filter(|r| r.state == SkillState::Failed)
    }

    /// Whether the named skill reached `Done`.
    pub fn completed(&self, name: &str) -> bool {
        self.outcomes
            .get(name)
            .map_or(false, |r| r.state == SkillState::Done)
    }

    /// Names of every skill that activated (reached extraction or beyond),
    /// whether or not it later failed.
    pub fn activated(&self) -> Vec<&str> {
        self.outcomes
            .values()
            .filter(|r| match r.state {
                SkillState::Done => true,
                SkillState::Failed => r.failed_at != Some(SkillState::Activating),
                _ => false,
            })
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Concatenated Done output, formatted as contextual evidence for a
    /// conversation layer to fold into its next prompt.
    pub fn context_block(&self) -> String {
        let mut parts = Vec::new();
        for report in self.done() {
            if report.logs.is_empty() {
                continue;
            }
            parts.push(format!("[{}]\n{}", report.name, report.logs.join("\n")));
        }
        parts.join("\n\n")
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounded fan-out for gateway calls within one cycle.
    pub max_concurrency: usize,
    /// Per-gateway-call deadline; expiry fails that skill only.
    pub gateway_timeout: Duration,
    /// Options forwarded on every gateway call.
    pub options: CompletionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            gateway_timeout: Duration::from_secs(60),
            options: CompletionOptions::default(),
        }
    }
}

/// Orchestrates activation, extraction, and execution for one utterance at
/// a time, borrowing the registry read-only for each cycle.
pub struct AnalysisEngine {
    registry: Arc<SkillRegistry>,
    gateway: Arc<dyn Gateway>,
    sandbox: Arc<Sandbox>,
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(
        registry: Arc<SkillRegistry>,
        gateway: Arc<dyn Gateway>,
        sandbox: Arc<Sandbox>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            sandbox,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Run one full dispatch cycle across every registered skill.
    pub async fn dispatch(&self, utterance: &str) -> DispatchReport {
        self.dispatch_filtered(utterance, None).await
    }

    /// Run one cycle restricted to skills of the given role.
    pub async fn dispatch_filtered(
        &self,
        utterance: &str,
        role: Option<SkillRole>,
    ) -> DispatchReport {
        let started = Instant::now();
        let skills = self.registry.snapshot(role);
        tracing::debug!(
            utterance,
            candidates = skills.len(),
            "starting dispatch cycle"
        );

        let outcomes: BTreeMap<String, SkillReport> = futures::stream::iter(skills)
            .map(|skill| async move {
                let name = skill.name.clone();
                let report = self.run_skill(utterance, &skill).await;
                (name, report)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let report = DispatchReport {
            utterance: utterance.to_string(),
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            done = report.done().count(),
            failed = report.failed().count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "dispatch cycle finished"
        );
        report
    }

    /// Drive one skill through its state machine.
    async fn run_skill(&self, utterance: &str, skill: &Skill) -> SkillReport {
        // ACTIVATING
        let prompt = prompts::activation_prompt(utterance, skill);
        let answer = match self.gateway_call(&prompt).await {
            Ok(answer) => answer,
            Err(e) => return SkillReport::failed(&skill.name, SkillState::Activating, e.into()),
        };
        match parser::parse_verdict(&answer) {
            Verdict::Affirmed => {}
            // Fail-closed: silently executing something is worse than
            // silently skipping it.
            Verdict::Denied | Verdict::Unparseable => return SkillReport::skipped(&skill.name),
        }

        // EXTRACTING
        let params = match self.extract_params(utterance, skill).await {
            Ok(params) => params,
            Err(failure) => {
                return SkillReport::failed(&skill.name, SkillState::Extracting, failure)
            }
        };

        // EXECUTING: CPU-bound and synchronous once parameters are ready.
        let result = self.sandbox.run(skill, &params);
        match result.error {
            None => SkillReport::done(&skill.name, params, result.logs),
            Some(e) => SkillReport::failed(&skill.name, SkillState::Executing, e.into()),
        }
    }

    /// One extraction query per declared parameter, coerced as it lands.
    async fn extract_params(
        &self,
        utterance: &str,
        skill: &Skill,
    ) -> Result<ParamMap, SkillFailure> {
        let mut params = ParamMap::new();
        for spec in &skill.parameters {
            let prompt = prompts::extraction_prompt(utterance, skill, spec);
            let raw = self.gateway_call(&prompt).await?;
            let cleaned = parser::clean_extraction(&raw);

            if cleaned.is_empty() {
                if spec.required {
                    return Err(ParamError::MissingRequired {
                        name: spec.name.clone(),
                    }
                    .into());
                }
                continue;
            }

            let value = params::coerce(&spec.name, spec.kind, &cleaned)?;
            params.insert(spec.name.clone(), value);
        }
        Ok(params)
    }

    async fn gateway_call(&self, prompt: &str) -> Result<String, GatewayError> {
        let deadline = self.config.gateway_timeout;
        match tokio::time::timeout(deadline, self.gateway.complete(prompt, &self.config.options))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                seconds: deadline.as_secs(),
            }),
        }
    }
}
