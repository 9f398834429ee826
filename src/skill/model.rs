//! Skill definition: the unit of dispatchable functionality.
//!
//! A skill declares *when* it should fire (`description` plus
//! `vibe_test_phrases`, both shown to the model), *what* it needs
//! (`parameters`, an ordered schema), and *what it does* (`source`, a Rhai
//! script defining an `execute` entry point). Built-ins ship `verified` and
//! are immutable after load.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter schema
// ---------------------------------------------------------------------------

/// Supported parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One declared parameter. Order within [`Skill::parameters`] is the call
/// order: values are handed to `execute` positionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Category tag for registry filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillRole {
    General,
    TextProcessing,
    Mathematics,
    DataAnalysis,
    FileOperations,
    WebUtilities,
    TimeDate,
    Formatting,
    Validation,
    EmotionalResponse,
    Information,
    Advanced,
}

impl std::fmt::Display for SkillRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkillRole::General => "general",
            SkillRole::TextProcessing => "text_processing",
            SkillRole::Mathematics => "mathematics",
            SkillRole::DataAnalysis => "data_analysis",
            SkillRole::FileOperations => "file_operations",
            SkillRole::WebUtilities => "web_utilities",
            SkillRole::TimeDate => "time_date",
            SkillRole::Formatting => "formatting",
            SkillRole::Validation => "validation",
            SkillRole::EmotionalResponse => "emotional_response",
            SkillRole::Information => "information",
            SkillRole::Advanced => "advanced",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Skill
// ---------------------------------------------------------------------------

/// A complete skill record. This is also the persisted JSON shape, one
/// record per name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Unique, stable, identifier-shaped name.
    pub name: String,

    /// Natural-language activation criterion shown to the model.
    pub description: String,

    /// Category tag.
    pub role: SkillRole,

    /// Ordered parameter schema.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,

    /// Example utterances that should activate this skill; consumed by the
    /// engine as few-shot guidance and by the harness as its corpus.
    #[serde(default)]
    pub vibe_test_phrases: Vec<String>,

    /// Rhai script body defining `fn execute(...)` with one argument per
    /// declared parameter, in declared order.
    pub source: String,

    /// Built-ins are verified and immutable.
    #[serde(default)]
    pub verified: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Skill {
    /// Create an unverified skill with empty schema and phrases.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        role: SkillRole,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            role,
            parameters: Vec::new(),
            vibe_test_phrases: Vec::new(),
            source: source.into(),
            verified: false,
            created_at: now,
            last_modified: now,
            tags: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParamSpec>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_vibe_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vibe_test_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Mark as a verified built-in.
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Lightweight listing view.
    pub fn descriptor(&self) -> SkillDescriptor {
        SkillDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            role: self.role,
            verified: self.verified,
            parameter_count: self.parameters.len(),
            tags: self.tags.clone(),
        }
    }
}

/// What `list` returns: enough to render a catalog without the source body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    pub role: SkillRole,
    pub verified: bool,
    pub parameter_count: usize,
    pub tags: Vec<String>,
}

/// Partial update applied by `update`; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillPatch {
    pub description: Option<String>,
    pub role: Option<SkillRole>,
    pub parameters: Option<Vec<ParamSpec>>,
    pub vibe_test_phrases: Option<Vec<String>>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SkillPatch {
    /// Apply this patch to a skill, refreshing `last_modified`.
    pub fn apply_to(&self, skill: &mut Skill) {
        if let Some(description) = &self.description {
            skill.description = description.clone();
        }
        if let Some(role) = self.role {
            skill.role = role;
        }
        if let Some(parameters) = &self.parameters {
            skill.parameters = parameters.clone();
        }
        if let Some(phrases) = &self.vibe_test_phrases {
            skill.vibe_test_phrases = phrases.clone();
        }
        if let Some(source) = &self.source {
            skill.source = source.clone();
        }
        if let Some(tags) = &self.tags {
            skill.tags = tags.clone();
        }
        skill.last_modified = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Outcome of validating a definition: errors make it invalid, warnings are
/// advisory (surfaced to the editing surface but never blocking).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Structural checks that need no compiler: name and parameter shapes,
/// advisory quality warnings. Source compilation is checked separately by
/// the sandbox.
pub fn validate_structure(skill: &Skill) -> ValidationReport {
    let mut report = ValidationReport::default();

    if skill.name.trim().is_empty() {
        report.error("skill name cannot be empty");
    } else if !IDENT_RE.is_match(&skill.name) {
        report.error(format!(
            "skill name '{}' must be identifier-shaped (letters, digits, underscore)",
            skill.name
        ));
    }
    if skill.name.len() > 50 {
        report.warning("skill name is quite long, consider shortening it");
    }

    if skill.description.trim().is_empty() {
        report.warning("description is empty; the model has nothing to activate on");
    } else if skill.description.len() < 10 {
        report.warning("description is very short, consider providing more detail");
    }

    for param in &skill.parameters {
        if !IDENT_RE.is_match(&param.name) {
            report.error(format!(
                "parameter name '{}' must be identifier-shaped",
                param.name
            ));
        }
        if param.description.trim().is_empty() {
            report.warning(format!("parameter '{}' is missing a description", param.name));
        }
    }
    {
        let mut seen = std::collections::BTreeSet::new();
        for param in &skill.parameters {
            if !seen.insert(param.name.as_str()) {
                report.error(format!("duplicate parameter name '{}'", param.name));
            }
        }
    }

    if skill.vibe_test_phrases.is_empty() {
        report.warning("no vibe test phrases; the harness cannot exercise this skill");
    }
    for (i, phrase) in skill.vibe_test_phrases.iter().enumerate() {
        if phrase.trim().len() < 5 {
            report.warning(format!("vibe test phrase {} is very short", i + 1));
        }
    }

    if skill.source.trim().is_empty() {
        report.error("source cannot be empty");
    } else if !skill.source.contains("log(") && !skill.source.contains("log (") {
        report.warning("source never calls log(); the dispatcher will see no output");
    }

    report
}
