//! Skill system: data model, validation, built-ins, and the registry.

mod builtin;
mod model;
mod registry;

pub use builtin::builtin_skills;
pub use model::{
    validate_structure, ParamKind, ParamSpec, Skill, SkillDescriptor, SkillPatch, SkillRole,
    ValidationReport,
};
pub use registry::{LoadIssue, SkillRegistry};
