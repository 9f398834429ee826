//! Error types for the dispatch core.
//!
//! One enum per error family, mirroring the stage boundaries of a dispatch
//! cycle: registry mutation, parameter coercion, sandbox execution, and
//! gateway interaction. Per-skill failures during a cycle are wrapped in
//! [`SkillFailure`] so the engine can report them without aborting siblings.

use thiserror::Error;

/// Errors surfaced by registry mutations.
///
/// These are always returned to the caller; the registry never recovers
/// silently from a failed mutation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A skill with this name already exists and the call was not an update.
    #[error("a skill named '{name}' is already registered")]
    DuplicateName { name: String },

    /// The definition failed validation; the messages list every error found.
    #[error("invalid skill definition: {}", errors.join("; "))]
    InvalidDefinition { errors: Vec<String> },

    /// The target skill is verified (built-in) and cannot be modified.
    #[error("skill '{name}' is verified and cannot be modified or removed")]
    Protected { name: String },

    /// No skill with this name exists.
    #[error("no skill named '{name}'")]
    NotFound { name: String },

    /// The persisted backing store could not be read or written.
    #[error("skill store error: {message}")]
    Store { message: String },
}

/// Errors from the parameter stage.
///
/// A missing required parameter is deliberately distinct from a value that
/// was present but could not be typed.
#[derive(Debug, Clone, Error)]
pub enum ParamError {
    /// A required parameter had no extractable value.
    #[error("required parameter '{name}' has no extractable value")]
    MissingRequired { name: String },

    /// A value was extracted but could not be coerced to the declared kind.
    #[error("cannot coerce '{raw}' into a {kind} for parameter '{name}'")]
    Coercion {
        name: String,
        kind: &'static str,
        raw: String,
    },
}

/// Errors from compiling or running skill source in the sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The source failed to compile.
    #[error("skill '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },

    /// The source compiled but does not define a callable `execute` entry
    /// point with the declared arity.
    #[error("skill '{name}' source must define execute with {expected} parameter(s)")]
    MissingExecute { name: String, expected: usize },

    /// The script raised at runtime.
    #[error("skill '{name}' raised during execution: {message}")]
    Runtime { name: String, message: String },
}

/// Errors from talking to the language-model gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached at all.
    #[error("gateway unavailable: {message}")]
    Unavailable { message: String },

    /// The call did not complete within the configured deadline.
    #[error("gateway call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The gateway answered, but the response carried no usable payload.
    #[error("unparseable gateway response: {message}")]
    Unparseable { message: String },
}

/// The failure recorded against one skill inside a dispatch cycle.
///
/// Isolated per skill: a `SkillFailure` never aborts sibling skills in the
/// same cycle.
#[derive(Debug, Error)]
pub enum SkillFailure {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Execution(#[from] SandboxError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_messages() {
        let err = RegistryError::DuplicateName {
            name: "calculate".into(),
        };
        assert!(err.to_string().contains("calculate"));

        let err = RegistryError::InvalidDefinition {
            errors: vec!["no execute".into(), "bad name".into()],
        };
        assert!(err.to_string().contains("no execute; bad name"));
    }

    #[test]
    fn test_param_error_variants_are_distinct() {
        let missing = ParamError::MissingRequired {
            name: "number".into(),
        };
        let coercion = ParamError::Coercion {
            name: "number".into(),
            kind: "number",
            raw: "banana".into(),
        };
        assert!(matches!(missing, ParamError::MissingRequired { .. }));
        assert!(matches!(coercion, ParamError::Coercion { .. }));
    }

    #[test]
    fn test_skill_failure_from_conversions() {
        let failure: SkillFailure = ParamError::MissingRequired {
            name: "x".into(),
        }
        .into();
        assert!(matches!(failure, SkillFailure::Param(_)));

        let failure: SkillFailure = GatewayError::Timeout { seconds: 60 }.into();
        assert!(matches!(failure, SkillFailure::Gateway(_)));
    }
}
