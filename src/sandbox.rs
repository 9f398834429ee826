//! Execution sandbox for skill source.
//!
//! Skill bodies are Rhai scripts defining `fn execute(...)` with one
//! argument per declared parameter, in declared order. Compilation happens
//! once per `(name, source-hash)` into an AST arena; the hash key means an
//! unchanged source is never recompiled and a changed one never served
//! stale.
//!
//! Each call runs against a fresh engine whose namespace exposes exactly:
//! the parameter values, a `log(message)` primitive appending to the
//! per-call buffer, and a small pure helper set (`calc`, `now_string`,
//! `now_hour`). File-system helpers (`read_file`, `list_dir`) are the
//! documented exception and are registered only for `file_operations`
//! skills. An operation budget bounds runaway loops.
//!
//! Any compile or runtime failure is captured as that skill's error and
//! never propagates to sibling skills in a dispatch cycle.

use std::sync::Arc;

use chrono::Timelike;
use dashmap::DashMap;
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, AST};
use sha2::{Digest, Sha256};

use crate::error::SandboxError;
use crate::params::{ParamMap, ParamValue};
use crate::skill::{Skill, SkillRole};

/// Default operation budget per call.
const DEFAULT_MAX_OPERATIONS: u64 = 500_000;

/// Captured output of one skill call.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Lines emitted through `log`, in order.
    pub logs: Vec<String>,
    /// The failure, if the call did not complete.
    pub error: Option<SandboxError>,
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Compiling/executing facade with a compiled-AST arena.
pub struct Sandbox {
    arena: DashMap<String, Arc<AST>>,
    max_operations: u64,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            arena: DashMap::new(),
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }

    /// Override the per-call operation budget.
    pub fn with_max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations;
        self
    }

    /// Number of distinct compiled sources currently in the arena.
    pub fn compiled_count(&self) -> usize {
        self.arena.len()
    }

    /// Validate that a skill's source compiles and defines `execute` with
    /// the declared arity. Used by the registry on register/update/load.
    pub fn check(&self, skill: &Skill) -> Result<(), SandboxError> {
        let ast = self.compile(skill)?;
        let expected = skill.parameters.len();
        let found = ast
            .iter_functions()
            .any(|f| f.name == "execute" && f.params.len() == expected);
        if found {
            Ok(())
        } else {
            Err(SandboxError::MissingExecute {
                name: skill.name.clone(),
                expected,
            })
        }
    }

    /// Run a skill with already-coerced parameters, capturing log lines.
    pub fn run(&self, skill: &Skill, params: &ParamMap) -> ExecutionResult {
        let ast = match self.compile(skill) {
            Ok(ast) => ast,
            Err(error) => {
                return ExecutionResult {
                    logs: Vec::new(),
                    error: Some(error),
                }
            }
        };

        // Positional arguments in declared order; absent optional values
        // arrive in the script as ().
        let args: Vec<Dynamic> = skill
            .parameters
            .iter()
            .map(|spec| match params.get(&spec.name) {
                Some(ParamValue::Text(s)) => Dynamic::from(s.clone()),
                Some(ParamValue::Number(n)) => Dynamic::from(*n),
                Some(ParamValue::Flag(b)) => Dynamic::from(*b),
                None => Dynamic::UNIT,
            })
            .collect();

        let buffer: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let engine = self.call_engine(skill, Arc::clone(&buffer));

        let mut scope = rhai::Scope::new();
        let outcome = engine.call_fn::<Dynamic>(&mut scope, &ast, "execute", args);

        let logs = std::mem::take(&mut *buffer.lock());
        match outcome {
            Ok(_) => ExecutionResult { logs, error: None },
            Err(e) => ExecutionResult {
                logs,
                error: Some(SandboxError::Runtime {
                    name: skill.name.clone(),
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Fetch or build the compiled AST for the skill's current source.
    fn compile(&self, skill: &Skill) -> Result<Arc<AST>, SandboxError> {
        let key = arena_key(&skill.name, &skill.source);
        if let Some(cached) = self.arena.get(&key) {
            return Ok(Arc::clone(&cached));
        }

        let mut engine = Engine::new();
        // The sandbox's only documented guardrail is the per-call operation
        // budget (applied in `call_engine`); Rhai's default parse-time
        // expression-depth cap is not a designed limit here and rejects
        // legitimately-authored scripts (e.g. the `directoryReader` builtin).
        engine.set_max_expr_depths(0, 0);
        let ast = engine
            .compile(&skill.source)
            .map_err(|e| SandboxError::Compile {
                name: skill.name.clone(),
                message: e.to_string(),
            })?;
        let ast = Arc::new(ast);

        // Older versions of this skill's source stay in the arena until the
        // skill is removed; they are keyed by hash and simply unused.
        self.arena.insert(key, Arc::clone(&ast));
        Ok(ast)
    }

    /// Build the per-call engine: namespace, helpers, operation budget.
    fn call_engine(&self, skill: &Skill, buffer: Arc<Mutex<Vec<String>>>) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.max_operations);

        engine.register_fn("log", move |message: &str| {
            buffer.lock().push(message.to_string());
        });

        engine.register_fn("calc", |expression: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            eval_arithmetic(expression)
        });

        engine.register_fn("now_string", || -> String {
            chrono::Local::now().format("%A, %B %d, %Y %I:%M:%S %p").to_string()
        });
        engine.register_fn("now_hour", || -> i64 {
            chrono::Local::now().hour() as i64
        });

        if skill.role == SkillRole::FileOperations {
            register_fs_helpers(&mut engine);
        }

        engine
    }
}

fn arena_key(name: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{}:{}", name, hex::encode(hasher.finalize()))
}

fn script_err(message: String) -> Box<EvalAltResult> {
    message.into()
}

/// Evaluate a plain arithmetic expression in an isolated expression-only
/// engine. Statements are rejected wholesale, so the surface is numbers
/// and operators. Whole-valued float results collapse to integers so
/// `100 / 4` logs as `25`, not `25.0`.
fn eval_arithmetic(expression: &str) -> Result<Dynamic, Box<EvalAltResult>> {
    let mut engine = Engine::new();
    engine.set_max_operations(10_000);
    let value = engine
        .eval_expression::<Dynamic>(expression)
        .map_err(|e| script_err(format!("invalid expression: {}", e)))?;
    if value.is::<i64>() {
        return Ok(value);
    }
    match value.try_cast::<f64>() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(Dynamic::from(f as i64)),
        Some(f) => Ok(Dynamic::from(f)),
        None => Err(script_err(
            "expression did not evaluate to a number".into(),
        )),
    }
}

fn register_fs_helpers(engine: &mut Engine) {
    engine.register_fn("read_file", |path: &str| -> Result<String, Box<EvalAltResult>> {
        std::fs::read_to_string(path).map_err(|e| script_err(e.to_string()))
    });

    engine.register_fn("list_dir", |path: &str| -> Result<rhai::Array, Box<EvalAltResult>> {
        let mut names = rhai::Array::new();
        let entries = std::fs::read_dir(path).map_err(|e| script_err(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| script_err(e.to_string()))?;
            names.push(Dynamic::from(entry.path().display().to_string()));
        }
        Ok(names)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{ParamKind, ParamSpec};
    use std::collections::BTreeMap;

    fn logging_skill(name: &str, source: &str) -> Skill {
        Skill::new(name, "test skill", SkillRole::General, source)
    }

    #[test]
    fn test_run_captures_logs_in_order() {
        let sandbox = Sandbox::new();
        let skill = logging_skill(
            "greeter",
            r#"fn execute() { log("one"); log("two"); }"#,
        );
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(result.is_ok());
        assert_eq!(result.logs, vec!["one", "two"]);
    }

    #[test]
    fn test_positional_params_in_declared_order() {
        let sandbox = Sandbox::new();
        let skill = logging_skill(
            "pair",
            r#"fn execute(a, b) { log(`${a}-${b}`); }"#,
        )
        .with_parameters(vec![
            ParamSpec::required("a", ParamKind::String, "first"),
            ParamSpec::required("b", ParamKind::Number, "second"),
        ]);
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), ParamValue::Text("x".into()));
        params.insert("b".to_string(), ParamValue::Number(2.0));
        let result = sandbox.run(&skill, &params);
        assert!(result.is_ok(), "error: {:?}", result.error);
        assert!(result.logs[0].starts_with("x-2"), "log: {}", result.logs[0]);
    }

    #[test]
    fn test_runtime_error_is_isolated_to_result() {
        let sandbox = Sandbox::new();
        let skill = logging_skill(
            "thrower",
            r#"fn execute() { log("before"); throw "boom"; }"#,
        );
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(!result.is_ok());
        assert_eq!(result.logs, vec!["before"]);
        assert!(matches!(result.error, Some(SandboxError::Runtime { .. })));
    }

    #[test]
    fn test_compile_error_reported() {
        let sandbox = Sandbox::new();
        let skill = logging_skill("broken", "fn execute( {");
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(matches!(result.error, Some(SandboxError::Compile { .. })));
    }

    #[test]
    fn test_check_requires_execute_with_declared_arity() {
        let sandbox = Sandbox::new();
        let skill = logging_skill("noexec", r#"fn other() { log("hi"); }"#);
        assert!(matches!(
            sandbox.check(&skill),
            Err(SandboxError::MissingExecute { expected: 0, .. })
        ));

        let skill = logging_skill("arity", r#"fn execute() { log("hi"); }"#)
            .with_parameters(vec![ParamSpec::required("x", ParamKind::Number, "x")]);
        assert!(matches!(
            sandbox.check(&skill),
            Err(SandboxError::MissingExecute { expected: 1, .. })
        ));
    }

    #[test]
    fn test_arena_caches_by_source_hash() {
        let sandbox = Sandbox::new();
        let mut skill = logging_skill("cached", r#"fn execute() { log("v1"); }"#);
        sandbox.run(&skill, &BTreeMap::new());
        sandbox.run(&skill, &BTreeMap::new());
        assert_eq!(sandbox.compiled_count(), 1);

        skill.source = r#"fn execute() { log("v2"); }"#.into();
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert_eq!(result.logs, vec!["v2"]);
        assert_eq!(sandbox.compiled_count(), 2);
    }

    #[test]
    fn test_calc_helper() {
        let sandbox = Sandbox::new();
        let skill = logging_skill(
            "calc_user",
            r#"fn execute() { let r = calc("2 + 2"); log(`result ${r}`); }"#,
        );
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(result.is_ok(), "error: {:?}", result.error);
        assert_eq!(result.logs, vec!["result 4"]);
    }

    #[test]
    fn test_operation_budget_contains_runaway_loop() {
        let sandbox = Sandbox::new().with_max_operations(1_000);
        let skill = logging_skill("spinner", r#"fn execute() { let n = 0; loop { n += 1; } }"#);
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(matches!(result.error, Some(SandboxError::Runtime { .. })));
    }

    #[test]
    fn test_fs_helpers_gated_by_role() {
        let sandbox = Sandbox::new();
        // General skills do not see read_file at all.
        let skill = logging_skill(
            "sneaky",
            r#"fn execute() { log(read_file("/etc/hostname")); }"#,
        );
        let result = sandbox.run(&skill, &BTreeMap::new());
        assert!(matches!(result.error, Some(SandboxError::Runtime { .. })));
    }

    #[test]
    fn test_fs_helper_reads_for_file_operations_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "hello from disk").unwrap();

        let sandbox = Sandbox::new();
        let mut skill = logging_skill(
            "reader",
            r#"
fn execute(file_path) {
    try {
        log(read_file(file_path));
    } catch (err) {
        log(`failed: ${err}`);
    }
}
"#,
        )
        .with_parameters(vec![ParamSpec::required(
            "file_path",
            ParamKind::String,
            "path",
        )]);
        skill.role = SkillRole::FileOperations;

        let mut params = BTreeMap::new();
        params.insert(
            "file_path".to_string(),
            ParamValue::Text(path.display().to_string()),
        );
        let result = sandbox.run(&skill, &params);
        assert!(result.is_ok(), "error: {:?}", result.error);
        assert_eq!(result.logs, vec!["hello from disk"]);
    }
}
