//! Skill registry: owns the set of skill definitions.
//!
//! Uniqueness and immutability rules live here: names are unique, verified
//! built-ins reject update/remove with `Protected`, and every mutation
//! re-validates the definition (structure plus a sandbox compile check).
//!
//! Built-ins are seeded at init and never touch the backing store.
//! User-defined skills persist as one JSON record per name under the store
//! directory; records that fail to parse or validate on load are skipped
//! and reported, never silently dropped and never fatal to their siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::sandbox::Sandbox;

use super::builtin::builtin_skills;
use super::model::{
    validate_structure, Skill, SkillDescriptor, SkillPatch, SkillRole, ValidationReport,
};

/// A record that could not be loaded from the store, with the reason.
#[derive(Debug, Clone)]
pub struct LoadIssue {
    pub file: PathBuf,
    pub message: String,
}

/// Registry over an insertion-ordered skill list with an optional JSON
/// file store.
pub struct SkillRegistry {
    skills: RwLock<Vec<Skill>>,
    store_dir: Option<PathBuf>,
    sandbox: Arc<Sandbox>,
}

impl SkillRegistry {
    /// In-memory registry with no backing store (tests, harness doubles).
    pub fn in_memory(sandbox: Arc<Sandbox>) -> Self {
        Self {
            skills: RwLock::new(Vec::new()),
            store_dir: None,
            sandbox,
        }
    }

    /// Registry persisting user-defined skills under `store_dir`.
    pub fn with_store(sandbox: Arc<Sandbox>, store_dir: impl Into<PathBuf>) -> Self {
        Self {
            skills: RwLock::new(Vec::new()),
            store_dir: Some(store_dir.into()),
            sandbox,
        }
    }

    /// Seed built-ins and load persisted records. Returns the issues for
    /// records that were skipped; loading always continues past them.
    pub fn init(&self) -> Result<Vec<LoadIssue>, RegistryError> {
        for skill in builtin_skills() {
            self.insert(skill, false)?;
        }
        self.load_store()
    }

    // --- Mutations -------------------------------------------------------

    /// Register a new skill. Fails with `DuplicateName` if the name is
    /// taken and `InvalidDefinition` if validation or compilation fails.
    pub fn register(&self, skill: Skill) -> Result<(), RegistryError> {
        self.insert(skill, true)
    }

    /// Patch an existing, non-verified skill. Re-validates the patched
    /// definition before replacing the stored one.
    pub fn update(&self, name: &str, patch: &SkillPatch) -> Result<Skill, RegistryError> {
        let mut skills = self.skills.write();
        let slot = skills
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })?;
        if slot.verified {
            return Err(RegistryError::Protected { name: name.into() });
        }

        let mut patched = slot.clone();
        patch.apply_to(&mut patched);
        self.validate(&patched)?;

        *slot = patched.clone();
        drop(skills);

        self.persist(&patched)?;
        Ok(patched)
    }

    /// Remove a non-verified skill and its persisted record.
    pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
        let mut skills = self.skills.write();
        let index = skills
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })?;
        if skills[index].verified {
            return Err(RegistryError::Protected { name: name.into() });
        }
        skills.remove(index);
        drop(skills);

        if let Some(dir) = &self.store_dir {
            let path = record_path(dir, name);
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| RegistryError::Store {
                    message: format!("removing {}: {}", path.display(), e),
                })?;
            }
        }
        Ok(())
    }

    // --- Reads -----------------------------------------------------------

    /// Insertion-stable descriptor listing, optionally filtered by role.
    pub fn list(&self, role: Option<SkillRole>) -> Vec<SkillDescriptor> {
        self.skills
            .read()
            .iter()
            .filter(|s| role.map_or(true, |r| s.role == r))
            .map(Skill::descriptor)
            .collect()
    }

    /// Full clone of one skill.
    pub fn get(&self, name: &str) -> Option<Skill> {
        self.skills.read().iter().find(|s| s.name == name).cloned()
    }

    /// Point-in-time clone of the full set, optionally filtered by role.
    /// The engine dispatches against this snapshot.
    pub fn snapshot(&self, role: Option<SkillRole>) -> Vec<Skill> {
        self.skills
            .read()
            .iter()
            .filter(|s| role.map_or(true, |r| s.role == r))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.read().is_empty()
    }

    /// Validate without registering; the editing surface uses this for
    /// dry-run feedback including warnings.
    pub fn validate(&self, skill: &Skill) -> Result<ValidationReport, RegistryError> {
        let mut report = validate_structure(skill);
        if report.is_valid() {
            if let Err(e) = self.sandbox.check(skill) {
                report.error(e.to_string());
            }
        }
        if report.is_valid() {
            Ok(report)
        } else {
            Err(RegistryError::InvalidDefinition {
                errors: report.errors,
            })
        }
    }

    // --- Internals -------------------------------------------------------

    fn insert(&self, skill: Skill, persist: bool) -> Result<(), RegistryError> {
        self.validate(&skill)?;

        let mut skills = self.skills.write();
        if skills.iter().any(|s| s.name == skill.name) {
            return Err(RegistryError::DuplicateName { name: skill.name });
        }
        skills.push(skill.clone());
        drop(skills);

        if persist {
            self.persist(&skill)?;
        }
        Ok(())
    }

    /// Write one record atomically: temp file in the same directory, then
    /// rename over the target. Verified skills are never written.
    fn persist(&self, skill: &Skill) -> Result<(), RegistryError> {
        if skill.verified {
            return Ok(());
        }
        let Some(dir) = &self.store_dir else {
            return Ok(());
        };

        std::fs::create_dir_all(dir).map_err(|e| RegistryError::Store {
            message: format!("creating {}: {}", dir.display(), e),
        })?;

        let body = serde_json::to_string_pretty(skill).map_err(|e| RegistryError::Store {
            message: e.to_string(),
        })?;
        let target = record_path(dir, &skill.name);
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| RegistryError::Store {
            message: format!("writing {}: {}", tmp.display(), e),
        })?;
        std::fs::rename(&tmp, &target).map_err(|e| RegistryError::Store {
            message: format!("renaming into {}: {}", target.display(), e),
        })?;
        Ok(())
    }

    fn load_store(&self) -> Result<Vec<LoadIssue>, RegistryError> {
        let Some(dir) = &self.store_dir else {
            return Ok(Vec::new());
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut issues = Vec::new();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| RegistryError::Store {
                message: format!("reading {}: {}", dir.display(), e),
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        entries.sort();

        for path in entries {
            match self.load_record(&path) {
                Ok(()) => {}
                Err(message) => {
                    tracing::warn!("skipping skill record {}: {}", path.display(), message);
                    issues.push(LoadIssue { file: path, message });
                }
            }
        }
        Ok(issues)
    }

    fn load_record(&self, path: &Path) -> Result<(), String> {
        let body = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut skill: Skill = serde_json::from_str(&body).map_err(|e| e.to_string())?;
        // The mutable store only ever holds user-defined skills; a record
        // claiming otherwise is treated as corrupt rather than granted
        // immutability.
        if skill.verified {
            skill.verified = false;
        }
        self.insert(skill, false).map_err(|e| e.to_string())
    }
}

fn record_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{ParamKind, ParamSpec};

    fn registry() -> SkillRegistry {
        let registry = SkillRegistry::in_memory(Arc::new(Sandbox::new()));
        registry.init().unwrap();
        registry
    }

    fn user_skill(name: &str) -> Skill {
        Skill::new(
            name,
            "Echo back whatever text the user provided.",
            SkillRole::General,
            "fn execute(text) { log(text); }",
        )
        .with_parameters(vec![ParamSpec::required(
            "text",
            ParamKind::String,
            "text to echo",
        )])
        .with_vibe_phrases(["echo hello world"])
    }

    #[test]
    fn test_register_then_list_includes_exactly_one() {
        let registry = registry();
        registry.register(user_skill("echo")).unwrap();
        let matches: Vec<_> = registry
            .list(None)
            .into_iter()
            .filter(|d| d.name == "echo")
            .collect();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = registry();
        registry.register(user_skill("echo")).unwrap();
        let err = registry.register(user_skill("echo")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn test_builtins_protected_from_update_and_remove() {
        let registry = registry();
        for name in ["calculate", "getWeather", "fear"] {
            let err = registry.update(name, &SkillPatch::default()).unwrap_err();
            assert!(matches!(err, RegistryError::Protected { .. }), "{}", name);
            let err = registry.remove(name).unwrap_err();
            assert!(matches!(err, RegistryError::Protected { .. }), "{}", name);
        }
    }

    #[test]
    fn test_update_revalidates_source() {
        let registry = registry();
        registry.register(user_skill("echo")).unwrap();

        let bad_patch = SkillPatch {
            source: Some("fn not_execute() {}".into()),
            ..SkillPatch::default()
        };
        let err = registry.update("echo", &bad_patch).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDefinition { .. }));

        // The stored definition is untouched after the failed update.
        assert!(registry.get("echo").unwrap().source.contains("execute"));
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let registry = registry();
        let err = registry.remove("missing").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn test_list_filters_by_role() {
        let registry = registry();
        let math = registry.list(Some(SkillRole::Mathematics));
        assert!(math.iter().all(|d| d.role == SkillRole::Mathematics));
        assert!(math.iter().any(|d| d.name == "calculate"));
        assert!(math.iter().any(|d| d.name == "square_root"));
    }

    #[test]
    fn test_invalid_definition_reports_every_error() {
        let registry = registry();
        let mut skill = user_skill("bad name");
        skill.source = String::new();
        let err = registry.register(skill).unwrap_err();
        match err {
            RegistryError::InvalidDefinition { errors } => assert!(errors.len() >= 2),
            other => panic!("expected InvalidDefinition, got {other}"),
        }
    }

    #[test]
    fn test_store_round_trip_and_corrupt_record_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new());

        {
            let registry = SkillRegistry::with_store(Arc::clone(&sandbox), dir.path());
            registry.init().unwrap();
            registry.register(user_skill("echo")).unwrap();
        }
        assert!(dir.path().join("echo.json").exists());
        // Built-ins never land in the store.
        assert!(!dir.path().join("calculate.json").exists());

        std::fs::write(dir.path().join("corrupt.json"), "{ not json").unwrap();

        let registry = SkillRegistry::with_store(Arc::clone(&sandbox), dir.path());
        let issues = registry.init().unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].file.ends_with("corrupt.json"));
        assert!(registry.get("echo").is_some());
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let registry = registry();
        let before = registry.snapshot(None);
        registry.register(user_skill("echo")).unwrap();
        assert_eq!(registry.snapshot(None).len(), before.len() + 1);
        // The earlier snapshot is unaffected by the mutation.
        assert_eq!(before.len(), 7);
    }
}
