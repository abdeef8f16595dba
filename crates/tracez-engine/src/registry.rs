//! Name-keyed set of verifiable tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracez_ir::{builtin, RunnerSpec, TaskError, TaskModel};
use tracing::{debug, info};

use crate::oracle::native;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task `{0}` is already registered")]
    Duplicate(String),
    #[error(transparent)]
    Invalid(#[from] TaskError),
    #[error("task `{task}` uses unknown built-in program `{program}`")]
    UnknownNativeProgram { task: String, program: String },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Definition {
        path: PathBuf,
        #[source]
        source: TaskError,
    },
}

/// Validated tasks, shared read-only once built.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<String, Arc<TaskModel>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in benchmarks.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for task in builtin::tasks() {
            registry.tasks.insert(task.name.clone(), Arc::new(task));
        }
        registry
    }

    pub fn insert(&mut self, task: TaskModel) -> Result<(), RegistryError> {
        task.validate()?;
        if let RunnerSpec::Native { program } = &task.runner {
            if !native::is_known(program) {
                return Err(RegistryError::UnknownNativeProgram {
                    task: task.name.clone(),
                    program: program.clone(),
                });
            }
        }
        if self.tasks.contains_key(&task.name) {
            return Err(RegistryError::Duplicate(task.name));
        }
        debug!(task = %task.name, sites = task.branch_sites.len(), "registered task");
        self.tasks.insert(task.name.clone(), Arc::new(task));
        Ok(())
    }

    /// Register every `*.json` task definition in `dir`, in file-name order.
    /// Returns the number of tasks added.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        let io_err = |source: std::io::Error| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let task = TaskModel::from_json(&raw).map_err(|source| RegistryError::Definition {
                path: path.clone(),
                source,
            })?;
            self.insert(task)?;
        }
        info!(dir = %dir.display(), loaded = paths.len(), "loaded task definitions");
        Ok(paths.len())
    }

    pub fn get(&self, name: &str) -> Option<Arc<TaskModel>> {
        self.tasks.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskModel> {
        self.tasks.values().map(|task| task.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_keeps_definition_order() {
        let registry = TaskRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["xor", "dummy", "control_temp"]);
        assert_eq!(registry.get("xor").map(|t| t.target_line), Some(11));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = TaskRegistry::with_builtin();
        let err = registry.insert(builtin::xor()).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "xor"));
    }

    #[test]
    fn unknown_native_program_is_rejected() {
        let mut task = builtin::xor();
        task.name = "xor2".into();
        task.runner = RunnerSpec::Native {
            program: "nand".into(),
        };
        let err = TaskRegistry::new().insert(task).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownNativeProgram { .. }));
    }

    #[test]
    fn loads_json_definitions_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = builtin::dummy();
        task.name = "dummy_copy".into();
        std::fs::write(
            dir.path().join("dummy_copy.json"),
            serde_json::to_string_pretty(&task).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = TaskRegistry::with_builtin();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 1);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("dummy_copy").as_deref(), Some(&task));
    }

    #[test]
    fn broken_definition_names_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"name\": 1}").unwrap();
        let err = TaskRegistry::new().load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Definition { path: p, .. } if p == path));
    }
}
