//! Task model: one verifiable program with its symbolic branch table.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::expr::{Expr, Sort, SortError};
use crate::listing::add_line_numbers;
use crate::template::{self, TemplateError};

/// Value substituted for a variable the solver leaves unconstrained,
/// clamped into the variable's domain.
pub const FALLBACK_SENTINEL: i64 = 999;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task `{task}`: duplicate variable `{name}`")]
    DuplicateVariable { task: String, name: String },
    #[error("task `{task}`: variable name {name:?} cannot be used as a solver symbol")]
    InvalidVariableName { task: String, name: String },
    #[error("task `{task}`: duplicate branch site at line {line}")]
    DuplicateBranchSite { task: String, line: u32 },
    #[error("task `{task}`: branch site {line} has no evidence locations")]
    MissingEvidence { task: String, line: u32 },
    #[error("task `{task}`: {context} is ill-sorted: {source}")]
    IllSorted {
        task: String,
        context: String,
        #[source]
        source: SortError,
    },
    #[error("task `{task}`: {context} must be Bool, found {found}")]
    NotBoolean {
        task: String,
        context: String,
        found: Sort,
    },
    #[error("task `{task}`: variable `{name}` has an empty domain [{min}, {max}]")]
    EmptyDomain {
        task: String,
        name: String,
        min: i64,
        max: i64,
    },
    #[error("task `{task}`: fallback {value} for `{name}` lies outside its domain")]
    FallbackOutOfDomain {
        task: String,
        name: String,
        value: i64,
    },
    #[error("task `{task}`: domain on boolean variable `{name}`")]
    BoolDomain { task: String, name: String },
    #[error("task `{task}`: runner has no command steps")]
    EmptyRunner { task: String },
    #[error("task `{task}`: runner template: {source}")]
    Template {
        task: String,
        #[source]
        source: TemplateError,
    },
    #[error("task `{task}`: runner references undeclared variable `{name}`")]
    RunnerUnknownVariable { task: String, name: String },
    #[error("invalid task definition: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inclusive integer bounds. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl Domain {
    pub fn range(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi)
    }

    pub fn clamp(&self, value: i64) -> i64 {
        let value = self.min.map_or(value, |lo| value.max(lo));
        self.max.map_or(value, |hi| value.min(hi))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// A symbolic input of the task's program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub sort: Sort,
    #[serde(default, skip_serializing_if = "Domain::is_unbounded")]
    pub domain: Domain,
    /// Value used when the solver's model does not constrain this variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<i64>,
}

impl VariableDecl {
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: Sort::Int,
            domain: Domain::default(),
            fallback: None,
        }
    }

    pub fn bounded(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            domain: Domain::range(min, max),
            ..Self::int(name)
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: Sort::Bool,
            domain: Domain::default(),
            fallback: None,
        }
    }

    /// Integer fallback: the explicit one, else [`FALLBACK_SENTINEL`]
    /// clamped into the domain. Booleans fall back to `0` (false) unless a
    /// non-zero fallback is declared.
    pub fn fallback_value(&self) -> i64 {
        match (self.sort, self.fallback) {
            (_, Some(value)) => value,
            (Sort::Int, None) => self.domain.clamp(FALLBACK_SENTINEL),
            (Sort::Bool, None) => 0,
        }
    }
}

/// A control-flow decision point, keyed by its line in the listing shown to
/// the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSite {
    pub id: u32,
    /// Location of the branch in the instrumented variant. Defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<u32>,
    /// Locations executed only when the branch evaluates true.
    pub evidence: Vec<u32>,
    /// True exactly when the branch is taken.
    pub predicate: Expr,
}

impl BranchSite {
    pub fn new(id: u32, evidence: Vec<u32>, predicate: Expr) -> Self {
        Self {
            id,
            probe: None,
            evidence,
            predicate,
        }
    }

    pub fn probe_location(&self) -> u32 {
        self.probe.unwrap_or(self.id)
    }
}

/// One step of an instrumented run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Where the run's coverage report lands and which entry to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Report path, relative to the working directory. May use placeholders.
    pub path: String,
    /// Key under `files` in the report naming the instrumented source.
    pub file_key: String,
}

/// External instrumented execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub steps: Vec<CommandStep>,
    pub report: ReportSpec,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Fixed working directory shared by every run of this task. Runs are
    /// serialized per task when set; otherwise each run gets a fresh
    /// temporary directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_workdir: Option<PathBuf>,
}

impl CommandSpec {
    fn templates(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|step| std::iter::once(step.program.as_str()).chain(step.args.iter().map(String::as_str)))
            .chain(std::iter::once(self.report.path.as_str()))
            .chain(self.env.values().map(String::as_str))
    }
}

/// How the task's program is executed concretely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunnerSpec {
    /// An instrumented rewrite compiled into the engine, looked up by name.
    Native { program: String },
    Command(CommandSpec),
}

/// One verifiable program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskModel {
    pub name: String,
    pub file_name: String,
    /// The single supported target line.
    pub target_line: u32,
    /// Program listing shown to the model.
    #[serde(default)]
    pub source: String,
    pub variables: Vec<VariableDecl>,
    #[serde(
        serialize_with = "serialize_sites",
        deserialize_with = "deserialize_sites"
    )]
    pub branch_sites: IndexMap<u32, BranchSite>,
    /// True iff the target line executes.
    pub reachability_goal: Expr,
    pub runner: RunnerSpec,
}

impl TaskModel {
    /// Parse and validate a JSON task definition.
    pub fn from_json(raw: &str) -> Result<Self, TaskError> {
        let task: TaskModel = serde_json::from_str(raw)?;
        task.validate()?;
        Ok(task)
    }

    pub fn site(&self, line: u32) -> Option<&BranchSite> {
        self.branch_sites.get(&line)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn supports_target(&self, line: u32) -> bool {
        self.target_line == line
    }

    pub fn numbered_listing(&self) -> String {
        add_line_numbers(&self.source, 3)
    }

    /// Check the model's structural invariants.
    pub fn validate(&self) -> Result<(), TaskError> {
        let task = || self.name.clone();

        let mut seen = HashSet::new();
        for var in &self.variables {
            if !seen.insert(var.name.as_str()) {
                return Err(TaskError::DuplicateVariable {
                    task: task(),
                    name: var.name.clone(),
                });
            }
            // Any other name is printable as a quoted SMT-LIB symbol.
            if var.name.is_empty() || var.name.contains(['|', '\\']) {
                return Err(TaskError::InvalidVariableName {
                    task: task(),
                    name: var.name.clone(),
                });
            }
            if var.sort == Sort::Bool && !var.domain.is_unbounded() {
                return Err(TaskError::BoolDomain {
                    task: task(),
                    name: var.name.clone(),
                });
            }
            if let (Some(min), Some(max)) = (var.domain.min, var.domain.max) {
                if min > max {
                    return Err(TaskError::EmptyDomain {
                        task: task(),
                        name: var.name.clone(),
                        min,
                        max,
                    });
                }
            }
            let fallback = var.fallback_value();
            let in_domain = match var.sort {
                Sort::Int => var.domain.contains(fallback),
                Sort::Bool => fallback == 0 || fallback == 1,
            };
            if !in_domain {
                return Err(TaskError::FallbackOutOfDomain {
                    task: task(),
                    name: var.name.clone(),
                    value: fallback,
                });
            }
        }

        let sort_of = |name: &str| self.variable(name).map(|v| v.sort);
        let check_bool = |expr: &Expr, context: String| -> Result<(), TaskError> {
            match expr.sort_with(&sort_of) {
                Ok(Sort::Bool) => Ok(()),
                Ok(found) => Err(TaskError::NotBoolean {
                    task: task(),
                    context,
                    found,
                }),
                Err(source) => Err(TaskError::IllSorted {
                    task: task(),
                    context,
                    source,
                }),
            }
        };

        for (line, site) in &self.branch_sites {
            if *line != site.id {
                return Err(TaskError::DuplicateBranchSite {
                    task: task(),
                    line: site.id,
                });
            }
            if site.evidence.is_empty() {
                return Err(TaskError::MissingEvidence {
                    task: task(),
                    line: *line,
                });
            }
            check_bool(&site.predicate, format!("predicate of branch site {line}"))?;
        }
        check_bool(&self.reachability_goal, "reachability goal".to_string())?;

        if let RunnerSpec::Command(spec) = &self.runner {
            if spec.steps.is_empty() {
                return Err(TaskError::EmptyRunner { task: task() });
            }
            for raw in spec.templates() {
                let vars = template::referenced_vars(raw).map_err(|source| {
                    TaskError::Template {
                        task: task(),
                        source,
                    }
                })?;
                if let Some(name) = vars.into_iter().find(|name| self.variable(name).is_none()) {
                    return Err(TaskError::RunnerUnknownVariable {
                        task: task(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn serialize_sites<S>(sites: &IndexMap<u32, BranchSite>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(sites.values())
}

fn deserialize_sites<'de, D>(deserializer: D) -> Result<IndexMap<u32, BranchSite>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = Vec::<BranchSite>::deserialize(deserializer)?;
    let mut sites = IndexMap::with_capacity(list.len());
    for site in list {
        let id = site.id;
        if sites.insert(id, site).is_some() {
            return Err(serde::de::Error::custom(format!(
                "duplicate branch site at line {id}"
            )));
        }
    }
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_task() -> TaskModel {
        let mut branch_sites = IndexMap::new();
        branch_sites.insert(
            3,
            BranchSite::new(3, vec![4], Expr::var("x").eq(Expr::int(1))),
        );
        TaskModel {
            name: "toy".into(),
            file_name: "toy.c".into(),
            target_line: 6,
            source: String::new(),
            variables: vec![VariableDecl::bounded("x", 0, 3)],
            branch_sites,
            reachability_goal: Expr::var("x").eq(Expr::int(1)).not(),
            runner: RunnerSpec::Native {
                program: "toy".into(),
            },
        }
    }

    #[test]
    fn fallback_sentinel_is_clamped_into_domain() {
        assert_eq!(VariableDecl::int("t").fallback_value(), FALLBACK_SENTINEL);
        assert_eq!(VariableDecl::bounded("e", 0, 1).fallback_value(), 1);
        assert_eq!(VariableDecl::bounded("n", 1000, 2000).fallback_value(), 1000);
        assert_eq!(VariableDecl::boolean("b").fallback_value(), 0);
        let explicit = VariableDecl {
            fallback: Some(7),
            ..VariableDecl::int("m")
        };
        assert_eq!(explicit.fallback_value(), 7);
    }

    #[test]
    fn valid_task_passes_validation() {
        toy_task().validate().unwrap();
    }

    #[test]
    fn undeclared_variable_in_predicate_is_rejected() {
        let mut task = toy_task();
        task.branch_sites.get_mut(&3).unwrap().predicate = Expr::var("y").gt(Expr::int(0));
        let err = task.validate().unwrap_err();
        assert!(matches!(err, TaskError::IllSorted { .. }), "{err}");
    }

    #[test]
    fn unquotable_variable_names_are_rejected() {
        for name in ["", "a|b", "a\\b"] {
            let mut task = toy_task();
            task.variables[0].name = name.into();
            assert!(
                matches!(task.validate(), Err(TaskError::InvalidVariableName { .. })),
                "{name:?}"
            );
        }
        let mut task = toy_task();
        task.variables[0].name = "user level".into();
        task.branch_sites.get_mut(&3).unwrap().predicate = Expr::var("user level").eq(Expr::int(1));
        task.reachability_goal = Expr::bool(true);
        task.validate().unwrap();
    }

    #[test]
    fn integer_goal_is_rejected() {
        let mut task = toy_task();
        task.reachability_goal = Expr::var("x").add(Expr::int(1));
        assert!(matches!(
            task.validate(),
            Err(TaskError::NotBoolean { found: Sort::Int, .. })
        ));
    }

    #[test]
    fn site_without_evidence_is_rejected() {
        let mut task = toy_task();
        task.branch_sites.get_mut(&3).unwrap().evidence.clear();
        assert!(matches!(
            task.validate(),
            Err(TaskError::MissingEvidence { line: 3, .. })
        ));
    }

    #[test]
    fn empty_domain_and_out_of_domain_fallback_are_rejected() {
        let mut task = toy_task();
        task.variables = vec![VariableDecl::bounded("x", 5, 1)];
        assert!(matches!(task.validate(), Err(TaskError::EmptyDomain { .. })));

        let mut task = toy_task();
        task.variables = vec![VariableDecl {
            fallback: Some(9),
            ..VariableDecl::bounded("x", 0, 3)
        }];
        assert!(matches!(
            task.validate(),
            Err(TaskError::FallbackOutOfDomain { value: 9, .. })
        ));
    }

    #[test]
    fn command_runner_templates_are_checked() {
        let mut task = toy_task();
        task.runner = RunnerSpec::Command(CommandSpec {
            steps: vec![CommandStep {
                program: "prog".into(),
                args: vec!["{var:x}".into(), "{var:z}".into()],
            }],
            report: ReportSpec {
                path: "coverage.json".into(),
                file_key: "prog.py".into(),
            },
            env: BTreeMap::new(),
            shared_workdir: None,
        });
        assert!(matches!(
            task.validate(),
            Err(TaskError::RunnerUnknownVariable { ref name, .. }) if name == "z"
        ));
    }

    #[test]
    fn json_definition_round_trips_and_rejects_duplicate_sites() {
        let task = toy_task();
        let json = serde_json::to_string(&task).unwrap();
        let back = TaskModel::from_json(&json).unwrap();
        assert_eq!(back, task);

        let dup = json.replace(
            r#""branch_sites":["#,
            r#""branch_sites":[{"id":3,"evidence":[4],"predicate":{"bool":true}},"#,
        );
        let err = TaskModel::from_json(&dup).unwrap_err();
        assert!(err.to_string().contains("duplicate branch site"), "{err}");
    }
}
