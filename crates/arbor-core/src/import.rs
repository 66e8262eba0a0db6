//! Generic transactional import
//!
//! Tasks are committed in order. When one fails, the failing task undoes
//! its own partial work and every committed task is rolled back in reverse
//! completion order. Rollback failures are collected into the surfaced
//! error instead of aborting the rollback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::errors::{ArborError, Result};

/// How an import treats data that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategy {
    /// Create only what does not exist yet
    Conserve,
    /// Create missing items, overwrite matches by name, keep the rest
    #[default]
    Merge,
    /// Replace everything the target holds
    Overwrite,
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStrategy::Conserve => "conserve",
            ImportStrategy::Merge => "merge",
            ImportStrategy::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStrategy {
    type Err = ArborError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conserve" => Ok(ImportStrategy::Conserve),
            "merge" => Ok(ImportStrategy::Merge),
            "overwrite" => Ok(ImportStrategy::Overwrite),
            _ => Err(ArborError::InvalidAttribute {
                name: crate::operation::attributes::IMPORT_STRATEGY.to_string(),
                reason: format!("'{}' is not one of conserve, merge, overwrite", s),
            }),
        }
    }
}

/// Lifecycle of one task within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Committed,
    Failed,
    RolledBack,
    RollbackFailed,
}

/// Changes a task made, for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

/// One unit of import work with its own compensation
pub trait ImportTask: Send {
    /// What the task targets, e.g. `portal/classic`
    fn scope(&self) -> String;

    /// Kind of payload, e.g. `pages`
    fn kind(&self) -> &str;

    /// Apply the payload. On failure, whatever was already changed must
    /// still be undoable through [`rollback`](Self::rollback).
    fn import(&mut self) -> Result<()>;

    /// Undo every change recorded by [`import`](Self::import)
    fn rollback(&mut self) -> Result<()>;

    fn changes(&self) -> ChangeCounts {
        ChangeCounts::default()
    }
}

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub scope: String,
    pub kind: String,
    pub state: TaskState,
    pub changes: ChangeCounts,
}

/// Summary of a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub tasks: Vec<TaskReport>,
}

impl ImportReport {
    pub fn committed(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.state == TaskState::Committed)
            .count()
    }

    /// Totals over all tasks
    pub fn totals(&self) -> ChangeCounts {
        self.tasks
            .iter()
            .fold(ChangeCounts::default(), |acc, task| ChangeCounts {
                created: acc.created + task.changes.created,
                updated: acc.updated + task.changes.updated,
                deleted: acc.deleted + task.changes.deleted,
                unchanged: acc.unchanged + task.changes.unchanged,
            })
    }
}

struct TrackedTask {
    task: Box<dyn ImportTask>,
    state: TaskState,
}

/// Ordered tasks committed as one unit
#[derive(Default)]
pub struct TransactionalImport {
    tasks: Vec<TrackedTask>,
}

impl TransactionalImport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Box<dyn ImportTask>) {
        self.tasks.push(TrackedTask {
            task,
            state: TaskState::Pending,
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Commit every task, or roll back what was done
    ///
    /// # Errors
    ///
    /// `ImportFailed` naming the failing task's scope and kind, with the
    /// rollback outcome.
    pub fn run(mut self) -> Result<ImportReport> {
        for index in 0..self.tasks.len() {
            let tracked = &mut self.tasks[index];
            match tracked.task.import() {
                Ok(()) => {
                    tracked.state = TaskState::Committed;
                    debug!(
                        site = %tracked.task.scope(),
                        payload_kind = tracked.task.kind(),
                        "import task committed"
                    );
                }
                Err(cause) => {
                    tracked.state = TaskState::Failed;
                    return Err(self.abort(index, cause));
                }
            }
        }

        let report = self.report();
        info!(task_count = report.tasks.len(), "import committed");
        Ok(report)
    }

    fn abort(&mut self, failed: usize, cause: ArborError) -> ArborError {
        let scope = self.tasks[failed].task.scope();
        let kind = self.tasks[failed].task.kind().to_string();
        warn!(site = %scope, payload_kind = %kind, error = %cause, "import task failed, rolling back");

        let mut rollback_errors = Vec::new();

        // the failed task may have changed part of its target already
        if let Err(e) = self.tasks[failed].task.rollback() {
            error!(site = %scope, payload_kind = %kind, error = %e, "rollback of failed task failed");
            rollback_errors.push(format!("{} {}: {}", scope, kind, e));
        }

        for tracked in self.tasks[..failed].iter_mut().rev() {
            match tracked.task.rollback() {
                Ok(()) => {
                    tracked.state = TaskState::RolledBack;
                    debug!(
                        site = %tracked.task.scope(),
                        payload_kind = tracked.task.kind(),
                        "import task rolled back"
                    );
                }
                Err(e) => {
                    tracked.state = TaskState::RollbackFailed;
                    error!(
                        site = %tracked.task.scope(),
                        payload_kind = tracked.task.kind(),
                        error = %e,
                        "rollback failed"
                    );
                    rollback_errors.push(format!(
                        "{} {}: {}",
                        tracked.task.scope(),
                        tracked.task.kind(),
                        e
                    ));
                }
            }
        }

        ArborError::ImportFailed {
            site: scope,
            kind,
            message: cause.to_string(),
            rollback_succeeded: rollback_errors.is_empty(),
            rollback_errors,
        }
    }

    fn report(&self) -> ImportReport {
        ImportReport {
            tasks: self
                .tasks
                .iter()
                .map(|tracked| TaskReport {
                    scope: tracked.task.scope(),
                    kind: tracked.task.kind().to_string(),
                    state: tracked.state,
                    changes: tracked.task.changes(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    struct ScriptedTask {
        name: &'static str,
        fail_import: bool,
        fail_rollback: bool,
        journal: Journal,
    }

    impl ScriptedTask {
        fn boxed(name: &'static str, fail_import: bool, fail_rollback: bool, journal: &Journal) -> Box<dyn ImportTask> {
            Box::new(Self {
                name,
                fail_import,
                fail_rollback,
                journal: journal.clone(),
            })
        }
    }

    impl ImportTask for ScriptedTask {
        fn scope(&self) -> String {
            "portal/classic".to_string()
        }

        fn kind(&self) -> &str {
            self.name
        }

        fn import(&mut self) -> Result<()> {
            self.journal.lock().unwrap().push(format!("import {}", self.name));
            if self.fail_import {
                return Err(ArborError::Persistence {
                    operation: "save".to_string(),
                    message: "store offline".to_string(),
                });
            }
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.journal.lock().unwrap().push(format!("rollback {}", self.name));
            if self.fail_rollback {
                return Err(ArborError::Persistence {
                    operation: "restore".to_string(),
                    message: "locked".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("OVERWRITE".parse::<ImportStrategy>().unwrap(), ImportStrategy::Overwrite);
        assert_eq!(ImportStrategy::default(), ImportStrategy::Merge);
        assert!(matches!(
            "replace".parse::<ImportStrategy>(),
            Err(ArborError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_all_tasks_commit() {
        let journal = Journal::default();
        let mut import = TransactionalImport::new();
        import.push(ScriptedTask::boxed("layout", false, false, &journal));
        import.push(ScriptedTask::boxed("pages", false, false, &journal));

        let report = import.run().unwrap();
        assert_eq!(report.committed(), 2);
        assert_eq!(*journal.lock().unwrap(), vec!["import layout", "import pages"]);
    }

    #[test]
    fn test_failure_rolls_back_in_reverse_order() {
        let journal = Journal::default();
        let mut import = TransactionalImport::new();
        import.push(ScriptedTask::boxed("layout", false, false, &journal));
        import.push(ScriptedTask::boxed("pages", false, false, &journal));
        import.push(ScriptedTask::boxed("navigation", true, false, &journal));

        let err = import.run().unwrap_err();
        assert!(matches!(
            err,
            ArborError::ImportFailed { ref kind, rollback_succeeded: true, .. } if kind == "navigation"
        ));
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "import layout",
                "import pages",
                "import navigation",
                "rollback navigation",
                "rollback pages",
                "rollback layout",
            ]
        );
    }

    #[test]
    fn test_rollback_errors_are_collected() {
        let journal = Journal::default();
        let mut import = TransactionalImport::new();
        import.push(ScriptedTask::boxed("layout", false, true, &journal));
        import.push(ScriptedTask::boxed("pages", false, false, &journal));
        import.push(ScriptedTask::boxed("navigation", true, false, &journal));

        match import.run().unwrap_err() {
            ArborError::ImportFailed {
                rollback_succeeded,
                rollback_errors,
                message,
                ..
            } => {
                assert!(!rollback_succeeded);
                assert_eq!(rollback_errors.len(), 1);
                assert!(rollback_errors[0].starts_with("portal/classic layout"));
                assert!(message.contains("store offline"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // every committed task was still attempted
        assert!(journal.lock().unwrap().contains(&"rollback pages".to_string()));
    }
}
