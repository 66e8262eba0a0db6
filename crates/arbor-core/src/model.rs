//! Result values produced by operation handlers

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// What a handler returns on success
#[derive(Debug, Clone)]
pub enum ResultValue {
    /// Success with nothing to serialize
    NoResult,
    ReadResource(ReadResourceModel),
    Export(ExportResourceModel),
    /// Free-form JSON, used by `read-config` and import reports
    Value(serde_json::Value),
}

impl ResultValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResultValue::NoResult => "no-result",
            ResultValue::ReadResource(_) => "read-resource",
            ResultValue::Export(_) => "export",
            ResultValue::Value(_) => "value",
        }
    }

    pub fn as_read_resource(&self) -> Option<&ReadResourceModel> {
        match self {
            ResultValue::ReadResource(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_export(&self) -> Option<&ExportResourceModel> {
        match self {
            ResultValue::Export(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            ResultValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<ReadResourceModel> for ResultValue {
    fn from(model: ReadResourceModel) -> Self {
        ResultValue::ReadResource(model)
    }
}

impl From<ExportResourceModel> for ResultValue {
    fn from(model: ExportResourceModel) -> Self {
        ResultValue::Export(model)
    }
}

impl From<serde_json::Value> for ResultValue {
    fn from(value: serde_json::Value) -> Self {
        ResultValue::Value(value)
    }
}

/// Description and child names of one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResourceModel {
    pub description: String,
    pub children: Vec<String>,
}

impl ReadResourceModel {
    pub fn new(description: impl Into<String>, children: Vec<String>) -> Self {
        Self {
            description: description.into(),
            children,
        }
    }
}

/// Serializes one resource's state into an archive entry
pub trait ExportTask: Send + Sync {
    /// Entry path inside the archive, `/`-separated, no leading slash
    fn entry_path(&self) -> String;

    fn export(&self, out: &mut dyn Write) -> Result<()>;
}

/// Ordered export tasks collected from a subtree
#[derive(Clone, Default)]
pub struct ExportResourceModel {
    tasks: Vec<Arc<dyn ExportTask>>,
}

impl ExportResourceModel {
    pub fn new(tasks: Vec<Arc<dyn ExportTask>>) -> Self {
        Self { tasks }
    }

    pub fn single(task: Arc<dyn ExportTask>) -> Self {
        Self { tasks: vec![task] }
    }

    pub fn push(&mut self, task: Arc<dyn ExportTask>) {
        self.tasks.push(task);
    }

    pub fn extend(&mut self, other: ExportResourceModel) {
        self.tasks.extend(other.tasks);
    }

    pub fn tasks(&self) -> &[Arc<dyn ExportTask>] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Arc<dyn ExportTask>> {
        self.tasks
    }

    pub fn entry_paths(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.entry_path()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for ExportResourceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportResourceModel")
            .field("tasks", &self.entry_paths())
            .finish()
    }
}

/// An export task over bytes already in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesExportTask {
    path: String,
    data: Vec<u8>,
}

impl BytesExportTask {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ExportTask for BytesExportTask {
    fn entry_path(&self) -> String {
        self.path.clone()
    }

    fn export(&self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&self.data)?;
        Ok(())
    }
}
