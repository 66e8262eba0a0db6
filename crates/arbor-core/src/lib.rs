//! Arbor Core - hierarchical resource management engine
//!
//! This crate provides the generic dispatch and consistency layer:
//! - Path addresses with template placeholders and include/exclude filters
//! - The managed resource tree with per-node operation handlers
//! - `ManagementController`, which resolves requests and runs handlers
//! - Global `read-resource` and recursive `export-resource` handlers
//! - Archive bundles and content-type marshalling
//! - A transactional import runner with reverse-order rollback
//!
//! Sub-systems contribute resources through [`registry::ManagementExtension`].

pub mod address;
pub mod archive;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod import;
pub mod logging_facility;
pub mod marshal;
pub mod model;
pub mod operation;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod template;

// Re-export commonly used types
pub use address::PathAddress;
pub use controller::{ManagementController, ManagementRequest, ManagementResponse, Outcome};
pub use errors::{ArborError, FailureDescription, FailureKind, Result};
pub use filter::PathTemplateFilter;
pub use import::{ImportStrategy, ImportTask, TransactionalImport};
pub use model::{ExportResourceModel, ExportTask, ReadResourceModel, ResultValue};
pub use operation::{Attachment, OperationAttributes, OperationContext, OperationHandler};
pub use registry::{ManagedResource, ManagementExtension, ResourceRegistry};
pub use runtime::RuntimeContext;
pub use template::ResolutionContext;
