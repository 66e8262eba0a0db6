use serde::Serialize;
use thiserror::Error;

use crate::address::PathAddress;

/// Result type alias using ArborError
pub type Result<T> = std::result::Result<T, ArborError>;

// ========== Failure Facility ==========

/// Canonical failure kind taxonomy
///
/// Each kind maps to a stable code that front-ends can match on and that
/// the logging facility records as `err.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    // Resolution
    ResourceNotFound,
    OperationNotFound,

    // Execution
    OperationFailure,
    ImportFailure,

    // Input
    Parse,
    InvalidInput,
    AttachmentMissing,

    // Registration / wiring
    Registration,
    Configuration,

    // Integration/IO
    Persistence,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl FailureKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::ResourceNotFound => "ERR_RESOURCE_NOT_FOUND",
            FailureKind::OperationNotFound => "ERR_OPERATION_NOT_FOUND",
            FailureKind::OperationFailure => "ERR_OPERATION_FAILURE",
            FailureKind::ImportFailure => "ERR_IMPORT_FAILURE",
            FailureKind::Parse => "ERR_PARSE",
            FailureKind::InvalidInput => "ERR_INVALID_INPUT",
            FailureKind::AttachmentMissing => "ERR_ATTACHMENT_MISSING",
            FailureKind::Registration => "ERR_REGISTRATION",
            FailureKind::Configuration => "ERR_CONFIGURATION",
            FailureKind::Persistence => "ERR_PERSISTENCE",
            FailureKind::Serialization => "ERR_SERIALIZATION",
            FailureKind::Io => "ERR_IO",
            FailureKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Structured failure description
///
/// This is what a failure outcome carries back to a front-end. It is built
/// eagerly because failures are small and always shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDescription {
    kind: FailureKind,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<PathAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_address: Option<PathAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback_succeeded: Option<bool>,
    message: String,
}

impl FailureDescription {
    /// Create a new description with the specified kind
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            code: kind.code(),
            op: None,
            address: None,
            step_address: None,
            rollback_succeeded: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the address the operation was invoked against
    pub fn with_address(mut self, address: PathAddress) -> Self {
        self.address = Some(address);
        self
    }

    /// Add the address of the recursion step that failed
    pub fn with_step_address(mut self, address: PathAddress) -> Self {
        self.step_address = Some(address);
        self
    }

    /// Add the import rollback outcome
    pub fn with_rollback_succeeded(mut self, succeeded: bool) -> Self {
        self.rollback_succeeded = Some(succeeded);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn address(&self) -> Option<&PathAddress> {
        self.address.as_ref()
    }

    pub fn step_address(&self) -> Option<&PathAddress> {
        self.step_address.as_ref()
    }

    pub fn rollback_succeeded(&self) -> Option<bool> {
        self.rollback_succeeded
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for FailureDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code)?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if let Some(address) = &self.address {
            write!(f, " at {}", address)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FailureDescription {}

// ========== End Failure Facility ==========

/// Error taxonomy for Arbor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArborError {
    // ===== Resolution =====
    /// No registered node matches the address
    #[error("Resource not found: {address}")]
    ResourceNotFound { address: PathAddress },

    /// The node exists but has no handler for the operation
    #[error("Operation '{operation}' not found for address {address}")]
    OperationNotFound {
        operation: String,
        address: PathAddress,
    },

    // ===== Execution =====
    /// A handler reported failure; recursive exports attach the failing step
    #[error("{message}{}", step_suffix(.step_address))]
    OperationFailed {
        message: String,
        step_address: Option<PathAddress>,
    },

    /// A committed import task failed; completed tasks were rolled back
    #[error(
        "Import of {kind} for site {site} failed: {message} ({})",
        rollback_summary(.rollback_succeeded, .rollback_errors)
    )]
    ImportFailed {
        site: String,
        kind: String,
        message: String,
        rollback_succeeded: bool,
        rollback_errors: Vec<String>,
    },

    // ===== Input =====
    /// Malformed filter, content type, bundle or payload
    #[error("Parse error in '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// Attribute present but not usable
    #[error("Invalid attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// The attachment stack is empty
    #[error("No attachment available for operation '{operation}'")]
    AttachmentMissing { operation: String },

    /// Content type not understood
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    // ===== Registration =====
    /// The operation name is already bound on this node
    #[error("Operation '{operation}' is already registered at {address}")]
    DuplicateOperation {
        operation: String,
        address: PathAddress,
    },

    /// A node may hold at most one template child
    #[error(
        "Ambiguous template child at {address}: '{requested}' conflicts with existing '{existing}'"
    )]
    AmbiguousTemplate {
        address: PathAddress,
        existing: String,
        requested: String,
    },

    /// A registration name is not a single non-empty segment
    #[error("Invalid resource name '{name}': {reason}")]
    InvalidResourceName { name: String, reason: String },

    // ===== Wiring =====
    /// No marshaller registered for a type and content type
    #[error("No marshaller registered for {type_name} as {content_type}")]
    MarshallerNotFound {
        type_name: String,
        content_type: String,
    },

    /// A runtime component was not provided
    #[error("Runtime component not available: {type_name}")]
    ComponentNotFound { type_name: String },

    // ===== Collaborators =====
    /// Backing store failure
    #[error("Persistence error during {operation}: {message}")]
    Persistence { operation: String, message: String },

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

fn step_suffix(step: &Option<PathAddress>) -> String {
    step.as_ref()
        .map(|address| format!(" [Step Address: {}]", address))
        .unwrap_or_default()
}

fn rollback_summary(succeeded: &bool, errors: &[String]) -> String {
    if *succeeded {
        "rollback succeeded".to_string()
    } else {
        format!(
            "rollback had errors, data may be inconsistent: {}",
            errors.join("; ")
        )
    }
}

impl ArborError {
    /// Convenience constructor for handler failures
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ArborError::OperationFailed {
            message: message.into(),
            step_address: None,
        }
    }

    /// Convenience constructor for grammar failures
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ArborError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Re-express this error as a failure at `step`.
    ///
    /// Non-`OperationFailed` errors keep their rendered message.
    pub fn at_step(self, step: PathAddress) -> Self {
        match self {
            ArborError::OperationFailed { message, .. } => ArborError::OperationFailed {
                message,
                step_address: Some(step),
            },
            other => ArborError::OperationFailed {
                message: other.to_string(),
                step_address: Some(step),
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        FailureDescription::from(self).kind()
    }
}

/// Conversion from ArborError to FailureDescription
impl From<&ArborError> for FailureDescription {
    fn from(err: &ArborError) -> Self {
        let message = err.to_string();
        match err {
            ArborError::ResourceNotFound { address } => {
                FailureDescription::new(FailureKind::ResourceNotFound)
                    .with_address(address.clone())
                    .with_message(message)
            }
            ArborError::OperationNotFound { operation, address } => {
                FailureDescription::new(FailureKind::OperationNotFound)
                    .with_op(operation.clone())
                    .with_address(address.clone())
                    .with_message(message)
            }
            ArborError::OperationFailed { step_address, .. } => {
                let description =
                    FailureDescription::new(FailureKind::OperationFailure).with_message(message);
                match step_address {
                    Some(step) => description.with_step_address(step.clone()),
                    None => description,
                }
            }
            ArborError::ImportFailed {
                rollback_succeeded,
                ..
            } => FailureDescription::new(FailureKind::ImportFailure)
                .with_rollback_succeeded(*rollback_succeeded)
                .with_message(message),
            ArborError::Parse { .. } => {
                FailureDescription::new(FailureKind::Parse).with_message(message)
            }
            ArborError::InvalidAttribute { .. } | ArborError::UnsupportedContentType { .. } => {
                FailureDescription::new(FailureKind::InvalidInput).with_message(message)
            }
            ArborError::AttachmentMissing { operation } => {
                FailureDescription::new(FailureKind::AttachmentMissing)
                    .with_op(operation.clone())
                    .with_message(message)
            }
            ArborError::DuplicateOperation { operation, address } => {
                FailureDescription::new(FailureKind::Registration)
                    .with_op(operation.clone())
                    .with_address(address.clone())
                    .with_message(message)
            }
            ArborError::AmbiguousTemplate { address, .. } => {
                FailureDescription::new(FailureKind::Registration)
                    .with_address(address.clone())
                    .with_message(message)
            }
            ArborError::InvalidResourceName { .. } => {
                FailureDescription::new(FailureKind::Registration).with_message(message)
            }
            ArborError::MarshallerNotFound { .. } | ArborError::ComponentNotFound { .. } => {
                FailureDescription::new(FailureKind::Configuration).with_message(message)
            }
            ArborError::Persistence { operation, .. } => {
                FailureDescription::new(FailureKind::Persistence)
                    .with_op(operation.clone())
                    .with_message(message)
            }
            ArborError::Serialization(_) => {
                FailureDescription::new(FailureKind::Serialization).with_message(message)
            }
            ArborError::Io(_) => FailureDescription::new(FailureKind::Io).with_message(message),
        }
    }
}

impl From<ArborError> for FailureDescription {
    fn from(err: ArborError) -> Self {
        FailureDescription::from(&err)
    }
}

impl From<serde_json::Error> for ArborError {
    fn from(err: serde_json::Error) -> Self {
        ArborError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ArborError {
    fn from(err: std::io::Error) -> Self {
        ArborError::Io(err.to_string())
    }
}
