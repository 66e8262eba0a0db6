//! Request dispatch
//!
//! ## Logging Ownership
//!
//! The controller owns lifecycle logging for every request:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Handlers, delegated operations and the import runner use plain
//! `tracing` events only.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use arbor_core_types::{RequestContext, RequestId};

use crate::address::PathAddress;
use crate::errors::{ArborError, FailureDescription, Result};
use crate::marshal::{ContentType, MarshallerRegistry};
use crate::model::ResultValue;
use crate::operation::{names, Attachment, OperationAttributes, OperationContext, RequestScope};
use crate::registry::ResourceRegistry;
use crate::runtime::RuntimeContext;
use crate::{log_op_end, log_op_error, log_op_start};

/// One operation invocation as built by a front-end
#[derive(Debug, Clone)]
pub struct ManagementRequest {
    context: RequestContext,
    operation: String,
    address: PathAddress,
    attributes: OperationAttributes,
    content_type: Option<ContentType>,
    attachments: Vec<Attachment>,
}

impl ManagementRequest {
    pub fn new(operation: impl Into<String>, address: PathAddress) -> Self {
        Self {
            context: RequestContext::new(),
            operation: operation.into(),
            address,
            attributes: OperationAttributes::new(),
            content_type: None,
            attachments: Vec::new(),
        }
    }

    pub fn read_resource(address: PathAddress) -> Self {
        Self::new(names::READ_RESOURCE, address)
    }

    pub fn export_resource(address: PathAddress) -> Self {
        Self::new(names::EXPORT_RESOURCE, address)
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.add(name, value);
        self
    }

    pub fn with_attributes(mut self, attributes: OperationAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Content type the result should be written as
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// The request body; handed out before any later attachment
    pub fn with_body(mut self, body: Attachment) -> Self {
        self.attachments.insert(0, body);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    pub fn attributes(&self) -> &OperationAttributes {
        &self.attributes
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }
}

/// A successful result, serialized only when written
pub struct SuccessOutcome {
    value: ResultValue,
    content_type: ContentType,
    marshallers: Arc<MarshallerRegistry>,
}

impl SuccessOutcome {
    pub fn value(&self) -> &ResultValue {
        &self.value
    }

    pub fn into_value(self) -> ResultValue {
        self.value
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        let marshallers = &self.marshallers;
        match &self.value {
            ResultValue::NoResult => Ok(()),
            ResultValue::ReadResource(model) => marshallers.marshal(model, self.content_type, out),
            ResultValue::Export(model) => marshallers.marshal(model, self.content_type, out),
            ResultValue::Value(value) => marshallers.marshal(value, self.content_type, out),
        }
    }
}

impl std::fmt::Debug for SuccessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessOutcome")
            .field("value", &self.value)
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success(SuccessOutcome),
    Failure(FailureDescription),
}

/// What the front-end gets back for one request
#[derive(Debug)]
pub struct ManagementResponse {
    request_id: RequestId,
    operation: String,
    address: PathAddress,
    outcome: Outcome,
}

impl ManagementResponse {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&ResultValue> {
        match &self.outcome {
            Outcome::Success(success) => Some(success.value()),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureDescription> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Serialize the result, or the failure description as JSON
    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        match &self.outcome {
            Outcome::Success(success) => success.write_to(out),
            Outcome::Failure(failure) => {
                serde_json::to_writer(out, failure)?;
                Ok(())
            }
        }
    }
}

/// Resolves requests against the registry and runs their handlers
///
/// The registry, runtime components and marshallers are shared read-only
/// between concurrent requests.
#[derive(Debug, Clone)]
pub struct ManagementController {
    registry: Arc<ResourceRegistry>,
    runtime: Arc<RuntimeContext>,
    marshallers: Arc<MarshallerRegistry>,
    export_content_type: ContentType,
}

impl ManagementController {
    pub fn new(
        registry: ResourceRegistry,
        runtime: RuntimeContext,
        marshallers: MarshallerRegistry,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            runtime: Arc::new(runtime),
            marshallers: Arc::new(marshallers),
            export_content_type: ContentType::Bundle,
        }
    }

    /// Content type for export results when the request names none
    pub fn with_export_content_type(mut self, content_type: ContentType) -> Self {
        self.export_content_type = content_type;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    pub fn marshallers(&self) -> &MarshallerRegistry {
        &self.marshallers
    }

    /// Run a request and wrap the result into an outcome
    pub fn execute(&self, request: ManagementRequest) -> ManagementResponse {
        let request_id = request.context.request_id.clone();
        let operation = request.operation.clone();
        let address = request.address.clone();
        let requested_type = request.content_type;

        let outcome = match self.invoke(request) {
            Ok(value) => Outcome::Success(SuccessOutcome {
                content_type: requested_type.unwrap_or_else(|| self.default_content_type(&value)),
                value,
                marshallers: self.marshallers.clone(),
            }),
            Err(err) => {
                let failure = FailureDescription::from(&err).with_op(operation.clone());
                let failure = match failure.address() {
                    Some(_) => failure,
                    None => failure.with_address(address.clone()),
                };
                Outcome::Failure(failure)
            }
        };

        ManagementResponse {
            request_id,
            operation,
            address,
            outcome,
        }
    }

    /// Run a request and return the handler's result as is
    pub fn invoke(&self, request: ManagementRequest) -> Result<ResultValue> {
        let ManagementRequest {
            context,
            operation,
            address,
            attributes,
            content_type,
            mut attachments,
        } = request;

        log_op_start!(
            operation.as_str(),
            request_id = %context.request_id,
            address = %address
        );
        let start = Instant::now();

        attachments.reverse();
        let scope = RequestScope {
            request: &context,
            content_type: content_type.unwrap_or_default(),
            attributes: &attributes,
            attachments: std::cell::RefCell::new(attachments),
            registry: &self.registry,
            runtime: &self.runtime,
            marshallers: &self.marshallers,
        };

        let result = self.dispatch(&scope, &address, &operation).map_err(|e| {
            log_op_error!(
                operation.as_str(),
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %context.request_id,
                address = %address
            );
            e
        })?;

        log_op_end!(
            operation.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = %context.request_id,
            result = result.kind_name()
        );
        Ok(result)
    }

    fn dispatch(
        &self,
        scope: &RequestScope<'_>,
        address: &PathAddress,
        operation: &str,
    ) -> Result<ResultValue> {
        let resolved = self
            .registry
            .resolve(address)
            .ok_or_else(|| ArborError::ResourceNotFound {
                address: address.clone(),
            })?;
        let handler =
            resolved
                .operation_handler(operation)
                .ok_or_else(|| ArborError::OperationNotFound {
                    operation: operation.to_string(),
                    address: address.clone(),
                })?;

        let (resource, resolution) = resolved.into_parts();
        let ctx = OperationContext::new(scope, address.clone(), resolution, operation, resource);
        handler.execute(&ctx)
    }

    /// Child names for path completion, including live values below
    /// template slots when the node's `read-resource` enumerates them
    pub fn get_children(&self, address: &PathAddress) -> Result<Vec<String>> {
        let request = ManagementRequest::read_resource(address.clone());
        match self.invoke(request)? {
            ResultValue::ReadResource(model) => Ok(model.children),
            other => Err(ArborError::operation_failed(format!(
                "read-resource returned {} instead of a resource description",
                other.kind_name()
            ))),
        }
    }

    fn default_content_type(&self, value: &ResultValue) -> ContentType {
        match value {
            ResultValue::Export(_) => self.export_content_type,
            _ => ContentType::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::model::ReadResourceModel;

    fn controller_with(registry: ResourceRegistry) -> ManagementController {
        ManagementController::new(registry, RuntimeContext::new(), MarshallerRegistry::with_defaults())
    }

    #[test]
    fn test_missing_resource_is_failure_outcome() {
        let controller = controller_with(ResourceRegistry::new());
        let response = controller.execute(ManagementRequest::read_resource(PathAddress::parse("/nope")));

        let failure = response.failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::ResourceNotFound);
        assert_eq!(failure.op(), Some("read-resource"));
        assert_eq!(failure.address(), Some(&PathAddress::parse("/nope")));
    }

    #[test]
    fn test_read_resource_written_as_json() {
        let mut registry = ResourceRegistry::new();
        registry.register_sub_resource("a", "node a").unwrap();
        let controller = controller_with(registry);

        let response = controller.execute(ManagementRequest::read_resource(PathAddress::root()));
        let mut out = Vec::new();
        response.write_to(&mut out).unwrap();
        let model: ReadResourceModel = serde_json::from_slice(&out).unwrap();
        assert_eq!(model.children, vec!["a"]);
    }

    #[test]
    fn test_body_popped_before_later_attachments() {
        let mut registry = ResourceRegistry::new();
        registry
            .register_sub_resource("echo", "")
            .unwrap()
            .register_operation_handler(
                "echo",
                |ctx: &OperationContext<'_>| -> Result<ResultValue> {
                    let first = ctx.pop_attachment()?.into_bytes();
                    let second = ctx.pop_attachment()?.into_bytes();
                    let third = ctx.pop_attachment();
                    assert!(matches!(third, Err(ArborError::AttachmentMissing { .. })));
                    Ok(ResultValue::Value(serde_json::json!([
                        String::from_utf8_lossy(&first),
                        String::from_utf8_lossy(&second)
                    ])))
                },
                "",
            )
            .unwrap();
        let controller = controller_with(registry);

        let value = controller
            .invoke(
                ManagementRequest::new("echo", PathAddress::parse("/echo"))
                    .with_attachment(Attachment::new("second"))
                    .with_body(Attachment::new("first")),
            )
            .unwrap();
        assert_eq!(value.as_value().unwrap(), &serde_json::json!(["first", "second"]));
    }
}
