//! Operation handlers and the per-request operation context

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use arbor_core_types::RequestContext;
use tracing::debug;

use crate::address::PathAddress;
use crate::errors::{ArborError, Result};
use crate::marshal::{ContentType, MarshallerRegistry};
use crate::model::ResultValue;
use crate::registry::{ManagedResource, ResourceRegistry};
use crate::runtime::RuntimeContext;
use crate::template::ResolutionContext;

/// Well-known operation names
pub mod names {
    pub const READ_RESOURCE: &str = "read-resource";
    pub const EXPORT_RESOURCE: &str = "export-resource";
    pub const READ_CONFIG: &str = "read-config";
    pub const IMPORT_RESOURCE: &str = "import-resource";
}

/// Well-known attribute names
pub mod attributes {
    /// Filter strings for `export-resource`
    pub const FILTER: &str = "filter";
    /// `conserve`, `merge` or `overwrite` for `import-resource`
    pub const IMPORT_STRATEGY: &str = "import-strategy";
}

/// Logic bound to one operation name on one node
///
/// Handlers report their result or failure through the return value.
/// Closures with the matching signature are handlers:
///
/// ```
/// use arbor_core::model::ResultValue;
/// use arbor_core::operation::{OperationContext, OperationHandler};
///
/// let handler = |_ctx: &OperationContext<'_>| Ok(ResultValue::NoResult);
/// fn assert_handler<H: OperationHandler>(_: &H) {}
/// assert_handler(&handler);
/// ```
pub trait OperationHandler: Send + Sync {
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<ResultValue>;
}

impl<F> OperationHandler for F
where
    F: Fn(&OperationContext<'_>) -> Result<ResultValue> + Send + Sync,
{
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<ResultValue> {
        self(ctx)
    }
}

/// Multi-valued request attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationAttributes {
    values: BTreeMap<String, Vec<String>>,
}

impl OperationAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raw request payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    content_type: Option<ContentType>,
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reader(&self) -> impl Read + '_ {
        Cursor::new(self.data.as_slice())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// State shared by every context derived for one request
pub(crate) struct RequestScope<'a> {
    pub(crate) request: &'a RequestContext,
    pub(crate) content_type: ContentType,
    pub(crate) attributes: &'a OperationAttributes,
    pub(crate) attachments: RefCell<Vec<Attachment>>,
    pub(crate) registry: &'a ResourceRegistry,
    pub(crate) runtime: &'a RuntimeContext,
    pub(crate) marshallers: &'a MarshallerRegistry,
}

/// Everything a handler sees for one invocation
///
/// Contexts derived through [`OperationContext::derive`] share the request
/// scope, so an attachment popped by one handler is gone for the others.
pub struct OperationContext<'a> {
    scope: &'a RequestScope<'a>,
    address: PathAddress,
    resolution: ResolutionContext,
    operation_name: String,
    resource: &'a ManagedResource,
}

impl<'a> OperationContext<'a> {
    pub(crate) fn new(
        scope: &'a RequestScope<'a>,
        address: PathAddress,
        resolution: ResolutionContext,
        operation_name: impl Into<String>,
        resource: &'a ManagedResource,
    ) -> Self {
        Self {
            scope,
            address,
            resolution,
            operation_name: operation_name.into(),
            resource,
        }
    }

    pub fn request(&self) -> &RequestContext {
        self.scope.request
    }

    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    pub fn resolution(&self) -> &ResolutionContext {
        &self.resolution
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn content_type(&self) -> ContentType {
        self.scope.content_type
    }

    pub fn attributes(&self) -> &OperationAttributes {
        self.scope.attributes
    }

    /// The node the address resolved to
    pub fn resource(&self) -> &'a ManagedResource {
        self.resource
    }

    pub fn registry(&self) -> &'a ResourceRegistry {
        self.scope.registry
    }

    pub fn runtime(&self) -> &'a RuntimeContext {
        self.scope.runtime
    }

    pub fn marshallers(&self) -> &'a MarshallerRegistry {
        self.scope.marshallers
    }

    /// Value bound to `{name}` while resolving this context's address
    pub fn resolve_path_template(&self, name: &str) -> Option<String> {
        self.resolution.resolve(name)
    }

    /// Like [`resolve_path_template`](Self::resolve_path_template), failing
    /// when the template is unbound
    pub fn require_path_template(&self, name: &str) -> Result<String> {
        self.resolve_path_template(name).ok_or_else(|| {
            ArborError::operation_failed(format!(
                "template '{{{}}}' is not bound at {}",
                name, self.address
            ))
        })
    }

    /// Take the next attachment. Each attachment is handed out once per
    /// request.
    pub fn pop_attachment(&self) -> Result<Attachment> {
        self.scope
            .attachments
            .borrow_mut()
            .pop()
            .ok_or_else(|| ArborError::AttachmentMissing {
                operation: self.operation_name.clone(),
            })
    }

    /// A fresh context for `operation_name` at `address`, with the bindings
    /// collected while resolving that address
    pub fn derive(&self, address: PathAddress, operation_name: &str) -> Result<OperationContext<'a>> {
        let resolved = self
            .scope
            .registry
            .resolve(&address)
            .ok_or_else(|| ArborError::ResourceNotFound {
                address: address.clone(),
            })?;
        let (resource, resolution) = resolved.into_parts();
        Ok(OperationContext::new(
            self.scope,
            address,
            resolution,
            operation_name,
            resource,
        ))
    }

    /// Run `operation_name` at `address` within the same request
    pub fn delegate(&self, address: &PathAddress, operation_name: &str) -> Result<ResultValue> {
        let handler = self
            .scope
            .registry
            .get_operation_handler(address, operation_name)
            .ok_or_else(|| self.missing(address, operation_name))?;
        let derived = self.derive(address.clone(), operation_name)?;
        debug!(
            from = %self.address,
            address = %address,
            operation = operation_name,
            "delegating operation"
        );
        handler.execute(&derived)
    }

    fn missing(&self, address: &PathAddress, operation_name: &str) -> ArborError {
        match self.scope.registry.get_sub_resource(address) {
            None => ArborError::ResourceNotFound {
                address: address.clone(),
            },
            Some(_) => ArborError::OperationNotFound {
                operation: operation_name.to_string(),
                address: address.clone(),
            },
        }
    }
}
