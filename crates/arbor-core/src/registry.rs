//! The managed resource tree and its operation handlers
//!
//! The tree is built once at start-up by ordinary registration calls, one
//! [`ManagementExtension`] per sub-system, and is read-only afterwards.
//! Each node holds literal children and at most one template child
//! (`{page-name}`). Lookup prefers a literal child and falls back to the
//! template child, binding the template name to the matched segment.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::address::{is_template_segment, template_name, PathAddress, SEPARATOR};
use crate::errors::{ArborError, Result};
use crate::handlers::{ExportResourceHandler, ReadResourceHandler};
use crate::operation::{names, OperationHandler};
use crate::template::ResolutionContext;

/// A handler bound to an operation name on one node
#[derive(Clone)]
pub struct RegisteredOperation {
    name: String,
    description: String,
    inherited: bool,
    handler: Arc<dyn OperationHandler>,
}

impl RegisteredOperation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether descendants without their own handler resolve to this one
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn handler(&self) -> Arc<dyn OperationHandler> {
        self.handler.clone()
    }
}

impl fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("name", &self.name)
            .field("inherited", &self.inherited)
            .finish()
    }
}

/// One addressable node
#[derive(Debug)]
pub struct ManagedResource {
    name: String,
    address: PathAddress,
    description: String,
    operations: Vec<RegisteredOperation>,
    children: Vec<ManagedResource>,
}

impl ManagedResource {
    fn new(name: &str, address: PathAddress, description: String) -> Self {
        Self {
            name: name.to_string(),
            address,
            description,
            operations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Segment name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration address; template slots keep their `{name}` form
    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_template(&self) -> bool {
        is_template_segment(&self.name)
    }

    /// Name inside the braces for a template node
    pub fn template_name(&self) -> Option<&str> {
        template_name(&self.name)
    }

    /// Add a child, or return the existing child of that name.
    ///
    /// # Errors
    ///
    /// `InvalidResourceName` when `name` is not a single non-empty segment,
    /// `AmbiguousTemplate` when a differently named template child exists.
    pub fn register_sub_resource(
        &mut self,
        name: &str,
        description: impl Into<String>,
    ) -> Result<&mut ManagedResource> {
        validate_name(name)?;

        if let Some(index) = self.children.iter().position(|child| child.name == name) {
            return Ok(&mut self.children[index]);
        }

        if is_template_segment(name) {
            if let Some(existing) = self.template_child() {
                return Err(ArborError::AmbiguousTemplate {
                    address: self.address.clone(),
                    existing: existing.name.clone(),
                    requested: name.to_string(),
                });
            }
        }

        let child = ManagedResource::new(name, self.address.append_segment(name), description.into());
        debug!(address = %child.address, "registered resource");
        self.children.push(child);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Bind `handler` to `name` on this node only
    ///
    /// # Errors
    ///
    /// `DuplicateOperation` when `name` is already bound here.
    pub fn register_operation_handler(
        &mut self,
        name: &str,
        handler: impl OperationHandler + 'static,
        description: impl Into<String>,
    ) -> Result<&mut Self> {
        self.add_operation(name, Arc::new(handler), description.into(), false)
    }

    /// Bind `handler` to `name` here and for descendants without their own
    /// handler for `name`
    ///
    /// # Errors
    ///
    /// `DuplicateOperation` when `name` is already bound here.
    pub fn register_inherited_operation_handler(
        &mut self,
        name: &str,
        handler: impl OperationHandler + 'static,
        description: impl Into<String>,
    ) -> Result<&mut Self> {
        self.add_operation(name, Arc::new(handler), description.into(), true)
    }

    fn add_operation(
        &mut self,
        name: &str,
        handler: Arc<dyn OperationHandler>,
        description: String,
        inherited: bool,
    ) -> Result<&mut Self> {
        if self.operation(name).is_some() {
            return Err(ArborError::DuplicateOperation {
                operation: name.to_string(),
                address: self.address.clone(),
            });
        }
        debug!(address = %self.address, operation = name, inherited, "registered operation");
        self.operations.push(RegisteredOperation {
            name: name.to_string(),
            description,
            inherited,
            handler,
        });
        Ok(self)
    }

    /// Operation registered on this node, inherited or not
    pub fn operation(&self, name: &str) -> Option<&RegisteredOperation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Handler registered on this node for this node specifically, ignoring
    /// handlers installed for a whole subtree
    pub fn own_operation_handler(&self, name: &str) -> Option<Arc<dyn OperationHandler>> {
        self.operation(name)
            .filter(|op| !op.inherited)
            .map(RegisteredOperation::handler)
    }

    pub fn operations(&self) -> &[RegisteredOperation] {
        &self.operations
    }

    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }

    pub fn children(&self) -> &[ManagedResource] {
        &self.children
    }

    /// Literal child names in registration order
    pub fn literal_child_names(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|child| !child.is_template())
            .map(|child| child.name.clone())
            .collect()
    }

    pub fn template_child(&self) -> Option<&ManagedResource> {
        self.children.iter().find(|child| child.is_template())
    }

    /// Child registered under exactly `name` (template nodes by `{name}`)
    pub fn child(&self, name: &str) -> Option<&ManagedResource> {
        self.children.iter().find(|child| child.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut ManagedResource> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Literal match first, then the template child
    fn lookup(&self, segment: &str) -> Option<&ManagedResource> {
        self.children
            .iter()
            .find(|child| child.name == segment && !child.is_template())
            .or_else(|| self.template_child())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains(SEPARATOR) {
        Some("name contains a path separator")
    } else if name.starts_with('{') != name.ends_with('}') || name == "{}" {
        Some("malformed template placeholder")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ArborError::InvalidResourceName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// A node found by [`ResourceRegistry::resolve`] with the template bindings
/// collected on the way down
pub struct ResolvedResource<'r> {
    resource: &'r ManagedResource,
    lineage: Vec<&'r ManagedResource>,
    resolution: ResolutionContext,
}

impl<'r> ResolvedResource<'r> {
    pub fn resource(&self) -> &'r ManagedResource {
        self.resource
    }

    pub fn resolution(&self) -> &ResolutionContext {
        &self.resolution
    }

    /// The node's own handler, else the nearest ancestor's inherited one
    pub fn operation_handler(&self, name: &str) -> Option<Arc<dyn OperationHandler>> {
        if let Some(op) = self.resource.operation(name) {
            return Some(op.handler());
        }
        self.lineage
            .iter()
            .rev()
            .filter_map(|ancestor| ancestor.operation(name))
            .find(|op| op.inherited)
            .map(RegisteredOperation::handler)
    }

    pub fn into_parts(self) -> (&'r ManagedResource, ResolutionContext) {
        (self.resource, self.resolution)
    }
}

/// Static registration performed by one sub-system
pub trait ManagementExtension {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Any registration error aborts start-up.
    fn register(&self, registry: &mut ResourceRegistry) -> Result<()>;
}

/// Root of the managed resource tree
#[derive(Debug)]
pub struct ResourceRegistry {
    root: ManagedResource,
}

impl ResourceRegistry {
    /// A registry whose root carries the global `read-resource` and
    /// `export-resource` handlers for the whole tree
    pub fn new() -> Self {
        let mut root = ManagedResource::new("", PathAddress::root(), "Management root".to_string());
        root.operations.push(RegisteredOperation {
            name: names::READ_RESOURCE.to_string(),
            description: "Describe a resource and list its children".to_string(),
            inherited: true,
            handler: Arc::new(ReadResourceHandler),
        });
        root.operations.push(RegisteredOperation {
            name: names::EXPORT_RESOURCE.to_string(),
            description: "Export every exportable resource below this address".to_string(),
            inherited: true,
            handler: Arc::new(ExportResourceHandler),
        });
        Self { root }
    }

    /// A registry with no handlers at all
    pub fn empty() -> Self {
        Self {
            root: ManagedResource::new("", PathAddress::root(), String::new()),
        }
    }

    pub fn root(&self) -> &ManagedResource {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ManagedResource {
        &mut self.root
    }

    /// Register a child of the root
    pub fn register_sub_resource(
        &mut self,
        name: &str,
        description: impl Into<String>,
    ) -> Result<&mut ManagedResource> {
        self.root.register_sub_resource(name, description)
    }

    /// Run an extension's registrations
    pub fn install(&mut self, extension: &dyn ManagementExtension) -> Result<()> {
        debug!(extension = extension.name(), "installing management extension");
        extension.register(self)
    }

    /// Node registered at exactly `address`, with template slots spelled
    /// `{name}`
    pub fn registered_mut(&mut self, address: &PathAddress) -> Option<&mut ManagedResource> {
        address
            .iter()
            .try_fold(&mut self.root, |node, segment| node.child_mut(segment))
    }

    /// Walk the tree for a concrete address, binding template slots
    pub fn resolve(&self, address: &PathAddress) -> Option<ResolvedResource<'_>> {
        let mut node = &self.root;
        let mut lineage = Vec::with_capacity(address.len());
        let mut resolution = ResolutionContext::new();

        for segment in address.iter() {
            let next = node.lookup(segment)?;
            if let Some(name) = next.template_name() {
                resolution.bind(name, segment);
            }
            lineage.push(node);
            node = next;
        }

        Some(ResolvedResource {
            resource: node,
            lineage,
            resolution,
        })
    }

    pub fn get_sub_resource(&self, address: &PathAddress) -> Option<&ManagedResource> {
        self.resolve(address).map(|resolved| resolved.resource)
    }

    pub fn get_operation_handler(
        &self,
        address: &PathAddress,
        name: &str,
    ) -> Option<Arc<dyn OperationHandler>> {
        self.resolve(address)?.operation_handler(name)
    }

    /// Literal child names at `address`; `None` when nothing is registered
    /// there
    pub fn get_child_names(&self, address: &PathAddress) -> Option<Vec<String>> {
        self.get_sub_resource(address)
            .map(ManagedResource::literal_child_names)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
