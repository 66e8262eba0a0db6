//! Arbor Content - the portal content sub-system
//!
//! Sites are addressed as `/content/{site-type}/{site-name}` and hold a
//! layout, a page collection and a navigation tree. This crate provides:
//! - The payload types and the [`store::PayloadStore`] they persist through
//! - Export tasks writing one archive file per payload
//! - Archive import with CONSERVE, MERGE and OVERWRITE strategies
//! - [`resources::ContentExtension`], which registers the `/content` subtree

pub mod export;
pub mod import;
pub mod model;
pub mod resources;
pub mod store;

use std::sync::Arc;

use arbor_core::errors::Result;
use arbor_core::import::ImportReport;
use arbor_core::marshal::{ContentType, JsonMarshaller, MarshallerRegistry};
use arbor_core::registry::ResourceRegistry;
use arbor_core::runtime::RuntimeContext;
use arbor_core::settings::Settings;
use arbor_core::ManagementController;

pub use import::ContentImporter;
pub use model::{Navigation, NavigationNode, Page, PageSet, SiteKey, SiteLayout, SiteType};
pub use resources::ContentExtension;
pub use store::{InMemoryStore, PayloadStore};

/// JSON marshallers for the payload types and the import report
pub fn register_marshallers(marshallers: &mut MarshallerRegistry) {
    marshallers.register::<SiteLayout>(ContentType::Json, JsonMarshaller::new());
    marshallers.register::<PageSet>(ContentType::Json, JsonMarshaller::new());
    marshallers.register::<Navigation>(ContentType::Json, JsonMarshaller::new());
    marshallers.register::<ImportReport>(ContentType::Json, JsonMarshaller::new());
}

/// A controller serving the `/content` subtree over `store`
///
/// # Errors
///
/// Registration errors from [`ContentExtension`].
pub fn content_controller(store: Arc<dyn PayloadStore>, settings: &Settings) -> Result<ManagementController> {
    let mut registry = ResourceRegistry::new();
    registry.install(&ContentExtension)?;

    let runtime = RuntimeContext::new()
        .with::<dyn PayloadStore>(store)
        .with(Arc::new(settings.import.clone()));

    let mut marshallers = MarshallerRegistry::with_defaults();
    register_marshallers(&mut marshallers);

    Ok(ManagementController::new(registry, runtime, marshallers)
        .with_export_content_type(settings.export.content_type))
}
