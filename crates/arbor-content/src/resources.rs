//! The `/content` subtree
//!
//! ```text
//! /content                              read-resource, import-resource
//! /content/{site-type}                  read-resource
//! /content/{site-type}/{site-name}      read-resource
//!     site-layout                       read-config, export-resource
//!     pages                             read-resource, export-resource
//!     pages/{page-name}                 read-config, export-resource
//!     navigation                        read-config, export-resource
//! ```
//!
//! Handlers find the [`PayloadStore`] in the runtime context.

use std::sync::Arc;

use arbor_core::archive::Archive;
use arbor_core::errors::{ArborError, Result};
use arbor_core::filter::PathTemplateFilter;
use arbor_core::import::ImportStrategy;
use arbor_core::marshal::ContentType;
use arbor_core::model::{ExportResourceModel, ReadResourceModel, ResultValue};
use arbor_core::operation::{attributes, names, OperationContext, OperationHandler};
use arbor_core::registry::{ManagementExtension, ResourceRegistry};
use arbor_core::settings::ImportSettings;
use serde::Serialize;
use tracing::debug;

use crate::export::{LayoutExportTask, NavigationExportTask, PagesExportTask};
use crate::import::ContentImporter;
use crate::model::{SiteKey, SiteType};
use crate::store::PayloadStore;

pub const CONTENT: &str = "content";
pub const SITE_LAYOUT: &str = "site-layout";
pub const PAGES: &str = "pages";
pub const NAVIGATION: &str = "navigation";

/// Template names bound below `/content`
pub mod templates {
    pub const SITE_TYPE: &str = "site-type";
    pub const SITE_NAME: &str = "site-name";
    pub const PAGE_NAME: &str = "page-name";
}

/// Registers the `/content` subtree
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentExtension;

impl ManagementExtension for ContentExtension {
    fn name(&self) -> &str {
        CONTENT
    }

    fn register(&self, registry: &mut ResourceRegistry) -> Result<()> {
        let content = registry.register_sub_resource(CONTENT, "Portal content: sites, pages and navigation")?;
        content
            .register_operation_handler(names::READ_RESOURCE, read_site_types, "List site types")?
            .register_operation_handler(
                names::IMPORT_RESOURCE,
                ImportResourceHandler,
                "Import a content archive",
            )?;

        let site_type = content.register_sub_resource("{site-type}", "Sites of one owner type")?;
        site_type.register_operation_handler(names::READ_RESOURCE, read_site_names, "List sites")?;

        let site = site_type.register_sub_resource("{site-name}", "One site")?;
        site.register_operation_handler(names::READ_RESOURCE, read_site, "Describe a site")?;

        site.register_sub_resource(SITE_LAYOUT, "Site layout and settings")?
            .register_operation_handler(names::READ_CONFIG, read_layout, "Site layout as JSON")?
            .register_operation_handler(names::EXPORT_RESOURCE, export_layout, "Export the site layout")?;

        let pages = site.register_sub_resource(PAGES, "Pages of the site")?;
        pages
            .register_operation_handler(names::READ_RESOURCE, read_page_names, "List pages")?
            .register_operation_handler(
                names::EXPORT_RESOURCE,
                export_pages,
                "Export pages, honouring page-name filters",
            )?;
        pages
            .register_sub_resource("{page-name}", "One page")?
            .register_operation_handler(names::READ_CONFIG, read_page, "Page as JSON")?
            .register_operation_handler(names::EXPORT_RESOURCE, export_page, "Export one page")?;

        site.register_sub_resource(NAVIGATION, "Navigation tree of the site")?
            .register_operation_handler(names::READ_CONFIG, read_navigation, "Navigation as JSON")?
            .register_operation_handler(names::EXPORT_RESOURCE, export_navigation, "Export the navigation")?;

        Ok(())
    }
}

fn store(ctx: &OperationContext<'_>) -> Result<Arc<dyn PayloadStore>> {
    ctx.runtime().require::<dyn PayloadStore>()
}

fn not_found(ctx: &OperationContext<'_>) -> ArborError {
    ArborError::ResourceNotFound {
        address: ctx.address().clone(),
    }
}

fn site_type(ctx: &OperationContext<'_>) -> Result<SiteType> {
    ctx.require_path_template(templates::SITE_TYPE)?
        .parse()
        .map_err(|_| not_found(ctx))
}

/// Key of the site at `ctx`, which must exist
fn existing_site(ctx: &OperationContext<'_>, store: &dyn PayloadStore) -> Result<SiteKey> {
    let name = ctx.require_path_template(templates::SITE_NAME)?;
    let site = SiteKey::new(site_type(ctx)?, name).map_err(|_| not_found(ctx))?;
    if !store.site_exists(&site)? {
        return Err(not_found(ctx));
    }
    Ok(site)
}

fn config_value(value: &impl Serialize) -> Result<ResultValue> {
    Ok(ResultValue::Value(serde_json::to_value(value)?))
}

fn export_of(task: impl arbor_core::model::ExportTask + 'static) -> ResultValue {
    ResultValue::Export(ExportResourceModel::single(Arc::new(task)))
}

fn read_site_types(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let types = SiteType::ALL.iter().map(ToString::to_string).collect();
    Ok(ReadResourceModel::new(ctx.resource().description(), types).into())
}

fn read_site_names(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let site_type = site_type(ctx)?;
    let names = store(ctx)?
        .find_sites(site_type)?
        .into_iter()
        .map(|site| site.name().to_string())
        .collect();
    Ok(ReadResourceModel::new(ctx.resource().description(), names).into())
}

fn read_site(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    existing_site(ctx, store.as_ref())?;
    let resource = ctx.resource();
    Ok(ReadResourceModel::new(resource.description(), resource.literal_child_names()).into())
}

fn read_page_names(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let names = store
        .find_pages(&site)?
        .into_iter()
        .map(|page| page.name)
        .collect();
    Ok(ReadResourceModel::new(ctx.resource().description(), names).into())
}

fn read_layout(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let layout = store.load_layout(&site)?.ok_or_else(|| not_found(ctx))?;
    config_value(&layout)
}

fn read_page(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let name = ctx.require_path_template(templates::PAGE_NAME)?;
    let page = store.load_page(&site, &name)?.ok_or_else(|| not_found(ctx))?;
    config_value(&page)
}

fn read_navigation(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let navigation = store.load_navigation(&site)?.ok_or_else(|| not_found(ctx))?;
    config_value(&navigation)
}

fn export_layout(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    Ok(export_of(LayoutExportTask::new(store, site)))
}

/// Pages whose `{page-name}` binding passes the request filter
fn export_pages(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let filter = PathTemplateFilter::parse_optional(ctx.attributes().get_all(attributes::FILTER))?;

    let names: Vec<String> = store
        .find_pages(&site)?
        .into_iter()
        .map(|page| page.name)
        .filter(|name| {
            let resolution = ctx.resolution().clone().with_binding(templates::PAGE_NAME, name.as_str());
            ctx.address().append_segment(name).accepts(&filter, &resolution)
        })
        .collect();

    if names.is_empty() {
        debug!(site = %site, "no pages selected for export");
        return Ok(ResultValue::NoResult);
    }
    Ok(export_of(PagesExportTask::only(store, site, names)))
}

fn export_page(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    let name = ctx.require_path_template(templates::PAGE_NAME)?;
    if store.load_page(&site, &name)?.is_none() {
        return Err(not_found(ctx));
    }
    Ok(export_of(PagesExportTask::only(store, site, vec![name])))
}

fn export_navigation(ctx: &OperationContext<'_>) -> Result<ResultValue> {
    let store = store(ctx)?;
    let site = existing_site(ctx, store.as_ref())?;
    if store.load_navigation(&site)?.is_none() {
        return Ok(ResultValue::NoResult);
    }
    Ok(export_of(NavigationExportTask::new(store, site)))
}

/// Bulk import of a content archive attached to the request
///
/// The strategy comes from the `import-strategy` attribute, else from the
/// [`ImportSettings`] component, else MERGE.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportResourceHandler;

impl ImportResourceHandler {
    fn strategy(ctx: &OperationContext<'_>) -> Result<ImportStrategy> {
        match ctx.attributes().get_first(attributes::IMPORT_STRATEGY) {
            Some(raw) => raw.parse(),
            None => Ok(ctx
                .runtime()
                .get::<ImportSettings>()
                .map(|settings| settings.default_strategy)
                .unwrap_or_default()),
        }
    }
}

impl OperationHandler for ImportResourceHandler {
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<ResultValue> {
        let strategy = Self::strategy(ctx)?;
        let store = store(ctx)?;

        let attachment = ctx.pop_attachment()?;
        let content_type = attachment.content_type().unwrap_or(ContentType::Bundle);
        let mut reader = attachment.reader();
        let archive: Archive = ctx.marshallers().unmarshal(content_type, &mut reader)?;

        let report = ContentImporter::new(store).import_archive(&archive, ctx.marshallers(), strategy)?;
        config_value(&report)
    }
}
