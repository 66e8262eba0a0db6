//! Export tasks for site payloads
//!
//! Tasks read the store when the archive is written, not when they are
//! collected.

use std::io::Write;
use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::marshal::{JsonMarshaller, Marshaller};
use arbor_core::model::ExportTask;

use crate::model::{Navigation, PageSet, PayloadKind, SiteKey, SiteLayout};
use crate::store::PayloadStore;

fn vanished(site: &SiteKey, kind: PayloadKind) -> ArborError {
    ArborError::operation_failed(format!("{} of site {} no longer exists", kind, site))
}

/// Writes `<type>/<name>/site.json`
pub struct LayoutExportTask {
    store: Arc<dyn PayloadStore>,
    site: SiteKey,
}

impl LayoutExportTask {
    pub fn new(store: Arc<dyn PayloadStore>, site: SiteKey) -> Self {
        Self { store, site }
    }
}

impl ExportTask for LayoutExportTask {
    fn entry_path(&self) -> String {
        self.site.entry_path(PayloadKind::Layout.file_name())
    }

    fn export(&self, out: &mut dyn Write) -> Result<()> {
        let layout = self
            .store
            .load_layout(&self.site)?
            .ok_or_else(|| vanished(&self.site, PayloadKind::Layout))?;
        JsonMarshaller::<SiteLayout>::pretty().marshal(&layout, out)
    }
}

/// Writes `<type>/<name>/pages.json`, optionally restricted to some pages
pub struct PagesExportTask {
    store: Arc<dyn PayloadStore>,
    site: SiteKey,
    names: Option<Vec<String>>,
}

impl PagesExportTask {
    /// Every page of the site
    pub fn all(store: Arc<dyn PayloadStore>, site: SiteKey) -> Self {
        Self {
            store,
            site,
            names: None,
        }
    }

    /// Only the named pages, in store order
    pub fn only(store: Arc<dyn PayloadStore>, site: SiteKey, names: Vec<String>) -> Self {
        Self {
            store,
            site,
            names: Some(names),
        }
    }
}

impl ExportTask for PagesExportTask {
    fn entry_path(&self) -> String {
        self.site.entry_path(PayloadKind::Pages.file_name())
    }

    fn export(&self, out: &mut dyn Write) -> Result<()> {
        let pages = self
            .store
            .find_pages(&self.site)?
            .into_iter()
            .filter(|page| {
                self.names
                    .as_ref()
                    .map_or(true, |names| names.contains(&page.name))
            })
            .collect();
        JsonMarshaller::<PageSet>::pretty().marshal(&PageSet::new(pages), out)
    }
}

/// Writes `<type>/<name>/navigation.json`
pub struct NavigationExportTask {
    store: Arc<dyn PayloadStore>,
    site: SiteKey,
}

impl NavigationExportTask {
    pub fn new(store: Arc<dyn PayloadStore>, site: SiteKey) -> Self {
        Self { store, site }
    }
}

impl ExportTask for NavigationExportTask {
    fn entry_path(&self) -> String {
        self.site.entry_path(PayloadKind::Navigation.file_name())
    }

    fn export(&self, out: &mut dyn Write) -> Result<()> {
        let navigation = self
            .store
            .load_navigation(&self.site)?
            .ok_or_else(|| vanished(&self.site, PayloadKind::Navigation))?;
        JsonMarshaller::<Navigation>::pretty().marshal(&navigation, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;
    use crate::store::InMemoryStore;

    #[test]
    fn test_pages_export_filters_by_name() {
        let store = Arc::new(InMemoryStore::new());
        let site = SiteKey::portal("classic").unwrap();
        store.save_page(&site, &Page::new("home", "Home")).unwrap();
        store.save_page(&site, &Page::new("news", "News")).unwrap();

        let task = PagesExportTask::only(store, site, vec!["news".to_string()]);
        let mut out = Vec::new();
        task.export(&mut out).unwrap();

        let set: PageSet = serde_json::from_slice(&out).unwrap();
        assert_eq!(set.names(), vec!["news"]);
        assert_eq!(task.entry_path(), "portal/classic/pages.json");
    }

    #[test]
    fn test_layout_export_after_removal_fails() {
        let store = Arc::new(InMemoryStore::new());
        let site = SiteKey::portal("classic").unwrap();
        store.save_layout(&site, &SiteLayout::new("Classic")).unwrap();
        let task = LayoutExportTask::new(store.clone(), site.clone());

        store.remove_layout(&site).unwrap();

        assert!(matches!(
            task.export(&mut Vec::new()),
            Err(ArborError::OperationFailed { .. })
        ));
    }
}
