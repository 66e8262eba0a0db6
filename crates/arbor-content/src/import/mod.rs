//! Content import
//!
//! An archive is staged completely first, so a malformed entry aborts the
//! import before anything is written. Staged sites then commit in key
//! order, each as layout, pages, navigation, inside one
//! [`TransactionalImport`].

mod staging;
mod tasks;

use std::sync::Arc;

use arbor_core::archive::Archive;
use arbor_core::errors::Result;
use arbor_core::import::{ImportReport, ImportStrategy, TransactionalImport};
use arbor_core::marshal::MarshallerRegistry;
use tracing::info;

use crate::store::PayloadStore;

pub use staging::{StagedImport, StagedSite};
pub use tasks::{LayoutImportTask, NavigationImportTask, PagesImportTask};

/// Stages archives and commits them against a [`PayloadStore`]
#[derive(Clone)]
pub struct ContentImporter {
    store: Arc<dyn PayloadStore>,
}

impl ContentImporter {
    pub fn new(store: Arc<dyn PayloadStore>) -> Self {
        Self { store }
    }

    /// One task per staged payload, in commit order
    pub fn plan(&self, staged: StagedImport, strategy: ImportStrategy) -> TransactionalImport {
        let mut import = TransactionalImport::new();
        for (site, payloads) in staged.into_sites() {
            if let Some(layout) = payloads.layout {
                import.push(Box::new(LayoutImportTask::new(
                    self.store.clone(),
                    site.clone(),
                    strategy,
                    layout,
                )));
            }
            if let Some(pages) = payloads.pages {
                import.push(Box::new(PagesImportTask::new(
                    self.store.clone(),
                    site.clone(),
                    strategy,
                    pages,
                )));
            }
            if let Some(navigation) = payloads.navigation {
                import.push(Box::new(NavigationImportTask::new(
                    self.store.clone(),
                    site,
                    strategy,
                    navigation,
                )));
            }
        }
        import
    }

    /// Stage and commit `archive`
    ///
    /// # Errors
    ///
    /// Staging errors (nothing was changed), or `ImportFailed` after a
    /// commit failure and rollback.
    pub fn import_archive(
        &self,
        archive: &Archive,
        marshallers: &MarshallerRegistry,
        strategy: ImportStrategy,
    ) -> Result<ImportReport> {
        let staged = StagedImport::from_archive(archive, marshallers)?;
        let import = self.plan(staged, strategy);
        info!(
            strategy = %strategy,
            task_count = import.len(),
            "committing content import"
        );
        import.run()
    }
}
