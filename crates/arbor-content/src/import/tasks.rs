//! Per-kind import tasks
//!
//! Every task records the compensating action before each store mutation,
//! so a task that fails halfway can still be undone. Rollback replays the
//! recorded actions newest first.

use std::collections::BTreeMap;
use std::sync::Arc;

use arbor_core::errors::Result;
use arbor_core::import::{ChangeCounts, ImportStrategy, ImportTask};
use tracing::{debug, warn};

use crate::model::{Navigation, Page, PageSet, PayloadKind, SiteKey, SiteLayout};
use crate::store::PayloadStore;

/// Compensation for one store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Undo {
    RestoreLayout(SiteLayout),
    RemoveLayout,
    RestorePage(Page),
    RemovePage(String),
    RestoreNavigation(Navigation),
    RemoveNavigation,
}

impl Undo {
    fn apply(&self, store: &dyn PayloadStore, site: &SiteKey) -> Result<()> {
        match self {
            Undo::RestoreLayout(layout) => store.save_layout(site, layout),
            Undo::RemoveLayout => store.remove_layout(site),
            Undo::RestorePage(page) => store.save_page(site, page),
            Undo::RemovePage(name) => store.remove_page(site, name),
            Undo::RestoreNavigation(navigation) => store.save_navigation(site, navigation),
            Undo::RemoveNavigation => store.remove_navigation(site),
        }
    }
}

/// Compensating actions of one task, oldest first
#[derive(Debug, Default)]
struct UndoLog {
    actions: Vec<Undo>,
}

impl UndoLog {
    fn record(&mut self, action: Undo) {
        self.actions.push(action);
    }

    /// Replay newest first. Actions that fail stay in the log and the first
    /// error is returned after every action was attempted.
    fn replay(&mut self, store: &dyn PayloadStore, site: &SiteKey) -> Result<()> {
        let mut first_error = None;
        let mut failed = Vec::new();
        while let Some(action) = self.actions.pop() {
            if let Err(e) = action.apply(store, site) {
                warn!(site = %site, error = %e, "compensating action failed");
                first_error.get_or_insert(e);
                failed.push(action);
            }
        }
        failed.reverse();
        self.actions = failed;
        first_error.map_or(Ok(()), Err)
    }
}

/// State shared by the three task kinds
struct TaskBase {
    store: Arc<dyn PayloadStore>,
    site: SiteKey,
    strategy: ImportStrategy,
    undo: UndoLog,
    changes: ChangeCounts,
}

impl TaskBase {
    fn new(store: Arc<dyn PayloadStore>, site: SiteKey, strategy: ImportStrategy) -> Self {
        Self {
            store,
            site,
            strategy,
            undo: UndoLog::default(),
            changes: ChangeCounts::default(),
        }
    }

    fn rollback(&mut self, kind: PayloadKind) -> Result<()> {
        debug!(
            site = %self.site,
            payload_kind = %kind,
            actions = self.undo.actions.len(),
            "rolling back import task"
        );
        self.undo.replay(self.store.as_ref(), &self.site)
    }
}

/// Imports `site.json`
pub struct LayoutImportTask {
    base: TaskBase,
    layout: SiteLayout,
}

impl LayoutImportTask {
    pub fn new(
        store: Arc<dyn PayloadStore>,
        site: SiteKey,
        strategy: ImportStrategy,
        layout: SiteLayout,
    ) -> Self {
        Self {
            base: TaskBase::new(store, site, strategy),
            layout,
        }
    }
}

impl ImportTask for LayoutImportTask {
    fn scope(&self) -> String {
        self.base.site.to_string()
    }

    fn kind(&self) -> &str {
        PayloadKind::Layout.as_str()
    }

    fn import(&mut self) -> Result<()> {
        let base = &mut self.base;
        let store = base.store.clone();
        let existing = store.load_layout(&base.site)?;

        match (base.strategy, existing) {
            (_, None) => {
                base.undo.record(Undo::RemoveLayout);
                store.save_layout(&base.site, &self.layout)?;
                base.changes.created += 1;
            }
            (ImportStrategy::Conserve, Some(_)) => base.changes.unchanged += 1,
            (ImportStrategy::Merge, Some(old)) => {
                if old == self.layout {
                    base.changes.unchanged += 1;
                } else {
                    base.undo.record(Undo::RestoreLayout(old));
                    store.save_layout(&base.site, &self.layout)?;
                    base.changes.updated += 1;
                }
            }
            (ImportStrategy::Overwrite, Some(old)) => {
                base.undo.record(Undo::RestoreLayout(old));
                store.remove_layout(&base.site)?;
                base.changes.deleted += 1;
                store.save_layout(&base.site, &self.layout)?;
                base.changes.created += 1;
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.base.rollback(PayloadKind::Layout)
    }

    fn changes(&self) -> ChangeCounts {
        self.base.changes
    }
}

/// Imports `pages.json`; pages match by name
pub struct PagesImportTask {
    base: TaskBase,
    pages: PageSet,
}

impl PagesImportTask {
    pub fn new(store: Arc<dyn PayloadStore>, site: SiteKey, strategy: ImportStrategy, pages: PageSet) -> Self {
        Self {
            base: TaskBase::new(store, site, strategy),
            pages,
        }
    }
}

impl ImportTask for PagesImportTask {
    fn scope(&self) -> String {
        self.base.site.to_string()
    }

    fn kind(&self) -> &str {
        PayloadKind::Pages.as_str()
    }

    fn import(&mut self) -> Result<()> {
        let base = &mut self.base;
        let store = base.store.clone();
        let existing: BTreeMap<String, Page> = store
            .find_pages(&base.site)?
            .into_iter()
            .map(|page| (page.name.clone(), page))
            .collect();

        if base.strategy == ImportStrategy::Overwrite {
            for old in existing.values() {
                base.undo.record(Undo::RestorePage(old.clone()));
                store.remove_page(&base.site, &old.name)?;
                base.changes.deleted += 1;
            }
        }

        for page in &self.pages.pages {
            match (base.strategy, existing.get(&page.name)) {
                (ImportStrategy::Overwrite, previous) => {
                    // a replaced page comes back through its RestorePage
                    if previous.is_none() {
                        base.undo.record(Undo::RemovePage(page.name.clone()));
                    }
                    store.save_page(&base.site, page)?;
                    base.changes.created += 1;
                }
                (_, None) => {
                    base.undo.record(Undo::RemovePage(page.name.clone()));
                    store.save_page(&base.site, page)?;
                    base.changes.created += 1;
                }
                (ImportStrategy::Conserve, Some(_)) => base.changes.unchanged += 1,
                (ImportStrategy::Merge, Some(old)) => {
                    if old == page {
                        base.changes.unchanged += 1;
                    } else {
                        base.undo.record(Undo::RestorePage(old.clone()));
                        store.save_page(&base.site, page)?;
                        base.changes.updated += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.base.rollback(PayloadKind::Pages)
    }

    fn changes(&self) -> ChangeCounts {
        self.base.changes
    }
}

/// Imports `navigation.json`
///
/// CONSERVE adds missing nodes only, MERGE also updates matched nodes,
/// OVERWRITE replaces the whole tree. Nodes match by name among siblings.
pub struct NavigationImportTask {
    base: TaskBase,
    navigation: Navigation,
}

impl NavigationImportTask {
    pub fn new(
        store: Arc<dyn PayloadStore>,
        site: SiteKey,
        strategy: ImportStrategy,
        navigation: Navigation,
    ) -> Self {
        Self {
            base: TaskBase::new(store, site, strategy),
            navigation,
        }
    }
}

impl ImportTask for NavigationImportTask {
    fn scope(&self) -> String {
        self.base.site.to_string()
    }

    fn kind(&self) -> &str {
        PayloadKind::Navigation.as_str()
    }

    fn import(&mut self) -> Result<()> {
        let base = &mut self.base;
        let store = base.store.clone();
        let Some(old) = store.load_navigation(&base.site)? else {
            base.undo.record(Undo::RemoveNavigation);
            store.save_navigation(&base.site, &self.navigation)?;
            base.changes.created += self.navigation.node_count();
            return Ok(());
        };

        if base.strategy == ImportStrategy::Overwrite {
            base.undo.record(Undo::RestoreNavigation(old.clone()));
            store.remove_navigation(&base.site)?;
            base.changes.deleted += old.node_count();
            store.save_navigation(&base.site, &self.navigation)?;
            base.changes.created += self.navigation.node_count();
            return Ok(());
        }

        let mut merged = old.clone();
        let (added, updated) = merged.merge_from(&self.navigation, base.strategy == ImportStrategy::Merge);
        if merged == old {
            base.changes.unchanged += 1;
            return Ok(());
        }
        base.undo.record(Undo::RestoreNavigation(old));
        store.save_navigation(&base.site, &merged)?;
        base.changes.created += added;
        base.changes.updated += updated;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.base.rollback(PayloadKind::Navigation)
    }

    fn changes(&self) -> ChangeCounts {
        self.base.changes
    }
}
