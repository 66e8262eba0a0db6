//! Payload persistence
//!
//! A site exists while it has a layout. Removal of something absent is not
//! an error, so rollback can replay removals safely.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_core::errors::{ArborError, Result};

use crate::model::{Navigation, Page, SiteKey, SiteLayout, SiteType};

/// Storage for site payloads, shared by handlers and import tasks
pub trait PayloadStore: Send + Sync {
    /// Sites of one type, ordered by name
    fn find_sites(&self, site_type: SiteType) -> Result<Vec<SiteKey>>;

    fn site_exists(&self, site: &SiteKey) -> Result<bool> {
        Ok(self.load_layout(site)?.is_some())
    }

    fn load_layout(&self, site: &SiteKey) -> Result<Option<SiteLayout>>;

    fn save_layout(&self, site: &SiteKey, layout: &SiteLayout) -> Result<()>;

    fn remove_layout(&self, site: &SiteKey) -> Result<()>;

    /// Pages of a site, ordered by name
    fn find_pages(&self, site: &SiteKey) -> Result<Vec<Page>>;

    fn load_page(&self, site: &SiteKey, name: &str) -> Result<Option<Page>>;

    fn save_page(&self, site: &SiteKey, page: &Page) -> Result<()>;

    fn remove_page(&self, site: &SiteKey, name: &str) -> Result<()>;

    fn load_navigation(&self, site: &SiteKey) -> Result<Option<Navigation>>;

    fn save_navigation(&self, site: &SiteKey, navigation: &Navigation) -> Result<()>;

    fn remove_navigation(&self, site: &SiteKey) -> Result<()>;
}

#[derive(Debug, Default)]
struct StoreState {
    layouts: BTreeMap<SiteKey, SiteLayout>,
    pages: BTreeMap<SiteKey, BTreeMap<String, Page>>,
    navigations: BTreeMap<SiteKey, Navigation>,
}

/// Process-local [`PayloadStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| poisoned(operation))
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| poisoned(operation))
    }
}

fn poisoned(operation: &str) -> ArborError {
    ArborError::Persistence {
        operation: operation.to_string(),
        message: "store lock poisoned".to_string(),
    }
}

impl PayloadStore for InMemoryStore {
    fn find_sites(&self, site_type: SiteType) -> Result<Vec<SiteKey>> {
        let state = self.read("find_sites")?;
        Ok(state
            .layouts
            .keys()
            .filter(|key| key.site_type() == site_type)
            .cloned()
            .collect())
    }

    fn load_layout(&self, site: &SiteKey) -> Result<Option<SiteLayout>> {
        Ok(self.read("load_layout")?.layouts.get(site).cloned())
    }

    fn save_layout(&self, site: &SiteKey, layout: &SiteLayout) -> Result<()> {
        self.write("save_layout")?
            .layouts
            .insert(site.clone(), layout.clone());
        Ok(())
    }

    fn remove_layout(&self, site: &SiteKey) -> Result<()> {
        self.write("remove_layout")?.layouts.remove(site);
        Ok(())
    }

    fn find_pages(&self, site: &SiteKey) -> Result<Vec<Page>> {
        let state = self.read("find_pages")?;
        Ok(state
            .pages
            .get(site)
            .map(|pages| pages.values().cloned().collect())
            .unwrap_or_default())
    }

    fn load_page(&self, site: &SiteKey, name: &str) -> Result<Option<Page>> {
        let state = self.read("load_page")?;
        Ok(state.pages.get(site).and_then(|pages| pages.get(name)).cloned())
    }

    fn save_page(&self, site: &SiteKey, page: &Page) -> Result<()> {
        self.write("save_page")?
            .pages
            .entry(site.clone())
            .or_default()
            .insert(page.name.clone(), page.clone());
        Ok(())
    }

    fn remove_page(&self, site: &SiteKey, name: &str) -> Result<()> {
        let mut state = self.write("remove_page")?;
        if let Some(pages) = state.pages.get_mut(site) {
            pages.remove(name);
            if pages.is_empty() {
                state.pages.remove(site);
            }
        }
        Ok(())
    }

    fn load_navigation(&self, site: &SiteKey) -> Result<Option<Navigation>> {
        Ok(self.read("load_navigation")?.navigations.get(site).cloned())
    }

    fn save_navigation(&self, site: &SiteKey, navigation: &Navigation) -> Result<()> {
        self.write("save_navigation")?
            .navigations
            .insert(site.clone(), navigation.clone());
        Ok(())
    }

    fn remove_navigation(&self, site: &SiteKey) -> Result<()> {
        self.write("remove_navigation")?.navigations.remove(site);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> SiteKey {
        SiteKey::portal("classic").unwrap()
    }

    #[test]
    fn test_site_exists_follows_layout() {
        let store = InMemoryStore::new();
        assert!(!store.site_exists(&classic()).unwrap());

        store.save_layout(&classic(), &SiteLayout::new("Classic")).unwrap();
        assert!(store.site_exists(&classic()).unwrap());
        assert_eq!(store.find_sites(SiteType::Portal).unwrap(), vec![classic()]);
        assert!(store.find_sites(SiteType::Group).unwrap().is_empty());
    }

    #[test]
    fn test_pages_sorted_by_name() {
        let store = InMemoryStore::new();
        store.save_page(&classic(), &Page::new("news", "News")).unwrap();
        store.save_page(&classic(), &Page::new("home", "Home")).unwrap();

        let names: Vec<String> = store
            .find_pages(&classic())
            .unwrap()
            .into_iter()
            .map(|page| page.name)
            .collect();
        assert_eq!(names, vec!["home", "news"]);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let store = InMemoryStore::new();
        store.remove_page(&classic(), "missing").unwrap();
        store.remove_layout(&classic()).unwrap();
        store.remove_navigation(&classic()).unwrap();

        store.save_page(&classic(), &Page::new("home", "Home")).unwrap();
        store.remove_page(&classic(), "home").unwrap();
        store.remove_page(&classic(), "home").unwrap();
        assert!(store.find_pages(&classic()).unwrap().is_empty());
    }
}
