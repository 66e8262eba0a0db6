use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arbor_content::model::{Navigation, NavigationNode, Page, SiteKey, SiteLayout, SiteType};
use arbor_content::store::{InMemoryStore, PayloadStore};
use arbor_content::content_controller;
use arbor_core::archive::Archive;
use arbor_core::errors::{ArborError, Result};
use arbor_core::settings::Settings;
use arbor_core::ManagementController;

#[allow(dead_code)]
pub fn classic() -> SiteKey {
    SiteKey::portal("classic").unwrap()
}

#[allow(dead_code)]
pub fn intranet() -> SiteKey {
    SiteKey::portal("intranet").unwrap()
}

/// classic: layout, pages home and news, navigation home
/// intranet: layout and page home
#[allow(dead_code)]
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.save_layout(&classic(), &SiteLayout::new("Classic")).unwrap();
    store.save_page(&classic(), &Page::new("home", "Home")).unwrap();
    store.save_page(&classic(), &Page::new("news", "News")).unwrap();
    store
        .save_navigation(
            &classic(),
            &Navigation::new(vec![NavigationNode::new("home").with_label("Home").with_page("home")]),
        )
        .unwrap();
    store.save_layout(&intranet(), &SiteLayout::new("Intranet")).unwrap();
    store.save_page(&intranet(), &Page::new("home", "Intranet Home")).unwrap();
    store
}

#[allow(dead_code)]
pub fn controller(store: Arc<dyn PayloadStore>) -> ManagementController {
    content_controller(store, &Settings::default()).unwrap()
}

#[allow(dead_code)]
pub fn layout_title(store: &dyn PayloadStore, site: &SiteKey) -> Option<String> {
    store.load_layout(site).unwrap().map(|layout| layout.title)
}

#[allow(dead_code)]
pub fn page_titles(store: &dyn PayloadStore, site: &SiteKey) -> Vec<(String, String)> {
    store
        .find_pages(site)
        .unwrap()
        .into_iter()
        .map(|page| (page.name, page.title))
        .collect()
}

/// Archive with JSON payload files for `portal/classic`
#[allow(dead_code)]
pub fn classic_archive(files: &[(&str, &str)]) -> Archive {
    let mut archive = Archive::new();
    for (file, json) in files {
        archive.add_file(&classic().entry_path(file), *json).unwrap();
    }
    archive
}

/// A store that fails chosen operations and delegates the rest
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    /// operation -> calls that still succeed before it starts failing
    failing: Mutex<HashMap<&'static str, usize>>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashMap::new()),
        }
    }

    /// Every call to `operation` fails
    pub fn fail_on(self, operation: &'static str) -> Self {
        self.fail_after(operation, 0)
    }

    /// The first `successes` calls to `operation` go through, later ones fail
    pub fn fail_after(self, operation: &'static str, successes: usize) -> Self {
        self.failing.lock().unwrap().insert(operation, successes);
        self
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let mut failing = self.failing.lock().unwrap();
        match failing.get_mut(operation) {
            Some(0) => Err(ArborError::Persistence {
                operation: operation.to_string(),
                message: "injected failure".to_string(),
            }),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl PayloadStore for FaultyStore {
    fn find_sites(&self, site_type: SiteType) -> Result<Vec<SiteKey>> {
        self.check("find_sites")?;
        self.inner.find_sites(site_type)
    }

    fn load_layout(&self, site: &SiteKey) -> Result<Option<SiteLayout>> {
        self.check("load_layout")?;
        self.inner.load_layout(site)
    }

    fn save_layout(&self, site: &SiteKey, layout: &SiteLayout) -> Result<()> {
        self.check("save_layout")?;
        self.inner.save_layout(site, layout)
    }

    fn remove_layout(&self, site: &SiteKey) -> Result<()> {
        self.check("remove_layout")?;
        self.inner.remove_layout(site)
    }

    fn find_pages(&self, site: &SiteKey) -> Result<Vec<Page>> {
        self.check("find_pages")?;
        self.inner.find_pages(site)
    }

    fn load_page(&self, site: &SiteKey, name: &str) -> Result<Option<Page>> {
        self.check("load_page")?;
        self.inner.load_page(site, name)
    }

    fn save_page(&self, site: &SiteKey, page: &Page) -> Result<()> {
        self.check("save_page")?;
        self.inner.save_page(site, page)
    }

    fn remove_page(&self, site: &SiteKey, name: &str) -> Result<()> {
        self.check("remove_page")?;
        self.inner.remove_page(site, name)
    }

    fn load_navigation(&self, site: &SiteKey) -> Result<Option<Navigation>> {
        self.check("load_navigation")?;
        self.inner.load_navigation(site)
    }

    fn save_navigation(&self, site: &SiteKey, navigation: &Navigation) -> Result<()> {
        self.check("save_navigation")?;
        self.inner.save_navigation(site, navigation)
    }

    fn remove_navigation(&self, site: &SiteKey) -> Result<()> {
        self.check("remove_navigation")?;
        self.inner.remove_navigation(site)
    }
}
