use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a page or navigation node is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Displayed,
    Hidden,
    /// Shown only inside its publication window
    Temporal,
    /// Reserved for administration pages
    System,
}

/// One page of a site, identified by name within the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub name: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_permission: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Page {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: None,
            visibility: Visibility::default(),
            access_permissions: Vec::new(),
            edit_permission: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_access(mut self, permission: impl Into<String>) -> Self {
        self.access_permissions.push(permission.into());
        self
    }
}

/// The page collection of one site, as stored in `pages.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSet {
    pub pages: Vec<Page>,
}

impl PageSet {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn get(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.pages.iter().map(|page| page.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
