//! Content payloads: site layouts, page collections and navigation trees

use std::fmt;

pub mod navigation;
pub mod page;
pub mod site;

pub use navigation::{Navigation, NavigationNode};
pub use page::{Page, PageSet, Visibility};
pub use site::{SiteKey, SiteLayout, SiteType};

/// The three payloads a site is made of, in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadKind {
    Layout,
    Pages,
    Navigation,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [PayloadKind::Layout, PayloadKind::Pages, PayloadKind::Navigation];

    /// Archive file name within the site directory
    pub fn file_name(&self) -> &'static str {
        match self {
            PayloadKind::Layout => "site.json",
            PayloadKind::Pages => "pages.json",
            PayloadKind::Navigation => "navigation.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Layout => "layout",
            PayloadKind::Pages => "pages",
            PayloadKind::Navigation => "navigation",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
