//! Archive staging: parse every entry before anything is changed

use std::collections::{BTreeMap, BTreeSet};

use arbor_core::archive::{Archive, ArchiveEntry};
use arbor_core::errors::{ArborError, Result};
use arbor_core::marshal::{ContentType, MarshallerRegistry};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::model::{Navigation, PageSet, PayloadKind, SiteKey, SiteLayout, SiteType};

/// Payloads found for one site, at most one per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedSite {
    pub layout: Option<SiteLayout>,
    pub pages: Option<PageSet>,
    pub navigation: Option<Navigation>,
}

impl StagedSite {
    fn has(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Layout => self.layout.is_some(),
            PayloadKind::Pages => self.pages.is_some(),
            PayloadKind::Navigation => self.navigation.is_some(),
        }
    }
}

/// Parsed archive, keyed by site in commit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedImport {
    sites: BTreeMap<SiteKey, StagedSite>,
}

impl StagedImport {
    /// Read every archive entry once
    ///
    /// Directory entries are skipped and unknown file names are ignored.
    ///
    /// # Errors
    ///
    /// `Parse` for a malformed entry path, an unknown site type, unreadable
    /// payload JSON, duplicate page names, or a second file of the same kind
    /// for one site. `MarshallerNotFound` when the payload types have no JSON
    /// marshaller.
    pub fn from_archive(archive: &Archive, marshallers: &MarshallerRegistry) -> Result<Self> {
        let mut staged = Self::default();
        for entry in archive.files() {
            let Some(kind) = PayloadKind::from_file_name(entry.file_name()) else {
                warn!(path = entry.path(), "ignoring unknown archive entry");
                continue;
            };
            let site = site_key(entry)?;
            let slot = staged.sites.entry(site.clone()).or_default();
            if slot.has(kind) {
                return Err(ArborError::parse(
                    entry.path(),
                    format!("second {} payload for site {}", kind, site),
                ));
            }

            let data = entry.data().unwrap_or_default();
            match kind {
                PayloadKind::Layout => slot.layout = Some(unmarshal(marshallers, entry, data)?),
                PayloadKind::Pages => {
                    let pages: PageSet = unmarshal(marshallers, entry, data)?;
                    check_unique_pages(entry, &pages)?;
                    slot.pages = Some(pages);
                }
                PayloadKind::Navigation => {
                    slot.navigation = Some(unmarshal(marshallers, entry, data)?)
                }
            }
            debug!(site = %site, payload_kind = %kind, "staged payload");
        }
        Ok(staged)
    }

    pub fn sites(&self) -> impl Iterator<Item = (&SiteKey, &StagedSite)> {
        self.sites.iter()
    }

    pub fn site(&self, key: &SiteKey) -> Option<&StagedSite> {
        self.sites.get(key)
    }

    pub fn into_sites(self) -> BTreeMap<SiteKey, StagedSite> {
        self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// `<type>/<name>/<file>`
fn site_key(entry: &ArchiveEntry) -> Result<SiteKey> {
    match entry.parent_segments().as_slice() {
        [site_type, name] => {
            let site_type: SiteType = site_type
                .parse()
                .map_err(|_| ArborError::parse(entry.path(), format!("unknown site type '{}'", site_type)))?;
            SiteKey::new(site_type, *name)
        }
        _ => Err(ArborError::parse(
            entry.path(),
            "expected <site-type>/<site-name>/<file>",
        )),
    }
}

fn unmarshal<T: DeserializeOwned + 'static>(
    marshallers: &MarshallerRegistry,
    entry: &ArchiveEntry,
    mut data: &[u8],
) -> Result<T> {
    marshallers
        .unmarshal::<T>(ContentType::Json, &mut data)
        .map_err(|e| match e {
            ArborError::Parse { reason, .. } => ArborError::parse(entry.path(), reason),
            other => other,
        })
}

fn check_unique_pages(entry: &ArchiveEntry, pages: &PageSet) -> Result<()> {
    let mut seen = BTreeSet::new();
    for page in &pages.pages {
        if !seen.insert(page.name.as_str()) {
            return Err(ArborError::parse(
                entry.path(),
                format!("page '{}' listed twice", page.name),
            ));
        }
    }
    Ok(())
}
