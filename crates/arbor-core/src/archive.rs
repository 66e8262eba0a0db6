//! Archive bundles for export and import
//!
//! An archive is an ordered list of directory and file entries. The bundle
//! form is a JSON document:
//!
//! ```text
//! {
//!   "format": "arbor-bundle/1",
//!   "entries": [
//!     { "type": "directory", "path": "portal/classic" },
//!     { "type": "file", "path": "portal/classic/site.json",
//!       "sha256": "<hex digest>", "data": "<base64>" }
//!   ]
//! }
//! ```
//!
//! File digests are checked on decode.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{ArborError, Result};
use crate::model::{BytesExportTask, ExportResourceModel, ExportTask};

/// Format marker written into every bundle
pub const BUNDLE_FORMAT: &str = "arbor-bundle/1";

/// Payload of an archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    path: String,
    kind: EntryKind,
}

impl ArchiveEntry {
    /// `/`-separated, no leading or trailing slash
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// File contents; `None` for directories
    pub fn data(&self) -> Option<&[u8]> {
        match &self.kind {
            EntryKind::File(data) => Some(data),
            EntryKind::Directory => None,
        }
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Path segments before the file name
    pub fn parent_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.path.split('/').collect();
        segments.pop();
        segments
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    directories: BTreeSet<String>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every export task into a file entry, in task order
    pub fn from_tasks(tasks: &[Arc<dyn ExportTask>]) -> Result<Self> {
        let mut archive = Self::new();
        for task in tasks {
            let mut data = Vec::new();
            task.export(&mut data)?;
            archive.add_file(&task.entry_path(), data)?;
        }
        Ok(archive)
    }

    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize_entry_path(path)?;
        self.ensure_directory(&path);
        Ok(())
    }

    /// Add a file, emitting each missing parent directory entry first
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = normalize_entry_path(path)?;
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.ensure_directory(parent);
        }
        self.entries.push(ArchiveEntry {
            path,
            kind: EntryKind::File(data.into()),
        });
        Ok(())
    }

    fn ensure_directory(&mut self, path: &str) {
        let mut prefix = String::new();
        for segment in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if self.directories.insert(prefix.clone()) {
                self.entries.push(ArchiveEntry {
                    path: prefix.clone(),
                    kind: EntryKind::Directory,
                });
            }
        }
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(|entry| !entry.is_directory())
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files()
            .find(|entry| entry.path == path)
            .and_then(ArchiveEntry::data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File entries as in-memory export tasks
    pub fn into_export_model(self) -> ExportResourceModel {
        let tasks: Vec<Arc<dyn ExportTask>> = self
            .entries
            .into_iter()
            .filter_map(|entry| match entry.kind {
                EntryKind::File(data) => {
                    Some(Arc::new(BytesExportTask::new(entry.path, data)) as Arc<dyn ExportTask>)
                }
                EntryKind::Directory => None,
            })
            .collect();
        ExportResourceModel::new(tasks)
    }

    pub fn encode(&self, out: &mut dyn Write) -> Result<()> {
        let document = BundleDocument {
            format: BUNDLE_FORMAT.to_string(),
            entries: self.entries.iter().map(BundleEntry::from).collect(),
        };
        serde_json::to_writer(out, &document)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Parse a bundle, verifying format marker, paths and digests
    pub fn decode(input: &mut dyn Read) -> Result<Self> {
        let document: BundleDocument = serde_json::from_reader(input)
            .map_err(|e| ArborError::parse("bundle", e.to_string()))?;
        if document.format != BUNDLE_FORMAT {
            return Err(ArborError::parse(
                "bundle",
                format!("unsupported format '{}'", document.format),
            ));
        }

        let mut archive = Self::new();
        for entry in document.entries {
            match entry {
                BundleEntry::Directory { path } => archive.add_directory(&path)?,
                BundleEntry::File { path, sha256, data } => {
                    let bytes = STANDARD
                        .decode(data.as_bytes())
                        .map_err(|e| ArborError::parse(path.as_str(), format!("invalid base64: {}", e)))?;
                    let actual = digest(&bytes);
                    if !actual.eq_ignore_ascii_case(&sha256) {
                        return Err(ArborError::parse(
                            path.as_str(),
                            format!("digest mismatch: expected {}, found {}", sha256, actual),
                        ));
                    }
                    archive.add_file(&path, bytes)?;
                }
            }
        }
        Ok(archive)
    }

    /// Mirror the archive below `dir`, creating directories as needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        for entry in &self.entries {
            let target = dir.join(&entry.path);
            match &entry.kind {
                EntryKind::Directory => fs::create_dir_all(&target)?,
                EntryKind::File(data) => {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&target, data)?;
                }
            }
        }
        debug!(dir = %dir.display(), entries = self.entries.len(), "archive written");
        Ok(())
    }

    /// Read every file below `dir`. Entries are sorted by path so the result
    /// does not depend on directory iteration order.
    pub fn read_from_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;
        files.sort();

        let mut archive = Self::new();
        for relative in files {
            let data = fs::read(dir.join(&relative))?;
            archive.add_file(&relative, data)?;
        }
        Ok(archive)
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| ArborError::Io(e.to_string()))?;
            let segments: Vec<String> = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(segments.join("/"));
        }
    }
    Ok(())
}

fn normalize_entry_path(raw: &str) -> Result<String> {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ArborError::parse(raw, "empty archive path"));
    }
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(ArborError::parse(raw, "relative segments are not allowed"));
    }
    Ok(segments.join("/"))
}

fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[derive(Serialize, Deserialize)]
struct BundleDocument {
    format: String,
    entries: Vec<BundleEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum BundleEntry {
    Directory {
        path: String,
    },
    File {
        path: String,
        sha256: String,
        data: String,
    },
}

impl From<&ArchiveEntry> for BundleEntry {
    fn from(entry: &ArchiveEntry) -> Self {
        match &entry.kind {
            EntryKind::Directory => BundleEntry::Directory {
                path: entry.path.clone(),
            },
            EntryKind::File(data) => BundleEntry::File {
                path: entry.path.clone(),
                sha256: digest(data),
                data: STANDARD.encode(data),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_directories_emitted_once() {
        let mut archive = Archive::new();
        archive.add_file("portal/classic/site.json", "{}").unwrap();
        archive.add_file("/portal/classic/pages.json", "[]").unwrap();

        let paths: Vec<&str> = archive.entries().iter().map(ArchiveEntry::path).collect();
        assert_eq!(
            paths,
            vec![
                "portal",
                "portal/classic",
                "portal/classic/site.json",
                "portal/classic/pages.json"
            ]
        );
    }

    #[test]
    fn test_bundle_round_trip() {
        let mut archive = Archive::new();
        archive.add_file("group/team/navigation.json", b"{\"nodes\":[]}".to_vec()).unwrap();

        let bytes = archive.to_bytes().unwrap();
        let decoded = Archive::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, archive);
        assert_eq!(decoded.file("group/team/navigation.json"), Some(&b"{\"nodes\":[]}"[..]));
    }

    #[test]
    fn test_tampered_digest_rejected() {
        let mut archive = Archive::new();
        archive.add_file("a/b.json", "original").unwrap();
        let text = String::from_utf8(archive.to_bytes().unwrap()).unwrap();
        let tampered = text.replace(&STANDARD.encode("original"), &STANDARD.encode("changed!"));

        let result = Archive::decode(&mut tampered.as_bytes());
        assert!(matches!(result, Err(ArborError::Parse { ref reason, .. }) if reason.contains("digest mismatch")));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Archive::decode(&mut r#"{"format":"zip","entries":[]}"#.as_bytes());
        assert!(matches!(result, Err(ArborError::Parse { .. })));
    }

    #[test]
    fn test_relative_segments_rejected() {
        let mut archive = Archive::new();
        assert!(archive.add_file("../etc/passwd", "x").is_err());
        assert!(archive.add_file("", "x").is_err());
    }

    #[test]
    fn test_entry_names() {
        let mut archive = Archive::new();
        archive.add_file("user/jo/pages.json", "[]").unwrap();
        let file = archive.files().next().unwrap();
        assert_eq!(file.file_name(), "pages.json");
        assert_eq!(file.parent_segments(), vec!["user", "jo"]);
    }
}
