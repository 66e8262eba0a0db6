use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use arbor_core::errors::{ArborError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of owner a site belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Portal,
    Group,
    User,
}

impl SiteType {
    pub const ALL: [SiteType; 3] = [SiteType::Portal, SiteType::Group, SiteType::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Portal => "portal",
            SiteType::Group => "group",
            SiteType::User => "user",
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteType {
    type Err = ArborError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "portal" => Ok(SiteType::Portal),
            "group" => Ok(SiteType::Group),
            "user" => Ok(SiteType::User),
            other => Err(ArborError::parse(other, "unknown site type")),
        }
    }
}

/// Logical identity of a site: owner type plus owner id
///
/// The archive directory of a site is `<type>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteKey {
    site_type: SiteType,
    name: String,
}

impl SiteKey {
    /// # Errors
    ///
    /// `Parse` when `name` is empty or contains a `/`.
    pub fn new(site_type: SiteType, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(ArborError::parse(name, "site name must be a single non-empty segment"));
        }
        Ok(Self { site_type, name })
    }

    pub fn portal(name: impl Into<String>) -> Result<Self> {
        Self::new(SiteType::Portal, name)
    }

    pub fn site_type(&self) -> SiteType {
        self.site_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archive_dir(&self) -> String {
        format!("{}/{}", self.site_type, self.name)
    }

    /// Archive entry path of a file belonging to this site
    pub fn entry_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.archive_dir(), file_name)
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site_type, self.name)
    }
}

/// Site-wide layout and settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLayout {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<String>,

    /// Free-form layout properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_locale() -> String {
    "en".to_string()
}

impl SiteLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            locale: default_locale(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
