//! TOML settings
//!
//! ```toml
//! [logging]
//! profile = "production"
//! filter = "arbor=info"
//!
//! [import]
//! default_strategy = "merge"
//!
//! [export]
//! content_type = "bundle"
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ArborError, Result};
use crate::import::ImportStrategy;
use crate::logging_facility::{self, Profile};
use crate::marshal::ContentType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub import: ImportSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub profile: Profile,
    /// EnvFilter directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    /// Used when a request carries no `import-strategy` attribute
    pub default_strategy: ImportStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub content_type: ContentType,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            content_type: ContentType::Bundle,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ArborError::parse("settings", e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ArborError::Serialization(e.to_string()))
    }

    /// Initialize the logging facility from the `[logging]` section
    pub fn init_logging(&self) {
        logging_facility::init_with_filter(self.logging.profile, self.logging.filter.as_deref());
    }
}
