//! Content types and the marshaller registry

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::errors::{ArborError, Result};
use crate::model::{ExportResourceModel, ReadResourceModel};

/// Wire representation of a result or attachment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Json,
    /// Archive bundle, see [`crate::archive`]
    Bundle,
}

impl ContentType {
    pub const JSON_MIME: &'static str = "application/json";
    pub const BUNDLE_MIME: &'static str = "application/vnd.arbor.bundle+json";

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => Self::JSON_MIME,
            ContentType::Bundle => Self::BUNDLE_MIME,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Bundle => "bundle",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ContentType {
    type Err = ArborError;

    /// Accepts MIME strings (parameters after `;` ignored) and short names
    fn from_str(s: &str) -> Result<Self> {
        let essence = s.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            Self::JSON_MIME | "json" => Ok(ContentType::Json),
            Self::BUNDLE_MIME | "bundle" => Ok(ContentType::Bundle),
            _ => Err(ArborError::UnsupportedContentType {
                content_type: s.to_string(),
            }),
        }
    }
}

/// Converts one type to and from a content type
pub trait Marshaller<T>: Send + Sync {
    fn marshal(&self, value: &T, out: &mut dyn Write) -> Result<()>;

    fn unmarshal(&self, input: &mut dyn Read) -> Result<T>;
}

/// serde_json marshaller for any serde type
pub struct JsonMarshaller<T> {
    pretty: bool,
    _type: PhantomData<fn() -> T>,
}

impl<T> JsonMarshaller<T> {
    pub fn new() -> Self {
        Self {
            pretty: false,
            _type: PhantomData,
        }
    }

    pub fn pretty() -> Self {
        Self {
            pretty: true,
            _type: PhantomData,
        }
    }
}

impl<T> Default for JsonMarshaller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Marshaller<T> for JsonMarshaller<T>
where
    T: Serialize + DeserializeOwned,
{
    fn marshal(&self, value: &T, out: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(out, value)?;
        } else {
            serde_json::to_writer(out, value)?;
        }
        Ok(())
    }

    fn unmarshal(&self, input: &mut dyn Read) -> Result<T> {
        serde_json::from_reader(input).map_err(|e| ArborError::parse(type_name::<T>(), e.to_string()))
    }
}

/// Bundle codec for [`Archive`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveMarshaller;

impl Marshaller<Archive> for ArchiveMarshaller {
    fn marshal(&self, value: &Archive, out: &mut dyn Write) -> Result<()> {
        value.encode(out)
    }

    fn unmarshal(&self, input: &mut dyn Read) -> Result<Archive> {
        Archive::decode(input)
    }
}

/// Writes export tasks as a bundle; reading yields in-memory tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportBundleMarshaller;

impl Marshaller<ExportResourceModel> for ExportBundleMarshaller {
    fn marshal(&self, value: &ExportResourceModel, out: &mut dyn Write) -> Result<()> {
        Archive::from_tasks(value.tasks())?.encode(out)
    }

    fn unmarshal(&self, input: &mut dyn Read) -> Result<ExportResourceModel> {
        Ok(Archive::decode(input)?.into_export_model())
    }
}

/// Marshallers keyed by (type, content type)
#[derive(Default)]
pub struct MarshallerRegistry {
    marshallers: HashMap<(TypeId, ContentType), Box<dyn Any + Send + Sync>>,
}

impl MarshallerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON for resource descriptions and free-form values, bundle for
    /// exports and archives
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<ReadResourceModel>(ContentType::Json, JsonMarshaller::new());
        registry.register::<serde_json::Value>(ContentType::Json, JsonMarshaller::new());
        registry.register::<ExportResourceModel>(ContentType::Bundle, ExportBundleMarshaller);
        registry.register::<Archive>(ContentType::Bundle, ArchiveMarshaller);
        registry
    }

    pub fn register<T: 'static>(
        &mut self,
        content_type: ContentType,
        marshaller: impl Marshaller<T> + 'static,
    ) {
        let marshaller: Arc<dyn Marshaller<T>> = Arc::new(marshaller);
        self.marshallers
            .insert((TypeId::of::<T>(), content_type), Box::new(marshaller));
    }

    pub fn get<T: 'static>(&self, content_type: ContentType) -> Option<Arc<dyn Marshaller<T>>> {
        self.marshallers
            .get(&(TypeId::of::<T>(), content_type))
            .and_then(|entry| entry.downcast_ref::<Arc<dyn Marshaller<T>>>())
            .cloned()
    }

    pub fn supports<T: 'static>(&self, content_type: ContentType) -> bool {
        self.marshallers
            .contains_key(&(TypeId::of::<T>(), content_type))
    }

    pub fn marshal<T: 'static>(
        &self,
        value: &T,
        content_type: ContentType,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.require::<T>(content_type)?.marshal(value, out)
    }

    pub fn unmarshal<T: 'static>(&self, content_type: ContentType, input: &mut dyn Read) -> Result<T> {
        self.require::<T>(content_type)?.unmarshal(input)
    }

    fn require<T: 'static>(&self, content_type: ContentType) -> Result<Arc<dyn Marshaller<T>>> {
        self.get::<T>(content_type)
            .ok_or_else(|| ArborError::MarshallerNotFound {
                type_name: type_name::<T>().to_string(),
                content_type: content_type.to_string(),
            })
    }
}

impl fmt::Debug for MarshallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshallerRegistry")
            .field("marshallers", &self.marshallers.len())
            .finish()
    }
}
