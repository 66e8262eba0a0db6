//! Hierarchical addresses of managed resources
//!
//! A `PathAddress` is an immutable, ordered list of path segments. Parsing
//! is total: leading, trailing and doubled separators are dropped, so
//! `"/a/b/c"`, `"a/b/c/"` and `"a//b/c"` all denote the same address.
//!
//! Segments written as `{name}` are template placeholders. Their runtime
//! values live in a separate [`ResolutionContext`](crate::template::ResolutionContext)
//! that is passed alongside the address, never inside it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::filter::PathTemplateFilter;
use crate::template::ResolutionContext;

/// Separator between address segments
pub const SEPARATOR: char = '/';

/// Immutable sequence of address segments
///
/// Equality and hashing are defined by the segments only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathAddress {
    segments: Vec<String>,
}

impl PathAddress {
    /// The root (empty) address
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a raw path. Never fails; empty segments are dropped.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: split_segments(raw).collect(),
        }
    }

    /// Build an address from several raw parts, each of which may itself
    /// contain separators (`["a/b", "c"]` equals `"/a/b/c"`).
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = parts
            .into_iter()
            .flat_map(|part| split_segments(part.as_ref()).collect::<Vec<_>>())
            .collect();
        Self { segments }
    }

    /// Return a new address with `raw` parsed and appended
    pub fn append(&self, raw: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(split_segments(raw));
        Self { segments }
    }

    /// Return a new address with a single segment appended.
    ///
    /// Separators inside `segment` are split like [`PathAddress::append`],
    /// which keeps the no-separator invariant.
    pub fn append_segment(&self, segment: impl AsRef<str>) -> Self {
        self.append(segment.as_ref())
    }

    /// Address over `segments[from..]`, or `None` when out of bounds
    pub fn sub_address(&self, from: usize) -> Option<Self> {
        self.sub_address_range(from, self.segments.len())
    }

    /// Address over `segments[from..to]`, or `None` when out of bounds
    pub fn sub_address_range(&self, from: usize, to: usize) -> Option<Self> {
        self.segments.get(from..to).map(|slice| Self {
            segments: slice.to_vec(),
        })
    }

    /// The enclosing address, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        self.sub_address_range(0, self.segments.len() - 1)
    }

    /// Last segment, `None` for the root
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Replace every `{name}` segment that `resolution` can answer with its value
    pub fn resolve_templates(&self, resolution: &ResolutionContext) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|segment| {
                template_name(segment)
                    .and_then(|name| resolution.resolve(name))
                    .unwrap_or_else(|| segment.clone())
            })
            .collect();
        Self { segments }
    }

    /// Whether the template values bound in `resolution` pass `filter`
    pub fn accepts(&self, filter: &PathTemplateFilter, resolution: &ResolutionContext) -> bool {
        filter.accepts(resolution)
    }
}

/// Whether `segment` is a `{name}` placeholder
pub fn is_template_segment(segment: &str) -> bool {
    template_name(segment).is_some()
}

/// Name inside a `{name}` placeholder
pub fn template_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

fn split_segments(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", SEPARATOR);
        }
        for segment in &self.segments {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for PathAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PathAddress {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for PathAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_forms_are_equal() {
        let expected = PathAddress::parse("a/b/c");
        for raw in ["/a/b/c", "a/b/c/", "/a/b/c/", "a//b/c", "//a/b//c//"] {
            assert_eq!(PathAddress::parse(raw), expected, "raw form {raw}");
        }
        assert_eq!(expected.to_string(), "/a/b/c");
    }

    #[test]
    fn test_from_parts_splits_each_part() {
        let address = PathAddress::from_parts(["a/b", "c"]);
        assert_eq!(address, PathAddress::parse("/a/b/c"));
        assert_eq!(address.len(), 3);
    }

    #[test]
    fn test_root_display() {
        assert_eq!(PathAddress::root().to_string(), "/");
        assert_eq!(PathAddress::parse("///"), PathAddress::root());
        assert!(PathAddress::parse("").is_empty());
    }

    #[test]
    fn test_append_does_not_mutate_original() {
        let base = PathAddress::parse("/a");
        let longer = base.append("b/c");
        assert_eq!(base.to_string(), "/a");
        assert_eq!(longer.to_string(), "/a/b/c");
        assert_eq!(base.append_segment("x").last_segment(), Some("x"));
    }

    #[test]
    fn test_sub_address() {
        let address = PathAddress::parse("/a/b/c/d");
        assert_eq!(address.sub_address(2), Some(PathAddress::parse("c/d")));
        assert_eq!(address.sub_address_range(1, 3), Some(PathAddress::parse("b/c")));
        assert_eq!(address.sub_address(4), Some(PathAddress::root()));
        assert_eq!(address.sub_address(5), None);
        assert_eq!(address.sub_address_range(3, 2), None);
    }

    #[test]
    fn test_parent_and_last_segment() {
        let address = PathAddress::parse("/a/b");
        assert_eq!(address.parent(), Some(PathAddress::parse("/a")));
        assert_eq!(address.last_segment(), Some("b"));
        assert_eq!(PathAddress::root().parent(), None);
        assert_eq!(PathAddress::root().last_segment(), None);
    }

    #[test]
    fn test_clone_is_value_equal() {
        let original = PathAddress::parse("/x/y");
        let copy = original.clone();
        assert_eq!(original, copy);
        assert!(!std::ptr::eq(&original, &copy));
    }

    #[test]
    fn test_template_segments() {
        assert!(is_template_segment("{page-name}"));
        assert_eq!(template_name("{page-name}"), Some("page-name"));
        assert!(!is_template_segment("page-name"));
        assert!(!is_template_segment("{}"));
        assert!(!is_template_segment("{open"));
    }

    #[test]
    fn test_resolve_templates() {
        let mut resolution = ResolutionContext::new();
        resolution.bind("site-name", "classic");
        let address = PathAddress::parse("/content/portal/{site-name}/pages/{page-name}");
        assert_eq!(
            address.resolve_templates(&resolution).to_string(),
            "/content/portal/classic/pages/{page-name}"
        );
    }

    #[test]
    fn test_serde_uses_display_form() {
        let address = PathAddress::parse("a/b");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: PathAddress = serde_json::from_str("\"a/b/\"").unwrap();
        assert_eq!(back, address);
    }
}
