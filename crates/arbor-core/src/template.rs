//! Template resolution for address placeholders
//!
//! The registry binds every template slot it walks through during lookup
//! (`{site-name}` → `classic`). Handlers read those values by name through
//! a `ResolutionContext`, regardless of where the slot sits in the address.

use std::fmt;
use std::sync::Arc;

/// Answers the value of a template name, or `None` when it does not know it
pub trait PathTemplateResolver: Send + Sync {
    fn resolve(&self, template: &str) -> Option<String>;
}

impl<F> PathTemplateResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, template: &str) -> Option<String> {
        self(template)
    }
}

/// A single `name = value` binding recorded during registry lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    name: String,
    value: String,
}

impl TemplateBinding {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PathTemplateResolver for TemplateBinding {
    fn resolve(&self, template: &str) -> Option<String> {
        (self.name == template).then(|| self.value.clone())
    }
}

/// Ordered list of resolvers; the first non-`None` answer wins
#[derive(Clone, Default)]
pub struct ResolutionContext {
    resolvers: Vec<Arc<dyn PathTemplateResolver>>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resolver(&mut self, resolver: Arc<dyn PathTemplateResolver>) {
        self.resolvers.push(resolver);
    }

    /// Shorthand for adding a [`TemplateBinding`]
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add_resolver(Arc::new(TemplateBinding::new(name, value)));
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn resolve(&self, template: &str) -> Option<String> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(template))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_template_is_none() {
        let resolution = ResolutionContext::new();
        assert_eq!(resolution.resolve("foo"), None);
        assert!(resolution.is_empty());
    }

    #[test]
    fn test_first_resolver_wins() {
        let mut resolution = ResolutionContext::new();
        resolution.bind("foo", "first");
        resolution.bind("foo", "second");
        assert_eq!(resolution.resolve("foo").as_deref(), Some("first"));
        assert_eq!(resolution.len(), 2);
    }

    #[test]
    fn test_closure_resolver() {
        let mut resolution = ResolutionContext::new();
        resolution.add_resolver(Arc::new(|name: &str| {
            (name == "site-type").then(|| "portal".to_string())
        }));
        resolution.bind("site-name", "classic");

        assert_eq!(resolution.resolve("site-type").as_deref(), Some("portal"));
        assert_eq!(resolution.resolve("site-name").as_deref(), Some("classic"));
        assert_eq!(resolution.resolve("page-name"), None);
    }

    #[test]
    fn test_falls_through_to_later_resolver() {
        let resolution = ResolutionContext::new()
            .with_binding("a", "1")
            .with_binding("b", "2");
        assert_eq!(resolution.resolve("b").as_deref(), Some("2"));
    }
}
