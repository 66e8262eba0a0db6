//! Include/exclude filters over resolved template values
//!
//! Grammar, one or more rule groups per string:
//!
//! ```text
//! rule-group  := template-name ':' value-list
//! value-list  := ['!'] value (',' value)*
//! groups      := rule-group (';' rule-group)*
//! ```
//!
//! A leading `!` turns the whole value list into an exclusion set.
//!
//! ```
//! use arbor_core::filter::PathTemplateFilter;
//! use arbor_core::template::ResolutionContext;
//!
//! let filter = PathTemplateFilter::parse(&["site-name: classic, mobile; page-name:!admin"]).unwrap();
//! let resolution = ResolutionContext::new().with_binding("site-name", "classic");
//! assert!(filter.accepts(&resolution));
//! ```

use std::collections::BTreeSet;

use crate::errors::{ArborError, Result};
use crate::template::ResolutionContext;

const GROUP_SEPARATOR: char = ';';
const TEMPLATE_SEPARATOR: char = ':';
const VALUE_SEPARATOR: char = ',';
const EXCLUSION_MARKER: char = '!';

/// Whether a rule group requires or forbids its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    Include,
    Exclude,
}

/// One `template: values` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    template: String,
    mode: RuleMode,
    values: BTreeSet<String>,
}

impl FilterRule {
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    fn accepts(&self, resolution: &ResolutionContext) -> bool {
        let Some(value) = resolution.resolve(&self.template) else {
            return true;
        };
        match self.mode {
            RuleMode::Include => self.values.contains(&value),
            RuleMode::Exclude => !self.values.contains(&value),
        }
    }
}

/// ANDed rule groups; empty accepts everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTemplateFilter {
    rules: Vec<FilterRule>,
}

impl PathTemplateFilter {
    /// A filter with no rule groups
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn builder() -> PathTemplateFilterBuilder {
        PathTemplateFilterBuilder::default()
    }

    /// Parse a list of filter strings. An empty list yields a filter that
    /// accepts everything.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut filter = Self::default();
        for spec in specs {
            for group in spec.as_ref().split(GROUP_SEPARATOR) {
                if group.trim().is_empty() {
                    continue;
                }
                let rule = parse_group(group)?;
                filter.add_rule(rule, group)?;
            }
        }
        Ok(filter)
    }

    /// Parse an optional attribute value list, treating `None` as accept-all
    pub fn parse_optional<S: AsRef<str>>(specs: Option<&[S]>) -> Result<Self> {
        match specs {
            Some(specs) => Self::parse(specs),
            None => Ok(Self::default()),
        }
    }

    /// Combine with another filter instance. Both must accept.
    ///
    /// Unlike parsing, this may leave one template with both an inclusion
    /// and an exclusion group; the exclusion then wins for its values.
    pub fn and(mut self, other: PathTemplateFilter) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn accepts(&self, resolution: &ResolutionContext) -> bool {
        self.rules.iter().all(|rule| rule.accepts(resolution))
    }

    fn add_rule(&mut self, rule: FilterRule, input: &str) -> Result<()> {
        match self
            .rules
            .iter_mut()
            .find(|existing| existing.template == rule.template)
        {
            Some(existing) if existing.mode == rule.mode => {
                existing.values.extend(rule.values);
                Ok(())
            }
            Some(_) => Err(ArborError::parse(
                input.trim(),
                format!(
                    "template '{}' cannot be both included and excluded",
                    rule.template
                ),
            )),
            None => {
                self.rules.push(rule);
                Ok(())
            }
        }
    }
}

fn parse_group(group: &str) -> Result<FilterRule> {
    let input = group.trim();
    let (template, value_list) = input
        .split_once(TEMPLATE_SEPARATOR)
        .ok_or_else(|| ArborError::parse(input, "expected 'template:value[,value]'"))?;

    let template = template.trim();
    if template.is_empty() {
        return Err(ArborError::parse(input, "empty template name"));
    }

    let mut value_list = value_list.trim();
    let mode = match value_list.strip_prefix(EXCLUSION_MARKER) {
        Some(rest) => {
            value_list = rest;
            RuleMode::Exclude
        }
        None => RuleMode::Include,
    };

    let mut values = BTreeSet::new();
    for value in value_list.split(VALUE_SEPARATOR) {
        let value = value.trim();
        if value.is_empty() {
            return Err(ArborError::parse(input, "empty value"));
        }
        if value.contains(EXCLUSION_MARKER) {
            return Err(ArborError::parse(
                input,
                "'!' is only allowed once, before the first value",
            ));
        }
        values.insert(value.to_string());
    }

    Ok(FilterRule {
        template: template.to_string(),
        mode,
        values,
    })
}

/// Programmatic construction of filters
///
/// ```
/// use arbor_core::filter::PathTemplateFilter;
///
/// let filter = PathTemplateFilter::builder()
///     .include("site-type", ["portal"])
///     .exclude("site-name", ["sandbox"])
///     .build();
/// assert_eq!(filter.rules().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct PathTemplateFilterBuilder {
    rules: Vec<FilterRule>,
}

impl PathTemplateFilterBuilder {
    pub fn include<I, S>(self, template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(template, RuleMode::Include, values)
    }

    pub fn exclude<I, S>(self, template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(template, RuleMode::Exclude, values)
    }

    pub fn build(self) -> PathTemplateFilter {
        PathTemplateFilter { rules: self.rules }
    }

    fn rule<I, S>(mut self, template: impl Into<String>, mode: RuleMode, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(FilterRule {
            template: template.into(),
            mode,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }
}
