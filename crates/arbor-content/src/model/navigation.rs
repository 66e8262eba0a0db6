use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::Visibility;

/// The navigation tree of one site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub nodes: Vec<NavigationNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationNode {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Name of the page this node opens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_reference: Option<String>,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_publication_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_publication_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            icon: None,
            page_reference: None,
            visibility: Visibility::default(),
            start_publication_date: None,
            end_publication_date: None,
            children: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page_reference = Some(page.into());
        self
    }

    pub fn with_child(mut self, child: NavigationNode) -> Self {
        self.children.push(child);
        self
    }

    /// Whether the node is shown at `at`
    pub fn is_visible_at(&self, at: DateTime<Utc>) -> bool {
        match self.visibility {
            Visibility::Displayed => true,
            Visibility::Hidden | Visibility::System => false,
            Visibility::Temporal => {
                self.start_publication_date.map_or(true, |start| start <= at)
                    && self.end_publication_date.map_or(true, |end| at < end)
            }
        }
    }
}

impl Navigation {
    pub fn new(nodes: Vec<NavigationNode>) -> Self {
        Self { priority: 0, nodes }
    }

    pub fn node(&self, name: &str) -> Option<&NavigationNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Number of nodes at every depth
    pub fn node_count(&self) -> usize {
        count_nodes(&self.nodes)
    }

    /// Merge `incoming` into `self` by node name, recursively.
    ///
    /// With `overwrite`, matched nodes take the incoming attributes; without
    /// it they keep their own and only gain missing descendants. Returns the
    /// number of nodes added and updated.
    pub fn merge_from(&mut self, incoming: &Navigation, overwrite: bool) -> (usize, usize) {
        if overwrite {
            self.priority = incoming.priority;
        }
        merge_nodes(&mut self.nodes, &incoming.nodes, overwrite)
    }
}

fn merge_nodes(
    existing: &mut Vec<NavigationNode>,
    incoming: &[NavigationNode],
    overwrite: bool,
) -> (usize, usize) {
    let mut added = 0;
    let mut updated = 0;
    for node in incoming {
        match existing.iter_mut().find(|current| current.name == node.name) {
            Some(current) => {
                if overwrite && !same_attributes(current, node) {
                    current.label = node.label.clone();
                    current.icon = node.icon.clone();
                    current.page_reference = node.page_reference.clone();
                    current.visibility = node.visibility;
                    current.start_publication_date = node.start_publication_date;
                    current.end_publication_date = node.end_publication_date;
                    updated += 1;
                }
                let (a, u) = merge_nodes(&mut current.children, &node.children, overwrite);
                added += a;
                updated += u;
            }
            None => {
                existing.push(node.clone());
                added += 1;
            }
        }
    }
    (added, updated)
}

fn count_nodes(nodes: &[NavigationNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

fn same_attributes(a: &NavigationNode, b: &NavigationNode) -> bool {
    a.label == b.label
        && a.icon == b.icon
        && a.page_reference == b.page_reference
        && a.visibility == b.visibility
        && a.start_publication_date == b.start_publication_date
        && a.end_publication_date == b.end_publication_date
}
