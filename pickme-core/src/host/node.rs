//! Host Nodes
//!
//! Identifiers for nodes and listeners, plus the element record kept by the
//! in-memory host.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::{Handler, Maybe};

/// Unique identifier for a node owned by a document host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for an attached event listener.
///
/// Returned by `add_event_listener` and used to detach the listener later.
/// Attaching the same handler twice yields two listeners with distinct IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener attached to an element.
#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) handler: Handler,
}

/// An element stored by the in-memory host.
pub(crate) struct Element {
    /// Lower-cased tag name.
    pub(crate) tag: String,

    /// Attributes in insertion order.
    pub(crate) attributes: IndexMap<String, String>,

    /// The element's own text run.
    pub(crate) text: String,

    /// Parent element, absent while detached.
    pub(crate) parent: Maybe<NodeId>,

    /// Child elements in document order.
    pub(crate) children: Vec<NodeId>,

    /// Listeners in attachment order.
    pub(crate) listeners: Vec<Listener>,
}

impl Element {
    /// Create a detached element with the given tag.
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            text: String::new(),
            parent: Maybe::Absent,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Iterate over the class tokens of this element.
    pub(crate) fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|value| value.split_whitespace())
            .into_iter()
            .flatten()
    }

    /// Check if the element carries `name`, optionally with an exact value.
    pub(crate) fn matches_attribute(&self, name: &str, value: Option<&str>) -> bool {
        match (self.attributes.get(name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn listener_ids_are_unique() {
        assert_ne!(ListenerId::new(), ListenerId::new());
    }

    #[test]
    fn element_lowercases_tag() {
        let element = Element::new("DIV");
        assert_eq!(element.tag, "div");
        assert!(element.parent.is_absent());
    }

    #[test]
    fn element_splits_classes() {
        let mut element = Element::new("div");
        element
            .attributes
            .insert("class".to_string(), "a  b\tc".to_string());
        assert_eq!(element.classes().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn attribute_matching() {
        let mut element = Element::new("div");
        element
            .attributes
            .insert("data-pickme-component".to_string(), "x".to_string());

        assert!(element.matches_attribute("data-pickme-component", None));
        assert!(element.matches_attribute("data-pickme-component", Some("x")));
        assert!(!element.matches_attribute("data-pickme-component", Some("y")));
        assert!(!element.matches_attribute("id", None));
    }
}
