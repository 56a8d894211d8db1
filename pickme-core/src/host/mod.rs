//! Document Host
//!
//! The document tree is not owned by this crate. Everything the core needs
//! from it goes through the `DocumentHost` trait: creating and querying
//! elements, moving them around, reading and writing attributes, class tokens
//! and text, and attaching event listeners.
//!
//! # Concepts
//!
//! ## Nodes
//!
//! A host hands out `NodeId` handles. The host is the authority on node
//! lifetime: a removed node stops being *connected* and may be released, and
//! the query operations only ever see connected nodes.
//!
//! ## Events
//!
//! Handlers are plain `Fn(&Event)` closures. Dispatch is synchronous and
//! bubbles from the target up to the document root. Hosts must not hold any
//! internal lock while a handler runs, since handlers are allowed to call back
//! into the core (a click handler that modifies a component, for instance).
//!
//! # Implementations
//!
//! `MemoryHost` is a complete in-memory document used by the tests and
//! benchmarks. A browser-backed host implements the same trait on top of the
//! platform DOM.

mod memory;
mod node;

pub use memory::MemoryHost;
pub use node::{ListenerId, NodeId};

use std::sync::Arc;

use thiserror::Error;

use crate::maybe::Maybe;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// A failure reported by a document host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The node is not known to this host.
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// The operation would make a node its own ancestor.
    #[error("cannot insert node {child} under {parent}: it is an ancestor of the parent")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The operation needs a node that is attached to a parent.
    #[error("node {0} has no parent")]
    Detached(NodeId),

    /// The document root cannot be removed.
    #[error("node {0} is the document root")]
    DocumentRoot(NodeId),

    /// A class token was empty or contained whitespace.
    #[error("invalid class token {0:?}")]
    InvalidClassToken(String),
}

/// An event delivered to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name, such as `click`.
    pub name: String,

    /// The node the event was dispatched on.
    pub target: NodeId,

    /// The node whose listener is currently running.
    pub current_target: NodeId,
}

/// A shareable event handler.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure as a `Handler`.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The capability the component core consumes from a document tree.
///
/// All methods take `&self`; implementations use interior mutability so that
/// handlers running inside `dispatch_event` can re-enter the host.
pub trait DocumentHost: Send + Sync {
    /// Create a detached element with the given tag.
    fn create_element(&self, tag: &str) -> NodeId;

    /// The document root every connected node descends from.
    fn document(&self) -> NodeId;

    /// Find a connected element by its `id` attribute.
    fn element_by_id(&self, id: &str) -> Maybe<NodeId> {
        self.query_attribute("id", Some(id))
    }

    /// Find the first connected element carrying `name`, in document order.
    ///
    /// With `value` set, the attribute must equal it exactly.
    fn query_attribute(&self, name: &str, value: Option<&str>) -> Maybe<NodeId>;

    /// Find every connected element carrying `name`, in document order.
    fn query_all_attribute(&self, name: &str, value: Option<&str>) -> Vec<NodeId>;

    /// Lower-cased tag name of a node.
    fn tag_name(&self, node: NodeId) -> Maybe<String>;

    /// Parent of a node, absent for detached nodes and the document root.
    fn parent(&self, node: NodeId) -> Maybe<NodeId>;

    /// Children of a node in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Check if `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Maybe::present(node);
        while let Maybe::Present(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Check if a node is part of the document.
    fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.document(), node)
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    fn append_child(&self, parent: NodeId, child: NodeId) -> HostResult<()>;

    /// Remove a node and its subtree from the document.
    ///
    /// Hosts may release removed nodes; a removed `NodeId` must not be reused.
    fn remove_node(&self, node: NodeId) -> HostResult<()>;

    /// Put `new` in the position `old` occupies and remove `old`.
    ///
    /// `old` is released the same way `remove_node` releases it.
    fn replace_node(&self, old: NodeId, new: NodeId) -> HostResult<()>;

    /// Read an attribute.
    fn get_attribute(&self, node: NodeId, name: &str) -> Maybe<String>;

    /// Write an attribute, overwriting any previous value.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> HostResult<()>;

    /// Remove an attribute. Returns whether it was present.
    fn remove_attribute(&self, node: NodeId, name: &str) -> HostResult<bool>;

    /// Add a class token if it is not present yet.
    ///
    /// Empty tokens and tokens containing whitespace are rejected with
    /// `HostError::InvalidClassToken`.
    fn add_class(&self, node: NodeId, class: &str) -> HostResult<()>;

    /// Remove a class token. Returns whether it was present.
    fn remove_class(&self, node: NodeId, class: &str) -> HostResult<bool>;

    /// Check for a class token.
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Read the text of a node.
    fn get_text(&self, node: NodeId) -> Maybe<String>;

    /// Replace the text of a node.
    fn set_text(&self, node: NodeId, text: &str) -> HostResult<()>;

    /// Attach a listener. Duplicate attachments are not deduplicated.
    fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        handler: Handler,
    ) -> HostResult<ListenerId>;

    /// Detach a listener. Returns whether it was attached.
    fn remove_event_listener(
        &self,
        node: NodeId,
        event: &str,
        listener: ListenerId,
    ) -> HostResult<bool>;

    /// Dispatch an event on `target`, bubbling to the root.
    ///
    /// Returns the number of handlers invoked.
    fn dispatch_event(&self, target: NodeId, event: &str) -> HostResult<usize>;
}

