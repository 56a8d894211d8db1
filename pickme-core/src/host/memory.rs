//! In-Memory Document Host
//!
//! A small document tree that implements `DocumentHost` without a browser.
//!
//! # Model
//!
//! - One document root node, created with the host. Everything reachable from
//!   it is connected; everything else is detached.
//! - Tag names are lower-cased on creation.
//! - The `class` attribute doubles as the class list: tokens are separated by
//!   whitespace and written back joined by single spaces.
//! - Each element holds its own text run. Setting text does not touch child
//!   elements, and reading text does not concatenate descendants.
//! - `remove_node` and `replace_node` release the removed subtree: its
//!   elements and listeners are dropped and its IDs become unknown. Nodes
//!   that were only detached by a move stay alive.
//!
//! # Locking
//!
//! The tree sits behind a `parking_lot::RwLock`. `dispatch_event` collects
//! the handlers to run, releases the lock, and only then invokes them, so
//! handlers are free to mutate the tree.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use super::node::{Element, Listener};
use super::{DocumentHost, Event, Handler, HostError, HostResult, ListenerId, NodeId};
use crate::maybe::Maybe;

/// Tag used for the document root.
const DOCUMENT_TAG: &str = "#document";

/// The node storage shared behind the lock.
struct Tree {
    root: NodeId,
    nodes: HashMap<NodeId, Element>,
}

impl Tree {
    fn element(&self, node: NodeId) -> HostResult<&Element> {
        self.nodes.get(&node).ok_or(HostError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> HostResult<&mut Element> {
        self.nodes.get_mut(&node).ok_or(HostError::UnknownNode(node))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Maybe::present(node);
        while let Maybe::Present(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).map_or(Maybe::Absent, |e| e.parent);
        }
        false
    }

    /// Unlink a node from its parent's child list.
    ///
    /// Returns the former parent and the index the node occupied.
    fn detach(&mut self, node: NodeId) -> HostResult<Maybe<(NodeId, usize)>> {
        let parent = self.element(node)?.parent;
        let Maybe::Present(parent) = parent else {
            return Ok(Maybe::Absent);
        };

        let siblings = &mut self.element_mut(parent)?.children;
        let index = siblings.iter().position(|&child| child == node);
        if let Some(index) = index {
            siblings.remove(index);
        }
        self.element_mut(node)?.parent = Maybe::Absent;

        Ok(Maybe::of(index.map(|index| (parent, index))))
    }

    /// Drop a detached node and everything below it.
    ///
    /// Returns the number of elements released.
    fn release(&mut self, node: NodeId) -> usize {
        let mut released = 0;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(element) = self.nodes.remove(&id) {
                stack.extend(element.children);
                released += 1;
            }
        }
        released
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> HostResult<()> {
        self.element(parent)?;
        self.element(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(HostError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Connected nodes in document order.
    fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            if let Some(element) = self.nodes.get(&node) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        order
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        let Some(element) = self.nodes.get(&node) else {
            return;
        };

        out.push('<');
        out.push_str(&element.tag);
        for (name, value) in &element.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push('>');
        out.push_str(&escape(&element.text));
        for &child in &element.children {
            self.render_into(child, out);
        }
        out.push_str("</");
        out.push_str(&element.tag);
        out.push('>');
    }
}

/// Class tokens must be non-empty and free of whitespace.
fn check_class_token(class: &str) -> HostResult<()> {
    if class.is_empty() || class.chars().any(char::is_whitespace) {
        return Err(HostError::InvalidClassToken(class.to_string()));
    }
    Ok(())
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

/// A document tree held entirely in memory.
pub struct MemoryHost {
    tree: RwLock<Tree>,
}

impl MemoryHost {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::with_top_level(Vec::new())
    }

    /// Create a document containing a `<div id="{id}">` mount point.
    pub fn with_mount_point(id: &str) -> Self {
        let mut mount = Element::new("div");
        mount.attributes.insert("id".to_string(), id.to_string());
        Self::with_top_level(vec![mount])
    }

    /// Build a document whose root holds `elements` as its children.
    fn with_top_level(elements: Vec<Element>) -> Self {
        let root = NodeId::new();
        let mut document = Element::new(DOCUMENT_TAG);
        let mut nodes = HashMap::with_capacity(elements.len() + 1);

        for mut element in elements {
            let id = NodeId::new();
            element.parent = Maybe::present(root);
            document.children.push(id);
            nodes.insert(id, element);
        }
        nodes.insert(root, document);

        Self {
            tree: RwLock::new(Tree { root, nodes }),
        }
    }

    /// Number of nodes currently held, attached or not.
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.len()
    }

    /// Number of listeners attached to a node, across all events.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.tree
            .read()
            .nodes
            .get(&node)
            .map_or(0, |element| element.listeners.len())
    }

    /// Render a subtree as HTML-like markup.
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.tree.read().render_into(node, &mut out);
        out
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree.read();
        f.debug_struct("MemoryHost")
            .field("root", &tree.root)
            .field("node_count", &tree.nodes.len())
            .finish()
    }
}

impl DocumentHost for MemoryHost {
    fn create_element(&self, tag: &str) -> NodeId {
        let id = NodeId::new();
        self.tree.write().nodes.insert(id, Element::new(tag));
        trace!(node = %id, tag, "created element");
        id
    }

    fn document(&self) -> NodeId {
        self.tree.read().root
    }

    fn query_attribute(&self, name: &str, value: Option<&str>) -> Maybe<NodeId> {
        let tree = self.tree.read();
        let found = tree.walk().into_iter().find(|node| {
            tree.nodes
                .get(node)
                .is_some_and(|element| element.matches_attribute(name, value))
        });
        Maybe::of(found)
    }

    fn query_all_attribute(&self, name: &str, value: Option<&str>) -> Vec<NodeId> {
        let tree = self.tree.read();
        tree.walk()
            .into_iter()
            .filter(|node| {
                tree.nodes
                    .get(node)
                    .is_some_and(|element| element.matches_attribute(name, value))
            })
            .collect()
    }

    fn tag_name(&self, node: NodeId) -> Maybe<String> {
        Maybe::of(self.tree.read().nodes.get(&node).map(|e| e.tag.clone()))
    }

    fn parent(&self, node: NodeId) -> Maybe<NodeId> {
        self.tree
            .read()
            .nodes
            .get(&node)
            .map_or(Maybe::Absent, |element| element.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .read()
            .nodes
            .get(&node)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> HostResult<()> {
        let mut tree = self.tree.write();
        tree.check_insert(parent, child)?;
        tree.detach(child)?;
        tree.element_mut(parent)?.children.push(child);
        tree.element_mut(child)?.parent = Maybe::present(parent);
        Ok(())
    }

    fn remove_node(&self, node: NodeId) -> HostResult<()> {
        let mut tree = self.tree.write();
        if node == tree.root {
            return Err(HostError::DocumentRoot(node));
        }
        tree.detach(node)?;
        let released = tree.release(node);
        trace!(node = %node, released, "removed node");
        Ok(())
    }

    fn replace_node(&self, old: NodeId, new: NodeId) -> HostResult<()> {
        if old == new {
            return Ok(());
        }

        let mut tree = self.tree.write();
        let Maybe::Present(parent) = tree.element(old)?.parent else {
            return Err(HostError::Detached(old));
        };
        tree.check_insert(parent, new)?;

        tree.detach(new)?;
        let Maybe::Present((parent, index)) = tree.detach(old)? else {
            return Err(HostError::Detached(old));
        };
        tree.element_mut(parent)?.children.insert(index, new);
        tree.element_mut(new)?.parent = Maybe::present(parent);
        let released = tree.release(old);
        trace!(old = %old, new = %new, released, "replaced node");
        Ok(())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Maybe<String> {
        Maybe::of(
            self.tree
                .read()
                .nodes
                .get(&node)
                .and_then(|element| element.attributes.get(name).cloned()),
        )
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> HostResult<()> {
        self.tree
            .write()
            .element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> HostResult<bool> {
        Ok(self
            .tree
            .write()
            .element_mut(node)?
            .attributes
            .shift_remove(name)
            .is_some())
    }

    fn add_class(&self, node: NodeId, class: &str) -> HostResult<()> {
        check_class_token(class)?;
        let mut tree = self.tree.write();
        let element = tree.element_mut(node)?;
        if element.classes().any(|token| token == class) {
            return Ok(());
        }

        let mut tokens: Vec<&str> = element.classes().collect();
        tokens.push(class);
        let joined = tokens.join(" ");
        element.attributes.insert("class".to_string(), joined);
        Ok(())
    }

    fn remove_class(&self, node: NodeId, class: &str) -> HostResult<bool> {
        check_class_token(class)?;
        let mut tree = self.tree.write();
        let element = tree.element_mut(node)?;
        if !element.classes().any(|token| token == class) {
            return Ok(false);
        }

        let joined = element
            .classes()
            .filter(|token| *token != class)
            .collect::<Vec<_>>()
            .join(" ");
        element.attributes.insert("class".to_string(), joined);
        Ok(true)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.tree
            .read()
            .nodes
            .get(&node)
            .is_some_and(|element| element.classes().any(|token| token == class))
    }

    fn get_text(&self, node: NodeId) -> Maybe<String> {
        Maybe::of(self.tree.read().nodes.get(&node).map(|e| e.text.clone()))
    }

    fn set_text(&self, node: NodeId, text: &str) -> HostResult<()> {
        self.tree.write().element_mut(node)?.text = text.to_string();
        Ok(())
    }

    fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        handler: Handler,
    ) -> HostResult<ListenerId> {
        let id = ListenerId::new();
        self.tree.write().element_mut(node)?.listeners.push(Listener {
            id,
            event: event.to_string(),
            handler,
        });
        Ok(id)
    }

    fn remove_event_listener(
        &self,
        node: NodeId,
        event: &str,
        listener: ListenerId,
    ) -> HostResult<bool> {
        let mut tree = self.tree.write();
        let listeners = &mut tree.element_mut(node)?.listeners;
        let before = listeners.len();
        listeners.retain(|l| !(l.id == listener && l.event == event));
        Ok(listeners.len() != before)
    }

    fn dispatch_event(&self, target: NodeId, event: &str) -> HostResult<usize> {
        // Collect the bubbling path and its handlers, then release the lock.
        let pending: Vec<(NodeId, Handler)> = {
            let tree = self.tree.read();
            tree.element(target)?;

            let mut pending = Vec::new();
            let mut current = Maybe::present(target);
            while let Maybe::Present(node) = current {
                let element = tree.element(node)?;
                pending.extend(
                    element
                        .listeners
                        .iter()
                        .filter(|l| l.event == event)
                        .map(|l| (node, l.handler.clone())),
                );
                current = element.parent;
            }
            pending
        };

        trace!(target = %target, event, handlers = pending.len(), "dispatching event");

        for (current_target, handler) in &pending {
            let delivered = Event {
                name: event.to_string(),
                target,
                current_target: *current_target,
            };
            handler(&delivered);
        }

        Ok(pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::handler;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn mount_point_is_connected() {
        let host = MemoryHost::with_mount_point("app");
        let app = host.element_by_id("app");
        assert!(app.is_present());
        assert!(host.is_connected(*app.get().unwrap()));
        assert_eq!(host.children(host.document()), vec![*app.get().unwrap()]);
        assert_eq!(host.node_count(), 2);
        assert_eq!(
            host.render(host.document()),
            "<#document><div id=\"app\"></div></#document>"
        );
    }

    #[test]
    fn queries_skip_detached_nodes() {
        let host = MemoryHost::new();
        let node = host.create_element("span");
        host.set_attribute(node, "data-x", "1").unwrap();

        assert!(host.query_attribute("data-x", None).is_absent());

        host.append_child(host.document(), node).unwrap();
        assert_eq!(host.query_attribute("data-x", Some("1")), Maybe::Present(node));
        assert!(host.query_attribute("data-x", Some("2")).is_absent());
    }

    #[test]
    fn query_all_is_in_document_order() {
        let host = MemoryHost::new();
        let doc = host.document();
        let a = host.create_element("div");
        let b = host.create_element("div");
        let c = host.create_element("div");
        for node in [a, b, c] {
            host.set_attribute(node, "data-component-item", "").unwrap();
        }
        host.append_child(doc, a).unwrap();
        host.append_child(a, b).unwrap();
        host.append_child(doc, c).unwrap();

        assert_eq!(
            host.query_all_attribute("data-component-item", None),
            vec![a, b, c]
        );
    }

    #[test]
    fn append_moves_existing_child() {
        let host = MemoryHost::new();
        let doc = host.document();
        let first = host.create_element("div");
        let second = host.create_element("div");
        let child = host.create_element("p");
        host.append_child(doc, first).unwrap();
        host.append_child(doc, second).unwrap();

        host.append_child(first, child).unwrap();
        host.append_child(second, child).unwrap();

        assert!(host.children(first).is_empty());
        assert_eq!(host.children(second), vec![child]);
        assert_eq!(host.parent(child), Maybe::Present(second));
    }

    #[test]
    fn append_rejects_cycles() {
        let host = MemoryHost::new();
        let outer = host.create_element("div");
        let inner = host.create_element("div");
        host.append_child(outer, inner).unwrap();

        assert_eq!(
            host.append_child(inner, outer),
            Err(HostError::HierarchyRequest {
                parent: inner,
                child: outer
            })
        );
    }

    #[test]
    fn replace_keeps_position() {
        let host = MemoryHost::new();
        let doc = host.document();
        let a = host.create_element("a");
        let b = host.create_element("b");
        let c = host.create_element("c");
        let replacement = host.create_element("i");
        for node in [a, b, c] {
            host.append_child(doc, node).unwrap();
        }

        host.replace_node(b, replacement).unwrap();

        assert_eq!(host.children(doc), vec![a, replacement, c]);
        assert!(!host.is_connected(b));
    }

    #[test]
    fn replace_requires_attached_node() {
        let host = MemoryHost::new();
        let old = host.create_element("a");
        let new = host.create_element("b");
        assert_eq!(host.replace_node(old, new), Err(HostError::Detached(old)));
    }

    #[test]
    fn removed_subtree_is_released() {
        let host = MemoryHost::new();
        let outer = host.create_element("div");
        let inner = host.create_element("div");
        host.append_child(host.document(), outer).unwrap();
        host.append_child(outer, inner).unwrap();
        host.add_event_listener(inner, "click", handler(|_| {}))
            .unwrap();
        assert_eq!(host.node_count(), 3);

        host.remove_node(outer).unwrap();

        assert!(!host.is_connected(outer));
        assert!(!host.is_connected(inner));
        assert!(host.children(host.document()).is_empty());
        assert_eq!(host.node_count(), 1);
        assert_eq!(host.listener_count(inner), 0);
        assert_eq!(host.set_text(inner, "x"), Err(HostError::UnknownNode(inner)));
    }

    #[test]
    fn moved_nodes_stay_alive() {
        let host = MemoryHost::new();
        let first = host.create_element("div");
        let second = host.create_element("div");
        host.append_child(host.document(), first).unwrap();
        host.append_child(host.document(), second).unwrap();

        host.append_child(second, first).unwrap();

        assert_eq!(host.node_count(), 3);
        assert_eq!(host.parent(first), Maybe::Present(second));
    }

    #[test]
    fn replaced_node_is_released() {
        let host = MemoryHost::new();
        let old = host.create_element("p");
        let child = host.create_element("span");
        let new = host.create_element("p");
        host.append_child(host.document(), old).unwrap();
        host.append_child(old, child).unwrap();

        host.replace_node(old, new).unwrap();

        assert_eq!(host.node_count(), 2);
        assert!(host.tag_name(old).is_absent());
        assert!(host.tag_name(child).is_absent());
        assert_eq!(host.children(host.document()), vec![new]);
    }

    #[test]
    fn repeated_replacement_keeps_node_count_flat() {
        let host = MemoryHost::with_mount_point("app");
        let app = *host.element_by_id("app").get().unwrap();
        let mut current = host.create_element("div");
        host.append_child(app, current).unwrap();
        let before = host.node_count();

        for _ in 0..1000 {
            let next = host.create_element("div");
            host.replace_node(current, next).unwrap();
            current = next;
        }

        assert_eq!(host.node_count(), before);
    }

    #[test]
    fn document_root_cannot_be_removed() {
        let host = MemoryHost::new();
        let doc = host.document();
        assert_eq!(host.remove_node(doc), Err(HostError::DocumentRoot(doc)));
        assert_eq!(host.node_count(), 1);
    }

    #[test]
    fn class_list_mutation() {
        let host = MemoryHost::new();
        let node = host.create_element("div");
        host.set_attribute(node, "class", "one  two").unwrap();

        host.add_class(node, "three").unwrap();
        host.add_class(node, "one").unwrap();
        assert_eq!(
            host.get_attribute(node, "class"),
            Maybe::present("one two three".to_string())
        );

        assert!(host.remove_class(node, "two").unwrap());
        assert!(!host.remove_class(node, "two").unwrap());
        assert!(host.has_class(node, "three"));
        assert!(!host.has_class(node, "two"));
    }

    #[test]
    fn malformed_class_tokens_are_rejected() {
        let host = MemoryHost::new();
        let node = host.create_element("div");
        host.set_attribute(node, "class", "one").unwrap();

        for token in ["", "a b", "tab\there"] {
            assert_eq!(
                host.add_class(node, token),
                Err(HostError::InvalidClassToken(token.to_string()))
            );
            assert!(host.remove_class(node, token).is_err());
        }
        assert_eq!(
            host.get_attribute(node, "class"),
            Maybe::present("one".to_string())
        );
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let host = MemoryHost::new();
        let outer = host.create_element("div");
        let inner = host.create_element("button");
        host.append_child(host.document(), outer).unwrap();
        host.append_child(outer, inner).unwrap();

        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();
        host.add_event_listener(
            outer,
            "click",
            handler(move |event| {
                assert_eq!(event.target, inner);
                assert_eq!(event.current_target, outer);
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        assert_eq!(host.dispatch_event(inner, "click").unwrap(), 1);
        assert_eq!(host.dispatch_event(inner, "keydown").unwrap(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_listeners_fire_twice() {
        let host = MemoryHost::new();
        let node = host.create_element("div");
        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();
        let shared = handler(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = host.add_event_listener(node, "click", shared.clone()).unwrap();
        host.add_event_listener(node, "click", shared).unwrap();
        host.dispatch_event(node, "click").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(host.remove_event_listener(node, "click", first).unwrap());
        host.dispatch_event(node, "click").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn handlers_can_reenter_the_host() {
        let host = Arc::new(MemoryHost::new());
        let node = host.create_element("div");
        let inner_host = host.clone();
        host.add_event_listener(
            node,
            "click",
            handler(move |event| {
                inner_host.set_text(event.target, "clicked").unwrap();
            }),
        )
        .unwrap();

        host.dispatch_event(node, "click").unwrap();
        assert_eq!(host.get_text(node), Maybe::present("clicked".to_string()));
    }

    #[test]
    fn unknown_nodes_are_errors() {
        let host = MemoryHost::new();
        let ghost = NodeId::from(u64::MAX);
        assert_eq!(host.set_text(ghost, "x"), Err(HostError::UnknownNode(ghost)));
        assert!(host.get_text(ghost).is_absent());
    }

    #[test]
    fn render_nests_children() {
        let host = MemoryHost::new();
        let outer = host.create_element("DIV");
        let inner = host.create_element("span");
        host.set_attribute(outer, "class", "a").unwrap();
        host.set_text(inner, "hi").unwrap();
        host.append_child(outer, inner).unwrap();

        assert_eq!(
            host.render(outer),
            "<div class=\"a\"><span>hi</span></div>"
        );
    }
}
