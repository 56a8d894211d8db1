//! Identity Registry
//!
//! The registry maps component identifiers to the nodes currently bound to
//! them, along with the parent each component was materialized under.
//!
//! # Source of Truth
//!
//! `lookup` always asks the document host, never the in-memory map. The map
//! is bookkeeping: it remembers parent linkage and hands out generation
//! numbers so that a `ComponentHandle` can tell whether the node it was
//! issued for is still the one bound to its identifier.
//!
//! # Invariants
//!
//! - At most one binding per identifier.
//! - A bound node carries the identity attribute for its identifier.
//! - Generations only grow; every `bind` issues a fresh one.
//!
//! Nodes removed from the document behind the registry's back leave stale
//! bindings behind. `invalidate` drops one explicitly and `prune` sweeps every
//! binding whose node no longer resolves.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::identity::{self, IdentityStyle};
use super::ComponentId;
use crate::host::{DocumentHost, HostResult, NodeId};
use crate::maybe::Maybe;

/// Typed handle to one binding of a component.
///
/// A handle stays valid until its identifier is rebound (for example when a
/// mismatching node is replaced), at which point it goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    id: ComponentId,
    generation: u64,
}

impl ComponentHandle {
    /// The component identifier.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// The generation this handle was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The node bound to the identifier.
    pub node: NodeId,

    /// The component this one was materialized under, absent for roots.
    pub parent: Maybe<ComponentId>,

    /// Generation issued when the binding was made.
    pub generation: u64,
}

/// Mapping from component identifier to live node.
pub struct Registry<H: DocumentHost + ?Sized> {
    host: Arc<H>,
    style: IdentityStyle,
    bindings: IndexMap<ComponentId, Binding>,
    next_generation: u64,
}

impl<H: DocumentHost + ?Sized> Registry<H> {
    /// Create an empty registry over `host`.
    pub fn new(host: Arc<H>, style: IdentityStyle) -> Self {
        Self {
            host,
            style,
            bindings: IndexMap::new(),
            next_generation: 1,
        }
    }

    /// The host this registry queries.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The identity attribute convention in use.
    pub fn style(&self) -> &IdentityStyle {
        &self.style
    }

    /// Find the connected node carrying `id`'s identity attribute.
    pub fn lookup(&self, id: &ComponentId) -> Maybe<NodeId> {
        identity::query_by_identity(self.host.as_ref(), &self.style, id)
    }

    /// Resolve a handle to its node, if it is still current.
    pub fn resolve(&self, handle: &ComponentHandle) -> Maybe<NodeId> {
        let Some(binding) = self.bindings.get(&handle.id) else {
            return Maybe::Absent;
        };
        if binding.generation != handle.generation {
            return Maybe::Absent;
        }
        self.lookup(&handle.id).filter(|node| *node == binding.node)
    }

    /// Check whether a handle still refers to the live binding.
    pub fn is_current(&self, handle: &ComponentHandle) -> bool {
        self.resolve(handle).is_present()
    }

    /// Record that `node` is bound to `id`, overwriting any previous binding.
    ///
    /// Stamps the identity attribute onto `node` if it is not there yet.
    pub fn bind(
        &mut self,
        id: ComponentId,
        node: NodeId,
        parent: Maybe<ComponentId>,
    ) -> HostResult<ComponentHandle> {
        if !self.style.is_stamped(self.host.as_ref(), node, &id) {
            identity::stamp(self.host.as_ref(), &self.style, node, &id)?;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        debug!(component = %id, node = %node, generation, "bound component");
        self.bindings.insert(
            id.clone(),
            Binding {
                node,
                parent,
                generation,
            },
        );

        Ok(ComponentHandle { id, generation })
    }

    /// Remove the binding for `id`.
    pub fn unbind(&mut self, id: &ComponentId) -> Maybe<Binding> {
        Maybe::of(self.bindings.shift_remove(id))
    }

    /// Tell the registry that the node bound to `id` is gone.
    ///
    /// Returns whether a binding was dropped.
    pub fn invalidate(&mut self, id: &ComponentId) -> bool {
        let dropped = self.unbind(id).is_present();
        if dropped {
            debug!(component = %id, "invalidated binding");
        }
        dropped
    }

    /// Drop every binding whose node no longer resolves.
    ///
    /// Returns the identifiers that were dropped, in binding order.
    pub fn prune(&mut self) -> Vec<ComponentId> {
        let stale: Vec<ComponentId> = self
            .bindings
            .iter()
            .filter(|(id, binding)| self.lookup(id) != Maybe::Present(binding.node))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.invalidate(id);
        }
        stale
    }

    /// The binding recorded for `id`.
    pub fn binding(&self, id: &ComponentId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// A handle for the current binding of `id`.
    pub fn handle(&self, id: &ComponentId) -> Maybe<ComponentHandle> {
        Maybe::of(self.bindings.get(id).map(|binding| ComponentHandle {
            id: id.clone(),
            generation: binding.generation,
        }))
    }

    /// Identifiers materialized under `parent`, in binding order.
    pub fn children_of(&self, parent: &ComponentId) -> Vec<ComponentId> {
        self.bindings
            .iter()
            .filter(|(_, binding)| binding.parent.get() == Some(parent))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Bound identifiers in binding order.
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.bindings.keys()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<H: DocumentHost + ?Sized> fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("style", &self.style)
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    fn registry() -> (Arc<MemoryHost>, Registry<MemoryHost>) {
        let host = Arc::new(MemoryHost::new());
        let registry = Registry::new(host.clone(), IdentityStyle::default());
        (host, registry)
    }

    #[test]
    fn bind_stamps_and_lookup_finds() {
        let (host, mut registry) = registry();
        let id = ComponentId::from("card");
        let node = host.create_element("div");
        host.append_child(host.document(), node).unwrap();

        let handle = registry.bind(id.clone(), node, Maybe::Absent).unwrap();

        assert_eq!(
            host.get_attribute(node, "data-pickme-component"),
            Maybe::present("card".to_string())
        );
        assert_eq!(registry.lookup(&id), Maybe::Present(node));
        assert_eq!(registry.resolve(&handle), Maybe::Present(node));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rebinding_makes_old_handles_stale() {
        let (host, mut registry) = registry();
        let id = ComponentId::from("card");
        let first = host.create_element("div");
        host.append_child(host.document(), first).unwrap();
        let old = registry.bind(id.clone(), first, Maybe::Absent).unwrap();

        let second = host.create_element("div");
        host.replace_node(first, second).unwrap();
        let new = registry.bind(id.clone(), second, Maybe::Absent).unwrap();

        assert!(new.generation() > old.generation());
        assert!(!registry.is_current(&old));
        assert!(registry.is_current(&new));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_observes_external_removal() {
        let (host, mut registry) = registry();
        let id = ComponentId::from("card");
        let node = host.create_element("div");
        host.append_child(host.document(), node).unwrap();
        let handle = registry.bind(id.clone(), node, Maybe::Absent).unwrap();

        host.remove_node(node).unwrap();

        assert!(registry.lookup(&id).is_absent());
        assert!(!registry.is_current(&handle));
        // The stale binding is still recorded until pruned.
        assert!(registry.binding(&id).is_some());
        assert_eq!(registry.prune(), vec![id.clone()]);
        assert!(registry.binding(&id).is_none());
    }

    #[test]
    fn invalidate_drops_binding() {
        let (host, mut registry) = registry();
        let id = ComponentId::from("card");
        let node = host.create_element("div");
        registry.bind(id.clone(), node, Maybe::Absent).unwrap();

        assert!(registry.invalidate(&id));
        assert!(!registry.invalidate(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn children_follow_parent_linkage() {
        let (host, mut registry) = registry();
        let parent = ComponentId::from("app");
        for name in ["a", "b"] {
            let node = host.create_element("li");
            registry
                .bind(name.into(), node, Maybe::present(parent.clone()))
                .unwrap();
        }
        let other = host.create_element("li");
        registry.bind("c".into(), other, Maybe::Absent).unwrap();

        assert_eq!(
            registry.children_of(&parent),
            vec![ComponentId::from("a"), ComponentId::from("b")]
        );
    }
}
