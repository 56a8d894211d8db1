//! Reconciliation Engine
//!
//! Given a requested component description, decide whether the node already
//! bound to its identifier can be reused, must be replaced, or has to be
//! created, and perform the matching document mutation.
//!
//! # Algorithm
//!
//! 1. Resolve the parent by identity, falling back to the designated default
//!    container. If neither resolves the request fails with `MissingParent`
//!    before anything is touched.
//! 2. Look up the node currently carrying the requested identifier.
//! 3. If there is one, compare it against the descriptor:
//!    - tag names must match (ASCII case-insensitive),
//!    - every listed attribute must match exactly (unlisted attributes on the
//!      node are ignored),
//!    - the text must match exactly.
//!
//!    A full match is a no-op. Anything else destroys the node and recreates
//!    it; there is no partial patching.
//! 4. Otherwise build a new node, attach it under the parent and bind it.
//!
//! # Replacement
//!
//! The replacement is fully built while detached, then swapped in. When the
//! old node is a direct child of the parent it is replaced in place, keeping
//! its position among its siblings; otherwise the new node is appended to the
//! parent and the old one removed, so the document always agrees with the
//! parent recorded in the registry. Listeners attached directly to the old
//! node are lost with it.

use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, warn};

use super::registry::{ComponentHandle, Registry};
use super::{identity, ComponentDescriptor, ComponentId};
use crate::error::{PickmeError, PickmeResult};
use crate::host::{DocumentHost, HostError, HostResult, NodeId};
use crate::maybe::Maybe;

/// An expected value next to the one found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference<T> {
    pub expected: T,
    pub actual: T,
}

/// An attribute whose value disagrees with the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMismatch {
    pub name: String,
    pub expected: String,
    pub actual: Maybe<String>,
}

/// Everything about an existing node that disagrees with a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mismatch {
    pub tag: Option<Difference<String>>,
    pub attributes: SmallVec<[AttributeMismatch; 2]>,
    pub text: Option<Difference<String>>,
}

impl Mismatch {
    /// Compare a node against a descriptor.
    ///
    /// Returns `Absent` when the node satisfies the descriptor.
    pub fn between<H: DocumentHost + ?Sized>(
        host: &H,
        node: NodeId,
        descriptor: &ComponentDescriptor,
    ) -> Maybe<Self> {
        let mut mismatch = Self::default();

        let tag = host.tag_name(node).into_option().unwrap_or_default();
        if !tag.eq_ignore_ascii_case(&descriptor.tag) {
            mismatch.tag = Some(Difference {
                expected: descriptor.tag.clone(),
                actual: tag,
            });
        }

        for (name, expected) in &descriptor.attributes {
            let actual = host.get_attribute(node, name);
            if actual.get() != Some(expected) {
                mismatch.attributes.push(AttributeMismatch {
                    name: name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let text = host.get_text(node).into_option().unwrap_or_default();
        if text != descriptor.text {
            mismatch.text = Some(Difference {
                expected: descriptor.text.clone(),
                actual: text,
            });
        }

        Maybe::present(mismatch).filter(|m| !m.is_empty())
    }

    /// Check if nothing disagrees.
    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.attributes.is_empty() && self.text.is_none()
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(tag) = &self.tag {
            parts.push(format!(
                "tag expected `{}`, found `{}`",
                tag.expected, tag.actual
            ));
        }
        for attribute in &self.attributes {
            let actual = match attribute.actual.get() {
                Some(value) => format!("`{value}`"),
                None => "nothing".to_string(),
            };
            parts.push(format!(
                "attribute `{}` expected `{}`, found {}",
                attribute.name, attribute.expected, actual
            ));
        }
        if let Some(text) = &self.text {
            parts.push(format!(
                "text expected `{}`, found `{}`",
                text.expected, text.actual
            ));
        }
        f.write_str(&parts.join("; "))
    }
}

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The existing node already matched and was kept.
    Reused,

    /// No node existed, a new one was created.
    Created,

    /// The existing node disagreed and was destroyed and recreated.
    Replaced(Mismatch),
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Handle to the resulting binding.
    pub handle: ComponentHandle,

    /// The node now bound to the component.
    pub node: NodeId,

    /// What happened to get there.
    pub outcome: Outcome,
}

/// Runs reconciliation against one registry.
pub struct Reconciler<'a, H: DocumentHost + ?Sized> {
    registry: &'a mut Registry<H>,

    /// Component used as parent when the requested one does not resolve.
    fallback: Maybe<ComponentId>,
}

impl<'a, H: DocumentHost + ?Sized> Reconciler<'a, H> {
    pub fn new(registry: &'a mut Registry<H>, fallback: Maybe<ComponentId>) -> Self {
        Self { registry, fallback }
    }

    /// Resolve the parent of `descriptor`, falling back to the default container.
    pub fn resolve_parent(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> PickmeResult<(ComponentId, NodeId)> {
        let registry = &*self.registry;
        let fallback = self.fallback.clone();

        registry
            .lookup(&descriptor.parent_id)
            .map(|node| (descriptor.parent_id.clone(), node))
            .or_else(|| {
                fallback.and_then(|id| {
                    registry
                        .lookup(&id)
                        .tap(|_| {
                            debug!(
                                component = %descriptor.id,
                                requested = %descriptor.parent_id,
                                fallback = %id,
                                "parent missing, using default container"
                            )
                        })
                        .map(|node| (id, node))
                })
            })
            .into_option()
            .ok_or_else(|| PickmeError::MissingParent {
                parent: descriptor.parent_id.clone(),
                component: descriptor.id.clone(),
            })
    }

    /// Reuse, replace or create the node for `descriptor`.
    pub fn reconcile(&mut self, descriptor: &ComponentDescriptor) -> PickmeResult<Reconciled> {
        let parent = self.resolve_parent(descriptor)?;
        let existing = self.registry.lookup(&descriptor.id);
        self.apply(descriptor, parent, existing)
    }

    /// Like `reconcile`, but only for a component that already exists under
    /// the requested parent. Never creates.
    ///
    /// The parent is taken literally: the fallback container is not
    /// consulted, and a missing parent is `ComponentNotFound`.
    pub fn reconcile_existing(
        &mut self,
        descriptor: &ComponentDescriptor,
    ) -> PickmeResult<Reconciled> {
        let not_found = || PickmeError::not_found(&descriptor.id);

        let Maybe::Present(parent) = self.registry.lookup(&descriptor.parent_id) else {
            return Err(not_found());
        };
        let Maybe::Present(node) = self.registry.lookup(&descriptor.id) else {
            return Err(not_found());
        };

        let host = self.registry.host();
        if parent == node || !host.contains(parent, node) {
            return Err(not_found());
        }

        self.apply(
            descriptor,
            (descriptor.parent_id.clone(), parent),
            Maybe::present(node),
        )
    }

    fn apply(
        &mut self,
        descriptor: &ComponentDescriptor,
        (parent_id, parent): (ComponentId, NodeId),
        existing: Maybe<NodeId>,
    ) -> PickmeResult<Reconciled> {
        let host = self.registry.host();

        let Maybe::Present(node) = existing else {
            let created = self.build(descriptor)?;
            host.append_child(parent, created)?;
            let handle = self.registry.bind(
                descriptor.id.clone(),
                created,
                Maybe::present(parent_id),
            )?;
            debug!(component = %descriptor.id, node = %created, "created component");
            return Ok(Reconciled {
                handle,
                node: created,
                outcome: Outcome::Created,
            });
        };

        if host.contains(node, parent) {
            return Err(HostError::HierarchyRequest {
                parent,
                child: node,
            }
            .into());
        }

        match Mismatch::between(host, node, descriptor) {
            Maybe::Absent => {
                // Nodes found in the document but not yet bound get adopted.
                let bound = self
                    .registry
                    .binding(&descriptor.id)
                    .is_some_and(|binding| binding.node == node);
                let handle = if bound {
                    self.registry
                        .handle(&descriptor.id)
                        .into_option()
                        .ok_or_else(|| PickmeError::not_found(&descriptor.id))?
                } else {
                    self.registry
                        .bind(descriptor.id.clone(), node, Maybe::present(parent_id))?
                };
                debug!(component = %descriptor.id, node = %node, "reused component");
                Ok(Reconciled {
                    handle,
                    node,
                    outcome: Outcome::Reused,
                })
            }
            Maybe::Present(mismatch) => {
                warn!(
                    component = %descriptor.id,
                    %mismatch,
                    "component does not match, recreating"
                );

                let created = self.build(descriptor)?;
                let host = self.registry.host();
                if host.parent(node) == Maybe::Present(parent) {
                    host.replace_node(node, created)?;
                } else {
                    host.append_child(parent, created)?;
                    host.remove_node(node)?;
                }

                self.registry.unbind(&descriptor.id);
                let handle = self.registry.bind(
                    descriptor.id.clone(),
                    created,
                    Maybe::present(parent_id),
                )?;
                Ok(Reconciled {
                    handle,
                    node: created,
                    outcome: Outcome::Replaced(mismatch),
                })
            }
        }
    }

    /// Build a detached node for `descriptor`.
    fn build(&self, descriptor: &ComponentDescriptor) -> HostResult<NodeId> {
        let host = self.registry.host();
        let node = host.create_element(&descriptor.tag);
        for (name, value) in &descriptor.attributes {
            host.set_attribute(node, name, value)?;
        }
        host.set_text(node, &descriptor.text)?;
        identity::stamp(host, self.registry.style(), node, &descriptor.id)?;
        Ok(node)
    }
}
