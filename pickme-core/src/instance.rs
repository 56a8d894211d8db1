//! Instance Manager
//!
//! An `Instance` owns one root component and the registry of everything
//! materialized beneath it. It is the entry point applications talk to.
//!
//! # Lifecycle
//!
//! 1. `Instance::create` finds the root by identity, or creates it and appends
//!    it to the mount point. Root attributes, text and handlers are applied
//!    either way.
//! 2. `add_component` reconciles descriptors under a parent, falling back to
//!    the root when configured to.
//! 3. `modify`, `register_event`, `add_class` and `set_text` mutate components
//!    that already exist.
//!
//! # Chaining
//!
//! `add_component` and `modify` return a `ComponentRef`, a short-lived
//! builder bound to the component they touched:
//!
//! ```rust,ignore
//! instance
//!     .modify(&descriptor)
//!     .add_class("third")
//!     .set_text("done");
//! ```
//!
//! A link that fails is reported once; the links after it are skipped.
//!
//! # Diagnostics
//!
//! Nothing here panics or unwinds past the call. Every failure is logged via
//! `tracing`, appended to the instance's diagnostics, and handed back to the
//! caller as a `Result`. The diagnostics buffer keeps only the most recent
//! `PickmeConfig::diagnostics_capacity` entries.
//!
//! # Re-entrancy
//!
//! All operations take `&self`. The registry lock is held only while the
//! document is being reconciled, never while event handlers run, so handlers
//! may call back into the instance.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, instrument};

use crate::component::{
    self, ComponentDescriptor, ComponentHandle, ComponentId, Outcome, Reconciled, Reconciler,
    Registry, RootSpec,
};
use crate::config::PickmeConfig;
use crate::error::{PickmeError, PickmeResult};
use crate::host::{DocumentHost, Handler, ListenerId, NodeId};
use crate::maybe::Maybe;

/// One mounted component tree.
pub struct Instance<H: DocumentHost + ?Sized> {
    host: Arc<H>,
    config: PickmeConfig,
    root: ComponentHandle,
    registry: RwLock<Registry<H>>,
    last_touched: Mutex<Maybe<ComponentHandle>>,
    diagnostics: Mutex<VecDeque<PickmeError>>,
}

impl<H: DocumentHost + ?Sized> Instance<H> {
    /// Resolve or create the root and bootstrap the registry.
    ///
    /// Fails with `MountPointMissing` when the root does not exist yet and the
    /// configured mount point cannot be found. Nothing is mutated in that case.
    #[instrument(level = "debug", skip_all, fields(root = %root.id))]
    pub fn create<I>(
        host: Arc<H>,
        config: PickmeConfig,
        root: RootSpec,
        handlers: I,
    ) -> PickmeResult<Self>
    where
        I: IntoIterator<Item = (String, Handler)>,
    {
        let mut registry = Registry::new(host.clone(), config.identity.clone());
        let existing = registry.lookup(&root.id);

        let mount = match existing {
            Maybe::Present(_) => Maybe::Absent,
            Maybe::Absent => {
                let mount = host.element_by_id(&config.mount_point);
                if mount.is_absent() {
                    let err = PickmeError::MountPointMissing {
                        mount_point: config.mount_point.clone(),
                        root: root.id.clone(),
                    };
                    error!(%err, "cannot mount root");
                    return Err(err);
                }
                mount
            }
        };

        let node = match existing {
            Maybe::Present(node) => node,
            Maybe::Absent => host.create_element(&root.tag),
        };

        for (name, value) in &root.attributes {
            host.set_attribute(node, name, value)?;
        }
        host.set_text(node, &root.text)?;
        for (event, handler) in handlers {
            host.add_event_listener(node, &event, handler)?;
        }

        if let Maybe::Present(mount) = mount {
            host.append_child(mount, node)?;
            debug!(node = %node, mount = %mount, "mounted new root");
        } else {
            debug!(node = %node, "adopted existing root");
        }

        let handle = registry.bind(root.id.clone(), node, Maybe::Absent)?;

        Ok(Self {
            host,
            config,
            root: handle.clone(),
            registry: RwLock::new(registry),
            last_touched: Mutex::new(Maybe::present(handle)),
            diagnostics: Mutex::new(VecDeque::new()),
        })
    }

    /// The document host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The configuration this instance was created with.
    pub fn config(&self) -> &PickmeConfig {
        &self.config
    }

    /// Handle to the root component.
    pub fn root(&self) -> &ComponentHandle {
        &self.root
    }

    /// The root node, if it is still in the document.
    pub fn root_node(&self) -> Maybe<NodeId> {
        self.registry.read().lookup(self.root.id())
    }

    /// Find the connected node carrying `id`'s identity attribute.
    pub fn lookup(&self, id: impl Into<ComponentId>) -> Maybe<NodeId> {
        self.registry.read().lookup(&id.into())
    }

    /// Every connected node stamped with `id`.
    pub fn components(&self, id: impl Into<ComponentId>) -> Vec<NodeId> {
        component::query_all_by_identity(self.host.as_ref(), &self.config.identity, &id.into())
    }

    /// A handle for the current binding of `id`.
    pub fn handle(&self, id: impl Into<ComponentId>) -> Maybe<ComponentHandle> {
        self.registry.read().handle(&id.into())
    }

    /// Resolve a handle to its node, if it is still current.
    pub fn resolve(&self, handle: &ComponentHandle) -> Maybe<NodeId> {
        self.registry.read().resolve(handle)
    }

    /// Components materialized under `parent`.
    pub fn children_of(&self, parent: impl Into<ComponentId>) -> Vec<ComponentId> {
        self.registry.read().children_of(&parent.into())
    }

    /// The component most recently created, modified or mutated.
    pub fn last_touched(&self) -> Maybe<ComponentHandle> {
        self.last_touched.lock().clone()
    }

    /// Reuse, replace or create the node for `descriptor`.
    #[instrument(level = "debug", skip_all, fields(component = %descriptor.id))]
    pub fn add_component(&self, descriptor: &ComponentDescriptor) -> ComponentRef<'_, H> {
        let result = {
            let mut registry = self.registry.write();
            Reconciler::new(&mut registry, self.fallback()).reconcile(descriptor)
        };
        self.settle(&descriptor.id, result)
    }

    /// Materialize several descriptors in order.
    ///
    /// A failing descriptor is reported and does not stop the ones after it.
    pub fn add_components(
        &self,
        descriptors: &[ComponentDescriptor],
    ) -> Vec<PickmeResult<ComponentHandle>> {
        descriptors
            .iter()
            .map(|descriptor| self.add_component(descriptor).into_result())
            .collect()
    }

    /// Reconcile an existing component under its parent. Never creates.
    ///
    /// Reports `ComponentNotFound` if the component does not exist under the
    /// requested parent, or the parent itself does not exist. The root
    /// fallback does not apply here.
    #[instrument(level = "debug", skip_all, fields(component = %descriptor.id))]
    pub fn modify(&self, descriptor: &ComponentDescriptor) -> ComponentRef<'_, H> {
        let result = {
            let mut registry = self.registry.write();
            Reconciler::new(&mut registry, self.fallback()).reconcile_existing(descriptor)
        };
        self.settle(&descriptor.id, result)
    }

    /// Attach `handler` for `event` to the component `id`.
    ///
    /// Each call attaches another listener; duplicates are not collapsed.
    #[instrument(
        level = "debug",
        skip_all,
        fields(event = %event, component = tracing::field::Empty)
    )]
    pub fn register_event(
        &self,
        id: impl Into<ComponentId>,
        event: &str,
        handler: Handler,
    ) -> PickmeResult<ListenerId> {
        let id = id.into();
        tracing::Span::current().record("component", tracing::field::display(&id));

        let Maybe::Present(node) = self.lookup(&id) else {
            return Err(self.report(PickmeError::not_found(id)));
        };
        self.host
            .add_event_listener(node, event, handler)
            .map_err(|err| self.report(err.into()))
    }

    /// Add a class token to the component behind `handle`.
    pub fn add_class(&self, handle: &ComponentHandle, class: &str) -> PickmeResult<()> {
        let node = self.resolve_or_report(handle)?;
        self.host
            .add_class(node, class)
            .map_err(|err| self.report(err.into()))?;
        self.touch(handle);
        Ok(())
    }

    /// Remove a class token from the component behind `handle`.
    pub fn remove_class(&self, handle: &ComponentHandle, class: &str) -> PickmeResult<bool> {
        let node = self.resolve_or_report(handle)?;
        let removed = self
            .host
            .remove_class(node, class)
            .map_err(|err| self.report(err.into()))?;
        self.touch(handle);
        Ok(removed)
    }

    /// Replace the text of the component behind `handle`.
    pub fn set_text(&self, handle: &ComponentHandle, text: &str) -> PickmeResult<()> {
        let node = self.resolve_or_report(handle)?;
        self.host
            .set_text(node, text)
            .map_err(|err| self.report(err.into()))?;
        self.touch(handle);
        Ok(())
    }

    /// Write an attribute on the component behind `handle`.
    pub fn set_attribute(
        &self,
        handle: &ComponentHandle,
        name: &str,
        value: &str,
    ) -> PickmeResult<()> {
        let node = self.resolve_or_report(handle)?;
        self.host
            .set_attribute(node, name, value)
            .map_err(|err| self.report(err.into()))?;
        self.touch(handle);
        Ok(())
    }

    /// Continue a chain from an existing handle.
    pub fn component(&self, handle: ComponentHandle) -> ComponentRef<'_, H> {
        ComponentRef {
            instance: self,
            handle: Ok(handle),
            outcome: Maybe::Absent,
        }
    }

    /// Drop the binding for a component whose node vanished.
    pub fn invalidate(&self, id: impl Into<ComponentId>) -> bool {
        self.registry.write().invalidate(&id.into())
    }

    /// Drop every binding whose node no longer resolves.
    pub fn prune(&self) -> Vec<ComponentId> {
        self.registry.write().prune()
    }

    /// The most recent reported conditions, oldest first.
    pub fn diagnostics(&self) -> Vec<PickmeError> {
        self.diagnostics.lock().iter().cloned().collect()
    }

    /// Drain the reported conditions.
    pub fn take_diagnostics(&self) -> Vec<PickmeError> {
        self.diagnostics.lock().drain(..).collect()
    }

    fn fallback(&self) -> Maybe<ComponentId> {
        Maybe::present(self.root.id().clone()).filter(|_| self.config.fallback_to_root)
    }

    fn resolve_or_report(&self, handle: &ComponentHandle) -> PickmeResult<NodeId> {
        self.resolve(handle)
            .into_option()
            .ok_or_else(|| self.report(PickmeError::not_found(handle.id())))
    }

    fn touch(&self, handle: &ComponentHandle) {
        *self.last_touched.lock() = Maybe::present(handle.clone());
    }

    /// Log a condition, record it, and give it back.
    fn report(&self, err: PickmeError) -> PickmeError {
        if !matches!(err, PickmeError::Mismatch { .. }) {
            error!(%err, "component operation failed");
        }
        let capacity = self.config.diagnostics_capacity;
        if capacity > 0 {
            let mut diagnostics = self.diagnostics.lock();
            while diagnostics.len() >= capacity {
                diagnostics.pop_front();
            }
            diagnostics.push_back(err.clone());
        }
        err
    }

    fn settle(
        &self,
        id: &ComponentId,
        result: PickmeResult<Reconciled>,
    ) -> ComponentRef<'_, H> {
        match result {
            Ok(Reconciled {
                handle, outcome, ..
            }) => {
                if let Outcome::Replaced(mismatch) = &outcome {
                    self.report(PickmeError::Mismatch {
                        component: id.clone(),
                        mismatch: mismatch.clone(),
                    });
                }
                self.touch(&handle);
                ComponentRef {
                    instance: self,
                    handle: Ok(handle),
                    outcome: Maybe::present(outcome),
                }
            }
            Err(err) => ComponentRef {
                instance: self,
                handle: Err(self.report(err)),
                outcome: Maybe::Absent,
            },
        }
    }
}

impl<H: DocumentHost + ?Sized> fmt::Debug for Instance<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("registry", &*self.registry.read())
            .finish()
    }
}

/// A chain of mutations on one component.
///
/// Produced by `Instance::add_component`, `Instance::modify` and
/// `Instance::component`. Once a link fails, the remaining links are skipped.
#[must_use = "a ComponentRef carries the result of the operation that produced it"]
pub struct ComponentRef<'a, H: DocumentHost + ?Sized> {
    instance: &'a Instance<H>,
    handle: PickmeResult<ComponentHandle>,
    outcome: Maybe<Outcome>,
}

impl<'a, H: DocumentHost + ?Sized> ComponentRef<'a, H> {
    /// Add a class token.
    pub fn add_class(self, class: &str) -> Self {
        self.then(|instance, handle| instance.add_class(handle, class))
    }

    /// Remove a class token.
    pub fn remove_class(self, class: &str) -> Self {
        self.then(|instance, handle| instance.remove_class(handle, class).map(|_| ()))
    }

    /// Replace the text.
    pub fn set_text(self, text: &str) -> Self {
        self.then(|instance, handle| instance.set_text(handle, text))
    }

    /// Write an attribute.
    pub fn set_attribute(self, name: &str, value: &str) -> Self {
        self.then(|instance, handle| instance.set_attribute(handle, name, value))
    }

    /// Attach an event handler.
    pub fn on(self, event: &str, handler: Handler) -> Self {
        self.then(|instance, handle| {
            instance
                .register_event(handle.id(), event, handler)
                .map(|_| ())
        })
    }

    /// The handle this chain operates on.
    pub fn handle(&self) -> Maybe<ComponentHandle> {
        Maybe::of(self.handle.as_ref().ok().cloned())
    }

    /// The node behind the handle, if it is still current.
    pub fn node(&self) -> Maybe<NodeId> {
        Maybe::of(self.handle.as_ref().ok()).and_then(|handle| self.instance.resolve(handle))
    }

    /// What reconciliation did, for chains started by `add_component` or `modify`.
    pub fn outcome(&self) -> Maybe<&Outcome> {
        self.outcome.as_ref()
    }

    /// The failure that stopped this chain, if any.
    pub fn error(&self) -> Option<&PickmeError> {
        self.handle.as_ref().err()
    }

    /// Check if every link so far succeeded.
    pub fn is_ok(&self) -> bool {
        self.handle.is_ok()
    }

    /// Finish the chain.
    pub fn into_result(self) -> PickmeResult<ComponentHandle> {
        self.handle
    }

    fn then<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&'a Instance<H>, &ComponentHandle) -> PickmeResult<()>,
    {
        let failure = match &self.handle {
            Ok(handle) => step(self.instance, handle).err(),
            Err(err) => {
                debug!(%err, "skipping link after earlier failure");
                None
            }
        };
        if let Some(err) = failure {
            self.handle = Err(err);
        }
        self
    }
}

impl<H: DocumentHost + ?Sized> fmt::Debug for ComponentRef<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("handle", &self.handle)
            .field("outcome", &self.outcome)
            .finish()
    }
}
