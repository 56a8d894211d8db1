//! Event Helpers
//!
//! Thin wrappers over `DocumentHost::add_event_listener` that hand back a
//! `Subscription` instead of a bare listener ID.
//!
//! `delegate` attaches one listener to a container and forwards events to the
//! closest ancestor of the event target (inclusive) that carries a given
//! attribute. Delegated handlers keep working for children created after the
//! listener was attached, including nodes recreated by reconciliation.

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::host::{handler, DocumentHost, Event, HostResult, ListenerId, NodeId};
use crate::maybe::Maybe;

/// An attached listener that can be detached again.
#[must_use = "dropping a Subscription keeps the listener attached without a way to remove it"]
pub struct Subscription<H: DocumentHost + ?Sized> {
    host: Arc<H>,
    node: NodeId,
    event: String,
    listener: ListenerId,
}

impl<H: DocumentHost + ?Sized> Subscription<H> {
    /// The node the listener is attached to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The host-assigned listener ID.
    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Detach the listener. Returns whether it was still attached.
    pub fn unsubscribe(self) -> HostResult<bool> {
        self.host
            .remove_event_listener(self.node, &self.event, self.listener)
    }
}

/// Listen for `event` on `node`.
///
/// The callback receives the node the listener is attached to.
pub fn on<H, F>(host: &Arc<H>, node: NodeId, event: &str, callback: F) -> HostResult<Subscription<H>>
where
    H: DocumentHost + ?Sized,
    F: Fn(NodeId, &Event) + Send + Sync + 'static,
{
    let listener = host.add_event_listener(
        node,
        event,
        handler(move |e: &Event| callback(e.current_target, e)),
    )?;

    Ok(Subscription {
        host: host.clone(),
        node,
        event: event.to_string(),
        listener,
    })
}

/// Listen for `click` on `node`.
pub fn on_click<H, F>(host: &Arc<H>, node: NodeId, callback: F) -> HostResult<Subscription<H>>
where
    H: DocumentHost + ?Sized,
    F: Fn(NodeId, &Event) + Send + Sync + 'static,
{
    on(host, node, "click", callback)
}

/// Find the closest node from `start` up to `root` (both inclusive) carrying
/// `name`, optionally with an exact value.
pub fn closest<H: DocumentHost + ?Sized>(
    host: &H,
    start: NodeId,
    root: NodeId,
    name: &str,
    value: Option<&str>,
) -> Maybe<NodeId> {
    let mut current = Maybe::present(start);
    while let Maybe::Present(node) = current {
        let matched = host
            .get_attribute(node, name)
            .filter(|actual| value.map_or(true, |expected| actual == expected))
            .is_present();
        if matched {
            return Maybe::present(node);
        }
        if node == root {
            break;
        }
        current = host.parent(node);
    }
    Maybe::Absent
}

/// Listen for `event` on `root` and forward it to the closest matching
/// descendant of the target.
///
/// The callback receives the matched node. Events whose target has no
/// matching ancestor inside `root` are ignored.
pub fn delegate<H, F>(
    host: &Arc<H>,
    root: NodeId,
    event: &str,
    name: &str,
    value: Option<&str>,
    callback: F,
) -> HostResult<Subscription<H>>
where
    H: DocumentHost + ?Sized + 'static,
    F: Fn(NodeId, &Event) + Send + Sync + 'static,
{
    // The host owns the handler, so the handler must not own the host.
    let weak: Weak<H> = Arc::downgrade(host);
    let name = name.to_string();
    let value = value.map(str::to_string);

    let listener = host.add_event_listener(
        root,
        event,
        handler(move |e: &Event| {
            let Some(host) = weak.upgrade() else {
                return;
            };
            let matched = closest(host.as_ref(), e.target, root, &name, value.as_deref());
            if let Maybe::Present(node) = matched {
                trace!(node = %node, event = %e.name, "delegated event");
                callback(node, e);
            }
        }),
    )?;

    Ok(Subscription {
        host: host.clone(),
        node: root,
        event: event.to_string(),
        listener,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn on_click_passes_attached_node() {
        let host = Arc::new(MemoryHost::new());
        let node = host.create_element("button");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let subscription = on_click(&host, node, move |el, _| seen_clone.lock().push(el)).unwrap();
        host.dispatch_event(node, "click").unwrap();
        assert_eq!(*seen.lock(), vec![node]);

        assert!(subscription.unsubscribe().unwrap());
        host.dispatch_event(node, "click").unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn delegate_matches_closest_ancestor() {
        let host = Arc::new(MemoryHost::new());
        let list = host.create_element("ul");
        let item = host.create_element("li");
        let label = host.create_element("span");
        host.append_child(host.document(), list).unwrap();
        host.append_child(list, item).unwrap();
        host.append_child(item, label).unwrap();
        host.set_attribute(item, "data-component-item", "").unwrap();

        let matched = Arc::new(Mutex::new(Vec::new()));
        let matched_clone = matched.clone();
        let _subscription = delegate(
            &host,
            list,
            "click",
            "data-component-item",
            None,
            move |node, _| matched_clone.lock().push(node),
        )
        .unwrap();

        host.dispatch_event(label, "click").unwrap();
        host.dispatch_event(list, "click").unwrap();

        assert_eq!(*matched.lock(), vec![item]);
    }

    #[test]
    fn delegate_sees_children_added_later() {
        let host = Arc::new(MemoryHost::new());
        let root = host.create_element("div");
        host.append_child(host.document(), root).unwrap();

        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();
        let _subscription = delegate(&host, root, "click", "role", Some("button"), move |_, _| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let late = host.create_element("div");
        host.set_attribute(late, "role", "button").unwrap();
        host.append_child(root, late).unwrap();
        host.dispatch_event(late, "click").unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closest_stops_at_root() {
        let host = MemoryHost::new();
        let outer = host.create_element("div");
        let inner = host.create_element("div");
        host.set_attribute(outer, "data-x", "").unwrap();
        host.append_child(outer, inner).unwrap();

        assert_eq!(closest(&host, inner, inner, "data-x", None), Maybe::Absent);
        assert_eq!(
            closest(&host, inner, outer, "data-x", None),
            Maybe::Present(outer)
        );
    }
}
