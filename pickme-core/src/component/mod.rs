//! Components
//!
//! This module implements the heart of the crate: describing components,
//! binding them to document nodes by identity, and reconciling requested
//! shapes against what the document currently holds.
//!
//! # Concepts
//!
//! ## Descriptors
//!
//! A `ComponentDescriptor` names a component, its parent, and the tag,
//! attributes and text it should have. Descriptors express desired state only.
//!
//! ## Identity
//!
//! Every bound node carries an identity attribute naming its component, so it
//! can be found again by querying the document rather than by holding a
//! reference to it.
//!
//! ## Registry
//!
//! The `Registry` records which node is bound to which identifier, which
//! parent it was materialized under, and issues generation-stamped
//! `ComponentHandle`s.
//!
//! ## Reconciliation
//!
//! The `Reconciler` decides, per request, whether to reuse, replace or create
//! a node. Mismatches always destroy and recreate; there is no partial patch.

mod descriptor;
mod identity;
mod reconcile;
mod registry;

pub use descriptor::{ComponentDescriptor, ComponentId, RootSpec};
pub use identity::{
    query_all_by_identity, query_by_identity, stamp, IdentityStyle, DEFAULT_IDENTITY_ATTRIBUTE,
    DEFAULT_IDENTITY_PREFIX,
};
pub use reconcile::{AttributeMismatch, Difference, Mismatch, Outcome, Reconciled, Reconciler};
pub use registry::{Binding, ComponentHandle, Registry};
