//! Pickme Core
//!
//! This crate provides the core of the Pickme client-side component manager.
//! Given declarative descriptions of UI fragments, it creates, locates,
//! reconciles and mutates nodes in a live document tree while tracking
//! component identity through an explicit registry.
//!
//! It implements:
//!
//! - A present-or-absent value type for lookup chains
//! - The document host capability, plus an in-memory host
//! - Identity attributes and the component registry
//! - The reuse / replace / create reconciliation engine
//! - The instance manager with chainable component mutations
//! - Event listener helpers
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `maybe`: `Maybe<T>`, the value type every lookup returns
//! - `host`: the `DocumentHost` trait and `MemoryHost`
//! - `component`: descriptors, identity, registry and reconciliation
//! - `instance`: `Instance` and the `ComponentRef` chain
//! - `events`: subscriptions and event delegation
//! - `config`: instance configuration
//! - `error`: the error taxonomy
//!
//! # Logging
//!
//! Everything is logged through `tracing`. Installing a subscriber is up to
//! the application.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pickme_core::{ComponentDescriptor, Instance, MemoryHost, PickmeConfig, RootSpec};
//!
//! let host = Arc::new(MemoryHost::with_mount_point("app"));
//! let instance = Instance::create(
//!     host,
//!     PickmeConfig::default(),
//!     RootSpec::new("root", "div").attr("class", "example").text("Some text"),
//!     Vec::new(),
//! )?;
//!
//! instance
//!     .add_component(
//!         &ComponentDescriptor::new("root", "example-child", "div")
//!             .attr("class", "example-child")
//!             .text("Child content"),
//!     )
//!     .add_class("highlighted")
//!     .set_text("Updated");
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod instance;
pub mod maybe;

pub use component::{
    ComponentDescriptor, ComponentHandle, ComponentId, IdentityStyle, Mismatch, Outcome,
    Reconciled, Registry, RootSpec,
};
pub use config::PickmeConfig;
pub use error::{PickmeError, PickmeResult};
pub use host::{handler, DocumentHost, Event, Handler, HostError, ListenerId, MemoryHost, NodeId};
pub use instance::{ComponentRef, Instance};
pub use maybe::Maybe;
