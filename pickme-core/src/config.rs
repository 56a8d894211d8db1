//! Instance Configuration
//!
//! Settings that decide how an instance finds and stamps its components.
//! Every field has a default, so an empty JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::component::IdentityStyle;
use crate::error::PickmeResult;

/// Default `id` of the mount point element.
pub const DEFAULT_MOUNT_POINT: &str = "app";

/// Default number of diagnostics an instance keeps.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 64;

/// Configuration for an `Instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PickmeConfig {
    /// Identity attribute convention.
    pub identity: IdentityStyle,

    /// `id` attribute of the element a newly created root is appended to.
    pub mount_point: String,

    /// Use the instance root as parent when a requested parent is missing.
    pub fallback_to_root: bool,

    /// Most recent diagnostics kept by an instance. Older ones are dropped.
    /// Zero disables recording; everything is still logged.
    pub diagnostics_capacity: usize,
}

impl Default for PickmeConfig {
    fn default() -> Self {
        Self {
            identity: IdentityStyle::default(),
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            fallback_to_root: true,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }
}

impl PickmeConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> PickmeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_identity(mut self, identity: IdentityStyle) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    pub fn with_fallback_to_root(mut self, enabled: bool) -> Self {
        self.fallback_to_root = enabled;
        self
    }

    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }
}
