//! Error Types
//!
//! Every condition the core can report. None of them is fatal: operations
//! either fall back (recreate on mismatch) or leave the document untouched,
//! and the caller decides whether to escalate.

use thiserror::Error;

use crate::component::{ComponentId, Mismatch};
use crate::host::HostError;

/// Result type used throughout the crate.
pub type PickmeResult<T> = Result<T, PickmeError>;

/// A condition reported by the component core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PickmeError {
    /// The requested parent does not resolve and there is no fallback container.
    #[error("parent component \"{parent}\" does not exist (requested by \"{component}\")")]
    MissingParent {
        parent: ComponentId,
        component: ComponentId,
    },

    /// The root could not be attached: no existing root and no mount point.
    #[error("mount point \"#{mount_point}\" is missing and root \"{root}\" does not exist")]
    MountPointMissing { mount_point: String, root: ComponentId },

    /// An existing node disagrees with the requested shape.
    #[error("component \"{component}\" does not match the requested shape: {mismatch}")]
    Mismatch {
        component: ComponentId,
        mismatch: Mismatch,
    },

    /// A mutation targeted a component with no live binding.
    #[error("component \"{component}\" not found")]
    ComponentNotFound { component: ComponentId },

    /// The document host rejected an operation.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Configuration or descriptor input could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PickmeError {
    /// Build a `ComponentNotFound` for the given id.
    pub fn not_found(component: impl Into<ComponentId>) -> Self {
        Self::ComponentNotFound {
            component: component.into(),
        }
    }
}

impl From<serde_json::Error> for PickmeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
