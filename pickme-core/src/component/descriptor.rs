//! Component Descriptors
//!
//! A descriptor is the requested shape of one component: where it lives,
//! what it is called, and what it should look like. Descriptors are consumed
//! by the reconciler and never stored.

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PickmeResult;

/// Opaque identifier naming one component within an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Create an identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ComponentId> for ComponentId {
    fn from(id: &ComponentId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Requested shape of a component.
///
/// Attribute matching is a subset constraint: attributes present on a node
/// but not listed here never count as a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// The component this one is nested under.
    pub parent_id: ComponentId,

    /// This component's identifier.
    pub id: ComponentId,

    /// Element tag name.
    pub tag: String,

    /// Attributes the element must carry, in application order.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// The element's text.
    #[serde(default)]
    pub text: String,
}

impl ComponentDescriptor {
    /// Describe a component with no attributes and empty text.
    pub fn new(
        parent_id: impl Into<ComponentId>,
        id: impl Into<ComponentId>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            id: id.into(),
            tag: tag.into(),
            attributes: IndexMap::new(),
            text: String::new(),
        }
    }

    /// Add or overwrite an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Parse a single descriptor from JSON.
    pub fn from_json(json: &str) -> PickmeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a list of descriptors from a JSON array.
    pub fn list_from_json(json: &str) -> PickmeResult<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Shape of an instance's root element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpec {
    /// Identifier of the root component.
    pub id: ComponentId,

    /// Element tag name, used when the root has to be created.
    pub tag: String,

    /// Attributes applied to the root, whether found or created.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Text applied to the root.
    #[serde(default)]
    pub text: String,
}

impl RootSpec {
    pub fn new(id: impl Into<ComponentId>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            attributes: IndexMap::new(),
            text: String::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}
