//! Identity Attributes
//!
//! Components are found again through an attribute written onto their node,
//! not through a held reference. This keeps external relocation or removal
//! observable: whatever the document says is the truth.
//!
//! Two conventions are supported:
//!
//! - `Value`: one reserved attribute whose value is the identifier,
//!   `data-pickme-component="<id>"`.
//! - `Presence`: one attribute per identifier, `data-component-<id>`, whose
//!   value is ignored.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::ComponentId;
use crate::host::{DocumentHost, HostResult, NodeId};
use crate::maybe::Maybe;

/// Default attribute for the `Value` style.
pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "data-pickme-component";

/// Default prefix for the `Presence` style.
pub const DEFAULT_IDENTITY_PREFIX: &str = "data-component-";

/// How a component identifier is written into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum IdentityStyle {
    /// `attribute="<id>"`
    Value {
        #[serde(default = "default_attribute")]
        attribute: String,
    },

    /// `<prefix><id>` with an empty value.
    Presence {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
}

fn default_attribute() -> String {
    DEFAULT_IDENTITY_ATTRIBUTE.to_string()
}

fn default_prefix() -> String {
    DEFAULT_IDENTITY_PREFIX.to_string()
}

impl Default for IdentityStyle {
    fn default() -> Self {
        Self::Value {
            attribute: default_attribute(),
        }
    }
}

impl IdentityStyle {
    /// Attribute name and exact value that mark a node as `id`.
    ///
    /// A `None` value means only the attribute's presence matters.
    pub fn selector<'a>(&'a self, id: &'a ComponentId) -> (Cow<'a, str>, Option<&'a str>) {
        match self {
            Self::Value { attribute } => (Cow::Borrowed(attribute.as_str()), Some(id.as_str())),
            Self::Presence { prefix } => (Cow::Owned(format!("{prefix}{id}")), None),
        }
    }

    /// Check whether `node` is stamped with `id`.
    pub fn is_stamped<H: DocumentHost + ?Sized>(
        &self,
        host: &H,
        node: NodeId,
        id: &ComponentId,
    ) -> bool {
        let (name, value) = self.selector(id);
        host.get_attribute(node, &name)
            .filter(|actual| value.map_or(true, |expected| actual == expected))
            .is_present()
    }
}

/// Find the connected node bound to `id`.
pub fn query_by_identity<H: DocumentHost + ?Sized>(
    host: &H,
    style: &IdentityStyle,
    id: &ComponentId,
) -> Maybe<NodeId> {
    let (name, value) = style.selector(id);
    host.query_attribute(&name, value)
}

/// Find every connected node stamped with `id`.
pub fn query_all_by_identity<H: DocumentHost + ?Sized>(
    host: &H,
    style: &IdentityStyle,
    id: &ComponentId,
) -> Vec<NodeId> {
    let (name, value) = style.selector(id);
    host.query_all_attribute(&name, value)
}

/// Write the identity attribute for `id` onto `node`.
pub fn stamp<H: DocumentHost + ?Sized>(
    host: &H,
    style: &IdentityStyle,
    node: NodeId,
    id: &ComponentId,
) -> HostResult<()> {
    let (name, value) = style.selector(id);
    host.set_attribute(node, &name, value.unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn value_style_selector() {
        let style = IdentityStyle::default();
        let id = ComponentId::from("card");
        let (name, value) = style.selector(&id);
        assert_eq!(name, "data-pickme-component");
        assert_eq!(value, Some("card"));
    }

    #[test]
    fn presence_style_selector() {
        let style = IdentityStyle::Presence {
            prefix: DEFAULT_IDENTITY_PREFIX.to_string(),
        };
        let id = ComponentId::from("card");
        let (name, value) = style.selector(&id);
        assert_eq!(name, "data-component-card");
        assert_eq!(value, None);
    }

    #[test]
    fn stamp_then_query() {
        let host = MemoryHost::new();
        let style = IdentityStyle::default();
        let id = ComponentId::from("card");
        let node = host.create_element("div");

        stamp(&host, &style, node, &id).unwrap();
        assert!(style.is_stamped(&host, node, &id));
        assert!(query_by_identity(&host, &style, &id).is_absent());

        host.append_child(host.document(), node).unwrap();
        assert_eq!(query_by_identity(&host, &style, &id), Maybe::Present(node));
    }

    #[test]
    fn presence_style_finds_every_stamped_node() {
        let host = MemoryHost::new();
        let style = IdentityStyle::Presence {
            prefix: DEFAULT_IDENTITY_PREFIX.to_string(),
        };
        let id = ComponentId::from("test");
        let nodes: Vec<_> = (0..2).map(|_| host.create_element("div")).collect();
        for (index, &node) in nodes.iter().enumerate() {
            host.set_attribute(node, "data-component-test", &(index + 1).to_string())
                .unwrap();
            host.append_child(host.document(), node).unwrap();
        }

        assert_eq!(query_all_by_identity(&host, &style, &id), nodes);
        assert_eq!(
            host.get_attribute(nodes[0], "data-component-test"),
            Maybe::present("1".to_string())
        );
    }

    #[test]
    fn style_parses_from_json() {
        let style: IdentityStyle =
            serde_json::from_str(r#"{"style": "presence"}"#).unwrap();
        assert_eq!(
            style,
            IdentityStyle::Presence {
                prefix: "data-component-".to_string()
            }
        );
    }
}
