//! Minimal module schema: enough structure to classify nodes, validate
//! payloads and key list entries.

use serde::{Deserialize, Serialize};

use crate::meta::NodeKind;

/// One schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SchemaNode {
    /// Grouping of child nodes.
    Container {
        /// Identifier.
        ident: String,
        /// Child definitions.
        #[serde(default)]
        children: Vec<SchemaNode>,
    },
    /// Keyed sequence of entries.
    List {
        /// Identifier.
        ident: String,
        /// Leaf identifying each entry.
        key: String,
        /// Entry definitions.
        #[serde(default)]
        children: Vec<SchemaNode>,
    },
    /// Terminal value.
    Leaf {
        /// Identifier.
        ident: String,
    },
    /// RPC (top level) or action (nested).
    Action {
        /// Identifier.
        ident: String,
        /// Input definitions, when the action takes input.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Vec<SchemaNode>>,
        /// Output definitions, when the action returns output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Vec<SchemaNode>>,
    },
    /// Event source.
    Notification {
        /// Identifier.
        ident: String,
        /// Event payload definitions.
        #[serde(default)]
        children: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    /// Container definition.
    pub fn container(ident: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Container {
            ident: ident.into(),
            children,
        }
    }

    /// List definition keyed by `key`.
    pub fn list(ident: impl Into<String>, key: impl Into<String>, children: Vec<Self>) -> Self {
        Self::List {
            ident: ident.into(),
            key: key.into(),
            children,
        }
    }

    /// Leaf definition.
    pub fn leaf(ident: impl Into<String>) -> Self {
        Self::Leaf {
            ident: ident.into(),
        }
    }

    /// Action definition.
    pub fn action(
        ident: impl Into<String>,
        input: Option<Vec<Self>>,
        output: Option<Vec<Self>>,
    ) -> Self {
        Self::Action {
            ident: ident.into(),
            input,
            output,
        }
    }

    /// Notification definition.
    pub fn notification(ident: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Notification {
            ident: ident.into(),
            children,
        }
    }

    /// Identifier.
    #[must_use]
    pub fn ident(&self) -> &str {
        match self {
            Self::Container { ident, .. }
            | Self::List { ident, .. }
            | Self::Leaf { ident }
            | Self::Action { ident, .. }
            | Self::Notification { ident, .. } => ident,
        }
    }

    /// Data children; empty for leaves and actions.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Container { children, .. }
            | Self::List { children, .. }
            | Self::Notification { children, .. } => children,
            Self::Leaf { .. } | Self::Action { .. } => &[],
        }
    }

    /// Classification when the node itself is selected.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Container { .. } => NodeKind::Container,
            Self::List { .. } => NodeKind::List,
            Self::Leaf { .. } => NodeKind::Leaf,
            Self::Action { input, output, .. } => NodeKind::Action {
                input: input.is_some(),
                output: output.is_some(),
            },
            Self::Notification { .. } => NodeKind::Notification,
        }
    }

    /// True for nodes that hold configuration or state data.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(
            self,
            Self::Container { .. } | Self::List { .. } | Self::Leaf { .. }
        )
    }
}

pub(crate) fn find<'a>(nodes: &'a [SchemaNode], ident: &str) -> Option<&'a SchemaNode> {
    nodes.iter().find(|node| node.ident() == ident)
}

/// Schema of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSchema {
    /// Module name, used as the JSON member prefix.
    pub name: String,
    /// XML namespace.
    pub namespace: String,
    /// Top-level definitions.
    #[serde(default)]
    pub nodes: Vec<SchemaNode>,
}

impl ModuleSchema {
    /// Empty module.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            nodes: Vec::new(),
        }
    }

    /// Adds a top-level definition.
    #[must_use]
    pub fn with_node(mut self, node: SchemaNode) -> Self {
        self.nodes.push(node);
        self
    }
}
