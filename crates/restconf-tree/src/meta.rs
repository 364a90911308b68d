/// Schema classification of a selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Container or module root; content is an object of children.
    Container,
    /// A whole list; content is an array of entries.
    List,
    /// One keyed list entry; content is an object.
    ListEntry,
    /// Terminal value.
    Leaf,
    /// RPC or action.
    Action {
        /// Whether the action declares input.
        input: bool,
        /// Whether the action declares output.
        output: bool,
    },
    /// Notification source.
    Notification,
}

/// Identity and classification of a node, as encoders and the dispatcher
/// need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMeta {
    module: String,
    namespace: Option<String>,
    ident: String,
    kind: NodeKind,
    depth: usize,
}

impl NodeMeta {
    /// Builds metadata for a node.
    ///
    /// `depth` counts path elements including the module root, so a
    /// top-level rpc sits at depth 2.
    pub fn new(
        module: impl Into<String>,
        ident: impl Into<String>,
        kind: NodeKind,
        depth: usize,
    ) -> Self {
        Self {
            module: module.into(),
            namespace: None,
            ident: ident.into(),
            kind,
            depth,
        }
    }

    /// Attaches the module's XML namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Name of the module that defines the node.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// XML namespace of the defining module.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local identifier.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Schema classification.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Path length including the module root.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// True for rpcs and actions.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self.kind, NodeKind::Action { .. })
    }

    /// True for notification sources.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self.kind, NodeKind::Notification)
    }

    /// True when the action declares input.
    #[must_use]
    pub const fn has_input(&self) -> bool {
        matches!(self.kind, NodeKind::Action { input: true, .. })
    }

    /// True when the action declares output.
    #[must_use]
    pub const fn has_output(&self) -> bool {
        matches!(self.kind, NodeKind::Action { output: true, .. })
    }
}
