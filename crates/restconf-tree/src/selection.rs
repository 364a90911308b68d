//! Node-level operations the gateway performs on behalf of HTTP verbs.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::TreeError;
use crate::meta::NodeMeta;
use crate::notification::{NotifyCallback, NotifyCloser};
use crate::scope::RequestScope;

/// Decoded request body: top-level member names without module prefixes.
pub type Payload = Map<String, Value>;

/// Readable node content plus the metadata encoders need.
pub trait TreeData: Send + Sync {
    /// Identity and classification of the node.
    fn meta(&self) -> &NodeMeta;

    /// Current value of the node.
    ///
    /// Containers and list entries produce objects keyed by unqualified child
    /// names, lists produce arrays and leaves produce scalars.
    fn content(&self) -> Result<Value, TreeError>;
}

/// A resolved node that can be read and, where the model allows, written,
/// invoked or subscribed to.
///
/// The write, action and subscription operations default to
/// [`TreeError::Unsupported`] so read-only trees only implement
/// [`TreeData`].
pub trait Selection: TreeData {
    /// Removes the node.
    fn delete(&self) -> Result<(), TreeError> {
        Err(unsupported(self.meta(), "delete"))
    }

    /// Creates children from `payload`; existing children are a conflict.
    fn insert_from(&self, payload: Payload) -> Result<(), TreeError> {
        let _ = payload;
        Err(unsupported(self.meta(), "create"))
    }

    /// Merges `payload` into the node.
    fn upsert_from(&self, payload: Payload) -> Result<(), TreeError> {
        let _ = payload;
        Err(unsupported(self.meta(), "merge"))
    }

    /// Replaces the node's content with `payload`.
    fn replace_from(&self, payload: Payload) -> Result<(), TreeError> {
        let _ = payload;
        Err(unsupported(self.meta(), "replace"))
    }

    /// Invokes an rpc or action.
    fn action(&self, input: Option<Payload>) -> Result<Option<Box<dyn TreeData>>, TreeError> {
        let _ = input;
        Err(unsupported(self.meta(), "invoke"))
    }

    /// Registers `callback` for every event the node raises.
    fn subscribe(&self, callback: NotifyCallback) -> Result<NotifyCloser, TreeError> {
        let _ = callback;
        Err(unsupported(self.meta(), "subscribe to"))
    }
}

fn unsupported(meta: &NodeMeta, verb: &str) -> TreeError {
    TreeError::unsupported(format!("cannot {verb} '{}:{}'", meta.module(), meta.ident()))
}

/// Resolves paths within one module.
pub trait Browser: Send + Sync {
    /// Module served by this browser.
    fn module(&self) -> &str;

    /// Resolves `path`, relative to the module root, to a node.
    ///
    /// `path` arrives as sent on the wire: implementations split it on `/`
    /// and `=` before percent-decoding identifiers and key values. An empty
    /// path selects the module root. `Ok(None)` means the path is
    /// valid for the model but no data exists there.
    fn select(
        &self,
        path: &str,
        scope: &RequestScope,
    ) -> Result<Option<Arc<dyn Selection>>, TreeError>;
}

/// Detached, read-only node holding a value.
///
/// Used for action output, event payloads and static descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    meta: NodeMeta,
    value: Value,
}

impl ValueNode {
    /// Pairs metadata with a value.
    #[must_use]
    pub const fn new(meta: NodeMeta, value: Value) -> Self {
        Self { meta, value }
    }

    /// Borrowed value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl TreeData for ValueNode {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn content(&self) -> Result<Value, TreeError> {
        Ok(self.value.clone())
    }
}

impl Selection for ValueNode {}
