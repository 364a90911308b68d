use std::sync::Arc;

use serde_json::Value;

use super::path::decode;
use crate::errors::TreeError;
use crate::meta::{NodeKind, NodeMeta};
use crate::scope::RequestScope;
use crate::selection::{Browser, Selection, ValueNode};

/// Read-only browser over a fixed JSON document.
///
/// Path segments select object members; every selected node is a
/// [`ValueNode`], so writes, actions and subscriptions are refused.
#[derive(Debug, Clone)]
pub struct StaticBrowser {
    module: String,
    namespace: String,
    root: Value,
}

impl StaticBrowser {
    /// Serves `root` as the content of `module`.
    pub fn new(module: impl Into<String>, namespace: impl Into<String>, root: Value) -> Self {
        Self {
            module: module.into(),
            namespace: namespace.into(),
            root,
        }
    }
}

fn kind_of(value: &Value) -> NodeKind {
    match value {
        Value::Object(_) => NodeKind::Container,
        Value::Array(_) => NodeKind::List,
        _ => NodeKind::Leaf,
    }
}

impl Browser for StaticBrowser {
    fn module(&self) -> &str {
        &self.module
    }

    fn select(
        &self,
        path: &str,
        _scope: &RequestScope,
    ) -> Result<Option<Arc<dyn Selection>>, TreeError> {
        let segments: Vec<_> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();
        let Some(value) = segments
            .iter()
            .try_fold(&self.root, |value, segment| value.get(&**segment))
        else {
            return Ok(None);
        };
        let ident = segments
            .last()
            .map_or(self.module.as_str(), |segment| &**segment);
        let meta = NodeMeta::new(&self.module, ident, kind_of(value), segments.len() + 1)
            .with_namespace(&self.namespace);
        Ok(Some(Arc::new(ValueNode::new(meta, value.clone()))))
    }
}
