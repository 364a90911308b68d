//! Path resolution against a [`ModuleSchema`] and navigation within JSON
//! data.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use serde_json::Value;

use super::schema::{ModuleSchema, SchemaNode, find};
use crate::errors::TreeError;
use crate::meta::{NodeKind, NodeMeta};

/// One hop from a parent value to a child value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Locator {
    Field(String),
    Entry { key: String, value: String },
}

/// Outcome of resolving a path against the schema.
#[derive(Debug, Clone)]
pub(crate) struct Resolved<'s> {
    pub meta: NodeMeta,
    pub locators: Vec<Locator>,
    pub schema_path: String,
    /// `None` for the module root.
    pub node: Option<&'s SchemaNode>,
}

struct Step<'p> {
    ident: Cow<'p, str>,
    key: Option<Cow<'p, str>>,
}

/// Percent-decodes one identifier or key value.
pub(crate) fn decode(text: &str) -> Cow<'_, str> {
    percent_decode_str(text).decode_utf8_lossy()
}

/// Splits on `/` and `=` first, then decodes, so keys may hold `/` or `=`.
fn steps(path: &str) -> Vec<Step<'_>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((ident, key)) => Step {
                ident: decode(ident),
                key: Some(decode(key)),
            },
            None => Step {
                ident: decode(segment),
                key: None,
            },
        })
        .collect()
}

/// Resolves `path` (relative to the module root, segments percent-encoded)
/// to schema metadata and a data locator.
pub(crate) fn resolve<'s>(schema: &'s ModuleSchema, path: &str) -> Result<Resolved<'s>, TreeError> {
    let steps = steps(path);
    let mut nodes = schema.nodes.as_slice();
    let mut locators = Vec::new();
    let mut idents: Vec<&str> = Vec::new();
    let mut kind = NodeKind::Container;
    let mut ident = schema.name.as_str();
    let mut current = None;
    let last = steps.len().saturating_sub(1);

    for (index, step) in steps.iter().enumerate() {
        let node = find(nodes, &step.ident).ok_or_else(|| {
            TreeError::not_found(format!(
                "'{}' is not defined in module '{}'",
                step.ident, schema.name
            ))
        })?;
        let terminal = !matches!(node, SchemaNode::Container { .. } | SchemaNode::List { .. });
        if terminal && index != last {
            return Err(TreeError::invalid_input(format!(
                "'{}' has no children",
                step.ident
            )));
        }
        if step.key.is_some() && !matches!(node, SchemaNode::List { .. }) {
            return Err(TreeError::invalid_input(format!(
                "'{}' is not a list",
                step.ident
            )));
        }

        locators.push(Locator::Field(node.ident().to_owned()));
        kind = node.kind();
        if let SchemaNode::List { key, .. } = node {
            match &step.key {
                Some(value) => {
                    locators.push(Locator::Entry {
                        key: key.clone(),
                        value: value.clone().into_owned(),
                    });
                    kind = NodeKind::ListEntry;
                }
                None if index != last => {
                    return Err(TreeError::invalid_input(format!(
                        "list '{}' requires a key",
                        step.ident
                    )));
                }
                None => {}
            }
        }

        idents.push(node.ident());
        ident = node.ident();
        nodes = node.children();
        current = Some(node);
    }

    let meta = NodeMeta::new(&schema.name, ident, kind, steps.len() + 1)
        .with_namespace(&schema.namespace);
    Ok(Resolved {
        meta,
        locators,
        schema_path: idents.join("/"),
        node: current,
    })
}

/// Compares a key leaf with its textual form from a path.
pub(crate) fn scalar_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(text) => text == expected,
        other => other.to_string() == expected,
    }
}

pub(crate) fn key_matches(entry: &Value, key: &str, expected: &str) -> bool {
    entry
        .get(key)
        .is_some_and(|value| scalar_matches(value, expected))
}

pub(crate) fn locate<'v>(root: &'v Value, locators: &[Locator]) -> Option<&'v Value> {
    locators.iter().try_fold(root, |value, locator| match locator {
        Locator::Field(name) => value.get(name),
        Locator::Entry { key, value: wanted } => value
            .as_array()?
            .iter()
            .find(|entry| key_matches(entry, key, wanted)),
    })
}

pub(crate) fn locate_mut<'v>(root: &'v mut Value, locators: &[Locator]) -> Option<&'v mut Value> {
    locators.iter().try_fold(root, |value, locator| match locator {
        Locator::Field(name) => value.get_mut(name),
        Locator::Entry { key, value: wanted } => value
            .as_array_mut()?
            .iter_mut()
            .find(|entry| key_matches(entry, key, wanted)),
    })
}
