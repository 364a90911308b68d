//! JSON rendering of tree nodes.

use bytes::Bytes;
use restconf_tree::{Payload, TreeData, TreeError};
use serde_json::{Map, Value};

use super::CodecError;

/// Prefixes `name` with `module:` when `qualified` and not already prefixed.
#[must_use]
pub fn qualify(module: &str, name: &str, qualified: bool) -> String {
    if qualified && !name.contains(':') {
        format!("{module}:{name}")
    } else {
        name.to_owned()
    }
}

/// Encodes a node as a JSON object.
///
/// Object content keeps its members with qualified names; any other content
/// is wrapped under the node's own (qualified) identifier.
///
/// # Errors
///
/// Propagates failures reading the node's content.
pub fn encode(data: &dyn TreeData, qualified: bool) -> Result<Value, TreeError> {
    let meta = data.meta();
    let encoded = match data.content()? {
        Value::Object(members) => members
            .into_iter()
            .map(|(name, value)| (qualify(meta.module(), &name, qualified), value))
            .collect(),
        other => {
            let mut wrapper = Map::new();
            wrapper.insert(qualify(meta.module(), meta.ident(), qualified), other);
            wrapper
        }
    };
    Ok(Value::Object(encoded))
}

pub(crate) fn to_bytes(value: &Value) -> Result<Bytes, CodecError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|error| CodecError::encode(error.to_string()))
}

/// Parses `body` as a JSON object without touching member names.
pub(crate) fn decode_object(body: &[u8]) -> Result<Payload, CodecError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::decode("request body is empty"));
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(members)) => Ok(members),
        Ok(_) => Err(CodecError::decode("request body must be a JSON object")),
        Err(error) => Err(CodecError::decode(format!("malformed JSON: {error}"))),
    }
}

/// Removes `module:` prefixes from top-level member names.
#[must_use]
pub fn strip_prefixes(payload: Payload) -> Payload {
    payload
        .into_iter()
        .map(|(name, value)| match name.split_once(':') {
            Some((_, local)) => (local.to_owned(), value),
            None => (name, value),
        })
        .collect()
}
