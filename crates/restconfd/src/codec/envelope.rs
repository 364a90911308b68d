//! RFC 8040 §3.6 action envelopes: `<module>:input` and `<module>:output`.

use bytes::Bytes;
use restconf_tree::{Payload, TreeData};
use serde_json::{Map, Value};

use super::{Codec, CodecError, form, json, xml};
use crate::compliance::{ComplianceOptions, media};

fn missing_wrapper(key: &str) -> CodecError {
    CodecError::decode(format!("'{key}' missing in input wrapper"))
}

/// Reads action input from a request body.
///
/// Form bodies are taken as-is. With the action wrapper disabled the body is
/// a bare JSON object. Otherwise a YANG JSON body must hold
/// `<module>:input` and a YANG XML body supplies the root element's
/// children.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bodies, a missing or
/// non-object wrapper, or a wrapped body in any other media type.
pub async fn unwrap_action_input(
    module: &str,
    content_type: Option<&str>,
    body: Bytes,
    compliance: ComplianceOptions,
) -> Result<Payload, CodecError> {
    let essence = content_type.map(media::essence).unwrap_or_default();
    if essence == media::FORM_URLENCODED {
        return Ok(form::decode_urlencoded(&body));
    }
    if essence == media::MULTIPART_FORM {
        return form::decode_multipart(content_type.unwrap_or_default(), body).await;
    }
    if compliance.disable_action_wrapper {
        return json::decode_object(&body).map(json::strip_prefixes);
    }

    if media::is_yang_xml(&essence) {
        let (key, root) = xml::parse(&body)?;
        let root = root.without_hyphenated_keys();
        if matches!(root, xml::XmlNode::Text(_)) {
            return Err(missing_wrapper(&key));
        }
        return xml::root_object(root).map(json::strip_prefixes);
    }

    if !media::is_yang_json(&essence) {
        return Err(CodecError::decode(format!(
            "wrapped action input must be {} or {}",
            media::YANG_DATA_JSON,
            media::YANG_DATA_XML
        )));
    }
    let key = format!("{module}:input");
    let mut wrapper = json::decode_object(&body)?;
    match wrapper.remove(&key) {
        Some(Value::Object(input)) => Ok(json::strip_prefixes(input)),
        _ => Err(missing_wrapper(&key)),
    }
}

/// Encodes action output.
///
/// JSON output is wrapped as `{"<module>:output": ...}` and XML output is
/// the bare `<output>` element. With the action wrapper disabled the output
/// members are written directly.
///
/// # Errors
///
/// Fails when the output cannot be read or serialised.
pub fn encode_action_output(
    codec: Codec,
    module: &str,
    output: &dyn TreeData,
    compliance: ComplianceOptions,
) -> Result<Bytes, CodecError> {
    match codec {
        Codec::Json { qualified } if !compliance.disable_action_wrapper => {
            let mut wrapper = Map::new();
            wrapper.insert(format!("{module}:output"), json::encode(output, qualified)?);
            json::to_bytes(&Value::Object(wrapper))
        }
        _ => codec.encode(output),
    }
}
