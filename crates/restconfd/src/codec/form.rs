//! Form bodies, accepted as a convenience for browser clients.

use std::convert::Infallible;

use bytes::Bytes;
use restconf_tree::Payload;
use serde_json::Value;

use super::CodecError;

pub(super) fn decode_urlencoded(body: &[u8]) -> Payload {
    url::form_urlencoded::parse(body)
        .map(|(name, value)| (name.into_owned(), Value::String(value.into_owned())))
        .collect()
}

/// Every named part becomes a string member; unnamed parts are skipped.
pub(super) async fn decode_multipart(content_type: &str, body: Bytes) -> Result<Payload, CodecError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|error| CodecError::decode(format!("bad multipart form: {error}")))?;
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut payload = Payload::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| CodecError::decode(format!("bad multipart form: {error}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field
            .text()
            .await
            .map_err(|error| CodecError::decode(format!("bad multipart field '{name}': {error}")))?;
        payload.insert(name, Value::String(text));
    }
    Ok(payload)
}
