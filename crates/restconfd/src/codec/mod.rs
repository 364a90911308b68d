//! Content negotiation, body encoding and decoding, and the IETF action
//! envelopes.

mod envelope;
mod form;
pub mod json;
pub mod xml;

use bytes::Bytes;
use restconf_tree::{Payload, TreeData, TreeError};
use thiserror::Error;

use crate::compliance::{ComplianceOptions, media};

pub use envelope::{encode_action_output, unwrap_action_input};

/// Failures while reading a request body or writing a response body.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Request body could not be turned into a payload.
    #[error("{message}")]
    Decode {
        /// Human-readable detail.
        message: String,
    },
    /// Node content could not be serialised.
    #[error("{message}")]
    Encode {
        /// Human-readable detail.
        message: String,
    },
    /// Reading node content failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl CodecError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

/// Response encoder chosen from `Accept` and compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// JSON, with or without `module:` member prefixes.
    Json {
        /// Prefix top-level members with the module name.
        qualified: bool,
    },
    /// XML with a namespaced root element.
    Xml {
        /// Advertise the YANG XML media type rather than plain XML.
        strict: bool,
    },
}

impl Codec {
    /// Picks the encoder for a response.
    ///
    /// The first JSON or XML media range in `accept` decides; anything else
    /// falls back to JSON.
    #[must_use]
    pub fn negotiate(accept: Option<&str>, compliance: ComplianceOptions) -> Self {
        let wants_xml = accept
            .into_iter()
            .flat_map(media::ranges)
            .find(|range| media::is_xml(range) || media::is_json(range))
            .is_some_and(|range| media::is_xml(&range));
        if wants_xml {
            Self::Xml {
                strict: !compliance.qualify_namespace_disabled,
            }
        } else {
            Self::json(compliance)
        }
    }

    /// JSON encoder for `compliance`.
    #[must_use]
    pub const fn json(compliance: ComplianceOptions) -> Self {
        Self::Json {
            qualified: !compliance.qualify_namespace_disabled,
        }
    }

    /// `Content-Type` sent with bodies from this encoder.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json { qualified: true } => media::YANG_DATA_JSON,
            Self::Json { qualified: false } => media::JSON,
            Self::Xml { strict: true } => media::YANG_DATA_XML,
            Self::Xml { strict: false } => media::XML,
        }
    }

    /// Encodes a node.
    ///
    /// # Errors
    ///
    /// Fails when the node's content cannot be read or serialised.
    pub fn encode(self, data: &dyn TreeData) -> Result<Bytes, CodecError> {
        match self {
            Self::Json { qualified } => {
                let value = json::encode(data, qualified)?;
                json::to_bytes(&value)
            }
            Self::Xml { .. } => xml::encode(data),
        }
    }
}

/// Decodes a data payload (PATCH, PUT, POST on data nodes).
///
/// Form bodies become string members; XML bodies yield the children of the
/// root element without attributes; anything else is parsed as JSON. Module
/// prefixes on top-level members are removed.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bodies or non-object
/// payloads.
pub async fn decode_payload(content_type: Option<&str>, body: Bytes) -> Result<Payload, CodecError> {
    let essence = content_type.map(media::essence).unwrap_or_default();
    if essence == media::FORM_URLENCODED {
        return Ok(form::decode_urlencoded(&body));
    }
    if essence == media::MULTIPART_FORM {
        return form::decode_multipart(content_type.unwrap_or_default(), body).await;
    }
    let payload = if media::is_xml(&essence) {
        let (_, root) = xml::parse(&body)?;
        xml::root_object(root.without_attributes())?
    } else {
        json::decode_object(&body)?
    };
    Ok(json::strip_prefixes(payload))
}
