//! Per-request choice between strict RFC 8040 behaviour and the relaxed
//! "simplified" dialect.

use axum::http::{HeaderMap, HeaderName};
use axum::http::header::{ACCEPT, CONTENT_TYPE};

/// Media type names recognised by the gateway.
pub mod media {
    /// RFC 8040 JSON.
    pub const YANG_DATA_JSON: &str = "application/yang-data+json";
    /// Historical spelling of [`YANG_DATA_JSON`].
    pub const YANG_DOT_DATA_JSON: &str = "application/yang.data+json";
    /// RFC 8040 XML.
    pub const YANG_DATA_XML: &str = "application/yang-data+xml";
    /// Historical spelling of [`YANG_DATA_XML`].
    pub const YANG_DOT_DATA_XML: &str = "application/yang.data+xml";
    /// Server-Sent Events.
    pub const EVENT_STREAM: &str = "text/event-stream";
    /// Plain JSON.
    pub const JSON: &str = "application/json";
    /// Plain XML.
    pub const XML: &str = "application/xml";
    /// Plain XML, legacy text spelling.
    pub const TEXT_XML: &str = "text/xml";
    /// Plain text error bodies.
    pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
    /// Form bodies.
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    /// Multipart form bodies.
    pub const MULTIPART_FORM: &str = "multipart/form-data";

    /// Lower-cased media type without parameters.
    #[must_use]
    pub fn essence(value: &str) -> String {
        value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Essences of every media range in a comma-separated header value.
    pub fn ranges(value: &str) -> impl Iterator<Item = String> + '_ {
        value.split(',').map(essence).filter(|range| !range.is_empty())
    }

    /// True for either YANG JSON spelling.
    #[must_use]
    pub fn is_yang_json(essence: &str) -> bool {
        essence == YANG_DATA_JSON || essence == YANG_DOT_DATA_JSON
    }

    /// True for either YANG XML spelling.
    #[must_use]
    pub fn is_yang_xml(essence: &str) -> bool {
        essence == YANG_DATA_XML || essence == YANG_DOT_DATA_XML
    }

    /// True for any XML media type the gateway reads or writes.
    #[must_use]
    pub fn is_xml(essence: &str) -> bool {
        is_yang_xml(essence) || essence == XML || essence == TEXT_XML
    }

    /// True for any JSON media type the gateway reads or writes.
    #[must_use]
    pub fn is_json(essence: &str) -> bool {
        is_yang_json(essence) || essence == JSON
    }
}

/// Query parameter that forces simplified behaviour.
pub const SIMPLIFIED_PARAM: &str = "simplified";

/// Protocol relaxations in effect for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplianceOptions {
    /// Accept top-level rpcs under `/restconf/data`.
    pub allow_rpc_under_data: bool,
    /// Read and write action bodies without the `<module>:input` and
    /// `<module>:output` envelopes.
    pub disable_action_wrapper: bool,
    /// Emit bare event payloads instead of the `ietf-restconf:notification`
    /// envelope.
    pub disable_notification_wrapper: bool,
    /// Emit JSON member names without module prefixes.
    pub qualify_namespace_disabled: bool,
}

impl ComplianceOptions {
    /// RFC 8040 behaviour.
    pub const STRICT: Self = Self {
        allow_rpc_under_data: false,
        disable_action_wrapper: false,
        disable_notification_wrapper: false,
        qualify_namespace_disabled: false,
    };

    /// Relaxed behaviour for legacy clients.
    pub const SIMPLIFIED: Self = Self {
        allow_rpc_under_data: true,
        disable_action_wrapper: true,
        disable_notification_wrapper: true,
        qualify_namespace_disabled: true,
    };

    /// True when every relaxation is off.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        *self == Self::STRICT
    }
}

/// Decides compliance from server policy and request hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceNegotiator {
    always_strict: bool,
}

impl ComplianceNegotiator {
    /// Creates a negotiator; `always_strict` overrides every request hint.
    #[must_use]
    pub const fn new(always_strict: bool) -> Self {
        Self { always_strict }
    }

    /// Applies the decision order: server policy, the `simplified` query
    /// flag, YANG media types in `Content-Type` or `Accept`, an event-stream
    /// `Accept`, and finally the simplified default.
    #[must_use]
    pub fn negotiate(&self, query: Option<&str>, headers: &HeaderMap) -> ComplianceOptions {
        if self.always_strict {
            return ComplianceOptions::STRICT;
        }
        if query.is_some_and(has_simplified_flag) {
            return ComplianceOptions::SIMPLIFIED;
        }

        let header_ranges = |name: HeaderName| {
            headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(media::ranges)
                .collect::<Vec<_>>()
        };
        let content_type = header_ranges(CONTENT_TYPE);
        let accept = header_ranges(ACCEPT);

        let names_yang = content_type
            .iter()
            .chain(&accept)
            .any(|range| media::is_yang_json(range) || media::is_yang_xml(range));
        if names_yang || accept.iter().any(|range| range == media::EVENT_STREAM) {
            ComplianceOptions::STRICT
        } else {
            ComplianceOptions::SIMPLIFIED
        }
    }
}

fn has_simplified_flag(query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == SIMPLIFIED_PARAM)
}
