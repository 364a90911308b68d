//! Request path resolution.
//!
//! Turns the raw (percent-encoded) request path into a [`Route`]. Resolution
//! is total: every malformed path maps to an [`AddressError`].

use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Endpoint category under `/restconf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    /// `/restconf/data`: configuration and state.
    Data,
    /// `/restconf/operations`: top-level rpcs.
    Operations,
    /// `/restconf/streams`: notification streams.
    Streams,
    /// `/restconf/schema`: schema sources and descriptions.
    Schema,
    /// `/restconf/ui`: device-supplied web assets.
    Ui,
}

impl EndpointCategory {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "data" => Some(Self::Data),
            "operations" => Some(Self::Operations),
            "streams" => Some(Self::Streams),
            "schema" => Some(Self::Schema),
            "ui" => Some(Self::Ui),
            _ => None,
        }
    }

    /// Path segment naming the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Operations => "operations",
            Self::Streams => "streams",
            Self::Schema => "schema",
            Self::Ui => "ui",
        }
    }

    const fn requires_module(self) -> bool {
        matches!(self, Self::Data | Self::Operations | Self::Streams)
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing facts for a `/restconf` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    device: Option<String>,
    category: EndpointCategory,
    module: Option<String>,
    path: String,
}

impl Address {
    /// Builds an address directly.
    pub fn new(
        device: Option<String>,
        category: EndpointCategory,
        module: Option<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            device,
            category,
            module,
            path: path.into(),
        }
    }

    /// Device id from `/restconf=<id>`; `None` selects the main device.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Endpoint category.
    #[must_use]
    pub const fn category(&self) -> EndpointCategory {
        self.category
    }

    /// Module named before the `:` (or the first schema segment).
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Path after the module, still percent-encoded.
    ///
    /// Segments are split on `/` before any decoding, so a list key may
    /// carry an encoded `/` (`interface=eth%2F0`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fully decoded path, for looking up schema and UI files.
    #[must_use]
    pub fn decoded_path(&self) -> String {
        percent_decode_str(&self.path)
            .decode_utf8_lossy()
            .into_owned()
    }
}

/// Top-level destination of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Root,
    /// `/.ver`
    Version,
    /// `/.well-known/<resource>`
    WellKnown {
        /// Decoded resource name, e.g. `host-meta`.
        resource: String,
    },
    /// `/restconf[=device]/<category>/...`
    Restconf(Address),
    /// Any other first segment.
    Unhandled {
        /// First path segment.
        segment: String,
        /// Remainder after the first segment.
        path: String,
    },
}

/// Malformed request paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// `/restconf=` with nothing after the `=`.
    #[error("empty device id in '{segment}'")]
    EmptyDevice {
        /// Offending segment.
        segment: String,
    },
    /// No category segment after `restconf`.
    #[error("missing endpoint after 'restconf'")]
    MissingEndpoint,
    /// Category segment is not one of the known endpoints.
    #[error("unknown endpoint '{segment}'")]
    UnknownEndpoint {
        /// Offending segment.
        segment: String,
    },
    /// Data path lacks a `module:` prefix.
    #[error("no module found in path '{path}'")]
    MissingModule {
        /// Path after the category.
        path: String,
    },
    /// A segment does not decode to UTF-8.
    #[error("path segment '{segment}' is not valid UTF-8")]
    Encoding {
        /// Offending raw segment.
        segment: String,
    },
}

fn decode_segment(segment: &str) -> Result<String, AddressError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AddressError::Encoding {
            segment: segment.to_owned(),
        })
}

fn decode_path(path: &str) -> Result<String, AddressError> {
    let segments = path
        .split('/')
        .map(decode_segment)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

/// Checks that every segment decodes, keeping the encoded form.
fn checked_path(path: &str) -> Result<String, AddressError> {
    path.split('/').try_for_each(|segment| decode_segment(segment).map(drop))?;
    Ok(path.to_owned())
}

fn split_first(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

/// Resolves a raw request path.
///
/// # Errors
///
/// Returns [`AddressError`] when a `/restconf` path is malformed or a segment
/// fails to percent-decode.
pub fn resolve(path: &str) -> Result<Route, AddressError> {
    let (first, rest) = split_first(path.trim_start_matches('/'));
    match first {
        "" => Ok(Route::Root),
        ".ver" => Ok(Route::Version),
        ".well-known" => Ok(Route::WellKnown {
            resource: decode_path(rest)?,
        }),
        _ => match first.split_once('=') {
            Some(("restconf", "")) => Err(AddressError::EmptyDevice {
                segment: first.to_owned(),
            }),
            Some(("restconf", device)) => resolve_restconf(Some(decode_segment(device)?), rest),
            None if first == "restconf" => resolve_restconf(None, rest),
            _ => Ok(Route::Unhandled {
                segment: decode_segment(first)?,
                path: rest.to_owned(),
            }),
        },
    }
}

fn resolve_restconf(device: Option<String>, rest: &str) -> Result<Route, AddressError> {
    let (segment, remainder) = split_first(rest);
    if segment.is_empty() {
        return Err(AddressError::MissingEndpoint);
    }
    let category = EndpointCategory::parse(segment).ok_or_else(|| AddressError::UnknownEndpoint {
        segment: segment.to_owned(),
    })?;

    let (module, path) = if category.requires_module() {
        let missing = || AddressError::MissingModule {
            path: remainder.to_owned(),
        };
        let (module, path) = remainder.split_once(':').ok_or_else(missing)?;
        if module.is_empty() || module.contains('/') {
            return Err(missing());
        }
        (Some(decode_segment(module)?), checked_path(path)?)
    } else if category == EndpointCategory::Schema {
        let (module, path) = split_first(remainder);
        let module = decode_segment(module)?;
        ((!module.is_empty()).then_some(module), checked_path(path)?)
    } else {
        (None, checked_path(remainder)?)
    };

    Ok(Route::Restconf(Address::new(device, category, module, path)))
}
