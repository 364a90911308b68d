//! Errors surfaced while handling a request and their HTTP rendering.
//!
//! Every failure on the request path becomes a [`GatewayError`]; the gateway
//! logs it once and turns it into a reply with [`GatewayError::into_reply`].

use axum::http::StatusCode;
use restconf_tree::TreeError;
use serde_json::json;
use thiserror::Error;

use crate::address::AddressError;
use crate::codec::CodecError;
use crate::compliance::{ComplianceOptions, media};
use crate::exchange::Reply;

/// Failures on the request path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request path could not be routed.
    #[error("bad address: {0}")]
    BadAddress(#[from] AddressError),

    /// Device, module or resource does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// Non-rpc node addressed under `/restconf/operations`.
    #[error("{{+restconf}}/operations is only intended for rpcs")]
    OperationsOnlyForRpcs,

    /// Top-level rpc invoked under `/restconf/data`.
    #[error("rpcs are located at {{+restconf}}/operations not {{+restconf}}/data")]
    RpcUnderData,

    /// Method has no meaning for the addressed node.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// Request method as sent.
        method: String,
    },

    /// Request body could not be decoded.
    #[error("{message}")]
    Decode {
        /// Parser complaint.
        message: String,
    },

    /// Response body could not be encoded.
    #[error("{message}")]
    Encode {
        /// Serialiser complaint.
        message: String,
    },

    /// Tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A request filter refused the request.
    #[error("{message}")]
    Filter {
        /// Reply body.
        message: String,
        /// Reply status.
        status: StatusCode,
    },
}

impl GatewayError {
    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a method-not-allowed error.
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
        }
    }

    /// Creates a filter rejection with the status to send.
    pub fn filter(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Filter {
            message: message.into(),
            status,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadAddress(_)
            | Self::OperationsOnlyForRpcs
            | Self::RpcUnderData
            | Self::Decode { .. } => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Tree(error) => match error {
                TreeError::NotFound { .. } => StatusCode::NOT_FOUND,
                TreeError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                TreeError::Conflict { .. } => StatusCode::CONFLICT,
                TreeError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
                TreeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Filter { status, .. } => *status,
        }
    }

    /// RFC 8040 `error-tag` for this error.
    #[must_use]
    pub fn error_tag(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "malformed-message",
            Self::Tree(TreeError::Conflict { .. }) => "data-exists",
            _ => match self.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "access-denied",
                StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                    "operation-not-supported"
                }
                status if status.is_client_error() => "invalid-value",
                _ => "operation-failed",
            },
        }
    }

    /// Renders the error for a client.
    ///
    /// Strict clients receive an `ietf-restconf:errors` document; simplified
    /// clients receive the message as plain text.
    #[must_use]
    pub fn into_reply(self, compliance: ComplianceOptions) -> Reply {
        let status = self.status();
        if compliance.is_strict() {
            let document = json!({
                "ietf-restconf:errors": {
                    "error": [{
                        "error-type": "protocol",
                        "error-tag": self.error_tag(),
                        "error-message": self.to_string(),
                    }]
                }
            });
            Reply::bytes(status, media::YANG_DATA_JSON, document.to_string())
        } else {
            Reply::bytes(status, media::TEXT_PLAIN, self.to_string())
        }
    }
}

impl From<CodecError> for GatewayError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Decode { message } => Self::Decode { message },
            CodecError::Encode { message } => Self::Encode { message },
            CodecError::Tree(error) => Self::Tree(error),
        }
    }
}
