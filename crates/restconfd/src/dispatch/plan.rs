//! Method and node-class decision table.

use axum::http::Method;
use restconf_tree::NodeMeta;

use crate::address::EndpointCategory;
use crate::compliance::ComplianceOptions;
use crate::errors::GatewayError;

/// Dispatch class of a resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Containers, lists, list entries and leaves.
    Data,
    /// Rpcs and actions.
    Action,
    /// Notification sources.
    Notification,
}

impl TargetKind {
    /// Classifies node metadata.
    #[must_use]
    pub const fn of(meta: &NodeMeta) -> Self {
        if meta.is_action() {
            Self::Action
        } else if meta.is_notification() {
            Self::Notification
        } else {
            Self::Data
        }
    }
}

/// What the dispatcher does with a resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Remove the node.
    Delete,
    /// Encode the node.
    Read,
    /// Open an event stream.
    Subscribe,
    /// Merge the body into the node.
    Merge,
    /// Replace the node with the body.
    Replace,
    /// Create children from the body.
    Create,
    /// Run the rpc or action.
    Invoke,
    /// CORS preflight; nothing to do.
    Preflight,
}

/// Chooses the operation for a request.
///
/// `depth` counts the module root, so a top-level rpc has depth 2.
///
/// # Errors
///
/// Returns the protocol error the request deserves when the combination is
/// not allowed.
pub fn plan(
    method: &Method,
    kind: TargetKind,
    category: EndpointCategory,
    depth: usize,
    compliance: ComplianceOptions,
) -> Result<Operation, GatewayError> {
    use EndpointCategory as Category;

    if method == Method::OPTIONS {
        return Ok(Operation::Preflight);
    }
    let not_allowed = || GatewayError::method_not_allowed(method.as_str());

    match kind {
        _ if kind != TargetKind::Action && category == Category::Operations => {
            Err(GatewayError::OperationsOnlyForRpcs)
        }
        TargetKind::Action if method == Method::POST => match category {
            Category::Data if depth <= 2 && !compliance.allow_rpc_under_data => {
                Err(GatewayError::RpcUnderData)
            }
            Category::Data | Category::Operations => Ok(Operation::Invoke),
            _ => Err(not_allowed()),
        },
        TargetKind::Notification
            if method == Method::GET && matches!(category, Category::Data | Category::Streams) =>
        {
            Ok(Operation::Subscribe)
        }
        TargetKind::Data => match (method, category) {
            (&Method::GET, Category::Data | Category::Streams | Category::Schema) => {
                Ok(Operation::Read)
            }
            (&Method::DELETE, Category::Data) => Ok(Operation::Delete),
            (&Method::PATCH, Category::Data) => Ok(Operation::Merge),
            (&Method::PUT, Category::Data) => Ok(Operation::Replace),
            (&Method::POST, Category::Data) => Ok(Operation::Create),
            _ => Err(not_allowed()),
        },
        TargetKind::Action | TargetKind::Notification => Err(not_allowed()),
    }
}
