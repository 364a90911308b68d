//! Extension points: request filters and the fallback handler.

use axum::http::HeaderName;
use restconf_tree::RequestScope;

use crate::errors::GatewayError;
use crate::exchange::{Reply, RestRequest};

/// Runs before routing, in registration order.
///
/// Filters may record values in the request scope for browsers to read, or
/// refuse the request. The first refusal becomes the reply.
pub trait RequestFilter: Send + Sync {
    /// Inspects the request.
    ///
    /// # Errors
    ///
    /// Returns the error to send back instead of serving the request.
    fn apply(&self, scope: &mut RequestScope, request: &RestRequest) -> Result<(), GatewayError>;
}

/// Serves requests outside `/restconf` and the well-known routes.
pub trait FallbackHandler: Send + Sync {
    /// Produces the reply.
    fn handle(&self, request: &RestRequest) -> Reply;
}

/// Copies a request header into a scope attribute.
#[derive(Debug, Clone)]
pub struct HeaderAttributeFilter {
    header: HeaderName,
    attribute: String,
}

impl HeaderAttributeFilter {
    /// Records `header` under `attribute` when the request carries it.
    pub fn new(header: HeaderName, attribute: impl Into<String>) -> Self {
        Self {
            header,
            attribute: attribute.into(),
        }
    }
}

impl RequestFilter for HeaderAttributeFilter {
    fn apply(&self, scope: &mut RequestScope, request: &RestRequest) -> Result<(), GatewayError> {
        if let Some(value) = request
            .headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
        {
            scope.insert_attribute(self.attribute.clone(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::*;

    #[test]
    fn header_value_lands_in_scope() {
        let filter = HeaderAttributeFilter::new(HeaderName::from_static("x-user"), "user");
        let request = RestRequest::new(Method::GET, "/").with_header(
            HeaderName::from_static("x-user"),
            "alice",
        );
        let mut scope = RequestScope::default();
        filter.apply(&mut scope, &request).expect("filter passes");
        assert_eq!(scope.attribute("user"), Some("alice"));
    }

    #[test]
    fn missing_header_leaves_scope_untouched() {
        let filter = HeaderAttributeFilter::new(HeaderName::from_static("x-user"), "user");
        let mut scope = RequestScope::default();
        filter
            .apply(&mut scope, &RestRequest::new(Method::GET, "/"))
            .expect("filter passes");
        assert_eq!(scope.attribute("user"), None);
    }
}
