//! CRUD, rpc and subscription dispatch against a module browser.

mod plan;

use axum::http::StatusCode;
use restconf_tree::{Browser, Selection};
use tracing::debug;

use crate::address::Address;
use crate::codec::{self, Codec};
use crate::errors::GatewayError;
use crate::exchange::{Reply, RequestContext, RestRequest};
use crate::notify::NotificationStreamer;

pub use plan::{Operation, TargetKind, plan};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Maps a request on a resolved node to a tree operation.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    streamer: NotificationStreamer,
}

impl Dispatcher {
    /// Dispatcher that opens subscriptions through `streamer`.
    #[must_use]
    pub const fn new(streamer: NotificationStreamer) -> Self {
        Self { streamer }
    }

    /// Streamer used for subscriptions.
    #[must_use]
    pub const fn streamer(&self) -> &NotificationStreamer {
        &self.streamer
    }

    /// Resolves `address` in `browser` and performs the request on it.
    ///
    /// A path that is valid for the model but holds no data yields an empty
    /// `404`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for resolution failures, disallowed
    /// method and node combinations, body codec failures and tree errors.
    pub async fn serve(
        &self,
        browser: &dyn Browser,
        address: &Address,
        request: &RestRequest,
        context: &RequestContext,
    ) -> Result<Reply, GatewayError> {
        let Some(selection) = browser.select(address.path(), &context.scope)? else {
            debug!(
                target: DISPATCH_TARGET,
                module = browser.module(),
                path = address.path(),
                "no data at path"
            );
            return Ok(Reply::empty(StatusCode::NOT_FOUND));
        };
        let meta = selection.meta();
        let operation = plan(
            &request.method,
            TargetKind::of(meta),
            address.category(),
            meta.depth(),
            context.compliance,
        )?;
        debug!(
            target: DISPATCH_TARGET,
            operation = ?operation,
            module = meta.module(),
            ident = meta.ident(),
            "dispatching"
        );

        let codec = Codec::negotiate(request.accept(), context.compliance);
        match operation {
            Operation::Preflight => Ok(Reply::empty(StatusCode::OK)),
            Operation::Read => {
                let body = codec.encode(selection.as_ref())?;
                Ok(Reply::bytes(StatusCode::OK, codec.content_type(), body))
            }
            Operation::Delete => {
                selection.delete()?;
                Ok(Reply::empty(StatusCode::OK))
            }
            Operation::Merge | Operation::Replace | Operation::Create => {
                let payload =
                    codec::decode_payload(request.content_type(), request.body.clone()).await?;
                match operation {
                    Operation::Merge => selection.upsert_from(payload)?,
                    Operation::Replace => selection.replace_from(payload)?,
                    _ => selection.insert_from(payload)?,
                }
                Ok(Reply::empty(StatusCode::OK))
            }
            Operation::Invoke => invoke(selection.as_ref(), request, context, codec).await,
            Operation::Subscribe => Ok(self.streamer.stream(selection.as_ref(), context)?),
        }
    }
}

async fn invoke(
    selection: &dyn Selection,
    request: &RestRequest,
    context: &RequestContext,
    codec: Codec,
) -> Result<Reply, GatewayError> {
    let meta = selection.meta();
    let input = if meta.has_input() && !request.body.is_empty() {
        Some(
            codec::unwrap_action_input(
                meta.module(),
                request.content_type(),
                request.body.clone(),
                context.compliance,
            )
            .await?,
        )
    } else {
        None
    };

    match selection.action(input)? {
        Some(output) if meta.has_output() => {
            let body = codec::encode_action_output(
                codec,
                meta.module(),
                output.as_ref(),
                context.compliance,
            )?;
            Ok(Reply::bytes(StatusCode::OK, codec.content_type(), body))
        }
        _ => Ok(Reply::empty(StatusCode::OK)),
    }
}
