//! TCP listener driving the axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use restconf_config::ListenEndpoint;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{LISTENER_TARGET, ListenerError, router};
use crate::gateway::Gateway;

/// Listener bound to a configured endpoint, not yet accepting requests.
#[derive(Debug)]
pub struct HttpListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
}

impl HttpListener {
    /// Binds `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] when the address cannot be bound.
    pub async fn bind(endpoint: &ListenEndpoint) -> Result<Self, ListenerError> {
        let ListenEndpoint::Tcp { host, port } = endpoint;
        let listener = TcpListener::bind((host.as_str(), *port))
            .await
            .map_err(|source| ListenerError::Bind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Address actually bound; differs from the endpoint when it asked for
    /// port `0`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::LocalAddr`] when the socket cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    /// Serves `gateway` until `shutdown` fires, then drains open requests.
    ///
    /// Cancelling `shutdown` also ends event streams when it is the
    /// gateway's own shutdown token.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Serve`] when the accept loop fails.
    pub async fn serve(
        self,
        gateway: Arc<Gateway>,
        shutdown: CancellationToken,
    ) -> Result<(), ListenerError> {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.endpoint,
            local_addr = ?self.listener.local_addr().ok(),
            "HTTP listener active"
        );
        let app = router(gateway).into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|source| ListenerError::Serve { source })?;
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "HTTP listener stopped");
        Ok(())
    }
}
