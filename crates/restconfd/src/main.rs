//! `restconfd` binary: loads configuration and serves until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use restconfd::{StructuredHealthReporter, SystemConfigLoader, bootstrap_with};
use tokio_util::sync::CancellationToken;
use tracing::error;

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

#[tokio::main]
async fn main() -> ExitCode {
    let Ok(gateway) = bootstrap_with(&SystemConfigLoader, Arc::new(StructuredHealthReporter::new()))
    else {
        // The reporter has already logged the failure.
        return ExitCode::FAILURE;
    };
    tokio::spawn(cancel_on_signal(gateway.shutdown_token()));
    match gateway.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(target: MAIN_TARGET, %error, "gateway stopped");
            ExitCode::FAILURE
        }
    }
}

async fn cancel_on_signal(token: CancellationToken) {
    if wait_for_signal().await {
        token.cancel();
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            result = tokio::signal::ctrl_c() => result.is_ok(),
            _ = terminate.recv() => true,
        },
        Err(err) => {
            error!(target: MAIN_TARGET, error = %err, "cannot watch SIGTERM");
            tokio::signal::ctrl_c().await.is_ok()
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
