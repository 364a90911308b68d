//! Scenario world exercising [`bootstrap_with`] and the listener lifecycle.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config_loader::{FailingConfigLoader, ManifestConfigLoader};
use super::reporter::{HealthEvent, RecordingHealthReporter};
use crate::bootstrap::{BootstrapError, ConfigLoader, Restconfd, bootstrap_with};
use crate::exchange::{Reply, RestRequest};
use crate::transport::ListenerError;

const WAIT: Duration = Duration::from_secs(2);

enum LoaderChoice {
    Manifest(ManifestConfigLoader),
    Failing,
}

/// World tracking one bootstrap attempt.
pub struct BootstrapWorld {
    runtime: Runtime,
    pub reporter: Arc<RecordingHealthReporter>,
    loader: Option<LoaderChoice>,
    result: Option<Result<Restconfd, BootstrapError>>,
    running: Option<JoinHandle<Result<(), ListenerError>>>,
    shutdown: Option<CancellationToken>,
    served: Option<Result<(), ListenerError>>,
    reply: Option<Reply>,
}

impl BootstrapWorld {
    /// Empty world; a loader must be chosen before bootstrapping.
    pub fn new() -> Self {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        Self {
            runtime,
            reporter: Arc::new(RecordingHealthReporter::default()),
            loader: None,
            result: None,
            running: None,
            shutdown: None,
            served: None,
            reply: None,
        }
    }

    /// Uses a loader pointing at the named manifest fixture.
    pub fn use_manifest(&mut self, kind: &str) {
        let loader = match kind {
            "valid" => ManifestConfigLoader::valid(),
            "invalid" => ManifestConfigLoader::invalid(),
            "missing" => ManifestConfigLoader::missing(),
            other => panic!("unknown manifest fixture '{other}'"),
        };
        self.loader = Some(LoaderChoice::Manifest(loader));
    }

    /// Uses a loader whose configuration does not parse.
    pub fn use_failing_loader(&mut self) {
        self.loader = Some(LoaderChoice::Failing);
    }

    /// Runs the bootstrap sequence.
    pub fn bootstrap(&mut self) {
        let loader: &dyn ConfigLoader = match self.loader.as_ref().expect("loader chosen") {
            LoaderChoice::Manifest(loader) => loader,
            LoaderChoice::Failing => &FailingConfigLoader,
        };
        let reporter = Arc::clone(&self.reporter);
        self.result = Some(bootstrap_with(loader, reporter));
    }

    /// Bootstrap failure, if any.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.result.as_ref().and_then(|result| result.as_ref().err())
    }

    /// The bootstrapped gateway process.
    pub fn daemon(&self) -> &Restconfd {
        match self.result.as_ref().expect("bootstrap ran") {
            Ok(daemon) => daemon,
            Err(error) => panic!("bootstrap failed: {error}"),
        }
    }

    /// Sends a request straight to the bootstrapped gateway.
    pub fn send(&mut self, method: Method, path: &str) {
        let gateway = Arc::clone(self.daemon().gateway());
        let reply = self
            .runtime
            .block_on(gateway.handle(RestRequest::new(method, path)));
        self.reply = Some(reply);
    }

    /// The last reply.
    pub fn reply(&self) -> &Reply {
        self.reply.as_ref().expect("no request was sent")
    }

    /// Serves the configured endpoint in the background until ready.
    pub fn start_listener(&mut self) {
        let daemon = match self.result.take().expect("bootstrap ran") {
            Ok(daemon) => daemon,
            Err(error) => panic!("bootstrap failed: {error}"),
        };
        self.shutdown = Some(daemon.shutdown_token());
        self.running = Some(self.runtime.spawn(daemon.run()));
        let reporter = Arc::clone(&self.reporter);
        assert!(
            self.eventually(|| listener_address(&reporter.events()).is_some()),
            "listener never became ready: {:?}",
            self.reporter.events()
        );
    }

    /// Cancels the shutdown token and waits for the listener to stop.
    pub fn stop_listener(&mut self) {
        self.shutdown.as_ref().expect("listener started").cancel();
        let running = self.running.take().expect("listener started");
        let served = self
            .runtime
            .block_on(async { tokio::time::timeout(WAIT, running).await })
            .expect("listener stops in time")
            .expect("listener task joins");
        self.served = Some(served);
    }

    /// Outcome of the stopped listener.
    pub fn served(&self) -> Option<&Result<(), ListenerError>> {
        self.served.as_ref()
    }

    /// Waits until `condition` holds or the wait budget runs out.
    pub fn eventually(&self, condition: impl Fn() -> bool) -> bool {
        self.runtime.block_on(async {
            let deadline = tokio::time::Instant::now() + WAIT;
            while !condition() {
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            true
        })
    }
}

impl Default for BootstrapWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default bootstrap world fixture.
pub fn bootstrap_world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

/// Address reported by the first `ListenerReady` event.
pub fn listener_address(events: &[HealthEvent]) -> Option<std::net::SocketAddr> {
    events.iter().find_map(|event| match event {
        HealthEvent::ListenerReady(addr) => Some(*addr),
        _ => None,
    })
}
