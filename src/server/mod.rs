//! Two-listener server.
//!
//! A plaintext listener and an mTLS listener serve the same router as two
//! independent tokio tasks. A supervisor waits on both: if either exits
//! without a shutdown having been requested, the other is stopped and the
//! failure is returned. There is no per-listener restart.

pub mod routes;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::mtls::{HandshakeState, SessionAcceptor, build_server_config};
use crate::{Error, Result};

pub use routes::{HELLO_BODY, create_router};

/// Plaintext + mTLS server, not yet bound.
#[derive(Debug)]
pub struct MtlsServer {
    http_addr: SocketAddr,
    https_addr: SocketAddr,
    tls: Arc<ServerConfig>,
    shutdown_timeout: Duration,
}

impl MtlsServer {
    /// Server with an already-built rustls config.
    #[must_use]
    pub fn new(http_addr: SocketAddr, https_addr: SocketAddr, tls: ServerConfig) -> Self {
        Self {
            http_addr,
            https_addr,
            tls: Arc::new(tls),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    /// Override the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Load trust store and server identity as configured.
    ///
    /// # Errors
    ///
    /// Any trust store, identity or address error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let trust = config.trust_store()?;
        let identity = config.server_identity()?;
        let tls = build_server_config(&trust, &identity, &config.tls_policy())?;
        let (http_addr, https_addr) = config.server.addrs()?;
        Ok(Self::new(http_addr, https_addr, tls).with_shutdown_timeout(config.server.shutdown_timeout))
    }

    /// Bind both listeners and start serving.
    ///
    /// Returns once both sockets are bound, so the addresses in the returned
    /// handle are live (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if either socket cannot be bound.
    pub async fn start(self) -> Result<ServerHandle> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let router = create_router();

        // Plaintext listener
        let listener = TcpListener::bind(self.http_addr).await?;
        let http_addr = listener.local_addr()?;
        let mut plain_stop = stop_rx.clone();
        let plain_app = router.clone();
        let plain: JoinHandle<io::Result<()>> = tokio::spawn(async move {
            axum::serve(listener, plain_app)
                .with_graceful_shutdown(async move {
                    let _ = plain_stop.wait_for(|stop| *stop).await;
                })
                .await
        });

        // TLS listener
        let tls_handle = Handle::new();
        let tls: JoinHandle<io::Result<()>> = tokio::spawn(
            axum_server::bind(self.https_addr)
                .acceptor(SessionAcceptor::new(self.tls))
                .handle(tls_handle.clone())
                .serve(router.into_make_service()),
        );

        let Some(https_addr) = tls_handle.listening().await else {
            plain.abort();
            return Err(match tls.await {
                Ok(Err(e)) => Error::Io(e),
                Ok(Ok(())) => Error::Transport("TLS listener exited before binding".into()),
                Err(e) => Error::Transport(format!("TLS listener task failed: {e}")),
            });
        };

        info!(addr = %http_addr, "Plaintext listener started");
        info!(addr = %https_addr, state = %HandshakeState::Listening, "mTLS listener started");

        let shutdown = ShutdownTrigger {
            stop_tx: Arc::new(stop_tx),
            tls: tls_handle,
            grace: self.shutdown_timeout,
        };
        let supervisor = tokio::spawn(supervise(
            plain,
            tls,
            stop_rx,
            shutdown.clone(),
            self.shutdown_timeout,
        ));

        Ok(ServerHandle {
            http_addr,
            https_addr,
            shutdown,
            supervisor,
        })
    }

    /// Start, then serve until SIGINT/SIGTERM or a listener failure.
    ///
    /// # Errors
    ///
    /// Bind errors, or the first listener failure.
    pub async fn run(self) -> Result<()> {
        let running = self.start().await?;
        let trigger = running.shutdown_trigger();
        let signals = tokio::spawn(async move {
            shutdown_signal().await;
            trigger.trigger();
        });
        let result = running.wait().await;
        signals.abort();
        result
    }
}

/// Requests a graceful stop of both listeners.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    stop_tx: Arc<watch::Sender<bool>>,
    tls: Handle<SocketAddr>,
    grace: Duration,
}

impl ShutdownTrigger {
    /// Stop accepting on both listeners and drain in-flight requests.
    pub fn trigger(&self) {
        if !self.stop_tx.send_replace(true) {
            info!("Shutting down listeners...");
        }
        self.tls.graceful_shutdown(Some(self.grace));
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    http_addr: SocketAddr,
    https_addr: SocketAddr,
    shutdown: ShutdownTrigger,
    supervisor: JoinHandle<Result<()>>,
}

impl ServerHandle {
    /// Bound plaintext address.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Bound mTLS address.
    #[must_use]
    pub fn https_addr(&self) -> SocketAddr {
        self.https_addr
    }

    /// Trigger usable from another task.
    #[must_use]
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown.clone()
    }

    /// Wait until both listeners have stopped.
    ///
    /// # Errors
    ///
    /// The listener failure that brought the server down, if any.
    pub async fn wait(self) -> Result<()> {
        match self.supervisor.await {
            Ok(result) => result,
            Err(e) => Err(Error::Transport(format!("Server supervisor failed: {e}"))),
        }
    }

    /// Request a graceful stop and wait for it.
    ///
    /// # Errors
    ///
    /// As [`ServerHandle::wait`].
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.trigger();
        self.wait().await
    }
}

/// Wait for the first listener to exit, stop the other, report.
async fn supervise(
    mut plain: JoinHandle<io::Result<()>>,
    mut tls: JoinHandle<io::Result<()>>,
    stop_rx: watch::Receiver<bool>,
    shutdown: ShutdownTrigger,
    grace: Duration,
) -> Result<()> {
    let (name, first, mut other) = tokio::select! {
        res = &mut plain => ("plaintext", res, tls),
        res = &mut tls => ("tls", res, plain),
    };

    let requested = *stop_rx.borrow();
    let outcome = listener_outcome(name, first);

    if !requested {
        match &outcome {
            Err(e) => error!(listener = name, error = %e, "Listener failed, stopping server"),
            Ok(()) => error!(listener = name, "Listener exited unexpectedly, stopping server"),
        }
        shutdown.trigger();
    }

    // The sibling gets the grace period plus a second before it is aborted
    if tokio::time::timeout(grace + Duration::from_secs(1), &mut other)
        .await
        .is_err()
    {
        warn!("Listener did not stop within the shutdown timeout, aborting");
        other.abort();
    }

    if requested {
        info!("Listeners stopped");
        return outcome;
    }
    outcome.and(Err(Error::Transport(format!(
        "{name} listener exited unexpectedly"
    ))))
}

fn listener_outcome(
    name: &str,
    res: std::result::Result<io::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::Transport(format!("{name} listener failed: {e}"))),
        Err(e) => Err(Error::Transport(format!("{name} listener task failed: {e}"))),
    }
}

/// Resolves on Ctrl+C or SIGTERM. If a handler cannot be installed that
/// branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
