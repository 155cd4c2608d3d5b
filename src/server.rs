//! One-shot loopback listener for the authorization redirect.
//!
//! The listener binds the redirect address, serves the redirect path until
//! the first request arrives, then shuts the server down and releases the
//! port. Waiting is bounded by a timeout so an abandoned browser step cannot
//! hang the process.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Extension, Router, routing::get};
use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    api::{self, CallbackSlot},
    config::AuthConfig,
    error::AuthError,
    types::CallbackResult,
};

/// Upper bound for draining connections after the callback was handled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Source of the authorization redirect.
///
/// Opening happens before the authorization URL is shown to the user, so
/// the redirect cannot reach a port nobody listens on yet.
#[async_trait]
pub trait CallbackListener: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PendingCallback>, AuthError>;
}

/// A bound listener waiting for its single redirect.
#[async_trait]
pub trait PendingCallback: Send {
    async fn receive(self: Box<Self>) -> Result<CallbackResult, AuthError>;
}

#[derive(Debug, Clone)]
pub struct LoopbackListener {
    bind_addr: SocketAddr,
    redirect_path: String,
    timeout: Duration,
}

impl LoopbackListener {
    /// # Arguments
    ///
    /// * `bind_addr` - Address to listen on; port 0 picks a free port
    /// * `redirect_path` - Path of the redirect URI, the only routed path
    /// * `timeout` - How long to wait for the redirect once bound
    pub fn new(bind_addr: SocketAddr, redirect_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bind_addr,
            redirect_path: redirect_path.into(),
            timeout,
        }
    }

    /// Listener for the bind address, redirect path and callback timeout in
    /// `config`.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.bind_addr,
            config.redirect_path(),
            config.callback_timeout,
        )
    }

    /// Binds the socket and starts serving the redirect path.
    ///
    /// # Errors
    ///
    /// [`AuthError::Bind`] if the address is unavailable. Binding is never
    /// retried.
    pub async fn bind(&self) -> Result<BoundCallback, AuthError> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| AuthError::Bind {
                addr: self.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: self.bind_addr,
            source,
        })?;

        let (result_tx, result_rx) = oneshot::channel();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(result_tx)));
        let app = Router::new().route(
            &self.redirect_path,
            get(api::callback).layer(Extension(slot)),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(addr = %local_addr, path = %self.redirect_path, "waiting for authorization redirect");
        Ok(BoundCallback {
            local_addr,
            result_rx,
            shutdown_tx,
            server,
            timeout: self.timeout,
        })
    }

    /// Binds, waits for exactly one redirect and shuts down.
    pub async fn listen_once(&self) -> Result<CallbackResult, AuthError> {
        self.bind().await?.wait().await
    }
}

/// Listener that is bound and serving. Dropping it stops the server.
pub struct BoundCallback {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<Result<CallbackResult, AuthError>>,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
    timeout: Duration,
}

impl BoundCallback {
    /// Address actually bound, which differs from the configured one when
    /// port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the redirect, then stops accepting connections.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Timeout`] if nothing arrives in time
    /// - [`AuthError::MalformedCallback`] if `code` or `state` is missing
    /// - [`AuthError::AuthorizationDenied`] if the provider sent an `error`
    pub async fn wait(self) -> Result<CallbackResult, AuthError> {
        let BoundCallback {
            local_addr,
            result_rx,
            shutdown_tx,
            mut server,
            timeout,
        } = self;

        let outcome = tokio::time::timeout(timeout, result_rx).await;

        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Err(e))) => warn!(error = %e, "callback server stopped with an error"),
            Ok(_) => debug!(addr = %local_addr, "callback listener released"),
            Err(_) => {
                server.abort();
                let _ = server.await;
                debug!(addr = %local_addr, "callback listener aborted after grace period");
            }
        }

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AuthError::MalformedCallback(
                "listener stopped before a redirect arrived".to_string(),
            )),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "authorization redirect timed out");
                Err(AuthError::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl CallbackListener for LoopbackListener {
    async fn open(&self) -> Result<Box<dyn PendingCallback>, AuthError> {
        Ok(Box::new(self.bind().await?))
    }
}

#[async_trait]
impl PendingCallback for BoundCallback {
    async fn receive(self: Box<Self>) -> Result<CallbackResult, AuthError> {
        (*self).wait().await
    }
}
