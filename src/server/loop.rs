// Server loop module
// Owns the bound listener and runs the accept loop until shutdown

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::listener::create_listener;
use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::logger;

/// A bound, not yet running file server
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Resolve the serving root and bind the listening socket.
    ///
    /// Fails without serving anything when the address is invalid, the root
    /// is not a readable directory, or the port cannot be bound. Must be
    /// called from within a Tokio runtime.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let addr = config.get_socket_addr()?;
        let state = AppState::new(config)?;
        let listener = create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            state: Arc::new(state),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (resolves port 0 to the assigned port)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Canonical directory being served
    pub fn root(&self) -> &Path {
        &self.state.root
    }

    /// Accept and serve connections until `shutdown` completes.
    ///
    /// Each connection runs on its own task, so a slow client never blocks
    /// the loop. Accept errors are logged and the loop keeps going.
    /// Connections already in flight are left to finish on their tasks.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            accept_connection(
                                stream,
                                peer_addr,
                                &self.state,
                                &self.active_connections,
                            );
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown => {
                    logger::log_shutdown();
                    return Ok(());
                }
            }
        }
    }
}
