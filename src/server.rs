use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::watch;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::codec::CodecError;
use crate::commands;
use crate::connection::Connection;
use crate::store::Store;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle of a server: `Idle -> Listening -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Bound, `run` not called yet.
    Idle,
    Listening,
    Draining,
    Stopped,
}

/// Live connections, by id. Guarded by its own lock so it never contends with the store.
type Registry = Arc<Mutex<HashMap<Uuid, SocketAddr>>>;

pub struct Server {
    listener: TcpListener,
    store: Store,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    state: watch::Sender<ServerState>,
    connections: Registry,
}

/// Controls a running server from outside its accept loop.
#[derive(Clone)]
pub struct Handle {
    shutdown: CancellationToken,
    state: watch::Receiver<ServerState>,
    connections: Registry,
}

impl Server {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let (state, _) = watch::channel(ServerState::Idle);

        Ok(Server {
            listener,
            store: Store::new(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            state,
            connections: Arc::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Store {
        self.store.clone()
    }

    pub fn handle(&self) -> Handle {
        Handle {
            shutdown: self.shutdown.clone(),
            state: self.state.subscribe(),
            connections: self.connections.clone(),
        }
    }

    /// Accepts connections until [`Handle::stop`] is called, then waits for every connection task
    /// to finish.
    pub async fn run(self) {
        let Server {
            listener,
            store,
            shutdown,
            tracker,
            state,
            connections,
        } = self;

        state.send_replace(ServerState::Listening);
        match listener.local_addr() {
            Ok(addr) => info!("Server listening on {}", addr),
            Err(e) => error!("Failed to read listener address: {}", e),
        }

        loop {
            // Cancellation is polled first so nothing is accepted once a stop was requested.
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            let (socket, client_address) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = time::sleep(ACCEPT_BACKOFF) => continue,
                    }
                }
            };

            let conn = Connection::new(socket, client_address);
            info!("Accepted connection from {:?}", client_address);
            connections.lock().insert(conn.id, client_address);

            let store = store.clone();
            let cancelled = shutdown.child_token();
            let connections = connections.clone();

            tracker.spawn(async move {
                let id = conn.id;
                if let Err(e) = handle_connection(conn, store, cancelled).await {
                    error!(connection_id = %id, "Connection error: {}", e);
                }
                connections.lock().remove(&id);
            });
        }

        drop(listener);
        state.send_replace(ServerState::Draining);
        info!(
            connections = connections.lock().len(),
            "Shutting down, closing connections"
        );

        tracker.close();
        tracker.wait().await;

        info!(keys = store.len(), "Server stopped");
        state.send_replace(ServerState::Stopped);
    }
}

impl Handle {
    /// Stops accepting connections, closes the open ones and waits for the server to drain.
    ///
    /// A server that is still `Idle` returns right away: once cancelled, `run` drains without
    /// accepting anything.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let mut state = self.state.clone();
        // An error means the server was dropped, so there is nothing left to wait for.
        let _ = state
            .wait_for(|state| matches!(state, ServerState::Idle | ServerState::Stopped))
            .await;
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

#[instrument(
    name = "connection",
    skip(conn, store, cancelled),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    mut conn: Connection,
    store: Store,
    cancelled: CancellationToken,
) -> Result<(), CodecError> {
    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", conn.client_address.to_string());

    loop {
        let request = tokio::select! {
            biased;
            _ = cancelled.cancelled() => {
                info!("Server is shutting down");
                break;
            }
            request = conn.read_request() => request?,
        };

        let Some(request) = request else {
            break;
        };

        debug!("Received request from client: {:?}", request);
        let res = commands::dispatch(request, &store);
        debug!("Sending response to client: {:?}", res);

        // A peer that stops reading its replies must not hold up shutdown.
        tokio::select! {
            biased;
            _ = cancelled.cancelled() => {
                info!("Server is shutting down, dropping pending reply");
                break;
            }
            written = conn.write_frame(res) => written?,
        }
    }

    info!("Connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn stop_before_run() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();

        // Queued in the listen backlog, never accepted.
        let mut client = TcpStream::connect(addr).await.unwrap();

        handle.stop().await;
        assert_eq!(handle.state(), ServerState::Idle);

        server.run().await;

        assert_eq!(handle.state(), ServerState::Stopped);
        assert_eq!(handle.connection_count(), 0);

        let mut buf = Vec::new();
        let read = client.read_to_end(&mut buf).await;
        assert!(read.is_err() || buf.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_racing_run() {
        for _ in 0..20 {
            let server = Server::bind("127.0.0.1:0").await.unwrap();
            let handle = server.handle();

            let task = tokio::spawn(server.run());
            handle.stop().await;

            assert_eq!(handle.connection_count(), 0);

            task.await.unwrap();
            assert_eq!(handle.state(), ServerState::Stopped);
        }
    }

    #[tokio::test]
    async fn state_transitions() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let handle = server.handle();
        assert_eq!(handle.state(), ServerState::Idle);

        let task = tokio::spawn(server.run());

        let mut state = handle.state.clone();
        state
            .wait_for(|state| *state == ServerState::Listening)
            .await
            .unwrap();

        handle.stop().await;
        handle.stop().await;
        task.await.unwrap();

        assert_eq!(handle.state(), ServerState::Stopped);
    }
}
