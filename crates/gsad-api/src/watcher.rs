//! Client liveness watching for long-running GET requests.
//!
//! While a command is in flight the watcher peeks at the client socket once
//! per interval. If the browser went away it cancels the backend connection
//! so the manager stops working for nobody. The watcher and the request
//! handler share a small state under its own lock; whichever first finds
//! the backend still open is the one that closes it.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gsad_gmp::BackendSession;

/// Non-consuming view of a client socket.
#[derive(Debug)]
pub struct PeerProbe {
    socket: TcpStream,
}

impl PeerProbe {
    /// Wraps a clone of the accepted socket.
    ///
    /// The clone shares the original's non-blocking mode, so a peek never
    /// stalls the runtime.
    pub fn new(socket: &TcpStream) -> std::io::Result<Self> {
        let socket = socket.try_clone()?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    /// Whether the peer has closed its side.
    ///
    /// Pending data (a pipelined request, TLS records) means it is alive.
    pub fn peer_closed(&self) -> bool {
        let mut byte = [0u8; 1];
        match self.socket.peek(&mut byte) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                false
            }
            Err(_) => true,
        }
    }
}

#[derive(Debug)]
struct WatchState {
    backend_closed: bool,
    backend: CancellationToken,
}

/// The background observer for one request.
#[derive(Debug)]
pub struct ClientWatcher {
    state: Arc<Mutex<WatchState>>,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl ClientWatcher {
    /// Starts watching `probe`, cancelling `backend` if the client leaves.
    pub fn start(probe: Arc<PeerProbe>, interval: Duration, backend: CancellationToken) -> Self {
        let state = Arc::new(Mutex::new(WatchState {
            backend_closed: false,
            backend,
        }));
        let stop = CancellationToken::new();

        let task = tokio::spawn({
            let state = Arc::clone(&state);
            let stop = stop.clone();
            async move {
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {}
                    }
                    if !probe.peer_closed() {
                        continue;
                    }
                    let mut state = state.lock();
                    if !state.backend_closed {
                        state.backend_closed = true;
                        state.backend.cancel();
                        tracing::info!("Client closed connection, cancelling manager command");
                    }
                    break;
                }
            }
        });

        Self { state, stop, task }
    }

    /// Whether the watcher already tore the backend down.
    pub fn backend_closed(&self) -> bool {
        self.state.lock().backend_closed
    }

    /// Stops the watcher and closes `backend` unless the watcher got there
    /// first.
    pub async fn finish(self, backend: Box<dyn BackendSession>) {
        {
            let mut state = self.state.lock();
            if state.backend_closed {
                tracing::debug!("Manager connection already closed by watcher");
            } else {
                state.backend_closed = true;
            }
        }
        drop(backend);

        self.stop.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Client watcher task failed");
        }
    }
}
