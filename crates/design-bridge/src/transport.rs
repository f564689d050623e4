//! Transport to the design application
//!
//! Provides AsyncReader/AsyncWriter traits that can be implemented for
//! different transport mechanisms (TCP, Unix sockets, in-memory channels),
//! and the `Transport` that owns the connection lifecycle on top of them.

use crate::config::Endpoint;
use crate::framing::check_frame_len;
use crate::protocol::{Inbound, decode_inbound, preview};
use crate::tcp::{TcpReadWrapper, TcpWriteWrapper};
use async_trait::async_trait;
use design_mcp_core::{DesignError, Result};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read a complete message from the transport
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write a complete message to the transport
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Receiver of everything the transport produces
///
/// Exactly one listener is registered per transport.
pub trait TransportListener: Send + Sync + 'static {
    /// A decoded message arrived
    fn on_message(&self, message: Inbound);

    /// The connection is gone; called once per connection
    fn on_disconnect(&self, reason: &str);
}

/// Frames queued for the writer task before `send` reports the link as busy
pub const OUTBOUND_QUEUE: usize = 256;

/// Handles for one live connection
struct Connection {
    outbound: mpsc::Sender<Vec<u8>>,
    reader: AbortHandle,
    writer: AbortHandle,
}

impl Connection {
    fn stop(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[derive(Default)]
struct LinkState {
    generation: u64,
    current: Option<Connection>,
}

struct Link {
    state: StdMutex<LinkState>,
    listener: Arc<dyn TransportListener>,
}

impl Link {
    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tear down connection `generation` and notify the listener once
    fn lost(&self, generation: u64, reason: &str) {
        let dropped = {
            let mut state = self.state();
            if state.generation != generation {
                return;
            }
            state.current.take()
        };

        if let Some(connection) = dropped {
            connection.stop();
            warn!("Connection to application lost: {}", reason);
            self.listener.on_disconnect(reason);
        }
    }
}

/// Persistent channel to the design application
///
/// Each connection runs a reader task and a writer task. `send` only queues
/// a complete frame, so callers never wait on the socket and a dropped caller
/// cannot leave half a frame on the wire.
#[derive(Clone)]
pub struct Transport {
    link: Arc<Link>,
}

impl Transport {
    /// Create a disconnected transport delivering to `listener`
    pub fn new(listener: Arc<dyn TransportListener>) -> Self {
        Self {
            link: Arc::new(Link {
                state: StdMutex::new(LinkState::default()),
                listener,
            }),
        }
    }

    /// Whether a connection is currently up
    pub fn is_connected(&self) -> bool {
        self.link.state().current.is_some()
    }

    /// Connect to the application at `endpoint`
    pub async fn connect(&self, endpoint: &Endpoint, connect_timeout: Duration) -> Result<()> {
        info!("Connecting to design application at {}", endpoint);

        match endpoint {
            Endpoint::Tcp(addr) => {
                let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
                    .await
                    .map_err(|_| {
                        DesignError::TransportUnavailable(format!("Connection timeout to {}", addr))
                    })?
                    .map_err(|e| {
                        DesignError::TransportUnavailable(format!(
                            "Failed to connect to {}: {}",
                            addr, e
                        ))
                    })?;

                // Disable Nagle's algorithm for low latency
                stream.set_nodelay(true).map_err(|e| {
                    DesignError::TransportUnavailable(format!("Failed to set TCP_NODELAY: {}", e))
                })?;

                let (read_half, write_half) = stream.into_split();
                self.attach(TcpReadWrapper(read_half), TcpWriteWrapper(write_half));
            }

            #[cfg(unix)]
            Endpoint::Unix(path) => {
                use crate::unix::{UnixReadWrapper, UnixWriteWrapper};
                use tokio::net::UnixStream;

                let stream = tokio::time::timeout(connect_timeout, UnixStream::connect(path))
                    .await
                    .map_err(|_| {
                        DesignError::TransportUnavailable(format!(
                            "Connection timeout to {}",
                            path.display()
                        ))
                    })?
                    .map_err(|e| {
                        DesignError::TransportUnavailable(format!(
                            "Failed to connect to {}: {}",
                            path.display(),
                            e
                        ))
                    })?;

                let (read_half, write_half) = stream.into_split();
                self.attach(UnixReadWrapper(read_half), UnixWriteWrapper(write_half));
            }

            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(DesignError::TransportUnavailable(
                    "Unix sockets are not supported on this platform".into(),
                ));
            }
        }

        info!("Connected to design application at {}", endpoint);
        Ok(())
    }

    /// Adopt an established connection and start its reader and writer tasks
    ///
    /// A previous connection, if any, is torn down first and its listener
    /// notification fires before the new one goes live.
    pub fn attach<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncReader + 'static,
        W: AsyncWriter + 'static,
    {
        let previous = self.link.state().generation;
        self.link.lost(previous, "replaced by a new connection");

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);

        let mut state = self.link.state();
        state.generation += 1;
        let generation = state.generation;
        let reader = tokio::spawn(reader_task(reader, self.link.clone(), generation));
        let writer = tokio::spawn(writer_task(
            writer,
            outbound_rx,
            self.link.clone(),
            generation,
        ));
        state.current = Some(Connection {
            outbound: outbound_tx,
            reader: reader.abort_handle(),
            writer: writer.abort_handle(),
        });
        drop(state);

        debug!("Transport attached (connection {})", generation);
    }

    /// Queue one encoded message for the writer task
    ///
    /// Fails with `TransportUnavailable` when no connection is up or the
    /// outbound queue is full, and with `RequestTooLarge` for a body that
    /// does not fit in a frame. None of these touch the connection; only a
    /// failed write does.
    pub fn send(&self, data: Vec<u8>) -> Result<()> {
        check_frame_len(data.len())?;

        let state = self.link.state();
        let Some(connection) = state.current.as_ref() else {
            return Err(DesignError::TransportUnavailable(
                "Not connected to the design application".into(),
            ));
        };

        connection.outbound.try_send(data).map_err(|e| match e {
            TrySendError::Full(_) => DesignError::TransportUnavailable(format!(
                "Outbound queue full ({} frames waiting on the application)",
                OUTBOUND_QUEUE
            )),
            TrySendError::Closed(_) => {
                DesignError::TransportUnavailable("Connection writer has stopped".into())
            }
        })
    }

    /// Close the current connection, if any
    pub fn close(&self) {
        let generation = self.link.state().generation;
        self.link.lost(generation, "transport closed");
    }
}

/// Background reader task for one connection
///
/// Every decoded message goes to the listener. Undecodable frames are
/// dropped. A read failure ends the connection.
async fn reader_task<R: AsyncReader>(mut reader: R, link: Arc<Link>, generation: u64) {
    loop {
        match reader.read_message().await {
            Ok(data) => {
                debug!("[App→Rust] len={} json={}", data.len(), preview(&data));

                match decode_inbound(&data) {
                    Ok(message) => link.listener.on_message(message),
                    Err(e) => error!("Failed to decode message: {}", e),
                }
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                link.lost(generation, &e.to_string());
                break;
            }
        }
    }
    debug!("Reader task for connection {} exiting", generation);
}

/// Background writer task for one connection
///
/// Frames are written whole and in queue order. A write failure ends the
/// connection, which fails every pending command with `ConnectionLost`.
async fn writer_task<W: AsyncWriter>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    link: Arc<Link>,
    generation: u64,
) {
    while let Some(data) = outbound.recv().await {
        if let Err(e) = writer.write_message(&data).await {
            error!("Write to application failed: {}", e);
            link.lost(generation, &e.to_string());
            break;
        }
    }
    debug!("Writer task for connection {} exiting", generation);
}
