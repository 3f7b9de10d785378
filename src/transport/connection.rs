//! Firmware connection and its line-reading event loop.
//!
//! Each accepted TCP stream is driven by one tokio task that handles:
//!
//! - Incoming bytes from the firmware, framed into lines and appended to the
//!   [`CommandLog`]
//! - Outgoing lines queued by the Rust API (sensor events)
//! - Shutdown requests from the listener
//!
//! The task owns both halves of the stream. Reads and writes never block the
//! caller: [`Connection::send_line`] only queues. A silent peer stalls its own
//! task and nothing else.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

use crate::command_log::CommandLog;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::LineCodec;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
pub(crate) enum ConnectionCommand {
    /// Write one line (newline appended by the codec).
    Send(String),
    /// Close the stream and stop reading.
    Shutdown,
}

/// Receiving end of a connection's command queue.
pub(crate) type CommandReceiver = mpsc::UnboundedReceiver<ConnectionCommand>;

// ============================================================================
// Connection
// ============================================================================

/// Handle to one firmware connection.
///
/// Cheap to clone; every clone talks to the same event loop. Dropping handles
/// does not close the stream, call [`shutdown`](Self::shutdown) for that.
#[derive(Clone)]
pub struct Connection {
    /// Registry key.
    id: ConnectionId,
    /// Remote address, when known.
    peer: Option<SocketAddr>,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    /// Creates a handle and the queue its event loop will drain.
    pub(crate) fn new(id: ConnectionId, peer: SocketAddr) -> (Self, CommandReceiver) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connection = Self {
            id,
            peer: Some(peer),
            command_tx,
        };
        (connection, command_rx)
    }

    /// A handle with no event loop behind it; every send fails.
    #[cfg(test)]
    pub(crate) fn detached(id: ConnectionId) -> Self {
        let (command_tx, _) = mpsc::unbounded_channel();
        Self {
            id,
            peer: None,
            command_tx,
        }
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address.
    #[inline]
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Returns `true` once the event loop has exited.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Queues a line for the firmware.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has exited.
    pub fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(line.into()))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the event loop to close the stream.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles line I/O until the stream ends or shutdown.
    pub(crate) async fn run_event_loop(
        id: ConnectionId,
        stream: TcpStream,
        mut command_rx: CommandReceiver,
        log: Arc<CommandLog>,
    ) {
        let (read_half, write_half) = stream.into_split();
        let mut lines = FramedRead::new(read_half, LineCodec::new());
        let mut sink = FramedWrite::new(write_half, LineCodec::new());

        loop {
            tokio::select! {
                // Lines from the firmware
                line = lines.next() => {
                    match line {
                        Some(Ok(line)) => {
                            trace!(conn = %id, %line, "Device line");
                            log.append(line);
                        }

                        Some(Err(e)) => {
                            warn!(conn = %id, error = %e, "Receive failed");
                            break;
                        }

                        None => {
                            debug!(conn = %id, "Stream ended by peer");
                            break;
                        }
                    }
                }

                // Commands from the Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(line)) => {
                            if let Err(e) = sink.send(line.as_str()).await {
                                warn!(conn = %id, error = %e, "Send failed");
                                break;
                            }
                            trace!(conn = %id, %line, "Line sent");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(conn = %id, "Shutdown command received");
                            let _ = SinkExt::<&str>::close(&mut sink).await;
                            break;
                        }

                        None => {
                            debug!(conn = %id, "Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Closing the receiver makes further sends fail fast.
        command_rx.close();
        debug!(conn = %id, "Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Accepts one loopback connection and runs its event loop.
    async fn spawn_pair(log: Arc<CommandLog>) -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let client = TcpStream::connect(addr).await.expect("connect");
        let (server, peer) = listener.accept().await.expect("accept");

        let id = ConnectionId::next();
        let (connection, command_rx) = Connection::new(id, peer);
        tokio::spawn(Connection::run_event_loop(id, server, command_rx, log));

        (connection, client)
    }

    async fn wait_for_len(log: &CommandLog, len: usize) {
        for _ in 0..100 {
            if log.len() >= len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("log never reached {len} lines: {:?}", log.snapshot());
    }

    #[tokio::test]
    async fn test_lines_are_appended_in_order() {
        let log = Arc::new(CommandLog::new());
        let (_connection, mut client) = spawn_pair(Arc::clone(&log)).await;

        client.write_all(b"C\nL 3 4 25").await.expect("write");
        client.flush().await.expect("flush");
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"5 0 0\nS\n").await.expect("write");

        wait_for_len(&log, 3).await;
        assert_eq!(log.snapshot(), vec!["C", "L 3 4 255 0 0", "S"]);
    }

    #[tokio::test]
    async fn test_send_line_reaches_peer() {
        let log = Arc::new(CommandLog::new());
        let (connection, client) = spawn_pair(log).await;

        connection.send_line("E 0 0 1").expect("send");

        let mut reader = BufReader::new(client);
        let mut received = String::new();
        tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut received))
            .await
            .expect("timely")
            .expect("read");
        assert_eq!(received, "E 0 0 1\n");
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        let log = Arc::new(CommandLog::new());
        let (connection, client) = spawn_pair(log).await;

        connection.shutdown();

        let mut reader = BufReader::new(client);
        let mut received = String::new();
        let n = tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut received))
            .await
            .expect("timely")
            .expect("read");
        assert_eq!(n, 0);

        for _ in 0..100 {
            if connection.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(connection.is_closed());
        assert!(connection.send_line("E 1 1 1").is_err());
    }

    #[tokio::test]
    async fn test_peer_close_ends_loop() {
        let log = Arc::new(CommandLog::new());
        let (connection, client) = spawn_pair(log).await;

        drop(client);

        for _ in 0..100 {
            if connection.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(connection.is_closed());
    }

    #[test]
    fn test_detached_send_fails() {
        let connection = Connection::detached(ConnectionId::next());
        assert!(matches!(
            connection.send_line("E 0 0 0"),
            Err(Error::ConnectionClosed)
        ));
    }
}
