//! TCP listener the firmware connects to.
//!
//! Binds once, then accepts on a background task for as long as the harness
//! runs. Every accepted stream gets its own [`Connection`] event loop and is
//! offered to the [`ConnectionRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │                Listener                   │
//! │          (127.0.0.1:2323)                 │
//! │   accept loop ──► Connection task (conn-1)│──► CommandLog
//! │               └─► Connection task (conn-2)│──► CommandLog
//! │   registry: current = conn-2              │
//! └───────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info};

use crate::command_log::CommandLog;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::Connection;
use super::registry::{Admission, ConnectionRegistry, SelectionPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (loopback).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default port the firmware host build connects to.
pub const DEFAULT_PORT: u16 = 2323;

/// Pause after a failed accept so a persistent error cannot spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

// ============================================================================
// ListenerConfig
// ============================================================================

/// Where to listen and how to pick the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Address to bind.
    pub ip: IpAddr,
    /// Port to bind (0 for an ephemeral port).
    pub port: u16,
    /// Current-connection selection policy.
    pub policy: SelectionPolicy,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_BIND_IP,
            port: DEFAULT_PORT,
            policy: SelectionPolicy::default(),
        }
    }
}

impl ListenerConfig {
    /// Loopback on an ephemeral port. Handy for tests.
    #[inline]
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }

    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Accepts firmware connections and feeds their output into a [`CommandLog`].
///
/// # Example
///
/// ```ignore
/// let log = Arc::new(CommandLog::new());
/// let listener = Listener::bind(ListenerConfig::default(), Arc::clone(&log)).await?;
///
/// // Launch firmware pointed at listener.local_addr()...
///
/// listener.wait_for_connection(Duration::from_secs(5)).await?;
/// listener.stop().await;
/// ```
pub struct Listener {
    /// Bound address (with the real port when 0 was requested).
    local_addr: SocketAddr,
    /// Destination for every received line.
    log: Arc<CommandLog>,
    /// Live connections and the current selection.
    registry: Arc<ConnectionRegistry>,
    /// Set once by `stop`.
    shutdown: AtomicBool,
    /// Woken whenever a connection becomes current.
    admitted: Notify,
    /// Accept loop task, taken by `stop` or `Drop`.
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(accept) = self.accept_task.get_mut().take() {
            accept.abort();
        }

        for connection in self.registry.drain() {
            connection.shutdown();
        }
    }
}

// ============================================================================
// Listener - Constructor
// ============================================================================

impl Listener {
    /// Binds the listener and starts the accept loop.
    ///
    /// The accept loop only holds a weak reference: dropping the last
    /// `Arc<Listener>` closes the socket and every connection, just like
    /// [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the address cannot be bound.
    pub async fn bind(config: ListenerConfig, log: Arc<CommandLog>) -> Result<Arc<Self>> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::connection(format!("failed to listen on {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, policy = ?config.policy, "Listener bound");

        let this = Arc::new(Self {
            local_addr,
            log,
            registry: Arc::new(ConnectionRegistry::new(config.policy)),
            shutdown: AtomicBool::new(false),
            admitted: Notify::new(),
            accept_task: Mutex::new(None),
        });

        let accept = tokio::spawn(Self::accept_loop(Arc::downgrade(&this), listener));
        *this.accept_task.lock() = Some(accept);

        info!(%local_addr, "Listener started");

        Ok(this)
    }
}

// ============================================================================
// Listener - Public API
// ============================================================================

impl Listener {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the shared command log.
    #[inline]
    #[must_use]
    pub fn log(&self) -> &Arc<CommandLog> {
        &self.log
    }

    /// Returns the connection registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the number of live connections, superseded ones included.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the id of the current connection.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<ConnectionId> {
        self.registry.current_id()
    }

    /// Returns `true` once `stop` has been called.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Waits until some connection is current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] if none arrives in time.
    pub async fn wait_for_connection(&self, wait: Duration) -> Result<ConnectionId> {
        let deadline = Instant::now() + wait;

        loop {
            let admitted = self.admitted.notified();
            if let Some(id) = self.registry.current_id() {
                return Ok(id);
            }

            if timeout_at(deadline, admitted).await.is_err() {
                return Err(Error::connection_timeout(wait));
            }
        }
    }
}

// ============================================================================
// Listener - Lifecycle
// ============================================================================

impl Listener {
    /// Stops accepting and closes every connection.
    ///
    /// The listening socket is closed before this returns. Calling it again
    /// is a no-op.
    pub async fn stop(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(port = self.port(), "Listener shutting down");

        let accept = self.accept_task.lock().take();
        if let Some(accept) = accept {
            accept.abort();
            // The socket is closed once the aborted task is dropped.
            if let Err(e) = accept.await
                && e.is_panic()
            {
                error!(error = %e, "Accept loop panicked");
            }
        }

        for connection in self.registry.drain() {
            connection.shutdown();
            debug!(conn = %connection.id(), "Connection closed during shutdown");
        }

        info!("Listener shutdown complete");
    }
}

// ============================================================================
// Listener - Accept Loop
// ============================================================================

impl Listener {
    /// Background task that accepts new connections.
    ///
    /// Runs until aborted by `stop`/`Drop`, or until the listener is gone.
    async fn accept_loop(owner: Weak<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            let accepted = listener.accept().await;

            let Some(this) = owner.upgrade() else {
                break;
            };
            if this.is_stopped() {
                break;
            }

            match accepted {
                Ok((stream, addr)) => this.handle_connection(stream, addr),
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    drop(this);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        // Dropping `listener` here closes the socket.
        debug!("Accept loop terminated");
    }

    /// Registers a freshly accepted stream and starts its event loop.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let id = ConnectionId::next();
        let (connection, command_rx) = Connection::new(id, addr);

        if self.registry.admit(connection) == Admission::Refused {
            // Dropping the stream closes it.
            drop(stream);
            return;
        }

        info!(conn = %id, %addr, "Firmware connected");
        self.admitted.notify_waiters();

        let log = Arc::clone(&self.log);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            Connection::run_event_loop(id, stream, command_rx, log).await;
            registry.remove(id);
            info!(conn = %id, "Firmware disconnected");
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn bind(policy: SelectionPolicy) -> Arc<Listener> {
        let config = ListenerConfig {
            policy,
            ..ListenerConfig::ephemeral()
        };
        Listener::bind(config, Arc::new(CommandLog::new()))
            .await
            .expect("bind")
    }

    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.socket_addr(), "127.0.0.1:2323".parse().unwrap());
        assert_eq!(config.policy, SelectionPolicy::LastWins);
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind(SelectionPolicy::LastWins).await;
        assert!(listener.port() > 0);
        assert_eq!(listener.connection_count(), 0);
        assert!(listener.current().is_none());
        listener.stop().await;
    }

    #[tokio::test]
    async fn test_accepts_and_logs_lines() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let mut client = TcpStream::connect(listener.local_addr()).await.expect("connect");

        listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("connected");

        client.write_all(b"L 0 0 255 0 0\n").await.expect("write");
        let log = Arc::clone(listener.log());
        assert!(eventually(|| log.last().is_some()).await);
        assert_eq!(log.last().as_deref(), Some("L 0 0 255 0 0"));

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_last_connection_wins() {
        let listener = bind(SelectionPolicy::LastWins).await;

        let mut first = TcpStream::connect(listener.local_addr()).await.expect("connect");
        let first_id = listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("first");

        let mut second = TcpStream::connect(listener.local_addr()).await.expect("connect");
        assert!(eventually(|| listener.connection_count() == 2).await);
        assert_ne!(listener.current(), Some(first_id));

        let log = Arc::clone(listener.log());
        second.write_all(b"S\n").await.expect("write");
        assert!(eventually(|| log.last().as_deref() == Some("S")).await);

        // The superseded connection is still read.
        first.write_all(b"OLD\n").await.expect("write");
        assert!(eventually(|| log.last().as_deref() == Some("OLD")).await);
        assert_ne!(listener.current(), Some(first_id));

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_keep_first_refuses_second() {
        let listener = bind(SelectionPolicy::KeepFirst).await;

        let _first = TcpStream::connect(listener.local_addr()).await.expect("connect");
        let first_id = listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("first");

        let mut second = TcpStream::connect(listener.local_addr()).await.expect("connect");
        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf))
            .await
            .expect("timely")
            .unwrap_or(0);
        assert_eq!(n, 0, "refused connection should be closed");

        assert_eq!(listener.current(), Some(first_id));
        assert_eq!(listener.connection_count(), 1);

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_disconnect_clears_current() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let client = TcpStream::connect(listener.local_addr()).await.expect("connect");
        listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("connected");

        drop(client);
        assert!(eventually(|| listener.current().is_none()).await);
        assert_eq!(listener.connection_count(), 0);

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_bind_address_in_use() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let config = ListenerConfig {
            port: listener.port(),
            ..ListenerConfig::default()
        };

        let err = Listener::bind(config, Arc::new(CommandLog::new()))
            .await
            .err()
            .expect("port already taken");
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.to_string().contains(&listener.port().to_string()));

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_drop_without_stop_releases_everything() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.expect("connect");
        listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("connected");

        drop(listener);

        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("timely")
            .unwrap_or(0);
        assert_eq!(n, 0);

        let mut refused = false;
        for _ in 0..200 {
            if TcpStream::connect(addr).await.is_err() {
                refused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refused, "listening socket should be closed");
    }

    #[tokio::test]
    async fn test_wait_for_connection_times_out() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let err = listener
            .wait_for_connection(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        listener.stop().await;
    }

    #[tokio::test]
    async fn test_stop_closes_socket_and_connections() {
        let listener = bind(SelectionPolicy::LastWins).await;
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.expect("connect");
        listener
            .wait_for_connection(Duration::from_secs(2))
            .await
            .expect("connected");

        listener.stop().await;
        assert!(listener.is_stopped());

        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("timely")
            .unwrap_or(0);
        assert_eq!(n, 0);

        assert!(TcpStream::connect(addr).await.is_err());

        // Idempotent
        listener.stop().await;
    }
}
