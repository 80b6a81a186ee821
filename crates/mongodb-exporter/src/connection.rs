// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Backend connection lifecycle.
//!
//! With the global pool enabled one connection is created on first success
//! and reused for the life of the process. Otherwise every scrape opens its
//! own connection and closes it afterwards.

use mongodb_exporter_collectors::{Connection, ConnectionError, Connector};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Owns the shared connection slot and knows how to open new connections
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    global_conn_pool: bool,
    shared: OnceCell<Arc<dyn Connection>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, global_conn_pool: bool) -> Self {
        Self {
            connector,
            global_conn_pool,
            shared: OnceCell::new(),
        }
    }

    /// Whether connections are reused across scrapes
    pub fn is_pooled(&self) -> bool {
        self.global_conn_pool
    }

    /// The shared connection, if one has been established
    pub fn shared_connection(&self) -> Option<Arc<dyn Connection>> {
        self.shared.get().map(Arc::clone)
    }

    /// Get a live connection for one scrape, giving up at `deadline`.
    ///
    /// In pooled mode concurrent first callers wait on a single connect and
    /// all receive its handle; a failed connect stores nothing, so the next
    /// call starts over. The slot lock is only held while initializing, and
    /// the initializing connect is bounded by its caller's deadline.
    pub async fn acquire(&self, deadline: Instant) -> Result<ScrapeConnection, ConnectionError> {
        if self.global_conn_pool {
            let connection = self
                .shared
                .get_or_try_init(|| connect(self.connector.as_ref(), deadline))
                .await?;
            return Ok(ScrapeConnection {
                connection: Arc::clone(connection),
                owned: false,
                released: false,
            });
        }

        let connection = connect(self.connector.as_ref(), deadline).await?;
        Ok(ScrapeConnection {
            connection,
            owned: true,
            released: false,
        })
    }
}

/// Open a connection and verify it answers before `deadline`.
///
/// A connection that fails or outlives the ping is disconnected before the
/// error is returned; callers never see a half-open handle.
pub async fn connect(
    connector: &dyn Connector,
    deadline: Instant,
) -> Result<Arc<dyn Connection>, ConnectionError> {
    let connection = timeout_at(deadline, connector.open())
        .await
        .map_err(|_| ConnectionError::Timeout("connect"))??;

    let ping = timeout_at(deadline, connection.ping())
        .await
        .unwrap_or(Err(ConnectionError::Timeout("ping")));
    if let Err(e) = ping {
        debug!(error = %e, "Ping failed, disconnecting");
        connection.disconnect().await;
        return Err(e);
    }
    Ok(connection)
}

/// A connection leased to one scrape.
///
/// Per-scrape connections are closed by [`ScrapeConnection::release`]; if the
/// lease is dropped without it (cancelled request, panic) the disconnect is
/// spawned onto the runtime instead. Shared connections are never closed.
pub struct ScrapeConnection {
    connection: Arc<dyn Connection>,
    owned: bool,
    released: bool,
}

impl ScrapeConnection {
    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.connection)
    }

    pub fn is_shared(&self) -> bool {
        !self.owned
    }

    /// Close the connection if this scrape owns it
    pub async fn release(mut self) {
        self.released = true;
        if self.owned {
            self.connection.disconnect().await;
            debug!("Per-scrape connection closed");
        }
    }
}

impl Drop for ScrapeConnection {
    fn drop(&mut self) {
        if !self.owned || self.released {
            return;
        }
        let connection = Arc::clone(&self.connection);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    connection.disconnect().await;
                });
            }
            Err(_) => warn!("No runtime to close abandoned MongoDB connection"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mongodb_exporter_test_utils::{FakeConnector, FakeServer};
    use std::time::Duration;

    fn manager(server: &Arc<FakeServer>, pooled: bool) -> ConnectionManager {
        ConnectionManager::new(Arc::new(FakeConnector::new(server)), pooled)
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_pooled_connection_is_reused() {
        let server = FakeServer::standalone();
        let manager = manager(&server, true);

        let first = manager.acquire(soon()).await.unwrap();
        assert!(first.is_shared());
        first.release().await;
        let second = manager.acquire(soon()).await.unwrap();
        second.release().await;

        assert_eq!(server.opens(), 1);
        assert_eq!(server.pings(), 1);
        assert_eq!(server.disconnects(), 0);
        assert!(manager.shared_connection().is_some());
    }

    #[tokio::test]
    async fn test_failed_pooled_connect_is_not_cached() {
        let server = FakeServer::standalone();
        server.set_reachable(false);
        let manager = manager(&server, true);

        assert!(manager.acquire(soon()).await.is_err());
        assert!(manager.shared_connection().is_none());

        server.set_reachable(true);
        assert!(manager.acquire(soon()).await.is_ok());
        assert_eq!(server.open_attempts(), 2);
        assert_eq!(server.opens(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_acquire_connects_once() {
        let server = FakeServer::standalone();
        server.set_connect_delay(Duration::from_millis(50));
        let manager = manager(&server, true);

        let (a, b) = tokio::join!(manager.acquire(soon()), manager.acquire(soon()));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a.connection(), &b.connection()));
        assert_eq!(server.open_attempts(), 1);
    }

    #[tokio::test]
    async fn test_ping_failure_disconnects() {
        let server = FakeServer::standalone();
        server.set_ping_ok(false);

        let err = connect(&FakeConnector::new(&server), soon()).await.err().expect("expected error");
        assert!(err.to_string().contains("not authorized"));
        assert_eq!(server.opens(), 1);
        assert_eq!(server.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_slow_ping_disconnects_at_deadline() {
        let server = FakeServer::standalone();
        server.set_ping_delay(Duration::from_millis(500));

        let started = std::time::Instant::now();
        let deadline = Instant::now() + Duration::from_millis(50);
        let err = connect(&FakeConnector::new(&server), deadline)
            .await
            .err().expect("expected error");

        assert!(matches!(err, ConnectionError::Timeout("ping")));
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(server.opens(), 1);
        assert_eq!(server.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_slow_connect_times_out_without_caching() {
        let server = FakeServer::standalone();
        server.set_connect_delay(Duration::from_millis(500));
        let manager = manager(&server, true);

        let deadline = Instant::now() + Duration::from_millis(20);
        let err = manager.acquire(deadline).await.err().expect("expected error");
        assert!(matches!(err, ConnectionError::Timeout("connect")));
        assert!(manager.shared_connection().is_none());
    }

    #[tokio::test]
    async fn test_unpooled_lease_is_released() {
        let server = FakeServer::standalone();
        let manager = manager(&server, false);

        let lease = manager.acquire(soon()).await.unwrap();
        assert!(!lease.is_shared());
        lease.release().await;
        assert_eq!(server.disconnects(), 1);

        let _second = manager.acquire(soon()).await.unwrap();
        assert_eq!(server.opens(), 2);
        assert!(manager.shared_connection().is_none());
    }

    #[tokio::test]
    async fn test_dropped_lease_still_disconnects() {
        let server = FakeServer::standalone();
        let manager = manager(&server, false);

        drop(manager.acquire(soon()).await.unwrap());
        for _ in 0..50 {
            if server.disconnects() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(server.disconnects(), 1);
    }
}
