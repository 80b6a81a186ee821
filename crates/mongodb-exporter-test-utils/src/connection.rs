//! [`Connector`] and [`Connection`] backed by a [`FakeServer`]

use async_trait::async_trait;
use mongodb_exporter_collectors::bson::Document;
use mongodb_exporter_collectors::{Connection, ConnectionError, Connector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::server::FakeServer;

/// Hands out [`FakeConnection`]s to one server
#[derive(Clone)]
pub struct FakeConnector {
    server: Arc<FakeServer>,
}

impl FakeConnector {
    pub fn new(server: &Arc<FakeServer>) -> Self {
        Self {
            server: Arc::clone(server),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        self.server.record_open_attempt();
        if let Some(delay) = self.server.connect_delay() {
            tokio::time::sleep(delay).await;
        }
        if !self.server.is_reachable() {
            return Err(ConnectionError::Connect("connection refused".to_string()));
        }
        self.server.record_open();
        Ok(Arc::new(FakeConnection {
            server: Arc::clone(&self.server),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One open handle; commands fail once it is disconnected
pub struct FakeConnection {
    server: Arc<FakeServer>,
    closed: AtomicBool,
}

impl FakeConnection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Connect("connection closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        if let Some(delay) = self.server.ping_delay() {
            tokio::time::sleep(delay).await;
        }
        self.server.ping()
    }

    async fn run_command(&self, _database: &str, command: Document) -> Result<Document, ConnectionError> {
        self.ensure_open()?;
        let name = command.keys().next().map(String::as_str).unwrap_or_default();
        if let Some(delay) = self.server.command_delay(name) {
            tokio::time::sleep(delay).await;
        }
        self.server.run_command(&command)
    }

    async fn list_database_names(&self) -> Result<Vec<String>, ConnectionError> {
        self.ensure_open()?;
        if let Some(delay) = self.server.listing_delay() {
            tokio::time::sleep(delay).await;
        }
        self.server.list_database_names()
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, ConnectionError> {
        self.ensure_open()?;
        self.server.list_collection_names(database)
    }

    async fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.server.record_disconnect();
        }
    }
}
