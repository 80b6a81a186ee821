//! Backend connection capability.
//!
//! Collectors and the scrape path only see [`Connection`]; the driver-backed
//! implementation lives here next to it so tests can swap in a scripted one.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use mongodb_exporter_config::APP_NAME;
use std::sync::Arc;
use tracing::debug;

use crate::error::ConnectionError;

/// A live handle to one MongoDB deployment
#[async_trait]
pub trait Connection: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> Result<(), ConnectionError>;

    /// Run a database command and return the raw reply
    async fn run_command(&self, database: &str, command: Document) -> Result<Document, ConnectionError>;

    /// Names of every database visible to the user
    async fn list_database_names(&self) -> Result<Vec<String>, ConnectionError>;

    /// Names of every collection in `database`
    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, ConnectionError>;

    /// Close background connections. The handle must not be used afterwards.
    async fn disconnect(&self);
}

/// Creates unverified connections; pinging is up to the caller
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn Connection>, ConnectionError>;
}

/// [`Connector`] backed by the official driver
#[derive(Debug, Clone)]
pub struct MongoConnector {
    uri: String,
    direct_connect: bool,
}

impl MongoConnector {
    pub fn new(uri: impl Into<String>, direct_connect: bool) -> Self {
        Self {
            uri: uri.into(),
            direct_connect,
        }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn open(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| ConnectionError::InvalidOptions(e.to_string()))?;
        options.direct_connection = Some(self.direct_connect);
        options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::InvalidOptions(e.to_string()))?;
        debug!(direct = self.direct_connect, "MongoDB client created");

        Ok(Arc::new(MongoConnection { client }))
    }
}

/// [`Connection`] wrapping a driver [`Client`]
pub struct MongoConnection {
    client: Client,
}

#[async_trait]
impl Connection for MongoConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::Connect(e.to_string()))
    }

    async fn run_command(&self, database: &str, command: Document) -> Result<Document, ConnectionError> {
        let name = command.keys().next().cloned().unwrap_or_default();
        self.client
            .database(database)
            .run_command(command)
            .await
            .map_err(|e| command_error(name, &e))
    }

    async fn list_database_names(&self) -> Result<Vec<String>, ConnectionError> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| command_error("listDatabases", &e))
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, ConnectionError> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| command_error("listCollections", &e))
    }

    async fn disconnect(&self) {
        self.client.clone().shutdown().await;
    }
}

fn command_error(command: impl Into<String>, err: &mongodb::error::Error) -> ConnectionError {
    let code = match err.kind.as_ref() {
        ErrorKind::Command(cmd) => Some(cmd.code),
        _ => None,
    };
    ConnectionError::command(command, code, err.to_string())
}
