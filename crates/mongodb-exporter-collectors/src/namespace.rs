//! Namespace parsing and discovery.

use std::fmt;

use crate::connection::Connection;
use crate::error::{CollectorError, ConnectionError};

/// Databases that never count as user data
pub const SYSTEM_DATABASES: [&str; 3] = ["admin", "config", "local"];

/// A `database.collection` pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Parse `db.collection`; the collection part may contain dots.
    pub fn parse(ns: &str) -> Result<Self, CollectorError> {
        match ns.split_once('.') {
            Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Ok(Self::new(db, coll)),
            _ => Err(CollectorError::InvalidNamespace(ns.to_string())),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

pub fn is_system_collection(name: &str) -> bool {
    name.starts_with("system.")
}

/// User collections of one database, sorted
pub async fn list_user_collections(
    connection: &dyn Connection,
    database: &str,
) -> Result<Vec<Namespace>, ConnectionError> {
    let mut names = connection.list_collection_names(database).await?;
    names.retain(|name| !is_system_collection(name));
    names.sort();
    Ok(names
        .into_iter()
        .map(|collection| Namespace::new(database, collection))
        .collect())
}

/// Every user collection across every user database
pub async fn list_user_namespaces(
    connection: &dyn Connection,
) -> Result<Vec<Namespace>, ConnectionError> {
    let mut databases = connection.list_database_names().await?;
    databases.retain(|db| !is_system_database(db));
    databases.sort();

    let mut namespaces = Vec::new();
    for database in databases {
        namespaces.extend(list_user_collections(connection, &database).await?);
    }
    Ok(namespaces)
}

/// Number of user collections; the input to the collection-stats limit
pub async fn count_user_collections(connection: &dyn Connection) -> Result<u64, ConnectionError> {
    let namespaces = list_user_namespaces(connection).await?;
    Ok(namespaces.len() as u64)
}

/// Turn an allow-list into concrete namespaces.
///
/// With an empty list and `discover` set, every user namespace is returned.
/// A bare database entry expands to its user collections when
/// `allow_bare_db` is set.
pub async fn resolve_namespaces(
    connection: &dyn Connection,
    entries: &[String],
    discover: bool,
    allow_bare_db: bool,
) -> Result<Vec<Namespace>, CollectorError> {
    if entries.is_empty() {
        if discover {
            return Ok(list_user_namespaces(connection).await?);
        }
        return Ok(Vec::new());
    }

    let mut namespaces = Vec::new();
    for entry in entries {
        if allow_bare_db && !entry.contains('.') && !entry.is_empty() {
            namespaces.extend(list_user_collections(connection, entry).await?);
        } else {
            namespaces.push(Namespace::parse(entry)?);
        }
    }
    namespaces.sort();
    namespaces.dedup();
    Ok(namespaces)
}
