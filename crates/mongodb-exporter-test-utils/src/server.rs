//! Scripted MongoDB backend.
//!
//! A [`FakeServer`] answers commands from a reply table, can be made
//! unreachable or slow, and counts every interaction so tests can assert on
//! connect, ping and disconnect behaviour.

use mongodb_exporter_collectors::bson::Document;
use mongodb_exporter_collectors::ConnectionError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::fixtures;

/// Error code MongoDB returns on a standalone for `replSetGetStatus`
pub const NO_REPLICATION_ENABLED: i32 = 76;

#[derive(Default)]
struct Script {
    replies: HashMap<String, Document>,
    failures: HashMap<String, ConnectionError>,
    one_shot_failures: HashMap<String, VecDeque<ConnectionError>>,
    databases: BTreeMap<String, Vec<String>>,
    connect_delay: Option<Duration>,
    command_delay: Option<Duration>,
    command_delays: HashMap<String, Duration>,
    listing_delay: Option<Duration>,
    ping_delay: Option<Duration>,
}

/// In-memory stand-in for a `mongod` or `mongos`
pub struct FakeServer {
    script: Mutex<Script>,
    reachable: AtomicBool,
    ping_ok: AtomicBool,
    open_attempts: AtomicUsize,
    opens: AtomicUsize,
    pings: AtomicUsize,
    disconnects: AtomicUsize,
    list_database_calls: AtomicUsize,
    command_calls: Mutex<HashMap<String, usize>>,
}

impl FakeServer {
    fn with_is_master(is_master: Document) -> Arc<Self> {
        let mut replies = HashMap::new();
        replies.insert("isMaster".to_string(), is_master);
        replies.insert("serverStatus".to_string(), fixtures::server_status());
        replies.insert("getDiagnosticData".to_string(), fixtures::diagnostic_data());
        replies.insert("dbStats".to_string(), fixtures::db_stats());
        replies.insert("collStats".to_string(), fixtures::coll_stats());
        replies.insert("aggregate".to_string(), fixtures::index_stats());
        replies.insert("top".to_string(), fixtures::top());

        let mut databases = BTreeMap::new();
        databases.insert(
            "app".to_string(),
            vec!["users".to_string(), "orders".to_string(), "system.views".to_string()],
        );
        databases.insert("admin".to_string(), vec!["system.users".to_string()]);
        databases.insert("local".to_string(), vec!["startup_log".to_string()]);

        Arc::new(Self {
            script: Mutex::new(Script {
                replies,
                databases,
                ..Default::default()
            }),
            reachable: AtomicBool::new(true),
            ping_ok: AtomicBool::new(true),
            open_attempts: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            list_database_calls: AtomicUsize::new(0),
            command_calls: Mutex::new(HashMap::new()),
        })
    }

    /// A standalone `mongod`; `replSetGetStatus` fails with code 76
    pub fn standalone() -> Arc<Self> {
        let server = Self::with_is_master(fixtures::is_master_standalone());
        server.fail_with_code(
            "replSetGetStatus",
            NO_REPLICATION_ENABLED,
            "not running with --replSet",
        );
        server
    }

    /// Primary of replica set `set_name`
    pub fn replica_set_member(set_name: &str) -> Arc<Self> {
        let server = Self::with_is_master(fixtures::is_master_primary(set_name));
        server.reply("replSetGetStatus", fixtures::repl_set_status(set_name));
        server
    }

    /// A `mongos` router
    pub fn mongos() -> Arc<Self> {
        Self::with_is_master(fixtures::is_master_mongos())
    }

    /// Answer `command` with `reply` from now on
    pub fn reply(&self, command: &str, reply: Document) {
        let mut script = self.script.lock();
        script.failures.remove(command);
        script.replies.insert(command.to_string(), reply);
    }

    /// Fail every `command` with a message and no server code
    pub fn fail(&self, command: &str, message: &str) {
        self.script.lock().failures.insert(
            command.to_string(),
            ConnectionError::command(command, None, message),
        );
    }

    /// Fail every `command` with a server error code
    pub fn fail_with_code(&self, command: &str, code: i32, message: &str) {
        self.script.lock().failures.insert(
            command.to_string(),
            ConnectionError::command(command, Some(code), message),
        );
    }

    /// Fail only the next `command`
    pub fn fail_once(&self, command: &str, message: &str) {
        self.script
            .lock()
            .one_shot_failures
            .entry(command.to_string())
            .or_default()
            .push_back(ConnectionError::command(command, None, message));
    }

    /// Stop failing `command`
    pub fn clear_failure(&self, command: &str) {
        self.script.lock().failures.remove(command);
    }

    /// Add `count` user collections named `c0..` to database `db`
    pub fn add_collections(&self, db: &str, count: usize) {
        let mut script = self.script.lock();
        let collections = script.databases.entry(db.to_string()).or_default();
        let start = collections.len();
        collections.extend((start..start + count).map(|i| format!("c{i}")));
    }

    /// Refuse or accept new connections and pings
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Accept connections but fail the liveness ping
    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.script.lock().connect_delay = Some(delay);
    }

    /// Delay every command
    pub fn set_command_delay(&self, delay: Duration) {
        self.script.lock().command_delay = Some(delay);
    }

    /// Delay only `command`; takes precedence over [`Self::set_command_delay`]
    pub fn delay_command(&self, command: &str, delay: Duration) {
        self.script
            .lock()
            .command_delays
            .insert(command.to_string(), delay);
    }

    /// Delay database listings, which holds a collection count open
    pub fn set_listing_delay(&self, delay: Duration) {
        self.script.lock().listing_delay = Some(delay);
    }

    pub fn set_ping_delay(&self, delay: Duration) {
        self.script.lock().ping_delay = Some(delay);
    }

    /// Every call to the connector, successful or not
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Connections actually handed out by the connector
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn list_database_calls(&self) -> usize {
        self.list_database_calls.load(Ordering::SeqCst)
    }

    /// How often `command` was run
    pub fn command_calls(&self, command: &str) -> usize {
        self.command_calls.lock().get(command).copied().unwrap_or(0)
    }

    pub(crate) fn connect_delay(&self) -> Option<Duration> {
        self.script.lock().connect_delay
    }

    pub(crate) fn command_delay(&self, command: &str) -> Option<Duration> {
        let script = self.script.lock();
        script
            .command_delays
            .get(command)
            .copied()
            .or(script.command_delay)
    }

    pub(crate) fn listing_delay(&self) -> Option<Duration> {
        self.script.lock().listing_delay
    }

    pub(crate) fn ping_delay(&self) -> Option<Duration> {
        self.script.lock().ping_delay
    }

    pub(crate) fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    pub(crate) fn record_open_attempt(&self) {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn ping(&self) -> Result<(), ConnectionError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if !self.is_reachable() {
            return Err(ConnectionError::Connect("server selection timeout".to_string()));
        }
        if !self.ping_ok.load(Ordering::SeqCst) {
            return Err(ConnectionError::command("ping", Some(13), "not authorized"));
        }
        Ok(())
    }

    pub(crate) fn run_command(&self, command: &Document) -> Result<Document, ConnectionError> {
        let name = command.keys().next().cloned().unwrap_or_default();
        *self.command_calls.lock().entry(name.clone()).or_insert(0) += 1;

        if !self.is_reachable() {
            return Err(ConnectionError::Connect("server selection timeout".to_string()));
        }

        let mut script = self.script.lock();
        if let Some(err) = script
            .one_shot_failures
            .get_mut(&name)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if let Some(err) = script.failures.get(&name) {
            return Err(err.clone());
        }
        script.replies.get(&name).cloned().ok_or_else(|| {
            ConnectionError::command(name.clone(), Some(59), format!("no such command: '{name}'"))
        })
    }

    pub(crate) fn list_database_names(&self) -> Result<Vec<String>, ConnectionError> {
        self.list_database_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_reachable() {
            return Err(ConnectionError::Connect("server selection timeout".to_string()));
        }
        let script = self.script.lock();
        if let Some(err) = script.failures.get("listDatabases") {
            return Err(err.clone());
        }
        Ok(script.databases.keys().cloned().collect())
    }

    pub(crate) fn list_collection_names(&self, database: &str) -> Result<Vec<String>, ConnectionError> {
        let script = self.script.lock();
        if let Some(err) = script.failures.get("listCollections") {
            return Err(err.clone());
        }
        Ok(script.databases.get(database).cloned().unwrap_or_default())
    }
}
