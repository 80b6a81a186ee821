//! Canned command replies.
//!
//! Shapes follow what a 6.x server returns, trimmed to the fields the
//! collectors read.

use mongodb_exporter_collectors::bson::{doc, DateTime, Document};

/// `isMaster` from a standalone `mongod`
pub fn is_master_standalone() -> Document {
    doc! { "ismaster": true, "maxBsonObjectSize": 16_777_216, "ok": 1.0 }
}

/// `isMaster` from the primary of `set_name`
pub fn is_master_primary(set_name: &str) -> Document {
    doc! {
        "ismaster": true,
        "secondary": false,
        "setName": set_name,
        "hosts": ["rs0-a:27017", "rs0-b:27017"],
        "ok": 1.0,
    }
}

/// `isMaster` from a `mongos`
pub fn is_master_mongos() -> Document {
    doc! { "ismaster": true, "msg": "isdbgrid", "ok": 1.0 }
}

pub fn server_status() -> Document {
    doc! {
        "host": "fake:27017",
        "version": "6.0.14",
        "uptime": 3600.0,
        "connections": { "current": 4, "available": 796, "totalCreated": 12 },
        "opcounters": {
            "insert": 10_i64,
            "query": 42_i64,
            "update": 3_i64,
            "delete": 1_i64,
            "getmore": 0_i64,
            "command": 88_i64,
        },
        "mem": { "resident": 120, "virtual": 1500 },
        "ok": 1.0,
    }
}

pub fn diagnostic_data() -> Document {
    doc! {
        "data": {
            "start": DateTime::from_millis(1_700_000_000_000),
            "serverStatus": server_status(),
            "systemMetrics": { "cpu": { "num_cpus": 4, "user_ms": 1200_i64 } },
        },
        "ok": 1.0,
    }
}

pub fn db_stats() -> Document {
    doc! {
        "db": "app",
        "collections": 2,
        "views": 0,
        "objects": 15_i64,
        "dataSize": 2048.0,
        "storageSize": 8192.0,
        "indexes": 2,
        "ok": 1.0,
    }
}

pub fn coll_stats() -> Document {
    doc! {
        "ns": "app.users",
        "count": 10_i64,
        "size": 1024_i64,
        "storageSize": 4096_i64,
        "nindexes": 1,
        "indexSizes": { "_id_": 4096 },
        "wiredTiger": { "cache": { "bytes read into cache": 0 } },
        "indexDetails": { "_id_": { "metadata": { "formatVersion": 8 } } },
        "ok": 1.0,
    }
}

pub fn index_stats() -> Document {
    doc! {
        "cursor": {
            "firstBatch": [
                {
                    "name": "_id_",
                    "key": { "_id": 1 },
                    "accesses": { "ops": 7_i64, "since": DateTime::from_millis(1_700_000_000_000) },
                },
            ],
            "id": 0_i64,
            "ns": "app.users",
        },
        "ok": 1.0,
    }
}

pub fn top() -> Document {
    doc! {
        "totals": {
            "note": "all times in microseconds",
            "app.users": {
                "total": { "time": 250, "count": 5 },
                "insert": { "time": 100, "count": 2 },
                "queries": { "time": 150, "count": 3 },
            },
        },
        "ok": 1.0,
    }
}

pub fn repl_set_status(set_name: &str) -> Document {
    doc! {
        "set": set_name,
        "myState": 1,
        "members": [
            { "_id": 0, "name": "rs0-a:27017", "health": 1.0, "state": 1, "stateStr": "PRIMARY", "uptime": 3600 },
            { "_id": 1, "name": "rs0-b:27017", "health": 1.0, "state": 2, "stateStr": "SECONDARY", "uptime": 3500 },
        ],
        "ok": 1.0,
    }
}
