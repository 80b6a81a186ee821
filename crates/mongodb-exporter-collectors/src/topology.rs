//! Node role classification.
//!
//! Re-run on every scrape: a node can be promoted, demoted or reconfigured
//! between two scrapes.

use mongodb::bson::{doc, Document};
use std::collections::HashMap;

use crate::connection::Connection;
use crate::error::ConnectionError;

/// What kind of process the exporter is talking to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Query router of a sharded cluster
    Mongos,
    /// Member of a replica set
    ReplicaSetMember,
    /// Standalone `mongod`
    Standalone,
}

impl NodeType {
    pub fn as_label(&self) -> &'static str {
        match self {
            NodeType::Mongos => "mongos",
            NodeType::ReplicaSetMember => "replset",
            NodeType::Standalone => "mongod",
        }
    }
}

/// Topology facts for the current scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyInfo {
    pub node_type: NodeType,
    /// Replica set name, members only
    pub replica_set: Option<String>,
    /// `primary`, `secondary`, `arbiter` or `other`, members only
    pub state: Option<&'static str>,
}

impl TopologyInfo {
    /// Classify the node behind `connection` with a single `isMaster`.
    pub async fn resolve(connection: &dyn Connection) -> Result<Self, ConnectionError> {
        let reply = connection.run_command("admin", doc! { "isMaster": 1 }).await?;
        Ok(Self::from_is_master(&reply))
    }

    /// Classify from an `isMaster` / `hello` reply.
    pub fn from_is_master(reply: &Document) -> Self {
        // mongos answers with msg: "isdbgrid"
        if reply.get_str("msg").map(|msg| msg == "isdbgrid").unwrap_or(false) {
            return TopologyInfo {
                node_type: NodeType::Mongos,
                replica_set: None,
                state: None,
            };
        }

        match reply.get_str("setName") {
            Ok(set_name) => {
                let flag = |key: &str| reply.get_bool(key).unwrap_or(false);
                let state = if flag("ismaster") || flag("isWritablePrimary") {
                    "primary"
                } else if flag("secondary") {
                    "secondary"
                } else if flag("arbiterOnly") {
                    "arbiter"
                } else {
                    "other"
                };
                TopologyInfo {
                    node_type: NodeType::ReplicaSetMember,
                    replica_set: Some(set_name.to_string()),
                    state: Some(state),
                }
            }
            Err(_) => TopologyInfo {
                node_type: NodeType::Standalone,
                replica_set: None,
                state: None,
            },
        }
    }

    /// Routers have no replication state or per-node `top` data
    pub fn is_router(&self) -> bool {
        self.node_type == NodeType::Mongos
    }

    /// Constant labels attached to collector output
    pub fn labels(&self) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        if let Some(name) = &self.replica_set {
            labels.insert("rs_nm".to_string(), name.clone());
        }
        if let Some(state) = self.state {
            labels.insert("rs_state".to_string(), state.to_string());
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mongos_is_detected_from_msg() {
        let info = TopologyInfo::from_is_master(&doc! { "ismaster": true, "msg": "isdbgrid" });
        assert_eq!(info.node_type, NodeType::Mongos);
        assert!(info.is_router());
        assert!(info.labels().is_empty());
    }

    #[test]
    fn test_replica_set_member_states() {
        let primary = TopologyInfo::from_is_master(&doc! { "setName": "rs0", "ismaster": true });
        assert_eq!(primary.node_type, NodeType::ReplicaSetMember);
        assert_eq!(primary.state, Some("primary"));

        let secondary = TopologyInfo::from_is_master(&doc! {
            "setName": "rs0", "ismaster": false, "secondary": true
        });
        assert_eq!(secondary.state, Some("secondary"));
        assert!(!secondary.is_router());

        let arbiter = TopologyInfo::from_is_master(&doc! { "setName": "rs0", "arbiterOnly": true });
        assert_eq!(arbiter.state, Some("arbiter"));

        let labels = secondary.labels();
        assert_eq!(labels.get("rs_nm").map(String::as_str), Some("rs0"));
        assert_eq!(labels.get("rs_state").map(String::as_str), Some("secondary"));
    }

    #[test]
    fn test_standalone() {
        let info = TopologyInfo::from_is_master(&doc! { "ismaster": true, "maxBsonObjectSize": 16777216 });
        assert_eq!(info.node_type, NodeType::Standalone);
        assert_eq!(info.node_type.as_label(), "mongod");
    }
}
