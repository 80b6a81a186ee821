//! Collectors and registry assembly against the scripted backend

use mongodb_exporter_collectors::bson::doc;
use mongodb_exporter_collectors::namespace::resolve_namespaces;
use mongodb_exporter_collectors::{
    count_user_collections, encode_text, CollectorKind, Connection, Connector, NodeType,
    RegistryBuilder, TopologyInfo,
};
use mongodb_exporter_config::CollectorsConfig;
use mongodb_exporter_test_utils::{FakeConnector, FakeServer};
use std::sync::Arc;

async fn connect(server: &Arc<FakeServer>) -> Arc<dyn Connection> {
    FakeConnector::new(server).open().await.unwrap()
}

fn everything() -> CollectorsConfig {
    CollectorsConfig {
        collect_all: true,
        ..Default::default()
    }
}

async fn scrape(server: &Arc<FakeServer>, settings: &CollectorsConfig) -> String {
    let connection = connect(server).await;
    let topology = TopologyInfo::resolve(connection.as_ref()).await.unwrap();
    let registry = RegistryBuilder::new(settings).build(Some(connection), Some(&topology), Some(2));
    encode_text(&registry.gather().await).unwrap()
}

#[tokio::test]
async fn test_topology_from_fake_servers() {
    let standalone = connect(&FakeServer::standalone()).await;
    let info = TopologyInfo::resolve(standalone.as_ref()).await.unwrap();
    assert_eq!(info.node_type, NodeType::Standalone);

    let member = connect(&FakeServer::replica_set_member("rs0")).await;
    let info = TopologyInfo::resolve(member.as_ref()).await.unwrap();
    assert_eq!(info.replica_set.as_deref(), Some("rs0"));
    assert_eq!(info.state, Some("primary"));

    let router = connect(&FakeServer::mongos()).await;
    assert!(TopologyInfo::resolve(router.as_ref()).await.unwrap().is_router());
}

#[tokio::test]
async fn test_topology_failure_is_reported() {
    let server = FakeServer::standalone();
    server.fail("isMaster", "command isMaster requires authentication");
    let connection = connect(&server).await;

    let err = TopologyInfo::resolve(connection.as_ref()).await.unwrap_err();
    assert!(err.to_string().contains("requires authentication"));
}

#[tokio::test]
async fn test_count_skips_system_namespaces() {
    let server = FakeServer::standalone();
    let connection = connect(&server).await;
    assert_eq!(count_user_collections(connection.as_ref()).await.unwrap(), 2);

    server.add_collections("shop", 3);
    assert_eq!(count_user_collections(connection.as_ref()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_resolve_namespaces() {
    let server = FakeServer::standalone();
    let connection = connect(&server).await;

    let bare = resolve_namespaces(connection.as_ref(), &["app".to_string()], false, true)
        .await
        .unwrap();
    let names: Vec<String> = bare.iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["app.orders", "app.users"]);

    let discovered = resolve_namespaces(connection.as_ref(), &[], true, true).await.unwrap();
    assert_eq!(discovered.len(), 2);

    let none = resolve_namespaces(connection.as_ref(), &[], false, true).await.unwrap();
    assert!(none.is_empty());

    let rejected = resolve_namespaces(connection.as_ref(), &["app".to_string()], false, false).await;
    assert!(rejected.is_err());
}

#[tokio::test]
async fn test_standalone_scrape_with_everything() {
    let server = FakeServer::standalone();
    let text = scrape(&server, &everything()).await;

    assert!(text.contains("mongodb_up 1"));
    assert!(text.contains("mongodb_exporter_build_info{version="));
    assert!(text.contains("mongodb_ss_uptime 3600"));
    assert!(text.contains("mongodb_sys_cpu_num_cpus 4"));
    assert!(text.contains(r#"mongodb_dbstats_objects{database="app"} 15"#));
    assert!(text.contains(r#"mongodb_collstats_count{collection="users",database="app"} 10"#));
    assert!(text.contains(
        r#"mongodb_collstats_index_size{collection="orders",database="app",index="_id_"} 4096"#
    ));
    assert!(!text.contains("mongodb_collstats_wiredtiger"));
    assert!(text.contains(
        r#"mongodb_indexstats_accesses_ops{collection="users",database="app",key_name="_id_"} 7"#
    ));
    assert!(text.contains(r#"mongodb_top_insert_count{collection="users",database="app"} 2"#));

    // code 76 on a standalone means no replica set metrics at all
    assert!(!text.contains("mongodb_rs_members"));
}

#[tokio::test]
async fn test_replica_set_member_labels() {
    let server = FakeServer::replica_set_member("rs0");
    let text = scrape(&server, &everything()).await;

    assert!(text.contains(r#"mongodb_up{rs_nm="rs0",rs_state="primary"} 1"#));
    assert!(text.contains(
        r#"mongodb_rs_members_health{member_idx="rs0-b:27017",rs_nm="rs0",rs_state="primary"} 1"#
    ));
    assert!(text.contains(
        r#"mongodb_rs_members_state{member_idx="rs0-b:27017",rs_nm="rs0",rs_state="primary"} 2"#
    ));
}

#[tokio::test]
async fn test_mongos_uses_server_status() {
    let server = FakeServer::mongos();
    let settings = everything();
    let connection = connect(&server).await;
    let topology = TopologyInfo::resolve(connection.as_ref()).await.unwrap();
    let registry = RegistryBuilder::new(&settings).build(Some(connection), Some(&topology), Some(2));

    assert!(!registry.contains(CollectorKind::Top));
    assert!(!registry.contains(CollectorKind::ReplSetStatus));
    assert!(registry.contains(CollectorKind::DiagnosticData));

    let text = encode_text(&registry.gather().await).unwrap();
    assert!(text.contains("mongodb_ss_uptime 3600"));
    assert_eq!(server.command_calls("serverStatus"), 1);
    assert_eq!(server.command_calls("getDiagnosticData"), 0);
    assert_eq!(server.command_calls("top"), 0);
}

#[tokio::test]
async fn test_compatible_mode_adds_legacy_metrics() {
    let server = FakeServer::standalone();
    let settings = CollectorsConfig {
        enable_diagnostic_data: true,
        compatible_mode: true,
        ..Default::default()
    };
    let text = scrape(&server, &settings).await;

    assert!(text.contains(r#"mongodb_connections{state="current"} 4"#));
    assert!(text.contains("mongodb_instance_uptime_seconds 3600"));
    assert!(text.contains(r#"mongodb_op_counters_total{type="query"} 42"#));
}

#[tokio::test]
async fn test_failing_collector_does_not_hide_others() {
    let server = FakeServer::standalone();
    server.fail("getDiagnosticData", "not authorized on admin");
    server.reply("dbStats", doc! { "db": "app", "objects": 3, "ok": 1.0 });

    let text = scrape(&server, &everything()).await;
    assert!(!text.contains("mongodb_ss_"));
    assert!(text.contains(r#"mongodb_dbstats_objects{database="app"} 3"#));
    assert!(text.contains("mongodb_up 1"));
}

#[tokio::test]
async fn test_general_status_reports_down() {
    let server = FakeServer::standalone();
    let connection = connect(&server).await;
    server.set_ping_ok(false);

    let registry = RegistryBuilder::new(&CollectorsConfig::default()).build(Some(connection), None, None);
    assert_eq!(registry.collector_names(), vec!["general"]);

    let text = encode_text(&registry.gather().await).unwrap();
    assert!(text.contains("mongodb_up 0"));
}
