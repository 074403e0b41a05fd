use httpmock::prelude::*;
use serde_json::json;

use leadflow::stores::{
    BackingStore, HttpStore, LEADS_TABLE, LocalStore, SnapshotStore, StoreError, WriteRecord,
};

mod common;
use common::*;

fn draft_lead(id: &str) -> leadflow::lead::Lead {
    let mut lead = leadflow::normalize::normalize(&json!({"id": id, "client": "Store Test"}));
    lead.agent = "AGENT_001".to_string();
    lead
}

#[tokio::test]
async fn local_store_round_trips_the_leads_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("db.json"));

    assert!(store.fetch_all().await.unwrap().is_empty());

    store
        .write_record(&WriteRecord::Create {
            lead: draft_lead("L-LOCAL1"),
        })
        .await
        .unwrap();
    let rows = store.fetch_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "L-LOCAL1");

    // Reopening the same file sees the same table.
    let reopened = LocalStore::new(store.path());
    assert_eq!(reopened.fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn local_store_updates_status_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("db.json"));
    store
        .write_record(&WriteRecord::Create {
            lead: draft_lead("L-LOCAL2"),
        })
        .await
        .unwrap();

    store
        .write_record(&WriteRecord::UpdateStatus {
            id: "L-LOCAL2".to_string(),
            status: "Credit_Review".to_string(),
        })
        .await
        .unwrap();
    let rows = store.fetch_all().await.unwrap();
    assert_eq!(rows[0]["status"], "Credit_Review");

    let missing = store
        .write_record(&WriteRecord::UpdateStatus {
            id: "L-NOPE".to_string(),
            status: "Rejected".to_string(),
        })
        .await;
    assert!(matches!(missing, Err(StoreError::NotAcknowledged { .. })));
}

#[tokio::test]
async fn local_store_keeps_other_tables_intact() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("db.json"));
    store.write_table("audit", &[json!({"entry": 1})]).unwrap();
    store
        .write_table(LEADS_TABLE, &[sql_row("L-1", "A", "Submitted", "AGENT_001")])
        .unwrap();

    assert_eq!(store.read_table("audit").unwrap().len(), 1);
    assert_eq!(store.read_table(LEADS_TABLE).unwrap().len(), 1);
}

#[tokio::test]
async fn http_store_accepts_every_feed_envelope() {
    let server = MockServer::start_async().await;
    let rows = vec![sql_row("L-E1", "Envelope", "Submitted", "AGENT_001")];

    for body in [
        json!(rows.clone()),
        json!({"data": rows.clone()}),
        json!({"leads": rows.clone()}),
        json!({"records": rows.clone()}),
    ] {
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/feed");
                then.status(200).json_body(body.clone());
            })
            .await;
        let store = HttpStore::new(server.url("/feed")).unwrap();
        let fetched = store.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 1, "failed for envelope {body}");
        mock.delete_async().await;
    }
}

#[tokio::test]
async fn http_store_maps_error_statuses() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/feed");
            then.status(503);
        })
        .await;
    let store = HttpStore::new(server.url("/feed")).unwrap();
    assert!(matches!(
        store.fetch_all().await,
        Err(StoreError::HttpStatus { status: 503 })
    ));
}

#[tokio::test]
async fn http_store_maps_garbage_bodies() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/feed");
            then.status(200).body("<html>definitely not json</html>");
        })
        .await;
    let store = HttpStore::new(server.url("/feed")).unwrap();
    assert!(matches!(
        store.fetch_all().await,
        Err(StoreError::MalformedPayload { .. })
    ));
}

#[tokio::test]
async fn http_store_posts_action_tagged_writes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/feed")
                .json_body_includes(r#"{"action": "UPDATE_STATUS", "id": "L-W1"}"#);
            then.status(200);
        })
        .await;
    let store = HttpStore::new(server.url("/feed")).unwrap();
    store
        .write_record(&WriteRecord::UpdateStatus {
            id: "L-W1".to_string(),
            status: "Login".to_string(),
        })
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn http_store_write_failure_is_not_acknowledged() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/feed");
            then.status(500);
        })
        .await;
    let store = HttpStore::new(server.url("/feed")).unwrap();
    let result = store
        .write_record(&WriteRecord::Note {
            id: "L-W2".to_string(),
            note: "hello".to_string(),
        })
        .await;
    assert!(matches!(result, Err(StoreError::NotAcknowledged { .. })));
}

#[tokio::test]
async fn snapshot_store_round_trips_through_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.json");

    let leads = vec![draft_lead("L-SNAP1"), draft_lead("L-SNAP2")];
    let mut snapshot = SnapshotStore::at_path(&path);
    snapshot.save(&leads);

    // A fresh handle (no in-memory copy) reads the file.
    let cold = SnapshotStore::at_path(&path);
    let loaded = cold.load();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "L-SNAP1");
}
