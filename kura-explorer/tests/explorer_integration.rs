use std::path::Path;

use kura_core::session::SessionConfig;
use kura_core::{AggregationMode, ExplorerSession, IngestError, OrphanPolicy};
use kura_explorer::protocol::ExplorerRequest;
use kura_explorer::{load_checkpoint, router};
use serde_json::json;

const CONVERSATIONS: &str = r#"[
  {"chat_id": "c1", "created_at": "2024-05-01T10:00:00Z",
   "messages": [{"role": "user", "content": "reset my password", "created_at": "2024-05-01T10:00:00Z"}],
   "metadata": {"tags": ["auth", "account"], "lang": "en"}},
  {"chat_id": "c2", "created_at": "2024-05-01T11:00:00",
   "messages": [{"role": "user", "content": "still locked out"}],
   "metadata": {"tags": ["auth", "account"], "lang": "en"}},
  {"chat_id": "c3", "messages": [], "metadata": {"tags": ["billing"], "lang": "de"}}
]"#;

const SUMMARIES: &str = r#"{"chat_id": "c1", "summary": "User asks how to reset a password."}
{"chat_id": "c2", "summary": "User cannot log in after a reset."}

{"chat_id": "c3", "summary": "User disputes an invoice."}
"#;

const CLUSTERS: &str = r#"{"id": "top", "name": "Account help", "description": "Access and billing", "parent_id": null, "chat_ids": ["c1", "c2", "c3"], "x_coord": 0.0, "y_coord": 0.0, "count": 3, "level": 0}
{"id": "auth", "name": "Login issues", "description": "Passwords and lockouts", "parent_id": "top", "chat_ids": ["c1", "c2"], "x_coord": 1.5, "y_coord": 2.0, "count": 2, "level": 1}
{"id": "billing", "name": "Invoices", "description": "Billing disputes", "parent_id": "top", "chat_ids": ["c3", "c404"], "x_coord": -1.0, "y_coord": 0.5, "count": 1, "level": 1}
{"id": "stray", "name": "Stray", "description": "Parent is gone", "parent_id": "deleted", "chat_ids": [], "x_coord": 9.0, "y_coord": 9.0, "count": 0}
"#;

fn write_checkpoint(dir: &Path) {
    std::fs::write(dir.join("conversations.json"), CONVERSATIONS).unwrap();
    std::fs::write(dir.join("summaries.jsonl"), SUMMARIES).unwrap();
    std::fs::write(dir.join("dimensionality.jsonl"), CLUSTERS).unwrap();
}

async fn loaded_session(config: SessionConfig) -> (tempfile::TempDir, ExplorerSession) {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    let mut session = ExplorerSession::new(config);
    let failures = load_checkpoint(&mut session, dir.path()).await;
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
    (dir, session)
}

#[tokio::test]
async fn test_status_reports_loaded_counts() {
    let (_dir, mut session) = loaded_session(SessionConfig::default()).await;

    let response = router::handle_request(ExplorerRequest::Status, &mut session);
    assert_eq!(response.status, "ok");
    assert_eq!(
        response.data.unwrap(),
        json!({"conversations": 3, "summaries": 3, "clusters": 4, "visualized": false})
    );
}

#[tokio::test]
async fn test_tree_request_builds_hierarchy() {
    let (_dir, mut session) = loaded_session(SessionConfig::default()).await;

    let response = router::handle_request(ExplorerRequest::Tree, &mut session);
    assert!(response.is_ok(), "{:?}", response.error);
    let tree = response.data.unwrap();

    assert_eq!(tree["id"], "root");
    assert_eq!(tree["level"], 0);
    let top = &tree["children"][0];
    assert_eq!(top["id"], "top");
    assert_eq!(top["level"], 1);
    assert_eq!(top["children"][0]["id"], "auth");
    assert_eq!(top["children"][0]["level"], 2);
    assert_eq!(top["children"][1]["id"], "billing");

    // The stray cluster's parent does not exist, so it is dropped by default.
    assert_eq!(tree["children"].as_array().unwrap().len(), 1);
    assert!(session.status().visualized);
}

#[tokio::test]
async fn test_orphans_can_attach_to_root() {
    let (_dir, mut session) = loaded_session(SessionConfig {
        orphan_policy: OrphanPolicy::AttachToRoot,
        ..Default::default()
    })
    .await;

    let response = router::handle_request(ExplorerRequest::Level { level: 1 }, &mut session);
    let data = response.data.unwrap();
    let ids: Vec<&str> = data["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["top", "stray"]);
}

#[tokio::test]
async fn test_orphans_can_be_rejected() {
    let (_dir, mut session) = loaded_session(SessionConfig {
        orphan_policy: OrphanPolicy::Reject,
        ..Default::default()
    })
    .await;

    let response = router::handle_request(ExplorerRequest::Tree, &mut session);
    assert_eq!(response.status, "error");
    assert!(response.error.unwrap().contains("stray"));
}

#[tokio::test]
async fn test_cluster_request_aggregates_metadata() {
    let (_dir, mut session) = loaded_session(SessionConfig::default()).await;

    let response = router::handle_request(
        ExplorerRequest::Cluster {
            id: "auth".to_string(),
            mode: None,
        },
        &mut session,
    );
    let data = response.data.unwrap();
    assert_eq!(data["cluster"]["name"], "Login issues");
    assert_eq!(data["metadata"]["mode"], "individual");
    assert_eq!(data["metadata"]["counts"]["tags"], json!({"account": 2, "auth": 2}));
    assert_eq!(data["metadata"]["counts"]["lang"], json!({"en": 2}));

    let response = router::handle_request(
        ExplorerRequest::Cluster {
            id: "auth".to_string(),
            mode: Some(AggregationMode::List),
        },
        &mut session,
    );
    let data = response.data.unwrap();
    assert_eq!(data["metadata"]["counts"]["tags"], json!({"auth, account": 2}));
}

#[tokio::test]
async fn test_conversations_skip_unknown_chat_ids() {
    let (_dir, mut session) = loaded_session(SessionConfig::default()).await;

    let response = router::handle_request(
        ExplorerRequest::Conversations {
            id: "billing".to_string(),
        },
        &mut session,
    );
    let data = response.data.unwrap();
    assert_eq!(data["cluster_id"], "billing");
    let conversations = data["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["chat_id"], "c3");
    assert_eq!(conversations[0]["summary"], "User disputes an invoice.");
}

#[tokio::test]
async fn test_unknown_cluster_is_an_error() {
    let (_dir, mut session) = loaded_session(SessionConfig::default()).await;

    let response = router::handle_request(
        ExplorerRequest::Cluster {
            id: "nope".to_string(),
            mode: None,
        },
        &mut session,
    );
    assert_eq!(response.status, "error");
    assert_eq!(response.error.as_deref(), Some("Unknown cluster: nope"));
}

#[tokio::test]
async fn test_missing_summary_fails_visualisation() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    std::fs::write(
        dir.path().join("summaries.jsonl"),
        "{\"chat_id\": \"c1\", \"summary\": \"only one\"}\n",
    )
    .unwrap();

    let mut session = ExplorerSession::default();
    assert!(load_checkpoint(&mut session, dir.path()).await.is_empty());

    let response = router::handle_request(ExplorerRequest::Tree, &mut session);
    assert_eq!(response.status, "error");
    assert_eq!(
        response.error.as_deref(),
        Some("No summary found for conversation c2")
    );
}

#[tokio::test]
async fn test_bad_summary_line_rejects_file_only() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    std::fs::write(
        dir.path().join("summaries.jsonl"),
        "{\"chat_id\": \"c1\", \"summary\": \"ok\"}\n{\"chat_id\": \"c2\"\n",
    )
    .unwrap();

    let mut session = ExplorerSession::default();
    let failures = load_checkpoint(&mut session, dir.path()).await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].0.ends_with("summaries.jsonl"));
    assert!(matches!(failures[0].1, IngestError::Line { line: 2, .. }));

    let status = session.status();
    assert_eq!(status.conversations, Some(3));
    assert_eq!(status.summaries, None);
    assert_eq!(status.clusters, Some(4));

    let response = router::handle_request(ExplorerRequest::Tree, &mut session);
    assert_eq!(
        response.error.as_deref(),
        Some("Checkpoint incomplete, missing: summaries.jsonl")
    );
}

#[tokio::test]
async fn test_invalid_cluster_record_rejects_file() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    std::fs::write(
        dir.path().join("dimensionality.jsonl"),
        r#"{"id": "top", "name": "Top", "description": "", "parent_id": 5, "chat_ids": [], "x_coord": 0, "y_coord": 0, "count": 0}"#,
    )
    .unwrap();

    let mut session = ExplorerSession::default();
    let failures = load_checkpoint(&mut session, dir.path()).await;
    assert_eq!(failures.len(), 1);
    match &failures[0].1 {
        IngestError::Validation(err) => assert_eq!(err.issues[0].field, "parent_id"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(session.status().clusters, None);
}
