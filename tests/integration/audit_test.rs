//! Audit log integration tests.
//!
//! Exercises the append-only log against a real SQLite file: persistence
//! across reopen, filtering, and concurrent appends from separate tasks.

use std::sync::Arc;

use askdb::audit::{AuditFilter, AuditLog, NewAuditEntry, Outcome};

fn entry(session_id: &str, sql: &str, outcome: Outcome) -> NewAuditEntry {
    NewAuditEntry {
        session_id: session_id.to_string(),
        sql: sql.to_string(),
        outcome,
        execution_time_ms: 12,
        row_count: if outcome == Outcome::Ok { 3 } else { 0 },
        error_message: None,
    }
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("audit.db");

    {
        let log = AuditLog::open(&db_path).await.unwrap();
        log.record(&entry("s1", "SELECT * FROM users", Outcome::Ok))
            .await
            .unwrap();
        log.record(&entry("s1", "DROP TABLE users", Outcome::RejectedWrite))
            .await
            .unwrap();
    }

    let log = AuditLog::open(&db_path).await.unwrap();
    assert_eq!(log.count().await.unwrap(), 2);

    let entries = log.list(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries[0].outcome, Outcome::RejectedWrite);
    assert_eq!(entries[1].outcome, Outcome::Ok);
    assert_eq!(entries[1].row_count, 3);
}

#[tokio::test]
async fn test_filter_by_session() {
    let log = AuditLog::open_in_memory().await.unwrap();
    log.record(&entry("alice", "SELECT 1", Outcome::Ok))
        .await
        .unwrap();
    log.record(&entry("bob", "SELECT 2", Outcome::Ok))
        .await
        .unwrap();
    log.record(&entry("alice", "SELECT 3", Outcome::Timeout))
        .await
        .unwrap();

    let filter = AuditFilter {
        session_id: Some("alice".to_string()),
        ..Default::default()
    };
    let entries = log.list(&filter).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.session_id == "alice"));
}

#[tokio::test]
async fn test_filter_by_time_range() {
    let log = AuditLog::open_in_memory().await.unwrap();
    log.record(&entry("s1", "SELECT 1", Outcome::Ok))
        .await
        .unwrap();

    // All entries were just written, so a range spanning now matches them
    // and a range in the past matches none.
    let spanning = AuditFilter {
        since: Some("2000-01-01 00:00:00".to_string()),
        until: Some("2100-01-01 00:00:00".to_string()),
        ..Default::default()
    };
    assert_eq!(log.list(&spanning).await.unwrap().len(), 1);

    let past = AuditFilter {
        until: Some("2000-01-01 00:00:00".to_string()),
        ..Default::default()
    };
    assert!(log.list(&past).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_limit_returns_newest() {
    let log = AuditLog::open_in_memory().await.unwrap();
    for i in 0..10 {
        log.record(&entry("s1", &format!("SELECT {i}"), Outcome::Ok))
            .await
            .unwrap();
    }

    let filter = AuditFilter {
        limit: Some(3),
        ..Default::default()
    };
    let entries = log.list(&filter).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].sql, "SELECT 9");
    assert_eq!(entries[2].sql, "SELECT 7");
}

#[tokio::test]
async fn test_concurrent_appends_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("audit.db");
    let log = Arc::new(AuditLog::open(&db_path).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            log.record(&entry(
                &format!("session-{i}"),
                "SELECT * FROM users",
                Outcome::Ok,
            ))
            .await
            .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(log.count().await.unwrap(), 8);
}

#[tokio::test]
async fn test_ids_are_monotonic() {
    let log = AuditLog::open_in_memory().await.unwrap();
    let first = log
        .record(&entry("s1", "SELECT 1", Outcome::Ok))
        .await
        .unwrap();
    let second = log
        .record(&entry("s1", "SELECT 2", Outcome::Ok))
        .await
        .unwrap();
    assert!(second > first);
}
