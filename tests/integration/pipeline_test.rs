//! End-to-end pipeline tests.
//!
//! Drives the full turn flow through the public API with mock
//! collaborators: question in, validated SQL through the query service,
//! paginated results and audit entries out.

use std::sync::Arc;
use std::time::Duration;

use askdb::audit::{AuditFilter, AuditLog, Outcome};
use askdb::exec::{ExecutionError, ExecutionErrorKind, FailingQueryService, MockQueryService};
use askdb::llm::MockSqlGenerator;
use askdb::pipeline::{Pipeline, TurnResponse};
use askdb::safety::{RejectReason, Validator};

async fn mock_pipeline(row_count: usize) -> Pipeline {
    let audit = Arc::new(AuditLog::open_in_memory().await.unwrap());
    Pipeline::new(
        Arc::new(MockSqlGenerator::new()),
        Arc::new(MockQueryService::with_numbered_rows(row_count)),
        audit,
    )
}

#[tokio::test]
async fn test_full_session_walk() {
    let pipeline = mock_pipeline(45).await;

    // First page arrives with the turn itself.
    let response = pipeline.ask("show me all users", "walk").await.unwrap();
    let first = match response {
        TurnResponse::Page { sql, page } => {
            assert_eq!(sql, "SELECT * FROM users");
            page
        }
        other => panic!("Expected Page, got {other:?}"),
    };
    assert_eq!(first.len(), 20);
    assert_eq!(first.total_rows, 45);
    assert!(first.has_more);

    // 45 rows at 20 per page: 20, 20, 5, then empty forever.
    let second = pipeline.next_page("walk").await.unwrap();
    assert_eq!(second.len(), 20);
    assert!(second.has_more);

    let third = pipeline.next_page("walk").await.unwrap();
    assert_eq!(third.len(), 5);
    assert!(!third.has_more);

    for _ in 0..3 {
        let past_end = pipeline.next_page("walk").await.unwrap();
        assert!(past_end.is_empty());
        assert!(!past_end.has_more);
    }

    // The walk was one query: exactly one audit entry.
    assert_eq!(pipeline.audit().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_interfere() {
    let pipeline = Arc::new(mock_pipeline(45).await);

    let mut handles = Vec::new();
    for name in ["alice", "bob", "carol", "dave"] {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            pipeline.ask("show me all users", name).await.unwrap();
            // Each session advances a different distance.
            let advances = name.len() % 3;
            for _ in 0..advances {
                pipeline.next_page(name).await.unwrap();
            }
            (name, pipeline.current_page(name).await.unwrap())
        }));
    }

    for handle in handles {
        let (name, page) = handle.await.unwrap();
        let expected_offset = (name.len() % 3) * 20;
        assert_eq!(
            page.rows[0][0],
            askdb::exec::Value::Int(expected_offset as i64),
            "session {name} saw another session's cursor"
        );
    }

    // Four sessions, four queries, four entries.
    assert_eq!(pipeline.audit().count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_write_attempt_is_refused_and_logged() {
    let pipeline = mock_pipeline(5).await;

    let response = pipeline
        .ask("delete the old accounts", "s1")
        .await
        .unwrap();

    match response {
        TurnResponse::Rejected { sql, reason } => {
            assert!(sql.starts_with("DELETE"));
            assert_eq!(reason, RejectReason::WriteOperation);
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }

    let entries = pipeline.audit().list(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, Outcome::RejectedWrite);
    assert!(entries[0].error_message.is_some());
}

#[tokio::test]
async fn test_custom_sensitive_columns_apply() {
    let audit = Arc::new(AuditLog::open_in_memory().await.unwrap());
    let generator = MockSqlGenerator::new()
        .with_response("keys", "```sql\nSELECT api_key FROM accounts\n```");
    let pipeline = Pipeline::new(
        Arc::new(generator),
        Arc::new(MockQueryService::new()),
        audit,
    )
    .with_validator(Validator::new(vec!["api_key".to_string()]));

    let response = pipeline.ask("show me the keys", "s1").await.unwrap();
    match response {
        TurnResponse::Rejected { reason, .. } => {
            assert_eq!(reason, RejectReason::SensitiveField);
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }

    // The default sensitive list was replaced, so "password" now passes
    // validation and reaches the service.
    let response = pipeline
        .ask("show me the password column", "s1")
        .await
        .unwrap();
    assert!(matches!(response, TurnResponse::Page { .. }));
}

#[tokio::test]
async fn test_failure_then_recovery_in_one_session() {
    // A turn that fails leaves the previous cursor intact.
    let audit = Arc::new(AuditLog::open_in_memory().await.unwrap());
    let generator = MockSqlGenerator::new();

    let pipeline = Pipeline::new(
        Arc::new(generator.clone()),
        Arc::new(MockQueryService::with_numbered_rows(30)),
        Arc::clone(&audit),
    );
    pipeline.ask("show me all users", "s1").await.unwrap();

    let failing = Pipeline::new(
        Arc::new(generator),
        Arc::new(FailingQueryService::new(ExecutionError::connection_failed(
            "refused",
        ))),
        audit,
    );
    let response = failing.ask("show me all users", "s1").await.unwrap();
    match response {
        TurnResponse::Failed { error, .. } => {
            assert_eq!(error.kind, ExecutionErrorKind::ConnectionFailed);
        }
        other => panic!("Expected Failed, got {other:?}"),
    }

    // The original pipeline's cursor still pages normally.
    let page = pipeline.next_page("s1").await.unwrap();
    assert_eq!(page.len(), 10);
}

#[tokio::test]
async fn test_timeout_is_typed_and_audited() {
    let audit = Arc::new(AuditLog::open_in_memory().await.unwrap());
    let service = MockQueryService::with_numbered_rows(5).with_delay(Duration::from_millis(500));
    let pipeline = Pipeline::new(
        Arc::new(MockSqlGenerator::new()),
        Arc::new(service),
        audit,
    )
    .with_query_timeout(Duration::from_millis(25));

    let response = pipeline.ask("show me all users", "s1").await.unwrap();
    match response {
        TurnResponse::Failed { error, .. } => {
            assert_eq!(error.kind, ExecutionErrorKind::Timeout);
        }
        other => panic!("Expected Failed, got {other:?}"),
    }

    let entries = pipeline.audit().list(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, Outcome::Timeout);
    assert_eq!(entries[0].row_count, 0);
}

#[tokio::test]
async fn test_mixed_turns_log_in_order() {
    let pipeline = mock_pipeline(3).await;

    pipeline.ask("show me all users", "s1").await.unwrap();
    pipeline.ask("delete the old accounts", "s1").await.unwrap();
    pipeline.ask("list the tables", "s1").await.unwrap();
    pipeline
        .record_cancelled("s1", "SELECT * FROM users")
        .await;

    let entries = pipeline.audit().list(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 4);

    // Newest first.
    let outcomes: Vec<Outcome> = entries.iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Cancelled,
            Outcome::Ok,
            Outcome::RejectedWrite,
            Outcome::Ok,
        ]
    );
}
