//! Integration tests for offline writes and their replay

mod common;

use chrono::NaiveDate;
use common::{TestClient, WithoutId};
use fitness_coach_client::config::ClearPolicy;
use fitness_coach_client::error::ClientError;
use fitness_coach_client::probe::ProbeOutcome;
use fitness_coach_client::services::Selector;
use fitness_coach_client::store::Bucket;
use fitness_coach_client::{DataSource, Notification};
use fitness_coach_shared::{
    CompletionRecord, CompletionStatus, EntityId, ProgressEntry, WorkoutPlan,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
}

fn plan(name: &str) -> WorkoutPlan {
    serde_json::from_value(json!({ "name": name, "sessions": [] })).unwrap()
}

#[tokio::test]
async fn test_offline_entry_is_created_on_reconnect() {
    let mut client = TestClient::new().await;
    client.backend_down().await;

    // Logged while offline: cached under a temporary id and queued
    let logged = client
        .state
        .progress
        .create_entry(ProgressEntry::new(day(1), 75.0))
        .await
        .unwrap();
    assert_eq!(logged.source, DataSource::Cache);
    let temporary = logged.data.id.unwrap();
    assert!(temporary.is_temporary());
    assert_eq!(client.state.cache.pending_count(), 1);
    assert!(!client.state.status.is_available());

    let listed = client.state.progress.list_entries().await;
    assert_eq!(listed.source, DataSource::Cache);
    assert_eq!(listed.data.len(), 1);
    assert_eq!(listed.data[0].weight, Some(75.0));

    // Backend comes back
    client.backend_up().await;
    Mock::given(method("POST"))
        .and(path("/api/progress"))
        .and(WithoutId)
        .and(body_partial_json(json!({ "date": "2025-04-01", "weight": 75.0 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": { "id": 42 }
        })))
        .expect(1)
        .mount(&client.server)
        .await;

    let outcome = client.state.probe().unwrap().check_once().await;
    assert_eq!(
        outcome,
        ProbeOutcome::Available {
            reconnected: true,
            pending: 1
        }
    );
    assert!(client
        .drain_notifications()
        .contains(&Notification::SyncAvailable { pending: 1 }));

    let report = client.state.sync.sync_all().await;
    assert!(report.success, "{:?}", report.failures);
    assert_eq!(report.created, 1);
    assert_eq!(report.message, "Sync completed: 1 created, 0 updated, 0 deleted");
    assert_eq!(client.state.cache.pending_count(), 0);

    let cached: Vec<ProgressEntry> = client.state.cache.get(Bucket::ProgressData);
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, Some(EntityId::persisted(42)));

    assert!(client.drain_notifications().iter().any(|n| matches!(
        n,
        Notification::SyncCompleted { message } if message.starts_with("Sync completed")
    )));
}

/// Two offline entries and one plan; the second entry is rejected on replay
async fn partially_failing_sync(
    policy: ClearPolicy,
) -> (TestClient, fitness_coach_client::SyncReport) {
    let client = TestClient::with_config(|config| config.sync.clear_policy = policy).await;
    client.backend_down().await;

    let progress = &client.state.progress;
    progress.create_entry(ProgressEntry::new(day(1), 75.0)).await.unwrap();
    progress.create_entry(ProgressEntry::new(day(2), 74.6)).await.unwrap();
    client.state.workouts.create_plan(plan("Fuerza")).await.unwrap();
    assert_eq!(client.state.cache.pending_count(), 3);

    client.backend_up().await;
    Mock::given(method("POST"))
        .and(path("/api/progress"))
        .and(body_partial_json(json!({ "date": "2025-04-01" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 42 })))
        .mount(&client.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/progress"))
        .and(body_partial_json(json!({ "date": "2025-04-02" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&client.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/workouts/plans"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "insertId": 7 })))
        .mount(&client.server)
        .await;

    let report = client.state.sync.sync_all().await;
    (client, report)
}

#[tokio::test]
async fn test_failed_entity_stays_queued() {
    let (client, report) = partially_failing_sync(ClearPolicy::ReplayedOnly).await;

    assert!(!report.success);
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cleared, 2);
    assert_eq!(report.retained, 1);
    assert_eq!(
        report.message,
        "Sync finished with 1 error(s); 1 pending change(s) kept for retry"
    );

    let remaining = client.state.cache.pending_requests();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].target.unwrap().is_temporary());

    // The rejected entry keeps its temporary id for the next pass
    let cached: Vec<ProgressEntry> = client.state.cache.get(Bucket::ProgressData);
    let rejected = cached.iter().find(|e| e.date == day(2)).unwrap();
    assert!(rejected.id.unwrap().is_temporary());
}

#[tokio::test]
async fn test_clear_all_drops_failed_entity_from_queue() {
    let (client, report) = partially_failing_sync(ClearPolicy::All).await;

    // Everything is cleared even though one replay failed
    assert!(!report.success);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cleared, 3);
    assert_eq!(report.retained, 0);
    assert_eq!(client.state.cache.pending_count(), 0);
}

#[tokio::test]
async fn test_empty_queue_is_a_no_op() {
    let client = TestClient::new().await;
    let report = client.state.sync.sync_all().await;
    assert!(report.success);
    assert_eq!(report.message, "No pending changes to synchronize");
    assert!(client.server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_offline_delete_of_unsynced_entry_leaves_nothing_to_sync() {
    let client = TestClient::new().await;
    client.backend_down().await;

    let logged = client
        .state
        .progress
        .create_entry(ProgressEntry::new(day(3), 74.0))
        .await
        .unwrap();
    client.state.progress.delete_entry(logged.data.id.unwrap()).await;

    assert_eq!(client.state.cache.pending_count(), 0);
    let cached: Vec<ProgressEntry> = client.state.cache.get(Bucket::ProgressData);
    assert!(cached.is_empty());
}

#[tokio::test]
async fn test_offline_delete_of_persisted_entry_is_replayed() {
    let client = TestClient::new().await;
    client.backend_down().await;
    client.state.progress.delete_entry(EntityId::persisted(9)).await;
    assert_eq!(client.state.cache.pending_count(), 1);

    client.backend_up().await;
    Mock::given(method("DELETE"))
        .and(path("/api/progress/9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&client.server)
        .await;

    let report = client.state.sync.sync_all().await;
    assert!(report.success);
    assert_eq!(report.deleted, 1);
    assert_eq!(client.state.cache.pending_count(), 0);
}

#[tokio::test]
async fn test_offline_completion_never_overwrites_plan_with_demo_data() {
    let client = TestClient::new().await;
    client.backend_down().await;

    let record = CompletionRecord {
        date: day(7),
        day_of_week: "Lunes".to_string(),
        status: CompletionStatus::Completed,
        completed_at: None,
        notes: None,
    };
    let result = client
        .state
        .workouts
        .complete_session(EntityId::persisted(1), &Selector::Label("Lunes".to_string()), record)
        .await;

    assert!(matches!(result, Err(ClientError::Validation(_))));
    let cached: Vec<WorkoutPlan> = client.state.cache.get(Bucket::WorkoutPlans);
    assert!(cached.is_empty());
    assert_eq!(client.state.cache.pending_count(), 0);

    // Nothing is replayed once the backend is back
    client.backend_up().await;
    client.state.status.record(true);
    let report = client.state.sync.sync_all().await;
    assert_eq!(report.message, "No pending changes to synchronize");
    let requests = client.server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "PUT"));
}
