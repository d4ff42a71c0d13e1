//! Integration tests for the generation ledger.
//!
//! These tests require Docker (testcontainers) or an external PostgreSQL
//! provided via `CHOREGEN_TEST_PG_URL`. Each test creates a unique temporary
//! database, runs migrations, and drops it on completion so tests are fully
//! isolated and idempotent.

use chrono::NaiveDate;
use uuid::Uuid;

use choregen_db::models::GenerationStatus;
use choregen_db::queries::ledger::{self, NewLedgerEntry};
use choregen_db::queries::tasks;
use choregen_test_utils::{create_test_db, drop_test_db, seed_child};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn entry(household_id: Uuid, child_id: Uuid, key: &str, status: GenerationStatus) -> NewLedgerEntry {
    NewLedgerEntry {
        template_id: Uuid::new_v4(),
        child_id,
        household_id,
        deadline: d(2026, 3, 1),
        generation_key: key.to_owned(),
        status,
    }
}

#[tokio::test]
async fn insert_if_absent_claims_key_exactly_once() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Mila", d(2019, 4, 20)).await;

    let new = entry(household_id, child_id, "key-once", GenerationStatus::Created);
    let first = ledger::insert_if_absent(&pool, &new)
        .await
        .expect("insert should succeed");
    let first = first.expect("first insert should claim the key");
    assert_eq!(first.status, GenerationStatus::Created);
    assert_eq!(first.generation_key, "key-once");
    assert!(first.task_id.is_none());

    // Second insert with the same key, even under a different template,
    // writes nothing.
    let again = entry(household_id, child_id, "key-once", GenerationStatus::Created);
    let second = ledger::insert_if_absent(&pool, &again)
        .await
        .expect("insert should succeed");
    assert!(second.is_none(), "conflicting key should return None");

    let fetched = ledger::get_by_generation_key(&pool, "key-once")
        .await
        .expect("fetch should succeed")
        .expect("entry should exist");
    assert_eq!(fetched.id, first.id);

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn set_task_id_links_ledger_to_task() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Theo", d(2021, 1, 5)).await;

    let new = entry(household_id, child_id, "key-link", GenerationStatus::Created);
    let row = ledger::insert_if_absent(&pool, &new)
        .await
        .expect("insert should succeed")
        .expect("key should be claimed");

    let task = tasks::insert_task(&pool, household_id, child_id, "Tidy bedroom", d(2026, 3, 1), 5)
        .await
        .expect("task insert should succeed");
    ledger::set_task_id(&pool, row.id, task.id)
        .await
        .expect("backlink should succeed");

    let fetched = ledger::get_by_generation_key(&pool, "key-link")
        .await
        .expect("fetch should succeed")
        .expect("entry should exist");
    assert_eq!(fetched.task_id, Some(task.id));

    // Linking a nonexistent ledger entry is an error.
    let missing = ledger::set_task_id(&pool, Uuid::new_v4(), task.id).await;
    assert!(missing.is_err());

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn expire_sweep_only_touches_overdue_unacknowledged_pending() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Nora", d(2018, 7, 2)).await;

    // Overdue pending: should expire.
    let mut overdue = entry(household_id, child_id, "key-overdue", GenerationStatus::Pending);
    overdue.deadline = d(2026, 1, 1);
    ledger::insert_if_absent(&pool, &overdue).await.unwrap().unwrap();

    // Future pending: stays.
    let mut future = entry(household_id, child_id, "key-future", GenerationStatus::Pending);
    future.deadline = d(2026, 12, 1);
    ledger::insert_if_absent(&pool, &future).await.unwrap().unwrap();

    // Overdue but already created: stays.
    let mut created = entry(household_id, child_id, "key-created", GenerationStatus::Created);
    created.deadline = d(2026, 1, 1);
    ledger::insert_if_absent(&pool, &created).await.unwrap().unwrap();

    let expired = ledger::expire_overdue_pending(&pool, d(2026, 6, 1))
        .await
        .expect("expire should succeed");
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].generation_key, "key-overdue");
    assert_eq!(expired[0].status, GenerationStatus::Expired);

    // Re-running the sweep finds nothing: expiry is terminal.
    let again = ledger::expire_overdue_pending(&pool, d(2026, 6, 1))
        .await
        .expect("expire should succeed");
    assert!(again.is_empty());

    let counts = ledger::counts(&pool).await.expect("counts should succeed");
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.created, 1);
    assert_eq!(counts.expired, 1);
    assert_eq!(counts.total, 3);

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn acknowledge_requires_created_status() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Finn", d(2020, 10, 30)).await;

    let created = entry(household_id, child_id, "key-ack", GenerationStatus::Created);
    let created_row = ledger::insert_if_absent(&pool, &created).await.unwrap().unwrap();

    let skipped = entry(household_id, child_id, "key-noack", GenerationStatus::Skipped);
    let skipped_row = ledger::insert_if_absent(&pool, &skipped).await.unwrap().unwrap();

    let updated = ledger::acknowledge(&pool, created_row.id, "parent-a")
        .await
        .expect("acknowledge should succeed");
    assert_eq!(updated, 1);

    let fetched = ledger::get_by_generation_key(&pool, "key-ack")
        .await
        .unwrap()
        .unwrap();
    assert!(fetched.acknowledged);
    assert_eq!(fetched.acknowledged_by.as_deref(), Some("parent-a"));
    assert!(fetched.acknowledged_at.is_some());

    // A skipped entry cannot be acknowledged.
    let updated = ledger::acknowledge(&pool, skipped_row.id, "parent-a")
        .await
        .expect("acknowledge should succeed");
    assert_eq!(updated, 0);

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_for_child_is_scoped_and_ordered() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_a) = seed_child(&pool, "Ada", d(2019, 2, 14)).await;
    let (_, child_b) = seed_child(&pool, "Ben", d(2022, 8, 9)).await;

    let mut early = entry(household_id, child_a, "key-early", GenerationStatus::Created);
    early.deadline = d(2026, 2, 1);
    ledger::insert_if_absent(&pool, &early).await.unwrap().unwrap();

    let mut late = entry(household_id, child_a, "key-late", GenerationStatus::Created);
    late.deadline = d(2026, 5, 1);
    ledger::insert_if_absent(&pool, &late).await.unwrap().unwrap();

    let other = entry(household_id, child_b, "key-other", GenerationStatus::Created);
    ledger::insert_if_absent(&pool, &other).await.unwrap().unwrap();

    let rows = ledger::list_for_child(&pool, child_a)
        .await
        .expect("list should succeed");
    assert_eq!(rows.len(), 2);
    // Latest deadline first.
    assert_eq!(rows[0].generation_key, "key-late");
    assert_eq!(rows[1].generation_key, "key-early");

    drop(pool);
    drop_test_db(&db_name).await;
}
