//! Integration tests for task materialization.
//!
//! Exercise the full claim-key-then-create-task transaction against a real
//! PostgreSQL, including the idempotence guarantee that makes repeated
//! sweeps safe.

use chrono::NaiveDate;
use uuid::Uuid;

use choregen_core::materialize;
use choregen_core::planner::{self, CandidateTiming, GenerationCandidate};
use choregen_db::models::GenerationStatus;
use choregen_db::queries::{ledger, tasks};
use choregen_test_utils::{create_test_db, drop_test_db, seed_child};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn candidate(household_id: Uuid, child_id: Uuid, title: &str) -> GenerationCandidate {
    let template_id = Uuid::new_v4();
    let deadline = d(2026, 3, 1);
    GenerationCandidate {
        template_id,
        child_id,
        household_id,
        title: title.to_owned(),
        deadline,
        weight: 5,
        generation_key: planner::generation_key(template_id, child_id, deadline),
        timing: CandidateTiming::Due,
    }
}

#[tokio::test]
async fn materialize_creates_task_and_ledger_entry() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Mila", d(2019, 4, 20)).await;

    let cand = candidate(household_id, child_id, "Tidy bedroom");
    let outcome = materialize::materialize(&pool, &cand)
        .await
        .expect("materialize should succeed");

    assert!(outcome.created);
    let task_id = outcome.task_id.expect("created outcome carries a task id");

    let task = tasks::get_task(&pool, task_id)
        .await
        .expect("fetch should succeed")
        .expect("task should exist");
    assert_eq!(task.title, "Tidy bedroom");
    assert_eq!(task.child_id, child_id);
    assert_eq!(task.deadline, cand.deadline);
    assert_eq!(task.weight, 5);

    let entry = ledger::get_by_generation_key(&pool, &cand.generation_key)
        .await
        .unwrap()
        .expect("ledger entry should exist");
    assert_eq!(entry.status, GenerationStatus::Created);
    assert_eq!(entry.task_id, Some(task_id));

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn second_materialize_of_same_candidate_is_a_noop() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Theo", d(2021, 1, 5)).await;

    let cand = candidate(household_id, child_id, "Water the plants");
    let first = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(first.created);

    let second = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.generated_id, first.generated_id);
    assert_eq!(second.task_id, first.task_id);

    // Exactly one task row exists.
    let all = tasks::list_tasks_for_child(&pool, child_id).await.unwrap();
    assert_eq!(all.len(), 1);

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn pending_offer_is_promoted_on_confirmation() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Ida", d(2020, 2, 14)).await;

    let cand = candidate(household_id, child_id, "Take out the bins");
    let recorded = materialize::record_pending(&pool, &cand).await.unwrap();
    assert!(recorded);

    // Re-running the sweep does not duplicate the offer.
    let again = materialize::record_pending(&pool, &cand).await.unwrap();
    assert!(!again);

    let entry = ledger::get_by_generation_key(&pool, &cand.generation_key)
        .await
        .unwrap()
        .expect("offer should be in the ledger");
    assert_eq!(entry.status, GenerationStatus::Pending);
    assert!(entry.task_id.is_none());

    // Confirmation promotes the offer and creates the task in one go.
    let outcome = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.generated_id, entry.id);
    let task_id = outcome.task_id.expect("created outcome carries a task id");

    let promoted = ledger::get_by_generation_key(&pool, &cand.generation_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.status, GenerationStatus::Created);
    assert_eq!(promoted.task_id, Some(task_id));

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn skip_declines_a_pending_offer() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Juna", d(2017, 11, 23)).await;

    let cand = candidate(household_id, child_id, "Plan summer holiday activities");
    assert!(materialize::record_pending(&pool, &cand).await.unwrap());

    let declined = materialize::skip(&pool, &cand).await.unwrap();
    assert!(declined);

    let entry = ledger::get_by_generation_key(&pool, &cand.generation_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, GenerationStatus::Skipped);

    // The decision is terminal; confirmation cannot revive it.
    let outcome = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(!outcome.created);
    let all = tasks::list_tasks_for_child(&pool, child_id).await.unwrap();
    assert!(all.is_empty());

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unclaimed_offer_expires_and_stays_expired() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Oskar", d(2019, 9, 9)).await;

    let cand = candidate(household_id, child_id, "School enrollment paperwork");
    assert!(materialize::record_pending(&pool, &cand).await.unwrap());

    // Deadline (2026-03-01) passes with the offer still pending.
    let expired = ledger::expire_overdue_pending(&pool, d(2026, 3, 2))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].generation_key, cand.generation_key);
    assert_eq!(expired[0].status, GenerationStatus::Expired);

    // A late confirmation finds a terminal entry and creates nothing.
    let outcome = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(!outcome.created);
    let all = tasks::list_tasks_for_child(&pool, child_id).await.unwrap();
    assert!(all.is_empty());

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn skip_blocks_later_materialization() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Nora", d(2018, 7, 2)).await;

    let cand = candidate(household_id, child_id, "Sort winter clothing");
    let recorded = materialize::skip(&pool, &cand).await.unwrap();
    assert!(recorded);

    // The skip claimed the key; a sweep cannot generate the task anymore.
    let outcome = materialize::materialize(&pool, &cand).await.unwrap();
    assert!(!outcome.created);
    assert!(outcome.task_id.is_none());

    let entry = ledger::get_by_generation_key(&pool, &cand.generation_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, GenerationStatus::Skipped);

    let all = tasks::list_tasks_for_child(&pool, child_id).await.unwrap();
    assert!(all.is_empty());

    // Skipping again reports that the decision already exists.
    let again = materialize::skip(&pool, &cand).await.unwrap();
    assert!(!again);

    drop(pool);
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn batch_isolates_failures_and_tallies_outcomes() {
    let (pool, db_name) = create_test_db().await;
    let (household_id, child_id) = seed_child(&pool, "Finn", d(2020, 10, 30)).await;

    let fresh = candidate(household_id, child_id, "Take out the bins");
    let duplicate = fresh.clone();
    // References a child that does not exist, so the FK insert fails.
    let broken = candidate(household_id, Uuid::new_v4(), "Broken");

    let result = materialize::materialize_batch(&pool, &[fresh, duplicate, broken]).await;

    assert_eq!(result.generated, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors, 1);
    assert_eq!(result.details.len(), 3);

    let failed = result
        .details
        .iter()
        .find(|detail| detail.error.is_some())
        .expect("one detail should carry an error");
    assert_eq!(failed.title, "Broken");

    // The failed candidate left nothing behind.
    let all = tasks::list_tasks_for_child(&pool, child_id).await.unwrap();
    assert_eq!(all.len(), 1);

    drop(pool);
    drop_test_db(&db_name).await;
}
