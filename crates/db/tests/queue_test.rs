//! Integration tests for the polled event queue.
//!
//! These run against a live Postgres named by `DATABASE_URL` (or
//! `GRANARY__DATABASE__URL`) and skip silently when neither is set.
//! Claims are process-wide, so the tests serialize on a file-local lock
//! to keep their rows from being claimed out from under each other.

use std::env;
use std::sync::LazyLock;

use sea_orm::{Database, DatabaseConnection, EntityTrait};
use serde_json::json;
use tokio::sync::Mutex;

use granary_db::QueueRepository;
use granary_db::entities::queued_events;
use granary_db::migration::{Migrator, MigratorTrait};
use granary_db::repositories::QueueDisposition;
use granary_db::repositories::queue::{STATUS_DEAD, STATUS_DONE, STATUS_PENDING};

static QUEUE_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("GRANARY__DATABASE__URL"))
        .ok()
}

async fn test_db() -> Option<DatabaseConnection> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };
    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Migrations failed");
    Some(db)
}

#[tokio::test]
async fn test_enqueue_starts_pending() {
    let Some(db) = test_db().await else { return };
    let _guard = QUEUE_LOCK.lock().await;
    let queue = QueueRepository::new(db);

    let row = queue.enqueue(json!({"probe": true})).await.unwrap();
    assert_eq!(row.status, STATUS_PENDING);
    assert_eq!(row.attempts, 0);
    assert!(row.last_error.is_none());
}

#[tokio::test]
async fn test_claim_makes_row_invisible() {
    let Some(db) = test_db().await else { return };
    let _guard = QUEUE_LOCK.lock().await;
    let queue = QueueRepository::new(db);

    let row = queue.enqueue(json!({"probe": "claim"})).await.unwrap();

    let claimed = queue.claim_batch(100, 300).await.unwrap();
    let mine = claimed
        .iter()
        .find(|c| c.id == row.id)
        .expect("row not claimed");
    assert_eq!(mine.attempts, 1);
    assert_eq!(mine.status, STATUS_PENDING);

    // Within the visibility window the row must not be claimable again.
    let again = queue.claim_batch(100, 300).await.unwrap();
    assert!(again.iter().all(|c| c.id != row.id));
}

#[tokio::test]
async fn test_mark_done_settles_row() {
    let Some(db) = test_db().await else { return };
    let _guard = QUEUE_LOCK.lock().await;
    let queue = QueueRepository::new(db.clone());

    let row = queue.enqueue(json!({"probe": "done"})).await.unwrap();
    let claimed = queue.claim_batch(100, 300).await.unwrap();
    let mine = claimed
        .into_iter()
        .find(|c| c.id == row.id)
        .expect("row not claimed");

    queue.mark_done(mine).await.unwrap();

    let settled = queued_events::Entity::find_by_id(row.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, STATUS_DONE);
}

#[tokio::test]
async fn test_redeliver_applies_backoff() {
    let Some(db) = test_db().await else { return };
    let _guard = QUEUE_LOCK.lock().await;
    let queue = QueueRepository::new(db.clone());

    let row = queue.enqueue(json!({"probe": "retry"})).await.unwrap();
    let claimed = queue.claim_batch(100, 300).await.unwrap();
    let mine = claimed
        .into_iter()
        .find(|c| c.id == row.id)
        .expect("row not claimed");

    let disposition = queue
        .redeliver(mine, 3600, 5, "transient failure")
        .await
        .unwrap();
    assert_eq!(disposition, QueueDisposition::Redelivered);

    // Backed off an hour: not claimable now, but still pending.
    let again = queue.claim_batch(100, 300).await.unwrap();
    assert!(again.iter().all(|c| c.id != row.id));

    let settled = queued_events::Entity::find_by_id(row.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, STATUS_PENDING);
    assert_eq!(settled.last_error.as_deref(), Some("transient failure"));
}

#[tokio::test]
async fn test_redeliver_exhausts_to_dead_letter() {
    let Some(db) = test_db().await else { return };
    let _guard = QUEUE_LOCK.lock().await;
    let queue = QueueRepository::new(db.clone());

    let row = queue.enqueue(json!({"probe": "dead"})).await.unwrap();
    let claimed = queue.claim_batch(100, 300).await.unwrap();
    let mine = claimed
        .into_iter()
        .find(|c| c.id == row.id)
        .expect("row not claimed");

    // One attempt allowed; the claim already spent it.
    let disposition = queue.redeliver(mine, 0, 1, "still failing").await.unwrap();
    assert_eq!(disposition, QueueDisposition::DeadLettered);

    let settled = queued_events::Entity::find_by_id(row.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, STATUS_DEAD);
    assert_eq!(settled.last_error.as_deref(), Some("still failing"));
}
