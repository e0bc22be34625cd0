use chrono::{Duration as ChronoDuration, Utc};
use showvault::modules::discovery::{JobProgress, JobRepository, NewJob, SqliteJobRepository};
use showvault::shared::infrastructure::database::Database;
use std::time::Duration;

async fn repository() -> (SqliteJobRepository, Database) {
    let db = Database::in_memory().await.expect("in-memory database");
    (SqliteJobRepository::new(db.pool().clone()), db)
}

#[tokio::test]
async fn dequeue_orders_by_priority_then_fifo() {
    let (repo, _db) = repository().await;

    let low = repo.enqueue(NewJob::full_series("tt0000001", 1)).await.unwrap();
    let high = repo.enqueue(NewJob::full_series("tt0000002", 9)).await.unwrap();
    let mid_first = repo.enqueue(NewJob::full_series("tt0000003", 5)).await.unwrap();
    let mid_second = repo.enqueue(NewJob::full_series("tt0000004", 5)).await.unwrap();

    let order: Vec<_> = [
        repo.dequeue().await.unwrap().unwrap().id,
        repo.dequeue().await.unwrap().unwrap().id,
        repo.dequeue().await.unwrap().unwrap().id,
        repo.dequeue().await.unwrap().unwrap().id,
    ]
    .to_vec();

    assert_eq!(order, vec![high.id, mid_first.id, mid_second.id, low.id]);
    assert!(repo.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn dequeue_claims_the_job_and_counts_the_attempt() {
    let (repo, _db) = repository().await;
    repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();

    let claimed = repo.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.status, "processing");
    assert_eq!(claimed.attempts, 1);
    assert!(claimed.started_at.is_some());

    // The claimed job is no longer visible to a second dequeue
    assert!(repo.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_enqueue_returns_the_existing_job() {
    let (repo, _db) = repository().await;

    let first = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    let second = repo.enqueue(NewJob::full_series("tt0000001", 9)).await.unwrap();
    assert_eq!(first.id, second.id);

    // A different target is a different job
    let other = repo
        .enqueue(NewJob::full_season("tt0000001", 2, 5))
        .await
        .unwrap();
    assert_ne!(first.id, other.id);

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.queued_count, 2);
}

#[tokio::test]
async fn completed_jobs_do_not_block_a_new_enqueue() {
    let (repo, _db) = repository().await;

    let job = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    repo.dequeue().await.unwrap().unwrap();
    repo.mark_completed(job.id, &JobProgress::default()).await.unwrap();

    let next = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    assert_ne!(job.id, next.id);
}

#[tokio::test]
async fn failed_jobs_requeue_until_attempts_are_exhausted() {
    let (repo, _db) = repository().await;
    let job = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    assert_eq!(job.max_attempts, 3);

    for attempt in 1..=3 {
        let claimed = repo.dequeue().await.unwrap().expect("job available");
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.attempts, attempt);
        repo.mark_failed(job.id, "provider unreachable").await.unwrap();
    }

    // Attempts exhausted: terminally failed and gone from the queue
    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "failed");
    assert_eq!(stored.error.as_deref(), Some("provider unreachable"));
    assert!(stored.completed_at.is_some());
    assert!(repo.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn mark_completed_records_progress() {
    let (repo, _db) = repository().await;
    let job = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    repo.dequeue().await.unwrap().unwrap();

    let progress = JobProgress {
        total_seasons: 3,
        total_episodes: 30,
    };
    repo.mark_completed(job.id, &progress).await.unwrap();

    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "completed");
    assert_eq!(stored.progress, Some(progress));
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn requeue_stuck_resets_only_timed_out_jobs() {
    let (repo, db) = repository().await;

    let stuck = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    let healthy = repo.enqueue(NewJob::full_series("tt0000002", 5)).await.unwrap();
    repo.dequeue().await.unwrap().unwrap();
    repo.dequeue().await.unwrap().unwrap();

    // Backdate one job past the timeout
    sqlx::query("UPDATE discovery_jobs SET started_at = ? WHERE id = ?")
        .bind(Utc::now() - ChronoDuration::hours(1))
        .bind(stuck.id.to_string())
        .execute(db.pool())
        .await
        .unwrap();

    let requeued = repo.requeue_stuck(Duration::from_secs(600)).await.unwrap();
    assert_eq!(requeued, 1);

    let reset = repo.get_by_id(stuck.id).await.unwrap().unwrap();
    assert_eq!(reset.status, "queued");
    assert_eq!(reset.attempts, 1); // Attempts survive the requeue
    assert!(reset.error.is_some());

    let untouched = repo.get_by_id(healthy.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, "processing");
}

#[tokio::test]
async fn has_active_job_tracks_queued_and_processing() {
    let (repo, _db) = repository().await;
    assert!(!repo.has_active_job_for_series("tt0000001").await.unwrap());

    let job = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    assert!(repo.has_active_job_for_series("tt0000001").await.unwrap());

    repo.dequeue().await.unwrap().unwrap();
    assert!(repo.has_active_job_for_series("tt0000001").await.unwrap());

    repo.mark_completed(job.id, &JobProgress::default()).await.unwrap();
    assert!(!repo.has_active_job_for_series("tt0000001").await.unwrap());
}

#[tokio::test]
async fn delete_old_completed_prunes_finished_jobs() {
    let (repo, db) = repository().await;

    let old = repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    repo.dequeue().await.unwrap().unwrap();
    repo.mark_completed(old.id, &JobProgress::default()).await.unwrap();

    let recent = repo.enqueue(NewJob::full_series("tt0000002", 5)).await.unwrap();
    repo.dequeue().await.unwrap().unwrap();
    repo.mark_completed(recent.id, &JobProgress::default()).await.unwrap();

    sqlx::query("UPDATE discovery_jobs SET completed_at = ? WHERE id = ?")
        .bind(Utc::now() - ChronoDuration::days(60))
        .bind(old.id.to_string())
        .execute(db.pool())
        .await
        .unwrap();

    let deleted = repo.delete_old_completed(30).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(repo.get_by_id(old.id).await.unwrap().is_none());
    assert!(repo.get_by_id(recent.id).await.unwrap().is_some());
}

#[tokio::test]
async fn statistics_count_jobs_by_status() {
    let (repo, _db) = repository().await;

    repo.enqueue(NewJob::full_series("tt0000001", 5)).await.unwrap();
    let processing = repo.enqueue(NewJob::full_series("tt0000002", 9)).await.unwrap();
    let completed = repo.enqueue(NewJob::full_series("tt0000003", 9)).await.unwrap();

    repo.dequeue().await.unwrap().unwrap(); // claims tt0000002
    repo.dequeue().await.unwrap().unwrap(); // claims tt0000003
    repo.mark_completed(completed.id, &JobProgress::default()).await.unwrap();

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.queued_count, 1);
    assert_eq!(stats.processing_count, 1);
    assert_eq!(stats.completed_count, 1);
    assert_eq!(stats.failed_count, 0);
    assert_eq!(stats.total_count, 3);

    // The processing job is still tracked by id
    assert_eq!(
        repo.get_by_id(processing.id).await.unwrap().unwrap().status,
        "processing"
    );
}
