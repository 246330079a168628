// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe background job processing.

use std::time::Duration;

use murmur_core::MurmurError;
use murmur_core::types::{QueueEntry, QueueFailure};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const QUEUE_COLUMNS: &str = "id, queue_name, payload, status, attempts, max_attempts, \
                             created_at, updated_at, locked_until, available_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        locked_until: row.get(8)?,
        available_at: row.get(9)?,
    })
}

/// SQLite datetime modifier for a positive offset, e.g. `+60 seconds`.
fn offset_modifier(d: Duration) -> String {
    format!("+{}.{:03} seconds", d.as_secs(), d.subsec_millis())
}

/// Enqueue a new item. Returns the auto-generated queue entry ID.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: i32,
) -> Result<i64, MurmurError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, max_attempts) VALUES (?1, ?2, ?3)",
                params![queue_name, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the oldest pending entry whose backoff has elapsed.
///
/// The entry moves to "processing" and is locked for `lock`; a worker that
/// dies mid-job leaves it to [`reclaim_expired`].
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lock: Duration,
) -> Result<Option<QueueEntry>, MurmurError> {
    let queue_name = queue_name.to_string();
    let lock = offset_modifier(lock);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "SELECT {QUEUE_COLUMNS} FROM queue
                 WHERE queue_name = ?1 AND status = 'pending'
                   AND available_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 ORDER BY available_at ASC, id ASC
                 LIMIT 1"
            );
            let Some(entry) = tx
                .query_row(&sql, params![queue_name], row_to_entry)
                .optional()?
            else {
                return Ok(None);
            };

            let claimed = tx.query_row(
                &format!(
                    "UPDATE queue SET status = 'processing',
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1
                     RETURNING {QUEUE_COLUMNS}"
                ),
                params![entry.id, lock],
                row_to_entry,
            )?;
            tx.commit()?;
            Ok(Some(claimed))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing of a queue entry.
pub async fn ack(db: &Database, id: i64) -> Result<(), MurmurError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt.
///
/// While attempts remain the entry returns to "pending", available again
/// after `backoff`. The last attempt marks it "failed" for good.
pub async fn fail(db: &Database, id: i64, backoff: Duration) -> Result<QueueFailure, MurmurError> {
    let backoff = offset_modifier(backoff);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (attempts, max_attempts): (i32, i32) = tx.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let attempts = attempts + 1;
            let outcome = if attempts >= max_attempts {
                tx.execute(
                    "UPDATE queue SET status = 'failed', attempts = ?1, locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![attempts, id],
                )?;
                QueueFailure::Exhausted { attempts }
            } else {
                tx.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1, locked_until = NULL,
                     available_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![attempts, id, backoff],
                )?;
                QueueFailure::Rescheduled { attempts }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return entries stuck in "processing" past their lock to "pending".
pub async fn reclaim_expired(db: &Database, queue_name: &str) -> Result<usize, MurmurError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'pending', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![queue_name],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn status_of(db: &Database, id: i64) -> (String, i32) {
        db.connection()
            .call(move |conn| -> Result<(String, i32), rusqlite::Error> {
                conn.query_row(
                    "SELECT status, attempts FROM queue WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .unwrap()
    }

    const LOCK: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "ai", r#"{"task_id":"t1"}"#, 4).await.unwrap();
        let entry = dequeue(&db, "ai", LOCK).await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert_eq!(entry.max_attempts, 4);
        assert!(entry.locked_until.is_some());

        assert!(dequeue(&db, "ai", LOCK).await.unwrap().is_none());

        ack(&db, id).await.unwrap();
        assert_eq!(status_of(&db, id).await.0, "completed");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_entry_waits_for_backoff() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "ai", "payload", 4).await.unwrap();
        dequeue(&db, "ai", LOCK).await.unwrap().unwrap();

        let outcome = fail(&db, id, Duration::from_secs(60)).await.unwrap();
        assert_eq!(outcome, QueueFailure::Rescheduled { attempts: 1 });
        assert_eq!(status_of(&db, id).await, ("pending".to_string(), 1));

        // Not available until the backoff elapses.
        assert!(dequeue(&db, "ai", LOCK).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn zero_backoff_is_immediately_available() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "ai", "payload", 4).await.unwrap();
        dequeue(&db, "ai", LOCK).await.unwrap().unwrap();
        fail(&db, id, Duration::ZERO).await.unwrap();
        let again = dequeue(&db, "ai", LOCK).await.unwrap().unwrap();
        assert_eq!(again.attempts, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "ai", "payload", 2).await.unwrap();

        dequeue(&db, "ai", LOCK).await.unwrap().unwrap();
        assert_eq!(
            fail(&db, id, Duration::ZERO).await.unwrap(),
            QueueFailure::Rescheduled { attempts: 1 }
        );
        dequeue(&db, "ai", LOCK).await.unwrap().unwrap();
        assert_eq!(
            fail(&db, id, Duration::ZERO).await.unwrap(),
            QueueFailure::Exhausted { attempts: 2 }
        );
        assert_eq!(status_of(&db, id).await.0, "failed");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_locks_are_reclaimed() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "ai", "payload", 4).await.unwrap();
        dequeue(&db, "ai", Duration::ZERO).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(reclaim_expired(&db, "ai").await.unwrap(), 1);
        assert_eq!(status_of(&db, id).await.0, "pending");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queues_are_isolated_by_name() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, "other", "payload", 4).await.unwrap();
        assert!(dequeue(&db, "ai", LOCK).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
