// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily usage counters.

use chrono::NaiveDate;
use murmur_core::MurmurError;
use murmur_core::types::{DailyUsage, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The counter for `user_id` on `date`, 0 if no message was sent that day.
pub async fn get_daily_usage(
    db: &Database,
    user_id: UserId,
    date: NaiveDate,
) -> Result<i64, MurmurError> {
    let date = date_key(date);
    db.connection()
        .call(move |conn| {
            let count: Option<i64> = conn
                .query_row(
                    "SELECT message_count FROM daily_usage WHERE user_id = ?1 AND date = ?2",
                    params![user_id.0, date],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(count.unwrap_or(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert-and-increment in a single statement; returns the new value.
pub async fn increment_daily_usage(
    db: &Database,
    user_id: UserId,
    date: NaiveDate,
) -> Result<i64, MurmurError> {
    let date = date_key(date);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "INSERT INTO daily_usage (user_id, date, message_count) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                   message_count = message_count + 1,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 RETURNING message_count",
                params![user_id.0, date],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counters on or after `since`, newest first.
pub async fn usage_history(
    db: &Database,
    user_id: UserId,
    since: NaiveDate,
) -> Result<Vec<DailyUsage>, MurmurError> {
    let since = date_key(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, message_count FROM daily_usage
                 WHERE user_id = ?1 AND date >= ?2
                 ORDER BY date DESC",
            )?;
            let rows = stmt.query_map(params![user_id.0, since], |row| {
                let raw: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(DailyUsage {
                    user_id,
                    date,
                    message_count: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir, UserId) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let user = users::create_user(&db, "+15553000").await.unwrap().id;
        (db, dir, user)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[tokio::test]
    async fn increment_creates_row_lazily() {
        let (db, _dir, user) = setup().await;
        assert_eq!(get_daily_usage(&db, user, day(1)).await.unwrap(), 0);
        assert_eq!(increment_daily_usage(&db, user, day(1)).await.unwrap(), 1);
        assert_eq!(increment_daily_usage(&db, user, day(1)).await.unwrap(), 2);
        assert_eq!(get_daily_usage(&db, user, day(1)).await.unwrap(), 2);
        assert_eq!(get_daily_usage(&db, user, day(2)).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let (db, _dir, user) = setup().await;
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { increment_daily_usage(&db, user, day(3)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(get_daily_usage(&db, user, day(3)).await.unwrap(), 20);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let (db, _dir, user) = setup().await;
        for d in [1, 5, 9] {
            increment_daily_usage(&db, user, day(d)).await.unwrap();
        }
        let history = usage_history(&db, user, day(4)).await.unwrap();
        let dates: Vec<_> = history.iter().map(|u| u.date).collect();
        assert_eq!(dates, vec![day(9), day(5)]);
        db.close().await.unwrap();
    }
}
