// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User account operations.

use murmur_core::MurmurError;
use murmur_core::types::{SubscriptionTier, User, UserId};
use rusqlite::{OptionalExtension, params};

use super::{is_constraint_violation, parse_column};
use crate::database::Database;

const USER_COLUMNS: &str =
    "id, mobile_number, is_active, subscription_tier, created_at, updated_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        mobile_number: row.get(1)?,
        is_active: row.get(2)?,
        subscription_tier: parse_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Register a new active Basic-tier user.
pub async fn create_user(db: &Database, mobile_number: &str) -> Result<User, MurmurError> {
    let mobile = mobile_number.to_string();
    let created = db
        .connection()
        .call(move |conn| {
            let sql = format!(
                "INSERT INTO users (mobile_number) VALUES (?1) RETURNING {USER_COLUMNS}"
            );
            match conn.query_row(&sql, params![mobile], row_to_user) {
                Ok(user) => Ok(Some(user)),
                Err(e) if is_constraint_violation(&e) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    created.ok_or_else(|| {
        MurmurError::Conflict(format!("mobile number {mobile_number} is already registered"))
    })
}

pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, MurmurError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, params![id.0], row_to_user).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_user_by_mobile(
    db: &Database,
    mobile_number: &str,
) -> Result<Option<User>, MurmurError> {
    let mobile = mobile_number.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE mobile_number = ?1");
            conn.query_row(&sql, params![mobile], row_to_user).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Change a user's tier. Returns `false` when the user does not exist.
pub async fn set_subscription_tier(
    db: &Database,
    id: UserId,
    tier: SubscriptionTier,
) -> Result<bool, MurmurError> {
    let tier = tier.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET subscription_tier = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![tier, id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Activate or deactivate an account.
pub async fn set_user_active(db: &Database, id: UserId, active: bool) -> Result<bool, MurmurError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET is_active = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![active, id.0],
            )?;
            Ok(changed > 0)
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

    #[tokio::test]
    async fn new_users_are_active_basic() {
        let (db, _dir) = setup_db().await;
        let user = create_user(&db, "+15550001").await.unwrap();
        assert!(user.is_active);
        assert_eq!(user.subscription_tier, SubscriptionTier::Basic);

        let fetched = get_user_by_mobile(&db, "+15550001").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_mobile_is_conflict() {
        let (db, _dir) = setup_db().await;
        create_user(&db, "+15550002").await.unwrap();
        let err = create_user(&db, "+15550002").await.unwrap_err();
        assert!(matches!(err, MurmurError::Conflict(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tier_flip_persists() {
        let (db, _dir) = setup_db().await;
        let user = create_user(&db, "+15550003").await.unwrap();
        assert!(set_subscription_tier(&db, user.id, SubscriptionTier::Pro).await.unwrap());
        let fetched = get_user(&db, user.id).await.unwrap().unwrap();
        assert_eq!(fetched.subscription_tier, SubscriptionTier::Pro);

        assert!(!set_subscription_tier(&db, UserId(9999), SubscriptionTier::Pro).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deactivation_persists() {
        let (db, _dir) = setup_db().await;
        let user = create_user(&db, "+15550004").await.unwrap();
        set_user_active(&db, user.id, false).await.unwrap();
        assert!(!get_user(&db, user.id).await.unwrap().unwrap().is_active);
        db.close().await.unwrap();
    }
}
