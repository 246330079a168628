// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom CRUD and the activity-ordered listing.

use murmur_core::MurmurError;
use murmur_core::types::{
    Chatroom, ChatroomId, ChatroomSummary, ChatroomUpdate, NewChatroom, UserId,
};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const CHATROOM_COLUMNS: &str = "id, name, description, owner_id, created_at, updated_at";

fn row_to_chatroom(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chatroom> {
    Ok(Chatroom {
        id: ChatroomId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: UserId(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Create a chatroom, optionally only while the owner has fewer than `cap`.
///
/// The count and the insert share one transaction, so concurrent creations
/// cannot both slip under the cap.
pub async fn create_chatroom(
    db: &Database,
    owner: UserId,
    chatroom: &NewChatroom,
    cap: Option<i64>,
) -> Result<Option<Chatroom>, MurmurError> {
    let chatroom = chatroom.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if let Some(cap) = cap {
                let owned: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM chatrooms WHERE owner_id = ?1",
                    params![owner.0],
                    |row| row.get(0),
                )?;
                if owned >= cap {
                    return Ok(None);
                }
            }
            let sql = format!(
                "INSERT INTO chatrooms (name, description, owner_id) VALUES (?1, ?2, ?3)
                 RETURNING {CHATROOM_COLUMNS}"
            );
            let created = tx.query_row(
                &sql,
                params![chatroom.name, chatroom.description, owner.0],
                row_to_chatroom,
            )?;
            tx.commit()?;
            Ok(Some(created))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_chatrooms(db: &Database, owner: UserId) -> Result<i64, MurmurError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM chatrooms WHERE owner_id = ?1",
                params![owner.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a chatroom only when `owner` owns it.
pub async fn get_owned_chatroom(
    db: &Database,
    id: ChatroomId,
    owner: UserId,
) -> Result<Option<Chatroom>, MurmurError> {
    db.connection()
        .call(move |conn| {
            let sql =
                format!("SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE id = ?1 AND owner_id = ?2");
            conn.query_row(&sql, params![id.0, owner.0], row_to_chatroom)
                .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update. Returns `None` when nothing owned by `owner` matched.
pub async fn update_chatroom(
    db: &Database,
    id: ChatroomId,
    owner: UserId,
    update: &ChatroomUpdate,
) -> Result<Option<Chatroom>, MurmurError> {
    let name = update.name.clone();
    let set_description = update.description.is_some();
    let description = update.description.clone().flatten();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "UPDATE chatrooms SET
                   name = COALESCE(?3, name),
                   description = CASE WHEN ?4 THEN ?5 ELSE description END,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND owner_id = ?2
                 RETURNING {CHATROOM_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![id.0, owner.0, name, set_description, description],
                row_to_chatroom,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a chatroom; its messages go with it through the foreign key cascade.
pub async fn delete_chatroom(
    db: &Database,
    id: ChatroomId,
    owner: UserId,
) -> Result<bool, MurmurError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM chatrooms WHERE id = ?1 AND owner_id = ?2",
                params![id.0, owner.0],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// One page of the owner's chatrooms with message count and last message
/// time, ordered by latest activity (creation time when empty), plus the
/// owner's total chatroom count.
pub async fn list_chatroom_summaries(
    db: &Database,
    owner: UserId,
    limit: u32,
    offset: u64,
) -> Result<(Vec<ChatroomSummary>, i64), MurmurError> {
    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chatrooms WHERE owner_id = ?1",
                params![owner.0],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.description, c.owner_id, c.created_at, c.updated_at,
                        COUNT(m.id), MAX(m.created_at)
                 FROM chatrooms c
                 LEFT JOIN messages m ON m.chatroom_id = c.id
                 WHERE c.owner_id = ?1
                 GROUP BY c.id
                 ORDER BY COALESCE(MAX(m.created_at), c.created_at) DESC, c.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![owner.0, limit, offset as i64], |row| {
                Ok(ChatroomSummary {
                    chatroom: row_to_chatroom(row)?,
                    message_count: row.get(6)?,
                    last_message_at: row.get(7)?,
                })
            })?;
            let summaries = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((summaries, total))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{messages, users};
    use murmur_core::types::{MessageStatus, UserMessageInsert};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir, UserId) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let user = users::create_user(&db, "+15551000").await.unwrap();
        (db, dir, user.id)
    }

    fn room(name: &str) -> NewChatroom {
        NewChatroom {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn cap_blocks_creation_at_limit() {
        let (db, _dir, owner) = setup_db().await;
        for i in 0..3 {
            let created = create_chatroom(&db, owner, &room(&format!("r{i}")), Some(3))
                .await
                .unwrap();
            assert!(created.is_some());
        }
        let blocked = create_chatroom(&db, owner, &room("r3"), Some(3)).await.unwrap();
        assert!(blocked.is_none());
        assert_eq!(count_chatrooms(&db, owner).await.unwrap(), 3);

        let uncapped = create_chatroom(&db, owner, &room("r4"), None).await.unwrap();
        assert!(uncapped.is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn other_owners_cannot_see_or_delete() {
        let (db, _dir, owner) = setup_db().await;
        let intruder = users::create_user(&db, "+15551001").await.unwrap().id;
        let created = create_chatroom(&db, owner, &room("mine"), None)
            .await
            .unwrap()
            .unwrap();

        assert!(get_owned_chatroom(&db, created.id, intruder).await.unwrap().is_none());
        assert!(!delete_chatroom(&db, created.id, intruder).await.unwrap());
        assert!(get_owned_chatroom(&db, created.id, owner).await.unwrap().is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_can_clear_description() {
        let (db, _dir, owner) = setup_db().await;
        let created = create_chatroom(
            &db,
            owner,
            &NewChatroom {
                name: "old".into(),
                description: Some("desc".into()),
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();

        let renamed = update_chatroom(
            &db,
            created.id,
            owner,
            &ChatroomUpdate {
                name: Some("new".into()),
                description: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(renamed.name, "new");
        assert_eq!(renamed.description.as_deref(), Some("desc"));

        let cleared = update_chatroom(
            &db,
            created.id,
            owner,
            &ChatroomUpdate {
                name: None,
                description: Some(None),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(cleared.description, None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn listing_orders_by_latest_activity_with_aggregates() {
        let (db, _dir, owner) = setup_db().await;
        let first = create_chatroom(&db, owner, &room("first"), None)
            .await
            .unwrap()
            .unwrap();
        let _second = create_chatroom(&db, owner, &room("second"), None)
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let inserted = messages::insert_user_message(
            &db,
            first.id,
            owner,
            "hello",
            MessageStatus::Completed,
            None,
        )
        .await
        .unwrap();
        assert!(matches!(inserted, UserMessageInsert::Accepted { .. }));

        let (page, total) = list_chatroom_summaries(&db, owner, 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].chatroom.name, "first");
        assert_eq!(page[0].message_count, 1);
        assert!(page[0].last_message_at.is_some());
        assert_eq!(page[1].chatroom.name, "second");
        assert_eq!(page[1].message_count, 0);
        assert!(page[1].last_message_at.is_none());

        let (second_page, _) = list_chatroom_summaries(&db, owner, 1, 1).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].chatroom.name, "second");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let (db, _dir, owner) = setup_db().await;
        let created = create_chatroom(&db, owner, &room("doomed"), None)
            .await
            .unwrap()
            .unwrap();
        messages::insert_user_message(&db, created.id, owner, "bye", MessageStatus::Completed, None)
            .await
            .unwrap();

        assert!(delete_chatroom(&db, created.id, owner).await.unwrap());
        let remaining: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        db.close().await.unwrap();
    }
}
