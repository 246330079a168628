// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations: quota-guarded user inserts, AI replies, status moves.

use chrono::NaiveDate;
use murmur_core::MurmurError;
use murmur_core::types::{
    ChatroomId, Message, MessageId, MessageKind, MessageStatus, QuotaClaim, UserId,
    UserMessageInsert,
};
use rusqlite::{OptionalExtension, params};

use super::{is_constraint_violation, parse_column};
use crate::database::Database;

const MESSAGE_COLUMNS: &str = "id, content, message_type, status, user_id, chatroom_id, \
                               parent_message_id, created_at, updated_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let message_type: String = row.get(2)?;
    let parent: Option<i64> = row.get(6)?;
    let kind = match (message_type.as_str(), parent) {
        ("user", None) => MessageKind::User,
        ("ai", Some(parent)) => MessageKind::Ai {
            parent_message_id: MessageId(parent),
        },
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("inconsistent message_type `{message_type}` / parent {parent:?}").into(),
            ));
        }
    };
    Ok(Message {
        id: MessageId(row.get(0)?),
        content: row.get(1)?,
        kind,
        status: parse_column(row, 3)?,
        user_id: UserId(row.get(4)?),
        chatroom_id: ChatroomId(row.get(5)?),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn select_message(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_message).optional()
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Insert a user message, consuming one unit of daily quota when `quota` is set.
///
/// The guarded upsert only increments while the counter is below the limit.
/// When it matches nothing the transaction is dropped and nothing is written.
pub async fn insert_user_message(
    db: &Database,
    chatroom_id: ChatroomId,
    user_id: UserId,
    content: &str,
    status: MessageStatus,
    quota: Option<QuotaClaim>,
) -> Result<UserMessageInsert, MurmurError> {
    let content = content.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let daily_count = match quota {
                Some(claim) => {
                    let date = date_key(claim.date);
                    let consumed: Option<i64> = tx
                        .query_row(
                            "INSERT INTO daily_usage (user_id, date, message_count)
                             VALUES (?1, ?2, 1)
                             ON CONFLICT(user_id, date) DO UPDATE SET
                               message_count = message_count + 1,
                               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                             WHERE message_count < ?3
                             RETURNING message_count",
                            params![user_id.0, date, claim.daily_limit],
                            |row| row.get(0),
                        )
                        .optional()?;
                    match consumed {
                        Some(count) => Some(count),
                        None => {
                            let used: i64 = tx.query_row(
                                "SELECT message_count FROM daily_usage
                                 WHERE user_id = ?1 AND date = ?2",
                                params![user_id.0, date],
                                |row| row.get(0),
                            )?;
                            return Ok(UserMessageInsert::QuotaExhausted { used });
                        }
                    }
                }
                None => None,
            };

            let sql = format!(
                "INSERT INTO messages (content, message_type, status, user_id, chatroom_id)
                 VALUES (?1, 'user', ?2, ?3, ?4)
                 RETURNING {MESSAGE_COLUMNS}"
            );
            let message = tx.query_row(
                &sql,
                params![content, status, user_id.0, chatroom_id.0],
                row_to_message,
            )?;
            tx.commit()?;
            Ok(UserMessageInsert::Accepted {
                message,
                daily_count,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

enum ReplyInsert {
    Inserted(Message),
    MissingParent,
    ParentIsAi,
    AlreadyReplied(MessageId),
    BadTransition(MessageStatus, MessageStatus),
}

/// Insert a completed AI reply to `parent` (which must be a user message),
/// optionally moving the parent to `parent_status` in the same transaction.
pub async fn insert_ai_reply(
    db: &Database,
    parent: MessageId,
    content: &str,
    parent_status: Option<MessageStatus>,
) -> Result<Message, MurmurError> {
    let content = content.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(parent_msg) = select_message(&tx, parent.0)? else {
                return Ok(ReplyInsert::MissingParent);
            };
            if parent_msg.kind.is_ai() {
                return Ok(ReplyInsert::ParentIsAi);
            }
            if let Some(next) = parent_status {
                if !parent_msg.status.can_transition_to(next) {
                    return Ok(ReplyInsert::BadTransition(parent_msg.status, next));
                }
                tx.execute(
                    "UPDATE messages SET status = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![next.to_string(), parent.0],
                )?;
            }

            let sql = format!(
                "INSERT INTO messages
                   (content, message_type, status, user_id, chatroom_id, parent_message_id)
                 VALUES (?1, 'ai', 'completed', ?2, ?3, ?4)
                 RETURNING {MESSAGE_COLUMNS}"
            );
            let inserted = tx.query_row(
                &sql,
                params![
                    content,
                    parent_msg.user_id.0,
                    parent_msg.chatroom_id.0,
                    parent.0
                ],
                row_to_message,
            );
            match inserted {
                Ok(message) => {
                    tx.commit()?;
                    Ok(ReplyInsert::Inserted(message))
                }
                Err(e) if is_constraint_violation(&e) => {
                    let existing: i64 = tx.query_row(
                        "SELECT id FROM messages WHERE parent_message_id = ?1",
                        params![parent.0],
                        |row| row.get(0),
                    )?;
                    Ok(ReplyInsert::AlreadyReplied(MessageId(existing)))
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        ReplyInsert::Inserted(message) => Ok(message),
        ReplyInsert::MissingParent => Err(MurmurError::not_found(
            "message",
            format!("parent message {parent} does not exist"),
        )),
        ReplyInsert::ParentIsAi => Err(MurmurError::Validation(format!(
            "message {parent} is an AI message and cannot be replied to"
        ))),
        ReplyInsert::AlreadyReplied(existing) => Err(MurmurError::Conflict(format!(
            "message {parent} already has AI reply {existing}"
        ))),
        ReplyInsert::BadTransition(from, to) => Err(MurmurError::Internal(format!(
            "message {parent} cannot move from {from} to {to}"
        ))),
    }
}

pub async fn get_message(db: &Database, id: MessageId) -> Result<Option<Message>, MurmurError> {
    db.connection()
        .call(move |conn| select_message(conn, id.0))
        .await
        .map_err(crate::database::map_tr_err)
}

/// The AI message replying to `parent`, if any.
pub async fn find_ai_reply(
    db: &Database,
    parent: MessageId,
) -> Result<Option<Message>, MurmurError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE parent_message_id = ?1");
            conn.query_row(&sql, params![parent.0], row_to_message)
                .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a message to `status` if the state machine allows it.
pub async fn update_message_status(
    db: &Database,
    id: MessageId,
    status: MessageStatus,
) -> Result<(), MurmurError> {
    let current = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM messages WHERE id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            let allowed = current
                .parse::<MessageStatus>()
                .is_ok_and(|from| from.can_transition_to(status));
            if allowed {
                tx.execute(
                    "UPDATE messages SET status = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![status.to_string(), id.0],
                )?;
                tx.commit()?;
            }
            Ok(Some((current, allowed)))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match current {
        None => Err(MurmurError::not_found("message", id.to_string())),
        Some((_, true)) => Ok(()),
        Some((from, false)) => Err(MurmurError::Internal(format!(
            "message {id} cannot move from {from} to {status}"
        ))),
    }
}

/// The `limit` newest completed messages of a chatroom, newest first.
pub async fn recent_completed_messages(
    db: &Database,
    chatroom_id: ChatroomId,
    limit: usize,
) -> Result<Vec<Message>, MurmurError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE chatroom_id = ?1 AND status = 'completed'
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![chatroom_id.0, limit], row_to_message)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A page of messages counted back from the newest, returned oldest first,
/// plus the total number of matching messages.
pub async fn list_messages(
    db: &Database,
    chatroom_id: ChatroomId,
    include_pending: bool,
    limit: u32,
    offset: u64,
) -> Result<(Vec<Message>, i64), MurmurError> {
    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE chatroom_id = ?1 AND (?2 OR status IN ('completed', 'failed'))",
                params![chatroom_id.0, include_pending],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE chatroom_id = ?1 AND (?2 OR status IN ('completed', 'failed'))
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![chatroom_id.0, include_pending, limit, offset as i64],
                row_to_message,
            )?;
            let messages = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((messages, total))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
