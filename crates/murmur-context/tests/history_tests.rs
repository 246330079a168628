// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use murmur_config::model::StorageConfig;
use murmur_context::ConversationContextBuilder;
use murmur_core::StorageAdapter;
use murmur_core::types::{MessageStatus, NewChatroom, Role, UserMessageInsert};
use murmur_storage::SqliteStorage;

async fn setup() -> (tempfile::TempDir, Arc<SqliteStorage>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("ctx.db").to_string_lossy().into_owned(),
        wal_mode: true,
    }));
    storage.initialize().await.unwrap();
    (dir, storage)
}

#[tokio::test]
async fn builds_alternating_turns_from_store() {
    let (_dir, storage) = setup().await;
    let user = storage.create_user("+15551230000").await.unwrap();
    let room = storage
        .create_chatroom(
            user.id,
            &NewChatroom {
                name: "Test".into(),
                description: None,
            },
            None,
        )
        .await
        .unwrap()
        .unwrap();

    for i in 0..7 {
        let accepted = storage
            .insert_user_message(room.id, user.id, &format!("question {i}"), MessageStatus::Completed, None)
            .await
            .unwrap();
        let UserMessageInsert::Accepted { message, .. } = accepted else {
            panic!("unexpected quota rejection");
        };
        storage
            .insert_ai_reply(message.id, &format!("answer {i}"), None)
            .await
            .unwrap();
    }

    let builder = ConversationContextBuilder::new(storage.clone(), 10);
    let turns = builder.build(room.id).await.unwrap();
    assert_eq!(turns.len(), 10);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "question 2");
    assert_eq!(turns[9].role, Role::Assistant);
    assert_eq!(turns[9].content, "answer 6");
    storage.close().await.unwrap();
}
