// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom service and listing cache.

use std::sync::Arc;

use murmur_core::MurmurError;
use murmur_core::types::ChatroomUpdate;
use murmur_kv::{DisabledKv, MemoryKv};
use murmur_test_utils::TestHarness;

#[tokio::test]
async fn listing_reflects_creation_after_cached_read() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_user("+15552001").await.unwrap();
    let chatrooms = &h.services.chatrooms;

    chatrooms.create(&user, "First", None).await.unwrap();
    let cached = chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(cached.total_count, 1);

    chatrooms.create(&user, "Second", None).await.unwrap();
    let fresh = chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(fresh.total_count, 2);
    assert_eq!(fresh.chatrooms.len(), 2);
}

#[tokio::test]
async fn page_two_never_serves_page_one() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_pro_user("+15552002").await.unwrap();
    let chatrooms = &h.services.chatrooms;
    for name in ["a", "b", "c", "d", "e"] {
        chatrooms.create(&user, name, None).await.unwrap();
    }

    let page1 = chatrooms.list(&user, Some(1), Some(2), true).await.unwrap();
    let page2 = chatrooms.list(&user, Some(2), Some(2), true).await.unwrap();

    assert_eq!(page1.page, 1);
    assert_eq!(page2.page, 2);
    assert_eq!(page2.chatrooms.len(), 2);
    assert!(page2.has_next);
    assert!(page2.has_previous);
    let first_ids: Vec<_> = page1.chatrooms.iter().map(|c| c.chatroom.id).collect();
    assert!(
        page2
            .chatrooms
            .iter()
            .all(|c| !first_ids.contains(&c.chatroom.id))
    );

    // Both pages now cached; they must still differ.
    let page2_again = chatrooms.list(&user, Some(2), Some(2), true).await.unwrap();
    assert_eq!(page2_again, page2);
    let last = chatrooms.list(&user, Some(3), Some(2), true).await.unwrap();
    assert_eq!(last.chatrooms.len(), 1);
    assert!(!last.has_next);
}

#[tokio::test]
async fn cached_page_is_served_without_requery() {
    let h = TestHarness::builder()
        .with_kv(Arc::new(MemoryKv::new()))
        .build()
        .await
        .unwrap();
    let user = h.create_user("+15552003").await.unwrap();
    let room = h.create_chatroom(&user, "Cached").await.unwrap();

    let before = h.services.chatrooms.list(&user, None, None, true).await.unwrap();
    // Bypass the service so the cache is not invalidated.
    h.storage().delete_chatroom(room.id, user.user_id).await.unwrap();

    let cached = h.services.chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(cached, before);
    let uncached = h.services.chatrooms.list(&user, None, None, false).await.unwrap();
    assert_eq!(uncached.total_count, 0);
}

#[tokio::test]
async fn listing_works_without_kv() {
    let h = TestHarness::builder()
        .with_kv(Arc::new(DisabledKv))
        .build()
        .await
        .unwrap();
    let user = h.create_user("+15552004").await.unwrap();
    h.create_chatroom(&user, "NoCache").await.unwrap();
    let page = h.services.chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn basic_users_capped_at_three_chatrooms() {
    let h = TestHarness::builder().build().await.unwrap();
    let basic = h.create_user("+15552005").await.unwrap();
    let pro = h.create_pro_user("+15552006").await.unwrap();
    for i in 0..3 {
        h.create_chatroom(&basic, &format!("room {i}")).await.unwrap();
        h.create_chatroom(&pro, &format!("room {i}")).await.unwrap();
    }

    let err = h.create_chatroom(&basic, "room 3").await.unwrap_err();
    match err {
        MurmurError::ChatroomLimitExceeded { message, allowance } => {
            assert_eq!(
                message,
                "Basic tier users can create up to 3 chatrooms. You have 3/3 chatrooms. Upgrade to Pro for unlimited chatrooms."
            );
            assert_eq!(allowance.current, 3);
            assert!(!allowance.can_create);
        }
        other => panic!("expected chatroom limit, got {other:?}"),
    }

    assert!(h.create_chatroom(&pro, "room 3").await.is_ok());
}

#[tokio::test]
async fn create_validates_and_normalizes() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_user("+15552007").await.unwrap();
    let chatrooms = &h.services.chatrooms;

    let room = chatrooms.create(&user, "  Trimmed  ", Some("   ")).await.unwrap();
    assert_eq!(room.name, "Trimmed");
    assert_eq!(room.description, None);

    assert!(matches!(
        chatrooms.create(&user, "   ", None).await,
        Err(MurmurError::Validation(_))
    ));
    assert!(matches!(
        chatrooms.create(&user, &"n".repeat(101), None).await,
        Err(MurmurError::Validation(_))
    ));
    assert!(matches!(
        chatrooms
            .create(&user, "ok", Some(&"d".repeat(501)))
            .await,
        Err(MurmurError::Validation(_))
    ));
}

#[tokio::test]
async fn update_and_delete_are_owner_scoped() {
    let h = TestHarness::builder().build().await.unwrap();
    let owner = h.create_user("+15552008").await.unwrap();
    let other = h.create_user("+15552009").await.unwrap();
    let chatrooms = &h.services.chatrooms;
    let room = chatrooms.create(&owner, "Old", Some("desc")).await.unwrap();

    let renamed = chatrooms
        .update(
            &owner,
            room.id,
            ChatroomUpdate {
                name: Some("New".into()),
                description: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "New");
    assert_eq!(renamed.description, None);

    let listed = chatrooms.list(&owner, None, None, true).await.unwrap();
    assert_eq!(listed.chatrooms[0].chatroom.name, "New");

    assert!(matches!(
        chatrooms
            .update(&other, room.id, ChatroomUpdate::default())
            .await,
        Err(MurmurError::NotFound { .. })
    ));
    assert!(matches!(
        chatrooms.delete(&other, room.id).await,
        Err(MurmurError::NotFound { .. })
    ));
}

#[tokio::test]
async fn delete_cascades_to_messages() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_user("+15552010").await.unwrap();
    let room = h.create_chatroom(&user, "Doomed").await.unwrap();
    let outcome = h.send_message(&user, room.id, "hello").await.unwrap();
    let message_id = outcome.user_message().id;

    h.services.chatrooms.delete(&user, room.id).await.unwrap();

    assert!(h.storage().get_message(message_id).await.unwrap().is_none());
    let listed = h.services.chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(listed.total_count, 0);
}

#[tokio::test]
async fn detail_returns_latest_messages_in_order() {
    let h = TestHarness::builder().without_provider().build().await.unwrap();
    let user = h.create_pro_user("+15552011").await.unwrap();
    let room = h.create_chatroom(&user, "Detail").await.unwrap();
    for i in 0..3 {
        h.send_message(&user, room.id, &format!("q{i}")).await.unwrap();
    }

    let detail = h
        .services
        .chatrooms
        .detail(&user, room.id, Some(4))
        .await
        .unwrap();
    assert_eq!(detail.message_count, 6);
    assert_eq!(detail.recent_messages.len(), 4);
    assert_eq!(detail.recent_messages[0].content, "q1");
    assert!(detail.recent_messages[3].kind.is_ai());
}
