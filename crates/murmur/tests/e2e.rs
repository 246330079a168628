// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios across the assembled services.
//!
//! Each test creates an isolated TestHarness with temp SQLite and an
//! in-memory key-value store. Tests are independent and order-insensitive.

use std::sync::Arc;

use murmur_agent::mock::MOCK_MODEL;
use murmur_agent::{SubmitOutcome, TaskState};
use murmur_config::model::DeliveryMode;
use murmur_context::ConversationContextBuilder;
use murmur_core::MurmurError;
use murmur_core::types::{MessageKind, MessageStatus, Role};
use murmur_test_utils::TestHarness;

// ---- Synchronous round trip ----

#[tokio::test]
async fn hello_in_new_chatroom_gets_completed_reply_inline() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let user = harness.create_user("15550200001").await.unwrap();
    let room = harness.create_chatroom(&user, "Test").await.unwrap();
    assert_eq!(room.name, "Test");
    assert_eq!(room.description, None);

    let outcome = harness.send_message(&user, room.id, "Hello").await.unwrap();
    let SubmitOutcome::Inline {
        user_message,
        reply: Some(reply),
    } = outcome
    else {
        panic!("expected an inline reply");
    };

    assert_eq!(user_message.status, MessageStatus::Completed);
    assert_eq!(reply.message.status, MessageStatus::Completed);
    assert!(!reply.message.content.is_empty());
    assert_eq!(reply.model, MOCK_MODEL);

    let stored = harness
        .storage()
        .get_message(reply.message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, reply.message.content);
    assert_eq!(
        stored.kind,
        MessageKind::Ai {
            parent_message_id: user_message.id
        }
    );
}

// ---- Quotas ----

#[tokio::test]
async fn basic_quota_stops_at_limit_without_counting_rejections() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let user = harness.create_user("15550200002").await.unwrap();
    let room = harness.create_chatroom(&user, "Quota").await.unwrap();
    let limit = harness.config.limits.basic_daily_messages;

    for i in 0..limit {
        harness
            .send_message(&user, room.id, &format!("message {i}"))
            .await
            .unwrap();
    }
    for _ in 0..3 {
        let err = harness
            .send_message(&user, room.id, "over the limit")
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::RateLimitExceeded { .. }), "{err:?}");
    }

    let report = harness.services.pipeline.usage(&user).await.unwrap();
    assert_eq!(report.daily.used, i64::from(limit));
    assert_eq!(report.daily.remaining, 0);
    assert!(!report.daily.can_send);
}

#[tokio::test]
async fn pro_user_sends_ten_times_the_basic_limit() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let user = harness.create_pro_user("15550200003").await.unwrap();
    let room = harness.create_chatroom(&user, "Unlimited").await.unwrap();
    let total = harness.config.limits.basic_daily_messages * 10;

    for i in 0..total {
        harness
            .send_message(&user, room.id, &format!("message {i}"))
            .await
            .unwrap();
    }

    // Pro sends never consume the daily counter.
    let report = harness.services.pipeline.usage(&user).await.unwrap();
    assert_eq!(report.daily.used, 0);
    assert_eq!(report.daily.limit, -1);
    assert!(report.daily.can_send);
}

// ---- Message tree ----

#[tokio::test]
async fn every_ai_message_points_at_the_user_message_before_it() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let user = harness.create_user("15550200004").await.unwrap();
    let room = harness.create_chatroom(&user, "Tree").await.unwrap();
    for text in ["hi", "what is the weather", "thanks"] {
        harness.send_message(&user, room.id, text).await.unwrap();
    }

    let page = harness
        .services
        .pipeline
        .list_messages(&user, room.id, None, None, true)
        .await
        .unwrap();
    assert_eq!(page.total_count, 6);

    for message in &page.messages {
        if let MessageKind::Ai { parent_message_id } = message.kind {
            let parent = page
                .messages
                .iter()
                .find(|m| m.id == parent_message_id)
                .expect("parent is in the same chatroom");
            assert_eq!(parent.kind, MessageKind::User);
            assert!(parent.id < message.id);
        }
    }
}

#[tokio::test]
async fn context_window_is_bounded_and_chronological() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let user = harness.create_pro_user("15550200010").await.unwrap();
    let room = harness.create_chatroom(&user, "Window").await.unwrap();
    for i in 0..6 {
        harness
            .send_message(&user, room.id, &format!("turn {i}"))
            .await
            .unwrap();
    }

    let builder = ConversationContextBuilder::new(Arc::clone(harness.storage()), 4);
    let turns = builder.build(room.id).await.unwrap();

    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "turn 4");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[2].content, "turn 5");
    assert_eq!(turns[3].role, Role::Assistant);
}

#[tokio::test]
async fn mock_mode_always_answers() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    let responder = &harness.services.responder;
    assert!(responder.is_mock());

    for input in ["hello", "help me", "why?", "x", "a b c d e f g h i j k l", "\u{1F600}"] {
        let response = responder.generate(input, &[], None).await;
        assert!(response.is_success(), "{input:?}");
        assert!(!response.content().trim().is_empty(), "{input:?}");
    }
}

// ---- Chatrooms ----

#[tokio::test]
async fn fourth_chatroom_needs_pro() {
    let harness = TestHarness::builder().build().await.unwrap();
    let basic = harness.create_user("15550200005").await.unwrap();
    let pro = harness.create_pro_user("15550200006").await.unwrap();
    for i in 0..3 {
        harness.create_chatroom(&basic, &format!("b{i}")).await.unwrap();
        harness.create_chatroom(&pro, &format!("p{i}")).await.unwrap();
    }

    let err = harness.create_chatroom(&basic, "b3").await.unwrap_err();
    match err {
        MurmurError::ChatroomLimitExceeded { message, .. } => assert!(message.contains("3/3")),
        other => panic!("expected ChatroomLimitExceeded, got {other:?}"),
    }
    harness.create_chatroom(&pro, "p3").await.unwrap();
}

#[tokio::test]
async fn listing_after_create_is_fresh_even_when_cached() {
    let harness = TestHarness::builder().build().await.unwrap();
    let user = harness.create_user("15550200007").await.unwrap();
    let chatrooms = &harness.services.chatrooms;

    harness.create_chatroom(&user, "first").await.unwrap();
    let before = chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(before.total_count, 1);

    harness.create_chatroom(&user, "second").await.unwrap();
    let after = chatrooms.list(&user, None, None, true).await.unwrap();
    assert_eq!(after.total_count, 2);
    assert!(after.chatrooms.iter().any(|c| c.chatroom.name == "second"));
}

// ---- Deferred delivery ----

#[tokio::test]
async fn deferred_task_goes_from_processing_to_completed() {
    let harness = TestHarness::builder()
        .without_provider()
        .with_delivery_mode(DeliveryMode::Deferred)
        .build()
        .await
        .unwrap();
    let user = harness.create_user("15550200008").await.unwrap();
    let other = harness.create_user("15550200009").await.unwrap();
    let room = harness.create_chatroom(&user, "Later").await.unwrap();

    let SubmitOutcome::Deferred { task_id, .. } =
        harness.send_message(&user, room.id, "hello").await.unwrap()
    else {
        panic!("expected a deferred outcome");
    };

    let pending = harness
        .services
        .pipeline
        .task_status(&user, &task_id)
        .await
        .unwrap();
    assert_eq!(pending.record.state, TaskState::Processing);
    assert!(pending.ai_message.is_none());

    let foreign = harness
        .services
        .pipeline
        .task_status(&other, &task_id)
        .await
        .unwrap_err();
    assert!(matches!(foreign, MurmurError::Forbidden(_)), "{foreign:?}");

    assert_eq!(harness.drain_jobs().await.unwrap(), 1);

    let done = harness
        .services
        .pipeline
        .task_status(&user, &task_id)
        .await
        .unwrap();
    assert!(matches!(done.record.state, TaskState::Completed { .. }));
    let ai_message = done.ai_message.expect("completed task carries its reply");
    assert!(!ai_message.content.is_empty());
    assert_eq!(
        ai_message.kind,
        MessageKind::Ai {
            parent_message_id: pending.record.message_id
        }
    );
}
