// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background job runner behaviour.

use std::sync::Arc;
use std::time::Duration;

use murmur_agent::reply::{APOLOGY_MODEL, APOLOGY_REPLY, UNKNOWN_MODEL};
use murmur_agent::tasks::new_task_id;
use murmur_agent::worker::AI_REPLY_QUEUE;
use murmur_agent::{AiJob, SubmitOutcome, TaskRecord, TaskState};
use murmur_config::model::{DeliveryMode, JobsConfig};
use murmur_core::types::{MessageId, MessageStatus};
use murmur_test_utils::{MockProvider, TestHarness};
use tokio_util::sync::CancellationToken;

async fn deferred_harness(responses: Vec<String>) -> TestHarness {
    TestHarness::builder()
        .with_delivery_mode(DeliveryMode::Deferred)
        .with_mock_responses(responses)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn job_for_already_answered_message_is_skipped() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_user("+15551001").await.unwrap();
    let room = h.create_chatroom(&user, "Idem").await.unwrap();
    let SubmitOutcome::Inline {
        user_message,
        reply: Some(reply),
    } = h.send_message(&user, room.id, "hello").await.unwrap()
    else {
        panic!("expected inline reply");
    };

    let task_id = new_task_id();
    h.services
        .tasks
        .publish(&TaskRecord::new(
            task_id.clone(),
            user.user_id,
            user_message.id,
            TaskState::Processing,
        ))
        .await;
    h.services
        .queue
        .enqueue(&AiJob {
            task_id: task_id.clone(),
            message_id: user_message.id,
            content: user_message.content.clone(),
            chatroom_id: room.id,
            user_id: user.user_id,
        })
        .await
        .unwrap();

    assert_eq!(h.drain_jobs().await.unwrap(), 1);
    assert_eq!(h.mock_provider.call_count().await, 1);

    let (messages, _) = h.storage().list_messages(room.id, true, 10, 0).await.unwrap();
    assert_eq!(messages.iter().filter(|m| m.kind.is_ai()).count(), 1);

    let record = h.services.tasks.get(&task_id, user.user_id).await.unwrap();
    let TaskState::Completed { ai_message_id, .. } = record.state else {
        panic!("expected completed task");
    };
    assert_eq!(ai_message_id, reply.message.id);
}

#[tokio::test]
async fn undecodable_payload_is_dropped() {
    let h = TestHarness::builder().build().await.unwrap();
    h.storage()
        .enqueue(AI_REPLY_QUEUE, "not json", 3)
        .await
        .unwrap();
    assert!(h.services.runner.run_once().await.unwrap());
    assert!(!h.services.runner.run_once().await.unwrap());
}

#[tokio::test]
async fn missing_message_fails_the_task() {
    let h = TestHarness::builder().build().await.unwrap();
    let user = h.create_user("+15551002").await.unwrap();
    let room = h.create_chatroom(&user, "Gone").await.unwrap();
    let task_id = new_task_id();
    h.services
        .tasks
        .publish(&TaskRecord::new(
            task_id.clone(),
            user.user_id,
            MessageId(9_999),
            TaskState::Processing,
        ))
        .await;
    h.services
        .queue
        .enqueue(&AiJob {
            task_id: task_id.clone(),
            message_id: MessageId(9_999),
            content: "lost".into(),
            chatroom_id: room.id,
            user_id: user.user_id,
        })
        .await
        .unwrap();

    assert_eq!(h.drain_jobs().await.unwrap(), 1);
    let record = h.services.tasks.get(&task_id, user.user_id).await.unwrap();
    assert!(matches!(record.state, TaskState::Failed { .. }));
}

#[tokio::test]
async fn soft_time_limit_stores_apology() {
    let provider = Arc::new(MockProvider::new().with_delay(Duration::from_secs(5)));
    let h = TestHarness::builder()
        .with_delivery_mode(DeliveryMode::Deferred)
        .with_provider(provider)
        .with_jobs(JobsConfig {
            soft_time_limit_secs: 1,
            hard_time_limit_secs: 3,
            ..JobsConfig::default()
        })
        .build()
        .await
        .unwrap();
    let user = h.create_user("+15551003").await.unwrap();
    let room = h.create_chatroom(&user, "Slow").await.unwrap();

    let SubmitOutcome::Deferred {
        user_message,
        task_id,
    } = h.send_message(&user, room.id, "take your time").await.unwrap()
    else {
        panic!("expected deferred outcome");
    };
    h.drain_jobs().await.unwrap();

    let view = h.services.pipeline.task_status(&user, &task_id).await.unwrap();
    let TaskState::Completed { model, .. } = &view.record.state else {
        panic!("expected completed task, got {:?}", view.record.state);
    };
    assert_eq!(model, APOLOGY_MODEL);
    assert_eq!(view.ai_message.unwrap().content, APOLOGY_REPLY);

    let user_message = h.storage().get_message(user_message.id).await.unwrap().unwrap();
    assert_eq!(user_message.status, MessageStatus::Failed);
}

#[tokio::test]
async fn spawned_workers_pick_up_jobs_and_stop_on_cancel() {
    let h = deferred_harness(vec!["from the worker".into()]).await;
    let user = h.create_user("+15551004").await.unwrap();
    let room = h.create_chatroom(&user, "Workers").await.unwrap();

    let cancel = CancellationToken::new();
    let handles = h.services.runner.spawn(cancel.clone());

    let SubmitOutcome::Deferred { task_id, .. } =
        h.send_message(&user, room.id, "hello").await.unwrap()
    else {
        panic!("expected deferred outcome");
    };

    let view = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let view = h.services.pipeline.task_status(&user, &task_id).await.unwrap();
            if view.record.state.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job should finish");
    assert_eq!(view.ai_message.unwrap().content, "from the worker");

    cancel.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}

#[tokio::test]
async fn deferred_jobs_in_same_chatroom_each_get_one_reply() {
    let h = deferred_harness(vec!["a1".into(), "a2".into()]).await;
    let user = h.create_user("+15551005").await.unwrap();
    let room = h.create_chatroom(&user, "Burst").await.unwrap();

    h.send_message(&user, room.id, "q1").await.unwrap();
    h.send_message(&user, room.id, "q2").await.unwrap();
    assert_eq!(h.drain_jobs().await.unwrap(), 2);

    let (messages, total) = h.storage().list_messages(room.id, false, 10, 0).await.unwrap();
    assert_eq!(total, 4);
    for parent in messages.iter().filter(|m| !m.kind.is_ai()) {
        let reply = h.storage().find_ai_reply(parent.id).await.unwrap();
        assert!(reply.is_some(), "message {} has no reply", parent.id);
    }
}

#[tokio::test]
async fn job_retries_until_exhausted_when_nothing_can_be_stored() {
    let h = TestHarness::builder()
        .with_delivery_mode(DeliveryMode::Deferred)
        .with_mock_responses(vec!["never saved".into()])
        .with_rejected_ai_replies()
        .with_jobs(JobsConfig {
            max_retries: 2,
            retry_backoff_secs: 0,
            ..JobsConfig::default()
        })
        .build()
        .await
        .unwrap();
    let user = h.create_user("+15551009").await.unwrap();
    let room = h.create_chatroom(&user, "Broken").await.unwrap();

    let SubmitOutcome::Deferred {
        user_message,
        task_id,
    } = h.send_message(&user, room.id, "anyone there?").await.unwrap()
    else {
        panic!("expected deferred outcome");
    };

    // First attempt plus two retries, then the entry is dead.
    assert_eq!(h.drain_jobs().await.unwrap(), 3);
    assert_eq!(h.mock_provider.call_count().await, 3);
    assert_eq!(h.drain_jobs().await.unwrap(), 0);

    let record = h.services.tasks.get(&task_id, user.user_id).await.unwrap();
    let TaskState::Failed { error } = &record.state else {
        panic!("expected failed task, got {:?}", record.state);
    };
    assert!(error.contains("rejected"), "unexpected error: {error}");

    assert!(h.storage().find_ai_reply(user_message.id).await.unwrap().is_none());
    let user_message = h.storage().get_message(user_message.id).await.unwrap().unwrap();
    assert_eq!(user_message.status, MessageStatus::Failed);
}

#[tokio::test]
async fn apology_after_stored_reply_reports_that_reply() {
    let h = TestHarness::builder()
        .with_mock_responses(vec!["the real answer".into()])
        .build()
        .await
        .unwrap();
    let user = h.create_user("+15551010").await.unwrap();
    let room = h.create_chatroom(&user, "Race").await.unwrap();
    let SubmitOutcome::Inline {
        user_message,
        reply: Some(reply),
    } = h.send_message(&user, room.id, "hello").await.unwrap()
    else {
        panic!("expected inline reply");
    };

    let again = h
        .services
        .generator
        .persist_apology(user_message.id)
        .await
        .unwrap();
    assert_eq!(again.message.id, reply.message.id);
    assert_eq!(again.message.content, "the real answer");
    assert_eq!(again.model, UNKNOWN_MODEL);
    assert_ne!(again.model, APOLOGY_MODEL);

    let user_message = h.storage().get_message(user_message.id).await.unwrap().unwrap();
    assert_eq!(user_message.status, MessageStatus::Completed);
}
