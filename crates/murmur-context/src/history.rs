// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use murmur_core::types::{ChatroomId, ConversationTurn, Message, MessageKind, Role};
use murmur_core::{MurmurError, StorageAdapter};
use tracing::debug;

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Builds the recent-history window for a chatroom.
#[derive(Clone)]
pub struct ConversationContextBuilder {
    storage: Arc<dyn StorageAdapter>,
    window: usize,
}

impl ConversationContextBuilder {
    pub fn new(storage: Arc<dyn StorageAdapter>, window: usize) -> Self {
        Self { storage, window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Fetches the newest completed messages of `chatroom_id` and returns
    /// them as turns in chronological order.
    pub async fn build(&self, chatroom_id: ChatroomId) -> Result<Vec<ConversationTurn>, MurmurError> {
        let recent = self
            .storage
            .recent_completed_messages(chatroom_id, self.window)
            .await?;
        let turns = assemble_turns(recent, self.window);
        debug!(chatroom_id = %chatroom_id, turns = turns.len(), "conversation context built");
        Ok(turns)
    }
}

/// Orders `messages` by creation time, keeps the newest `window`, and maps
/// them to turns. Messages with blank content are dropped after windowing,
/// so the result never exceeds `window` entries.
pub fn assemble_turns(mut messages: Vec<Message>, window: usize) -> Vec<ConversationTurn> {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
    let skip = messages.len().saturating_sub(window);
    messages
        .into_iter()
        .skip(skip)
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| ConversationTurn {
            role: match m.kind {
                MessageKind::User => Role::User,
                MessageKind::Ai { .. } => Role::Assistant,
            },
            content: m.content,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::types::{MessageId, MessageStatus, UserId};
    use proptest::prelude::*;

    fn message(id: i64, created_at: &str, ai: bool, content: &str) -> Message {
        Message {
            id: MessageId(id),
            content: content.to_string(),
            kind: if ai {
                MessageKind::Ai {
                    parent_message_id: MessageId(id - 1),
                }
            } else {
                MessageKind::User
            },
            status: MessageStatus::Completed,
            user_id: UserId(1),
            chatroom_id: ChatroomId(1),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn newest_first_input_comes_out_chronological() {
        let input = vec![
            message(4, "2026-01-01T00:00:04.000Z", true, "fine thanks"),
            message(3, "2026-01-01T00:00:03.000Z", false, "how are you"),
            message(2, "2026-01-01T00:00:02.000Z", true, "hi there"),
            message(1, "2026-01-01T00:00:01.000Z", false, "hello"),
        ];
        let turns = assemble_turns(input, 10);
        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["hello", "hi there", "how are you", "fine thanks"]);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn same_timestamp_breaks_ties_by_id() {
        let ts = "2026-01-01T00:00:00.000Z";
        let turns = assemble_turns(
            vec![message(2, ts, true, "reply"), message(1, ts, false, "ask")],
            10,
        );
        assert_eq!(turns[0].content, "ask");
        assert_eq!(turns[1].content, "reply");
    }

    #[test]
    fn blank_content_is_dropped() {
        let turns = assemble_turns(
            vec![
                message(1, "2026-01-01T00:00:01.000Z", false, "   "),
                message(2, "2026-01-01T00:00:02.000Z", true, "answer"),
            ],
            10,
        );
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "answer");
    }

    #[test]
    fn window_keeps_newest() {
        let input: Vec<_> = (1..=15)
            .map(|i| message(i, &format!("2026-01-01T00:00:{i:02}.000Z"), false, &format!("m{i}")))
            .collect();
        let turns = assemble_turns(input, 10);
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "m6");
        assert_eq!(turns[9].content, "m15");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn never_exceeds_window_and_stays_ordered(
            stamps in proptest::collection::vec((0u32..500, any::<bool>(), "[a-z ]{0,8}"), 0..40),
            window in 0usize..20,
        ) {
            let input: Vec<Message> = stamps
                .iter()
                .enumerate()
                .map(|(i, (secs, ai, content))| {
                    message(i as i64 + 1, &format!("2026-01-01T00:{:02}:{:02}.000Z", secs / 60, secs % 60), *ai, content)
                })
                .collect();
            let mut expected = input.clone();
            expected.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));

            let turns = assemble_turns(input, window);
            prop_assert!(turns.len() <= window);

            let kept: Vec<&Message> = expected
                .iter()
                .skip(expected.len().saturating_sub(window))
                .filter(|m| !m.content.trim().is_empty())
                .collect();
            prop_assert_eq!(turns.len(), kept.len());
            for (turn, msg) in turns.iter().zip(kept) {
                prop_assert_eq!(&turn.content, &msg.content);
            }
        }
    }
}
