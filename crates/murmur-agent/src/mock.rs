// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned replies used when no AI backend is configured.

/// Model name reported for canned replies.
pub const MOCK_MODEL: &str = "mock-gemini";

/// Checked in order; the first keyword found in the lowercased input wins.
const KEYWORD_REPLIES: &[(&str, &str)] = &[
    ("hello", "Hello! How can I help you today?"),
    ("hi", "Hi there! What would you like to know?"),
    (
        "help",
        "I'm here to assist you with any questions you have. Feel free to ask me anything!",
    ),
    (
        "how are you",
        "I'm doing well, thank you for asking! How can I assist you today?",
    ),
    (
        "what",
        "That's an interesting question! Could you provide more details so I can give you a better answer?",
    ),
    (
        "why",
        "Great question! Let me think about that and provide you with a comprehensive answer.",
    ),
    (
        "when",
        "Timing can be important! Let me help you understand when this might happen.",
    ),
    (
        "where",
        "Location matters! Let me provide you with relevant information about where to find what you're looking for.",
    ),
];

const DEFAULT_REPLY: &str = "Thank you for your message! I understand you're asking about something important. \
While I'm currently in demo mode, I'd be happy to help you explore this topic further. \
Could you tell me more about what specifically you'd like to know?";

const QUESTION_PREFIX: &str = "That's a great question! ";
const DETAIL_PREFIX: &str = "I can see you've shared quite a bit of detail. ";

/// Word count above which the detail prefix is added.
const DETAILED_WORDS: usize = 10;

/// Deterministic reply for `input`. Never empty.
pub fn mock_reply(input: &str) -> String {
    let lowered = input.to_lowercase();
    let base = KEYWORD_REPLIES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map_or(DEFAULT_REPLY, |(_, reply)| reply);

    if input.contains('?') {
        format!("{QUESTION_PREFIX}{base}")
    } else if input.split_whitespace().count() > DETAILED_WORDS {
        format!("{DETAIL_PREFIX}{base}")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn greeting_keyword() {
        assert_eq!(mock_reply("Hello"), "Hello! How can I help you today?");
    }

    #[test]
    fn earlier_keywords_win() {
        // "this" contains "hi", which precedes "what" in the table.
        assert_eq!(mock_reply("what is this"), "Hi there! What would you like to know?");
    }

    #[test]
    fn question_mark_adds_prefix() {
        assert_eq!(
            mock_reply("Can you help?"),
            "That's a great question! I'm here to assist you with any questions you have. Feel free to ask me anything!"
        );
    }

    #[test]
    fn long_input_adds_detail_prefix() {
        let reply = mock_reply("one two three four five six seven eight nine ten eleven");
        assert!(reply.starts_with(DETAIL_PREFIX));
        assert!(reply.ends_with(DEFAULT_REPLY));
    }

    #[test]
    fn question_prefix_takes_precedence_over_detail() {
        let reply = mock_reply("one two three four five six seven eight nine ten eleven?");
        assert!(reply.starts_with(QUESTION_PREFIX));
    }

    proptest! {
        #[test]
        fn reply_is_never_empty(input in "\\PC{1,200}") {
            prop_assert!(!mock_reply(&input).trim().is_empty());
        }
    }
}
