// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use murmur_core::types::{ConversationTurn, Role};

/// Maximum history turns rendered into a prompt.
pub const PROMPT_HISTORY_TURNS: usize = 10;

/// Renders the single prompt string sent to the AI backend:
///
/// ```text
/// System: <instruction>
///
/// Conversation History:
/// User: ...
/// Assistant: ...
///
/// User: <message>
/// AI Assistant:
/// ```
///
/// The history block is omitted when there is no history.
pub fn render_prompt(system_prompt: &str, history: &[ConversationTurn], user_message: &str) -> String {
    let mut lines = vec![format!("System: {system_prompt}")];

    if !history.is_empty() {
        lines.push(String::new());
        lines.push("Conversation History:".to_string());
        let start = history.len().saturating_sub(PROMPT_HISTORY_TURNS);
        for turn in &history[start..] {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            lines.push(format!("{speaker}: {}", turn.content));
        }
    }

    lines.push(String::new());
    lines.push(format!("User: {user_message}"));
    lines.push("AI Assistant:".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn prompt_without_history() {
        let prompt = render_prompt("Be kind.", &[], "Hello");
        assert_eq!(prompt, "System: Be kind.\n\nUser: Hello\nAI Assistant:");
    }

    #[test]
    fn prompt_with_history() {
        let history = [turn(Role::User, "hi"), turn(Role::Assistant, "hello!")];
        let prompt = render_prompt("Be kind.", &history, "how are you?");
        assert_eq!(
            prompt,
            "System: Be kind.\n\nConversation History:\nUser: hi\nAssistant: hello!\n\nUser: how are you?\nAI Assistant:"
        );
    }

    #[test]
    fn only_last_ten_turns_rendered() {
        let history: Vec<_> = (0..14).map(|i| turn(Role::User, &format!("t{i}"))).collect();
        let prompt = render_prompt("sys", &history, "now");
        assert!(!prompt.contains("User: t3\n"));
        assert!(prompt.contains("User: t4\n"));
        assert!(prompt.contains("User: t13\n"));
    }
}
