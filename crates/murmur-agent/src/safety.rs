// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-based content screening.

use serde::Serialize;

const FLAGGED_WORDS: &[&str] = &["spam", "abuse", "harmful", "inappropriate"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub confidence: f32,
    pub categories: Vec<&'static str>,
    pub message: &'static str,
}

/// Flags content containing any word from a small banned list.
pub fn analyze_message_safety(content: &str) -> SafetyVerdict {
    let lowered = content.to_lowercase();
    let is_safe = !FLAGGED_WORDS.iter().any(|word| lowered.contains(word));
    if is_safe {
        SafetyVerdict {
            is_safe,
            confidence: 0.95,
            categories: Vec::new(),
            message: "Content appears safe",
        }
    } else {
        SafetyVerdict {
            is_safe,
            confidence: 0.8,
            categories: vec!["potential_spam"],
            message: "Content may need review",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_text_is_safe() {
        let verdict = analyze_message_safety("What's the weather like?");
        assert!(verdict.is_safe);
        assert_eq!(verdict.confidence, 0.95);
        assert!(verdict.categories.is_empty());
    }

    #[test]
    fn flagged_word_is_case_insensitive() {
        let verdict = analyze_message_safety("Buy cheap SPAM now");
        assert!(!verdict.is_safe);
        assert_eq!(verdict.categories, vec!["potential_spam"]);
        assert_eq!(verdict.message, "Content may need review");
    }
}
