//! Heuristic token estimation for prompt budgeting.
//!
//! Arabic packs roughly two characters per token, Latin roughly four;
//! each message adds fixed structural overhead.

use crate::session::HistoryEntry;

const MESSAGE_OVERHEAD: f64 = 4.0;

/// Estimate the token count of a text.
pub fn estimate_text_tokens(text: &str) -> u32 {
    let arabic = text
        .chars()
        .filter(|c| ('\u{0600}'..='\u{06FF}').contains(c))
        .count() as f64;
    let other = text.chars().count() as f64 - arabic;
    (arabic * 0.5 + other * 0.25) as u32
}

/// Estimate the token count of a message thread, including per-message
/// overhead.
pub fn estimate_history_tokens(entries: &[HistoryEntry]) -> u32 {
    entries
        .iter()
        .map(|e| estimate_text_tokens(&e.content) + MESSAGE_OVERHEAD as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Role;

    #[test]
    fn arabic_weighs_double() {
        // 10 Arabic chars ≈ 5 tokens; 10 Latin chars ≈ 2 tokens.
        let ar = estimate_text_tokens("مرحبامرحبا");
        let en = estimate_text_tokens("aaaaaaaaaa");
        assert!(ar > en);
        assert_eq!(ar, 5);
        assert_eq!(en, 2);
    }

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_text_tokens(""), 0);
    }

    #[test]
    fn history_adds_overhead_per_message() {
        let entries = vec![
            HistoryEntry {
                role: Role::User,
                content: String::new(),
                tool_call_id: None,
            },
            HistoryEntry {
                role: Role::Assistant,
                content: String::new(),
                tool_call_id: None,
            },
        ];
        assert_eq!(estimate_history_tokens(&entries), 8);
    }
}
