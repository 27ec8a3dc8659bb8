//! Chat relay prompts carrying live session context.

use crate::types::SessionStats;

/// Returned to the user when the chat relay cannot get a reply.
pub const CHAT_FALLBACK_REPLY: &str = "Error: could not get AI response";

/// Builds the prompt for a user chat message.
///
/// A class system prompt, when configured, is placed ahead of the session
/// context.
pub fn build_chat_prompt(
    stats: &SessionStats,
    message: &str,
    system_prompt: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    if let Some(system_prompt) = system_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        lines.push(system_prompt.to_string());
        lines.push(String::new());
    }
    lines.push("You are Keyllama, an AI assistant helping a user with coding.".to_string());
    lines.push("Current session stats:".to_string());
    lines.push(format!("Total edits: {}", stats.total_edit_events));
    lines.push(format!("Chars inserted: {}", stats.chars_inserted));
    lines.push(format!("Chars deleted: {}", stats.chars_deleted));
    lines.push(format!("External pastes: {}", stats.external_paste_count()));
    lines.push(String::new());
    lines.push(format!("User says: \"{message}\""));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    fn stats() -> SessionStats {
        let start = Utc
            .with_ymd_and_hms(2025, 3, 10, 14, 0, 0)
            .single()
            .expect("valid test timestamp");
        let mut stats = SessionStats::new(start, true);
        stats.total_edit_events = 7;
        stats.chars_inserted = 120;
        stats.chars_deleted = 4;
        stats
    }

    #[test]
    fn chat_prompt_includes_session_counters_and_message() {
        let prompt = build_chat_prompt(&stats(), "why is my loop slow?", None);
        assert!(prompt.starts_with("You are Keyllama"));
        assert!(prompt.contains("Total edits: 7"));
        assert!(prompt.contains("Chars inserted: 120"));
        assert!(prompt.contains("Chars deleted: 4"));
        assert!(prompt.contains("External pastes: 0"));
        assert!(prompt.ends_with("User says: \"why is my loop slow?\""));
    }

    #[test]
    fn chat_prompt_leads_with_class_system_prompt() {
        let prompt = build_chat_prompt(&stats(), "hint?", Some("Never give full solutions."));
        assert!(prompt.starts_with("Never give full solutions.\n\nYou are Keyllama"));
    }

    #[test]
    fn chat_prompt_ignores_blank_system_prompt() {
        let prompt = build_chat_prompt(&stats(), "hint?", Some("   "));
        assert!(prompt.starts_with("You are Keyllama"));
    }
}
