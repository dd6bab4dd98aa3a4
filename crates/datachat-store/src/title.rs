use chrono::{DateTime, Utc};

/// Title used when a message yields no words.
pub const DEFAULT_TITLE: &str = "New Chat";

const TITLE_MAX_WORDS: usize = 8;
const TITLE_MAX_CHARS: usize = 50;

/// Title for a chat created without one.
pub fn default_chat_title(now: DateTime<Utc>) -> String {
    format!("{} – {}", DEFAULT_TITLE, now.format("%d.%m.%Y %H:%M"))
}

/// Derive a chat title from a message: the first eight words, capped at fifty
/// characters with a trailing `...` when cut.
pub fn title_from_message(text: &str) -> String {
    let title = text
        .split_whitespace()
        .take(TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if title.chars().count() > TITLE_MAX_CHARS {
        let mut cut: String = title.chars().take(TITLE_MAX_CHARS).collect();
        cut.push_str("...");
        cut
    } else if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_message_falls_back() {
        assert_eq!(title_from_message(""), "New Chat");
        assert_eq!(title_from_message("   \n\t "), "New Chat");
    }

    #[test]
    fn test_first_eight_words() {
        assert_eq!(title_from_message("a b c d e f g h i j"), "a b c d e f g h");
        assert_eq!(title_from_message("  spaced   out\twords "), "spaced out words");
    }

    #[test]
    fn test_short_question_kept_verbatim() {
        assert_eq!(
            title_from_message("Show me total sales by branch for May"),
            "Show me total sales by branch for May"
        );
    }

    #[test]
    fn test_long_words_truncated_to_fifty_chars() {
        let text = "internationalization considerations notwithstanding everything \
                    else remains straightforward";
        let title = title_from_message(text);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);
        assert!(text.starts_with(title.trim_end_matches("...")));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let text = "ə".repeat(60);
        let title = title_from_message(&text);
        assert_eq!(title, format!("{}...", "ə".repeat(50)));
    }

    #[test]
    fn test_default_chat_title() {
        let now = Utc.with_ymd_and_hms(2025, 5, 12, 9, 30, 0).unwrap();
        assert_eq!(default_chat_title(now), "New Chat – 12.05.2025 09:30");
    }
}
