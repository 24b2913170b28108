//! Small text and clock helpers shared by the core and the CLI.

/// Longest excerpt of a remote error that goes into a log line.
pub const LOG_EXCERPT_CHARS: usize = 180;

const ELLIPSIS: &str = "...";

/// Trimmed text, or `None` for missing and blank values. Config fields and
/// env vars go through this so `""` and `"  "` count as unset.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

/// Only `http` and `https` URLs are accepted for the Supabase endpoint.
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Bounded excerpt of an error body for logging.
pub fn log_excerpt(value: &str) -> String {
    value.trim().chars().take(LOG_EXCERPT_CHARS).collect()
}

/// Cut `text` to `max_chars` characters, ending in `...` when anything was
/// dropped. Counts chars, not bytes.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated = text.chars().take(kept).collect::<String>();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Seconds since the Unix epoch, the unit session expiry is stored in.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_text_counts_as_unset() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(String::new())), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some("  notes_v2 ".to_string())),
            Some("notes_v2".to_string())
        );
    }

    #[test]
    fn supabase_urls_need_an_http_scheme() {
        assert!(is_http_url("http://127.0.0.1:54321"));
        assert!(is_http_url("https://demo.supabase.co"));
        assert!(!is_http_url("ws://demo.supabase.co"));
        assert!(!is_http_url("demo.supabase.co"));
    }

    #[test]
    fn log_excerpt_is_bounded() {
        let body = format!("\n{}\n", "e".repeat(LOG_EXCERPT_CHARS * 2));
        assert_eq!(log_excerpt(&body).chars().count(), LOG_EXCERPT_CHARS);
        assert_eq!(log_excerpt("  timeout "), "timeout");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("groceries", 9), "groceries");
        assert_eq!(truncate_chars("groceries list", 9), "grocer...");
        assert_eq!(truncate_chars("crème brûlée", 8), "crème...");
        assert_eq!(truncate_chars("abcdef", 2), "...");
    }
}
