/// Maximum length of service output quoted in errors and logs.
pub const PREVIEW_CHARS: usize = 200;

/// Truncate to `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Borrowing prefix of at most `max_chars` characters.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// One-line preview of raw service output for errors and logs.
pub fn preview(raw: &str) -> String {
    let flat = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, PREVIEW_CHARS)
}

/// Redact response bodies that look like they carry credentials.
pub fn sanitize_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
    ];

    let preview = preview(content);
    let lower = preview.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(response details redacted)".to_string();
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_unicode_safe() {
        assert_eq!(truncate("żółć gęślą", 7), "żółć...");
        assert_eq!(truncate("auto", 10), "auto");
    }

    #[test]
    fn test_truncate_small_max() {
        assert_eq!(truncate("samochód", 2), "sa");
        assert_eq!(truncate("samochód", 0), "");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("żółć", 2), "żó");
        assert_eq!(truncate_str("ab", 5), "ab");
    }

    #[test]
    fn test_preview_flattens_whitespace() {
        assert_eq!(preview("  1. nowy\n\n2. stary "), "1. nowy 2. stary");
    }

    #[test]
    fn test_sanitize_response() {
        assert_eq!(sanitize_response("model not loaded"), "model not loaded");
        assert_eq!(
            sanitize_response("invalid api_key provided"),
            "(response details redacted)"
        );
    }
}
