/// Truncate a string to `max_chars` characters, appending "..." if truncated.
///
/// Counts characters rather than bytes so multi-byte server messages never
/// split inside a code point.
pub fn truncate_for_display(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
