//! Shared utility functions.

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Collapse a possibly multi-line text to its first line, truncated for
/// one-line display.
pub fn one_line(s: &str, max_bytes: usize) -> String {
    let first = s.lines().next().unwrap_or("").trim();
    let truncated = truncate_str(first, max_bytes);
    if truncated.len() < first.len() || s.trim().lines().nth(1).is_some() {
        format!("{}…", truncated)
    } else {
        truncated.to_string()
    }
}
