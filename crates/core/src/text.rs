/// Characters of note content shown in list items.
pub const EXCERPT_CHARS: usize = 100;

/// Truncate `text` to at most `max_chars` characters, appending `...` when
/// anything was cut. Never splits a UTF-8 sequence.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
