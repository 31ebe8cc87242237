//! Inline code spans and fenced blocks.

use super::scan::{appended, is_blank_payload};

fn fence_count(text: &str) -> usize {
    text.matches("```").count()
}

/// The text currently sits inside a multi-line fenced block that has not
/// been closed. Everything after the fence is literal code.
pub(crate) fn in_open_fence(text: &str) -> bool {
    text.contains('\n') && fence_count(text) % 2 == 1
}

fn is_part_of_fence(bytes: &[u8], i: usize) -> bool {
    let lo = i.saturating_sub(2);
    let hi = (i + 3).min(bytes.len());
    bytes[lo..hi].windows(3).any(|w| w == b"```")
}

/// Close a dangling inline code span.
///
/// A single-line triple-backtick span missing its last backtick is
/// completed. An odd number of fences means a block was just opened and is
/// left alone; otherwise an odd count of lone backticks gets one closer.
pub(crate) fn close_inline_code(text: &str) -> Option<String> {
    if !text.contains('\n') && text.starts_with("```") {
        let closing = text.len() - text.trim_end_matches('`').len();
        let body_end = text.len() - closing;
        if matches!(closing, 2 | 3) && body_end >= 3 && !text[3..body_end].contains('`') {
            return (closing == 2).then(|| appended(text, "`"));
        }
    }

    if fence_count(text) % 2 == 1 {
        return None;
    }

    let bytes = text.as_bytes();
    let lone = (0..bytes.len()).filter(|&i| bytes[i] == b'`' && !is_part_of_fence(bytes, i));

    let last = lone.clone().last()?;
    if is_blank_payload(&text[last + 1..]) {
        return None;
    }
    (lone.count() % 2 == 1).then(|| appended(text, "`"))
}
