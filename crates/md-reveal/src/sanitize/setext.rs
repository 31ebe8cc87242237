//! Guard against a half-typed line turning the paragraph above it into a
//! setext heading.

/// Zero-width space appended after an ambiguous `-`/`=` line.
pub(crate) const GUARD: char = '\u{200B}';

/// `text\n-` would render `text` as a heading until the list item or rule
/// arrives. Appending a zero-width space keeps it a paragraph.
pub(crate) fn protect(text: &str) -> Option<String> {
    let last_nl = text.rfind('\n')?;
    let previous = &text[..last_nl];
    let last_line = &text[last_nl + 1..];

    if last_line.ends_with([' ', '\t']) {
        return None;
    }
    if !matches!(last_line.trim(), "-" | "--" | "=" | "==") {
        return None;
    }

    let previous_line = previous.rsplit('\n').next().unwrap_or("");
    if previous_line.trim().is_empty() {
        return None;
    }

    let mut out = String::with_capacity(text.len() + GUARD.len_utf8());
    out.push_str(text);
    out.push(GUARD);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protects_ambiguous_underline() {
        assert_eq!(protect("Title\n-"), Some("Title\n-\u{200B}".to_string()));
        assert_eq!(protect("Title\n=="), Some("Title\n==\u{200B}".to_string()));
        assert_eq!(protect("Title\n  --"), Some("Title\n  --\u{200B}".to_string()));
    }

    #[test]
    fn test_leaves_real_structure() {
        assert_eq!(protect("Title\n---"), None);
        assert_eq!(protect("Title\n- "), None);
        assert_eq!(protect("\n-"), None);
        assert_eq!(protect("para\n\n-"), None);
        assert_eq!(protect("-"), None);
    }
}
