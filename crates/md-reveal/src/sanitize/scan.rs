//! Character-class and region scanning shared by the repair rules.
//!
//! All markdown markers are ASCII, so byte offsets of markers are always
//! char boundaries. Neighbour checks decode full chars so word detection
//! works for non-latin scripts too.

/// What kind of region a byte offset sits in, as seen by a left-to-right
/// scan that has consumed everything before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Region {
    Text,
    InlineCode,
    Fence,
}

/// Region of every byte offset in `text`, plus one trailing entry for
/// `text.len()`.
///
/// Triple backticks toggle a fenced block; a lone backtick outside a fence
/// toggles an inline code span.
pub(crate) fn code_regions(text: &str) -> Vec<Region> {
    let bytes = text.as_bytes();
    let mut regions = Vec::with_capacity(bytes.len() + 1);
    let mut in_fence = false;
    let mut in_inline = false;

    let current = |in_fence: bool, in_inline: bool| {
        if in_fence {
            Region::Fence
        } else if in_inline {
            Region::InlineCode
        } else {
            Region::Text
        }
    };

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"```") {
            regions.push(current(in_fence, in_inline));
            in_fence = !in_fence;
            let after = current(in_fence, in_inline);
            regions.push(after);
            regions.push(after);
            i += 3;
            continue;
        }

        regions.push(current(in_fence, in_inline));
        if !in_fence && bytes[i] == b'`' {
            in_inline = !in_inline;
        }
        i += 1;
    }

    regions.push(current(in_fence, in_inline));
    regions
}

/// `true` for every byte offset inside a `$$...$$` block, skipping `\$`.
///
/// Single `$` never opens anything: it is far more often a currency sign
/// than inline math.
pub(crate) fn math_block_mask(text: &str) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = Vec::with_capacity(bytes.len() + 1);
    let mut in_block = false;

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'$') {
            mask.extend([in_block, in_block]);
            i += 2;
            continue;
        }

        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'$') {
            mask.push(in_block);
            in_block = !in_block;
            mask.push(in_block);
            i += 2;
            continue;
        }

        mask.push(in_block);
        i += 1;
    }

    mask.push(in_block);
    mask
}

pub(crate) fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// The char ending right before byte offset `index`.
pub(crate) fn char_before(text: &str, index: usize) -> Option<char> {
    text.get(..index)?.chars().next_back()
}

/// The char starting at byte offset `index`.
pub(crate) fn char_at(text: &str, index: usize) -> Option<char> {
    text.get(index..)?.chars().next()
}

/// A marker byte sandwiched between two word chars, like the `_` in
/// `snake_case`.
pub(crate) fn is_intraword(text: &str, index: usize) -> bool {
    matches!(
        (char_before(text, index), char_at(text, index + 1)),
        (Some(prev), Some(next)) if is_word_char(prev) && is_word_char(next)
    )
}

pub(crate) fn is_escaped(text: &str, index: usize) -> bool {
    index > 0 && text.as_bytes()[index - 1] == b'\\'
}

/// Nothing after the marker that a reader would miss if it were hidden.
pub(crate) fn is_blank_payload(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_whitespace() || matches!(c, '_' | '~' | '*' | '`'))
}

pub(crate) fn line_start(text: &str, index: usize) -> usize {
    text[..index].rfind('\n').map_or(0, |nl| nl + 1)
}

pub(crate) fn line_end(text: &str, index: usize) -> usize {
    text[index..].find('\n').map_or(text.len(), |nl| index + nl)
}

/// `marker` sits on a line made only of that marker (3 or more) and
/// blanks, i.e. a thematic break.
pub(crate) fn is_rule_line(text: &str, index: usize, marker: u8) -> bool {
    let line = &text.as_bytes()[line_start(text, index)..line_end(text, index)];
    let mut count = 0;
    for &b in line {
        if b == marker {
            count += 1;
        } else if b != b' ' && b != b'\t' {
            return false;
        }
    }
    count >= 3
}

/// `index` is the bullet of a list item: up to three spaces of indent, a
/// `*`, `+` or `-`, then a blank. Ordered markers (`1.`) are matched on
/// their first digit.
pub(crate) fn is_list_bullet(text: &str, index: usize) -> bool {
    let bytes = text.as_bytes();
    let start = line_start(text, index);
    let indent = bytes[start..index].iter().take_while(|&&b| b == b' ').count();
    if start + indent != index || indent > 3 {
        return false;
    }

    let is_blank = |i: usize| matches!(bytes.get(i), Some(b' ' | b'\t'));
    match bytes.get(index) {
        Some(b'*' | b'+' | b'-') => is_blank(index + 1),
        Some(b) if b.is_ascii_digit() => {
            let digits = bytes[index..].iter().take_while(|b| b.is_ascii_digit()).count();
            matches!(bytes.get(index + digits), Some(b'.' | b')')) && is_blank(index + digits + 1)
        }
        _ => false,
    }
}

/// Everything on the line before `index` is a bullet (`- `, `* `, `+ `).
pub(crate) fn follows_list_bullet(text: &str, index: usize) -> bool {
    let prefix = text[line_start(text, index)..index].trim_start_matches([' ', '\t']);
    let mut chars = prefix.chars();
    match chars.next() {
        Some('-' | '*' | '+') => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c == ' ' || c == '\t')
        }
        _ => false,
    }
}

/// `index` sits inside the destination of a `[text](url)` on the same
/// line whose closing paren has already arrived.
pub(crate) fn is_in_link_destination(text: &str, index: usize) -> bool {
    let before = &text[line_start(text, index)..index];
    let Some(open) = before.rfind(['(', ')']) else {
        return false;
    };
    if !before[open..].starts_with('(') || !before[..open].ends_with(']') {
        return false;
    }
    text[index..line_end(text, index)].contains(')')
}

/// Byte offsets of non-overlapping `pat` occurrences that sit in plain text.
pub(crate) fn plain_matches<'a>(
    text: &'a str,
    pat: &'a str,
    regions: &'a [Region],
) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(pat)
        .map(|(i, _)| i)
        .filter(move |&i| regions[i] == Region::Text && !is_escaped(text, i))
}

/// Closing text produced by a rule, appended to the input.
pub(crate) fn appended(text: &str, closing: &str) -> String {
    let mut out = String::with_capacity(text.len() + closing.len());
    out.push_str(text);
    out.push_str(closing);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_regions_inline() {
        let text = "a `b` c";
        let regions = code_regions(text);
        assert_eq!(regions.len(), text.len() + 1);
        assert_eq!(regions[2], Region::Text); // opening backtick
        assert_eq!(regions[3], Region::InlineCode); // b
        assert_eq!(regions[5], Region::Text); // after closing
    }

    #[test]
    fn test_code_regions_fence() {
        let text = "```\n*x*\n```\n*y";
        let regions = code_regions(text);
        assert_eq!(regions[0], Region::Text);
        assert_eq!(regions[4], Region::Fence);
        let y = text.rfind('*').unwrap();
        assert_eq!(regions[y], Region::Text);
    }

    #[test]
    fn test_math_block_mask() {
        let text = "a $x_1$ b $$y_2$$ \\$c_3";
        let mask = math_block_mask(text);
        assert!(!mask[text.find("x_1").unwrap() + 1]);
        assert!(mask[text.find("y_2").unwrap() + 1]);
        assert!(!mask[text.find("c_3").unwrap() + 1]);
        assert!(!mask[text.find(" b").unwrap()]);
        assert_eq!(mask.len(), text.len() + 1);
    }

    #[test]
    fn test_currency_sign_masks_nothing() {
        let text = "costs $5 for _this";
        assert!(math_block_mask(text).iter().all(|&m| !m));
    }

    #[test]
    fn test_intraword() {
        assert!(is_intraword("snake_case", 5));
        assert!(!is_intraword("_lead", 0));
        assert!(!is_intraword("word _x", 5));
        assert!(is_intraword("日本_語", "日本".len()));
    }

    #[test]
    fn test_list_bullets() {
        assert!(is_list_bullet("* item", 0));
        assert!(is_list_bullet("text\n  - item", 7));
        assert!(is_list_bullet("1. one", 0));
        assert!(!is_list_bullet("*item", 0));
        assert!(!is_list_bullet("a * b", 2));
    }

    #[test]
    fn test_follows_list_bullet() {
        assert!(follows_list_bullet("- **bold", 2));
        assert!(follows_list_bullet("  * __x", 4));
        assert!(!follows_list_bullet("text **bold", 5));
        assert!(!follows_list_bullet("-**bold", 1));
    }

    #[test]
    fn test_rule_line() {
        assert!(is_rule_line("a\n***\nb", 2, b'*'));
        assert!(is_rule_line("* * *", 0, b'*'));
        assert!(!is_rule_line("**bold**", 0, b'*'));
    }

    #[test]
    fn test_link_destination() {
        let text = "[a](http://x_y.com) and _b";
        assert!(is_in_link_destination(text, text.find("x_y").unwrap() + 1));
        assert!(!is_in_link_destination(text, text.rfind('_').unwrap()));
    }

    #[test]
    fn test_blank_payload() {
        assert!(is_blank_payload(""));
        assert!(is_blank_payload("  *_\n"));
        assert!(!is_blank_payload(" a"));
    }
}
