//! Closing of unterminated bold, italic and bold-italic spans.
//!
//! Each function looks at one marker family. A family is only closed when
//! its markers have an odd count and the text after the opener carries a
//! real payload.

use super::scan::{
    appended, code_regions, follows_list_bullet, is_blank_payload, is_escaped, is_in_link_destination,
    is_intraword, is_list_bullet, is_rule_line, math_block_mask, plain_matches, Region,
};

fn in_math(mask: &Option<Vec<bool>>, index: usize) -> bool {
    mask.as_ref().is_some_and(|m| m[index])
}

/// Underscores inside `$$` blocks are subscripts, not emphasis.
fn math_mask_if_needed(text: &str) -> Option<Vec<bool>> {
    text.contains("$$").then(|| math_block_mask(text))
}

fn count_triple_asterisks(text: &str, regions: &[Region]) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut run = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'*' && regions[i] == Region::Text {
            run += 1;
        } else {
            count += run / 3;
            run = 0;
        }
    }
    count + run / 3
}

/// Whether the `*` at `index` stands alone as an italic marker.
///
/// The first `*` of a `***` run counts (it carries the italic half of a
/// bold-italic span); any `*` in a `**` pair does not.
fn is_single_asterisk(text: &str, index: usize, regions: &[Region]) -> bool {
    let bytes = text.as_bytes();
    let prev = index.checked_sub(1).map(|i| bytes[i]);
    let next = bytes.get(index + 1).copied();

    if regions[index] != Region::Text || is_escaped(text, index) {
        return false;
    }
    if prev == Some(b'*') {
        return false;
    }
    if next == Some(b'*') {
        return bytes.get(index + 2) == Some(&b'*');
    }
    !is_intraword(text, index) && !is_list_bullet(text, index)
}

fn count_single_asterisks(text: &str, regions: &[Region]) -> usize {
    text.bytes()
        .enumerate()
        .filter(|&(i, b)| b == b'*' && is_single_asterisk(text, i, regions))
        .count()
}

/// Whether the `_` at `index` stands alone as an italic marker.
fn is_single_underscore(
    text: &str,
    index: usize,
    regions: &[Region],
    math: &Option<Vec<bool>>,
) -> bool {
    let bytes = text.as_bytes();
    let prev = index.checked_sub(1).map(|i| bytes[i]);
    let next = bytes.get(index + 1).copied();

    regions[index] == Region::Text
        && prev != Some(b'_')
        && next != Some(b'_')
        && !is_escaped(text, index)
        && !in_math(math, index)
        && !is_in_link_destination(text, index)
        && !is_intraword(text, index)
}

fn single_underscores<'a>(
    text: &'a str,
    regions: &'a [Region],
    math: &'a Option<Vec<bool>>,
) -> impl Iterator<Item = usize> + 'a {
    text.bytes()
        .enumerate()
        .filter(move |&(i, b)| b == b'_' && is_single_underscore(text, i, regions, math))
        .map(|(i, _)| i)
}

/// Shared shape of the `**`, `__` and `~~` rules: find the last opener,
/// require a payload after it, then close on an odd plain-text count.
pub(crate) fn close_double(text: &str, marker: &str, rule_marker: Option<u8>) -> Option<String> {
    let regions = code_regions(text);
    let last = plain_matches(text, marker, &regions).last()?;

    let payload = &text[last + marker.len()..];
    if payload.contains(&marker[..1]) || is_blank_payload(payload) {
        return None;
    }
    if rule_marker.is_some_and(|m| is_rule_line(text, last, m)) {
        return None;
    }
    // a marker right after a bullet that runs onto the next line is more
    // likely list syntax than an open span
    if payload.contains('\n') && follows_list_bullet(text, last) {
        return None;
    }

    let count = plain_matches(text, marker, &regions).count();
    (count % 2 == 1).then(|| appended(text, marker))
}

/// `***bold italic` → `***bold italic***`
pub(crate) fn close_bold_italic(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'*') {
        return None;
    }

    let regions = code_regions(text);
    let last = plain_matches(text, "***", &regions).last()?;
    let payload = &text[last + 3..];
    if payload.contains('*') || is_blank_payload(payload) || is_rule_line(text, last, b'*') {
        return None;
    }
    if count_triple_asterisks(text, &regions) % 2 == 0 {
        return None;
    }

    // `**a *b***`-style nesting already balances once split into pairs
    let pairs = plain_matches(text, "**", &regions).count();
    if pairs % 2 == 0 && count_single_asterisks(text, &regions) % 2 == 0 {
        return None;
    }
    Some(appended(text, "***"))
}

/// `**bold` → `**bold**`
pub(crate) fn close_bold(text: &str) -> Option<String> {
    close_double(text, "**", Some(b'*'))
}

/// `__italic` → `__italic__`
pub(crate) fn close_double_underscore(text: &str) -> Option<String> {
    close_double(text, "__", Some(b'_'))
}

/// `*italic` → `*italic*`
pub(crate) fn close_single_asterisk(text: &str) -> Option<String> {
    let regions = code_regions(text);

    let first = text
        .bytes()
        .enumerate()
        .position(|(i, b)| {
            b == b'*'
                && regions[i] == Region::Text
                && text.as_bytes().get(i + 1) != Some(&b'*')
                && is_single_asterisk(text, i, &regions)
        })?;

    if is_blank_payload(&text[first + 1..]) {
        return None;
    }
    (count_single_asterisks(text, &regions) % 2 == 1).then(|| appended(text, "*"))
}

/// `_italic` → `_italic_`, with the closer placed before trailing newlines
/// so a finished paragraph break is kept.
pub(crate) fn close_single_underscore(text: &str) -> Option<String> {
    let regions = code_regions(text);
    let math = math_mask_if_needed(text);

    let first = single_underscores(text, &regions, &math).next()?;
    if is_blank_payload(&text[first + 1..]) {
        return None;
    }
    if single_underscores(text, &regions, &math).count() % 2 == 0 {
        return None;
    }

    if let Some(nested) = close_underscore_inside_bold(text) {
        return Some(nested);
    }

    let body = text.trim_end_matches('\n');
    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(body);
    out.push('_');
    out.push_str(&text[body.len()..]);
    Some(out)
}

/// `**bold _italic**` → `**bold _italic_**`
///
/// The bold rule already closed the outer span; the italic closer has to
/// land inside it.
fn close_underscore_inside_bold(text: &str) -> Option<String> {
    let inner = text.strip_suffix("**")?;
    let regions = code_regions(inner);
    let math = math_mask_if_needed(inner);

    let first_pair = plain_matches(inner, "**", &regions).next()?;
    if plain_matches(inner, "**", &regions).count() % 2 == 0 {
        return None;
    }
    let underscore = single_underscores(inner, &regions, &math).next()?;
    (first_pair < underscore).then(|| format!("{inner}_**"))
}
