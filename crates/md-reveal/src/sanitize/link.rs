//! Repair of links and images whose text or destination is still arriving.

use super::scan::{code_regions, Region};

/// Outcome of the link rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkRepair {
    /// A link was closed with the placeholder destination. Nothing else
    /// may touch the text after this.
    Placeholder(String),
    /// A half-formed image was cut from the tail.
    Truncated(String),
}

fn matching_open(bytes: &[u8], regions: &[Region], close: usize) -> Option<usize> {
    let mut depth = 1usize;
    for i in (0..close).rev() {
        if regions[i] != Region::Text {
            continue;
        }
        match bytes[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn has_matching_close(bytes: &[u8], regions: &[Region], open: usize) -> bool {
    let mut depth = 1usize;
    for i in open + 1..bytes.len() {
        if regions[i] != Region::Text {
            continue;
        }
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn placeholder_link(before: &str, link_text: &str, placeholder: &str) -> String {
    format!("{before}[{link_text}]({placeholder})")
}

/// Repair a trailing link or image, if there is one.
///
/// `[text](partial-url` becomes `[text](placeholder)`; `![alt](partial`
/// is removed entirely. An unclosed `[text` is closed with the placeholder
/// destination, an unclosed `![alt` is removed.
pub(crate) fn repair(
    text: &str,
    placeholder: &str,
    links: bool,
    images: bool,
) -> Option<LinkRepair> {
    let bytes = text.as_bytes();
    let regions = code_regions(text);

    // destination still arriving
    let mut search = text.len();
    while let Some(idx) = text[..search].rfind("](") {
        search = idx;
        if regions[idx] != Region::Text || text[idx + 2..].contains(')') {
            continue;
        }
        let Some(open) = matching_open(bytes, &regions, idx) else {
            continue;
        };

        let is_image = open > 0 && bytes[open - 1] == b'!';
        if is_image && images {
            return Some(LinkRepair::Truncated(text[..open - 1].to_string()));
        }
        if !is_image && links {
            let repaired = placeholder_link(&text[..open], &text[open + 1..idx], placeholder);
            return Some(LinkRepair::Placeholder(repaired));
        }
    }

    // link text still arriving
    for i in (0..bytes.len()).rev() {
        if bytes[i] != b'[' || regions[i] != Region::Text {
            continue;
        }
        if has_matching_close(bytes, &regions, i) {
            continue;
        }

        let is_image = i > 0 && bytes[i - 1] == b'!';
        if is_image && images {
            return Some(LinkRepair::Truncated(text[..i - 1].to_string()));
        }
        if !is_image && links {
            // a bare `[` with nothing typed after it stays literal
            if text[i + 1..].trim().is_empty() {
                return None;
            }
            let mut repaired = String::with_capacity(text.len() + placeholder.len() + 3);
            repaired.push_str(text);
            repaired.push_str("](");
            repaired.push_str(placeholder);
            repaired.push(')');
            return Some(LinkRepair::Placeholder(repaired));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const P: &str = "md-reveal:incomplete-link";

    fn run(text: &str) -> Option<LinkRepair> {
        repair(text, P, true, true)
    }

    #[test]
    fn test_complete_links_untouched() {
        let cases = [
            "[click](https://x.com)",
            "see [a](b) and [c](d)",
            "![img](pic.png)",
            "- [ ] task",
            "[x] done",
        ];
        for case in cases {
            assert_eq!(run(case), None, "{case}");
        }
    }

    #[test]
    fn test_partial_destination() {
        let cases = [
            (
                "[click](https://x",
                format!("[click]({P})"),
            ),
            (
                "text [a](b) then [click](https://x",
                format!("text [a](b) then [click]({P})"),
            ),
            ("[nested [x] text](ht", format!("[nested [x] text]({P})")),
            ("[click](", format!("[click]({P})")),
        ];
        for (input, expected) in cases {
            assert_eq!(run(input), Some(LinkRepair::Placeholder(expected)), "{input}");
        }
    }

    #[test]
    fn test_partial_link_text() {
        assert_eq!(
            run("go [here"),
            Some(LinkRepair::Placeholder(format!("go [here]({P})")))
        );
        assert_eq!(run("go ["), None);
        assert_eq!(run("go [  "), None);
    }

    #[test]
    fn test_partial_images_are_cut() {
        let cases = [
            ("before ![alt](https://x", "before "),
            ("![alt](", ""),
            ("before ![alt", "before "),
            ("before ![", "before "),
        ];
        for (input, expected) in cases {
            assert_eq!(
                run(input),
                Some(LinkRepair::Truncated(expected.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_brackets_in_code_ignored() {
        assert_eq!(run("`arr[0`"), None);
        assert_eq!(run("```\nlet x = v[i\n```"), None);
        assert_eq!(run("`[a](b`"), None);
    }

    #[test]
    fn test_toggles() {
        assert_eq!(repair("[click](https://x", P, false, true), None);
        assert_eq!(repair("![alt](https://x", P, true, false), None);
    }
}
