//! Display math blocks (`$$ ... $$`).

use super::scan::{appended, code_regions, Region};

/// Close an open `$$` block.
///
/// Delimiters inside code are not counted. If the opener was already
/// followed by a line break, the closer goes on its own line.
pub(crate) fn close_block_math(text: &str) -> Option<String> {
    let regions = code_regions(text);
    let bytes = text.as_bytes();

    let mut delimiters = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if regions[i] == Region::Text && bytes[i] == b'$' && bytes[i + 1] == b'$' {
            delimiters.push(i);
            i += 2;
        } else {
            i += 1;
        }
    }

    if delimiters.len() % 2 == 0 {
        return None;
    }

    let opener = *delimiters.last()?;
    let body = &text[opener + 2..];
    if body.trim().is_empty() {
        return None;
    }

    if body.contains('\n') && !text.ends_with('\n') {
        Some(appended(text, "\n$$"))
    } else {
        Some(appended(text, "$$"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_math() {
        let cases: &[(&str, Option<&str>)] = &[
            ("$$\nE=mc^2", Some("$$\nE=mc^2\n$$")),
            ("$$\nE=mc^2\n", Some("$$\nE=mc^2\n$$")),
            ("$$x^2", Some("$$x^2$$")),
            ("$$a$$ and $$\nb", Some("$$a$$ and $$\nb\n$$")),
            ("$$a$$", None),
            ("$$", None),
            ("$$\n", None),
            ("`$$` code", None),
            ("costs $5", None),
        ];
        for (input, expected) in cases {
            assert_eq!(close_block_math(input).as_deref(), *expected, "input: {input:?}");
        }
    }
}
