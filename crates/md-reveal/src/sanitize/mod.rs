//! Incomplete-markup repair for streaming markdown.
//!
//! [`sanitize`] takes the text revealed so far and returns a version that
//! a regular markdown parser can render without dangling syntax: `**bo`
//! becomes `**bo**`, `[link](http://ex` points at a placeholder, a
//! half-typed image disappears until it is complete.
//!
//! The repair only appends closers or cuts an unmistakably incomplete
//! trailing construct. Content that is already complete is never
//! rewritten, and the function keeps no state between calls.

mod code;
mod emphasis;
mod link;
mod math;
mod scan;
mod setext;
mod strike;

use link::LinkRepair;
use scan::{code_regions, math_block_mask, Region};

/// Destination given to links whose URL has not fully arrived.
pub const INCOMPLETE_LINK_URL: &str = "md-reveal:incomplete-link";

/// Which repairs run, and how much of the text they look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    pub links: bool,
    pub images: bool,
    pub emphasis: bool,
    pub inline_code: bool,
    pub strikethrough: bool,
    pub block_math: bool,
    pub setext_headings: bool,

    /// Placeholder destination for unterminated links
    pub incomplete_link_url: String,

    /// Rules only run on roughly this many trailing bytes. The text is
    /// split at a blank line outside code and math blocks, so a span never
    /// straddles the cut. Without such a line the whole text is examined.
    pub window_bytes: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            links: true,
            images: true,
            emphasis: true,
            inline_code: true,
            strikethrough: true,
            block_math: true,
            setext_headings: true,
            incomplete_link_url: INCOMPLETE_LINK_URL.to_string(),
            window_bytes: 16 * 1024,
        }
    }
}

impl SanitizeOptions {
    pub fn with_incomplete_link_url(mut self, url: impl Into<String>) -> Self {
        self.incomplete_link_url = url.into();
        self
    }

    pub fn with_window_bytes(mut self, window_bytes: usize) -> Self {
        self.window_bytes = window_bytes;
        self
    }
}

/// Outcome of a single repair rule.
enum Step {
    /// Nothing to repair
    Keep,
    /// Use the repaired text for the following rules
    Rewrite(String),
    /// Use the repaired text and skip every following rule
    Finish(String),
}

type Rule = fn(&str, &SanitizeOptions) -> Step;

fn step(enabled: bool, repaired: Option<String>) -> Step {
    match repaired {
        Some(text) if enabled => Step::Rewrite(text),
        _ => Step::Keep,
    }
}

fn setext_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.setext_headings, setext::protect(text))
}

fn open_fence_rule(text: &str, _opts: &SanitizeOptions) -> Step {
    // inside an unclosed fence everything is literal code
    if code::in_open_fence(text) {
        Step::Finish(text.to_string())
    } else {
        Step::Keep
    }
}

fn link_rule(text: &str, opts: &SanitizeOptions) -> Step {
    if !opts.links && !opts.images {
        return Step::Keep;
    }
    match link::repair(text, &opts.incomplete_link_url, opts.links, opts.images) {
        Some(LinkRepair::Placeholder(text)) => Step::Finish(text),
        Some(LinkRepair::Truncated(text)) => Step::Rewrite(text),
        None => Step::Keep,
    }
}

fn bold_italic_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.emphasis, emphasis::close_bold_italic(text))
}

fn bold_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.emphasis, emphasis::close_bold(text))
}

fn double_underscore_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.emphasis, emphasis::close_double_underscore(text))
}

fn single_asterisk_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.emphasis, emphasis::close_single_asterisk(text))
}

fn single_underscore_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.emphasis, emphasis::close_single_underscore(text))
}

fn inline_code_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.inline_code, code::close_inline_code(text))
}

fn strikethrough_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.strikethrough, strike::close_strikethrough(text))
}

fn block_math_rule(text: &str, opts: &SanitizeOptions) -> Step {
    step(opts.block_math, math::close_block_math(text))
}

/// Repairs in application order. Nothing runs inside an open fence, and
/// later rules assume link syntax has already been normalized.
const PIPELINE: [(&str, Rule); 11] = [
    ("open-fence", open_fence_rule),
    ("link", link_rule),
    ("setext", setext_rule),
    ("bold-italic", bold_italic_rule),
    ("bold", bold_rule),
    ("double-underscore", double_underscore_rule),
    ("single-asterisk", single_asterisk_rule),
    ("single-underscore", single_underscore_rule),
    ("inline-code", inline_code_rule),
    ("strikethrough", strikethrough_rule),
    ("block-math", block_math_rule),
];

/// Split `text` so the tail holds at least `window_bytes`.
///
/// The cut lands right after the last blank line that sits outside every
/// code region and `$$` block. Inline spans cannot cross a blank line, so
/// nothing the rules count straddles the cut. If there is no such line the
/// whole text is the tail.
fn split_window(text: &str, window_bytes: usize) -> (&str, &str) {
    if text.len() <= window_bytes {
        return ("", text);
    }
    let limit = text.len() - window_bytes;
    let regions = code_regions(text);
    let math = math_block_mask(text);

    let cut = text
        .match_indices("\n\n")
        .map(|(i, _)| i)
        .take_while(|&i| i + 2 <= limit)
        .filter(|&i| regions[i] == Region::Text && regions[i + 2] == Region::Text && !math[i])
        .last();

    match cut {
        Some(i) => text.split_at(i + 2),
        None => ("", text),
    }
}

/// Repair `text` with the default options.
pub fn sanitize(text: &str) -> String {
    sanitize_with(text, &SanitizeOptions::default())
}

/// Repair `text` so it can be handed to a markdown parser mid-stream.
pub fn sanitize_with(text: &str, opts: &SanitizeOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    let (prefix, window) = split_window(text, opts.window_bytes);
    let mut tail = window.to_string();

    for (name, rule) in PIPELINE {
        match rule(&tail, opts) {
            Step::Keep => {}
            Step::Rewrite(repaired) => {
                tracing::trace!("sanitize: {} rewrote tail", name);
                tail = repaired;
            }
            Step::Finish(repaired) => {
                tracing::trace!("sanitize: {} finished the pipeline", name);
                tail = repaired;
                break;
            }
        }
    }

    let mut out = String::with_capacity(prefix.len() + tail.len());
    out.push_str(prefix);
    out.push_str(&tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_closes_odd_emphasis() {
        assert_eq!(sanitize("**bold"), "**bold**");
        assert_eq!(sanitize("*text"), "*text*");
        assert_eq!(sanitize("`code"), "`code`");
        assert_eq!(sanitize("$$\nE=mc^2"), "$$\nE=mc^2\n$$");
        assert_eq!(sanitize("~~gone"), "~~gone~~");
        assert_eq!(sanitize("***both"), "***both***");
    }

    #[test]
    fn test_links() {
        assert_eq!(sanitize("[click](https://x.com)"), "[click](https://x.com)");
        assert_eq!(
            sanitize("[click](https://x"),
            format!("[click]({INCOMPLETE_LINK_URL})")
        );
        assert_eq!(sanitize("see ![alt](https://x"), "see ");
        assert!(!sanitize("see ![alt](https://x").contains("!["));
    }

    #[test]
    fn test_placeholder_link_skips_later_rules() {
        // the `**` inside the link text must not be closed again
        assert_eq!(
            sanitize("**[bold link](http://a"),
            format!("**[bold link]({INCOMPLETE_LINK_URL})")
        );
    }

    #[test]
    fn test_truncated_image_continues() {
        assert_eq!(sanitize("**bold ![img](http://a"), "**bold **");
    }

    #[test]
    fn test_no_false_positives_in_code() {
        let fenced = "```\n*not emphasis*\n```";
        assert_eq!(sanitize(fenced), fenced);
        assert_eq!(sanitize("```rust\nlet x = **y"), "```rust\nlet x = **y");
        assert_eq!(sanitize("```\n[a](b"), "```\n[a](b");
    }

    #[test]
    fn test_idempotent_on_complete_input() {
        let cases = [
            "# Title\n\nSome **bold** and *italic* text.\n",
            "A [link](https://example.com) and `code`.",
            "```rust\nfn main() {}\n```\n",
            "- item one\n- item two\n",
            "$$\nx^2\n$$\n",
            "~~struck~~ __under__ ***both***",
            "snake_case_names stay put",
        ];
        for case in cases {
            let once = sanitize(case);
            assert_eq!(once, case, "complete input changed: {case:?}");
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_idempotent_after_repair() {
        let cases = ["**bold", "*it", "`code", "~~s", "$$\nx", "[l](http://a", "_u"];
        for case in cases {
            let once = sanitize(case);
            assert_eq!(sanitize(&once), once, "input: {case:?}");
        }
    }

    #[test]
    fn test_streaming_prefixes_never_panic() {
        let doc = "# Héllo 🌍\n\nSome **bold _mixed_** text with `code`, ~~old~~ and \
                   [a link](https://example.com/a_b).\n\n```rust\nlet x = 1;\n```\n\n\
                   $$\nE=mc^2\n$$\n\n- item *one*\n- item ![img](pic.png)\n";
        for (i, _) in doc.char_indices() {
            let _ = sanitize(&doc[..i]);
        }
        assert_eq!(sanitize(doc), doc);
    }

    #[test]
    fn test_window_cuts_at_blank_line() {
        let opts = SanitizeOptions::default().with_window_bytes(8);
        // the unbalanced `**` before the cut is left alone
        assert_eq!(
            sanitize_with("first **para\n\nsecond *tail", &opts),
            "first **para\n\nsecond *tail*"
        );
    }

    #[test]
    fn test_window_without_safe_cut_scans_everything() {
        let opts = SanitizeOptions::default().with_window_bytes(3);
        assert_eq!(sanitize_with("**a long sentence", &opts), "**a long sentence**");
        assert_eq!(sanitize_with("ééé *x", &opts), "ééé *x*");
        assert_eq!(sanitize_with("日本語", &opts), "日本語");
    }

    #[test]
    fn test_long_complete_document_unchanged() {
        let single_line = format!("**{}** done.", "a".repeat(20_000));
        assert_eq!(sanitize(&single_line), single_line);

        let paragraphs = "Some **bold**, `code`, ~~old~~ and _it_.\n\n".repeat(600);
        assert!(paragraphs.len() > 16 * 1024);
        assert_eq!(sanitize(&paragraphs), paragraphs);

        let fenced = format!(
            "```\n{}```\n\nafter **the** fence\n",
            "let x = a ** b;\n\n".repeat(1500)
        );
        assert_eq!(sanitize(&fenced), fenced);

        let math = format!("$$\n{}$$\n\nthen _x_\n", "a_1 + b_2\n\n".repeat(2000));
        assert_eq!(sanitize(&math), math);
    }

    #[test]
    fn test_long_document_with_open_tail() {
        let body = "Some **bold** text.\n\n".repeat(1000);
        let text = format!("{body}and **open");
        assert_eq!(sanitize(&text), format!("{body}and **open**"));
    }

    #[test]
    fn test_currency_does_not_hide_emphasis() {
        assert_eq!(sanitize("It costs $5 for _this"), "It costs $5 for _this_");
        assert_eq!(sanitize("It costs $5 for *this"), "It costs $5 for *this*");
    }

    #[test]
    fn test_setext_runs_after_link() {
        assert_eq!(
            sanitize("[a\n-"),
            format!("[a\n-]({INCOMPLETE_LINK_URL})")
        );
        assert_eq!(sanitize("```\ntext\n-"), "```\ntext\n-");
    }

    #[test]
    fn test_disabled_rules() {
        let opts = SanitizeOptions {
            emphasis: false,
            inline_code: false,
            ..Default::default()
        };
        assert_eq!(sanitize_with("**bold `code", &opts), "**bold `code");
    }

    #[test]
    fn test_custom_placeholder() {
        let opts = SanitizeOptions::default().with_incomplete_link_url("#");
        assert_eq!(sanitize_with("[a](htt", &opts), "[a](#)");
    }

    #[test]
    fn test_setext_guard() {
        assert_eq!(sanitize("Some text\n-"), "Some text\n-\u{200B}");
    }
}
