/// A downstream markdown parser fed with sanitized text.
///
/// The engine never parses markdown itself. Implement this for whatever
/// renderer the host uses; any `Fn(&str) -> T` already qualifies.
pub trait MarkdownParser {
    type Tree;

    fn parse(&self, markdown: &str) -> Self::Tree;
}

impl<F, T> MarkdownParser for F
where
    F: Fn(&str) -> T,
{
    type Tree = T;

    fn parse(&self, markdown: &str) -> T {
        self(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize;

    /// Counts emphasis delimiters the way a strict parser would.
    struct DelimiterCount;

    impl MarkdownParser for DelimiterCount {
        type Tree = usize;

        fn parse(&self, markdown: &str) -> usize {
            markdown.matches("**").count()
        }
    }

    #[test]
    fn test_sanitized_text_balances_delimiters() {
        let tree = DelimiterCount.parse(&sanitize("this is **bo"));
        assert_eq!(tree % 2, 0);
    }

    #[test]
    fn test_closure_parser() {
        let lines = |s: &str| s.lines().count();
        assert_eq!(lines.parse("# a\nb\n"), 2);
    }
}
