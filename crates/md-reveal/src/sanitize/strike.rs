//! Strikethrough (`~~`).

use super::emphasis::close_double;

/// `~~gone` → `~~gone~~`
pub(crate) fn close_strikethrough(text: &str) -> Option<String> {
    close_double(text, "~~", None)
}
