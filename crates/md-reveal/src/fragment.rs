//! Normalization of incoming source values into text fragments.

use std::borrow::Cow;
use std::fmt;

/// A unit of incoming text, already normalized.
///
/// Fragments are immutable once received. An empty fragment carries no
/// content and is dropped before it reaches the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Decode a byte payload as UTF-8, replacing invalid sequences.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Stringify any displayable value.
    pub fn display(value: impl fmt::Display) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything a source may yield that can be turned into a [`Fragment`].
///
/// Garbage never halts the pipeline: missing values become empty
/// fragments and invalid UTF-8 is decoded lossily.
pub trait IntoFragment {
    fn into_fragment(self) -> Fragment;
}

impl IntoFragment for Fragment {
    fn into_fragment(self) -> Fragment {
        self
    }
}

impl IntoFragment for String {
    fn into_fragment(self) -> Fragment {
        Fragment(self)
    }
}

impl IntoFragment for &str {
    fn into_fragment(self) -> Fragment {
        Fragment(self.to_owned())
    }
}

impl IntoFragment for &String {
    fn into_fragment(self) -> Fragment {
        Fragment(self.clone())
    }
}

impl IntoFragment for Cow<'_, str> {
    fn into_fragment(self) -> Fragment {
        Fragment(self.into_owned())
    }
}

impl IntoFragment for char {
    fn into_fragment(self) -> Fragment {
        Fragment(self.to_string())
    }
}

impl IntoFragment for Vec<u8> {
    fn into_fragment(self) -> Fragment {
        match String::from_utf8(self) {
            Ok(s) => Fragment(s),
            Err(err) => Fragment::from_bytes(err.as_bytes()),
        }
    }
}

impl IntoFragment for &[u8] {
    fn into_fragment(self) -> Fragment {
        Fragment::from_bytes(self)
    }
}

impl<const N: usize> IntoFragment for [u8; N] {
    fn into_fragment(self) -> Fragment {
        Fragment::from_bytes(&self)
    }
}

impl<T: IntoFragment> IntoFragment for Option<T> {
    fn into_fragment(self) -> Fragment {
        self.map(IntoFragment::into_fragment).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_values() {
        assert_eq!("abc".into_fragment().as_str(), "abc");
        assert_eq!(String::from("abc").into_fragment().as_str(), "abc");
        assert_eq!(Cow::Borrowed("abc").into_fragment().as_str(), "abc");
        assert_eq!('x'.into_fragment().as_str(), "x");
    }

    #[test]
    fn test_bytes_are_decoded() {
        assert_eq!(b"hi".to_vec().into_fragment().as_str(), "hi");
        assert_eq!("héllo".as_bytes().into_fragment().as_str(), "héllo");
        // lone continuation byte
        assert_eq!(vec![b'a', 0x80, b'b'].into_fragment().as_str(), "a\u{FFFD}b");
    }

    #[test]
    fn test_missing_values_are_empty() {
        let none: Option<String> = None;
        assert!(none.into_fragment().is_empty());
        assert_eq!(Some("x").into_fragment().as_str(), "x");
    }

    #[test]
    fn test_display_values() {
        assert_eq!(Fragment::display(42).as_str(), "42");
        assert_eq!(Fragment::display(1.5).to_string(), "1.5");
    }
}
