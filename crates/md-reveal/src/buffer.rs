//! Append-only accumulation of received fragments.

/// Holds everything received since the last reset.
///
/// Fragments are stored contiguously with their end offsets recorded, so
/// the full value is always available without re-joining.
#[derive(Debug, Clone, Default)]
pub struct AccumulationBuffer {
    /// Concatenation of all fragments in receipt order
    text: String,

    /// Byte offset where each fragment ends
    ends: Vec<usize>,
}

impl AccumulationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer seeded with one initial fragment.
    pub fn with_seed(seed: &str) -> Self {
        let mut buffer = Self::new();
        buffer.append(seed);
        buffer
    }

    /// Append a fragment. Empty input is a no-op.
    pub fn append(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }

        self.text.push_str(fragment);
        self.ends.push(self.text.len());
    }

    /// The full accumulated value.
    pub fn value(&self) -> &str {
        &self.text
    }

    /// Discard everything, optionally reseeding with an initial fragment.
    pub fn reset(&mut self, seed: &str) {
        self.text.clear();
        self.ends.clear();
        self.append(seed);
    }

    /// Drop everything past byte `len`. A fragment cut in the middle keeps
    /// its head. `len` must fall on a char boundary.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.text.len() {
            return;
        }
        self.text.truncate(len);
        while self.ends.last().is_some_and(|&end| end > len) {
            self.ends.pop();
        }
        if self.ends.last().copied().unwrap_or(0) < len {
            self.ends.push(len);
        }
    }

    /// Number of fragments received since the last reset.
    pub fn fragment_count(&self) -> usize {
        self.ends.len()
    }

    /// Fragments in receipt order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        let starts = std::iter::once(0).chain(self.ends.iter().copied());
        starts
            .zip(self.ends.iter().copied())
            .map(|(start, end)| &self.text[start..end])
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_concatenates() {
        let mut buffer = AccumulationBuffer::new();
        buffer.append("Hel");
        buffer.append("lo ");
        buffer.append("world");

        assert_eq!(buffer.value(), "Hello world");
        assert_eq!(buffer.fragment_count(), 3);
        assert_eq!(
            buffer.fragments().collect::<Vec<_>>(),
            vec!["Hel", "lo ", "world"]
        );
    }

    #[test]
    fn test_empty_append_is_noop() {
        let mut buffer = AccumulationBuffer::new();
        buffer.append("");
        assert!(buffer.is_empty());
        assert_eq!(buffer.fragment_count(), 0);
    }

    #[test]
    fn test_growth_is_monotonic() {
        let chunks = ["# Title\n", "", "some ", "**bold", "** text\n"];
        let mut buffer = AccumulationBuffer::new();
        let mut previous = String::new();

        for chunk in chunks {
            buffer.append(chunk);
            assert!(buffer.value().starts_with(&previous));
            assert_eq!(buffer.len(), previous.len() + chunk.len());
            previous = buffer.value().to_string();
        }
    }

    #[test]
    fn test_reset_with_seed() {
        let mut buffer = AccumulationBuffer::with_seed("seed ");
        buffer.append("more");
        assert_eq!(buffer.value(), "seed more");

        buffer.reset("");
        assert_eq!(buffer.value(), "");
        assert_eq!(buffer.fragment_count(), 0);

        buffer.reset("fresh");
        assert_eq!(buffer.value(), "fresh");
        assert_eq!(buffer.fragment_count(), 1);
    }

    #[test]
    fn test_truncate() {
        let mut buffer = AccumulationBuffer::new();
        buffer.append("one ");
        buffer.append("two ");
        buffer.append("three");

        buffer.truncate(6);
        assert_eq!(buffer.value(), "one tw");
        assert_eq!(buffer.fragments().collect::<Vec<_>>(), vec!["one ", "tw"]);

        buffer.truncate(4);
        assert_eq!(buffer.fragments().collect::<Vec<_>>(), vec!["one "]);

        buffer.truncate(100);
        assert_eq!(buffer.value(), "one ");

        buffer.truncate(0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.fragment_count(), 0);
    }

    #[test]
    fn test_multibyte_fragments() {
        let mut buffer = AccumulationBuffer::new();
        buffer.append("héllo ");
        buffer.append("🌍");
        assert_eq!(
            buffer.fragments().collect::<Vec<_>>(),
            vec!["héllo ", "🌍"]
        );
    }
}
