//! Paced reveal of accumulated text.
//!
//! The scheduler owns the visible value and a queue of tokens still
//! waiting to be shown. It never owns a timer: whoever drives it calls
//! [`RevealScheduler::tick`] once per `delay` while it is draining. That
//! keeps the transitions pure and lets tests step through a reveal by hand.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

/// Delay between two revealed tokens when none is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(28);

/// Granularity at which new text becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum RevealMode {
    /// Every fragment shows up as soon as it arrives
    #[default]
    Chunk,
    /// Runs of whitespace and runs of non-whitespace, one per tick
    Word,
    /// One grapheme cluster per tick
    Character,
}

impl RevealMode {
    pub const ALL: [RevealMode; 3] = [RevealMode::Chunk, RevealMode::Word, RevealMode::Character];

    pub fn name(&self) -> &'static str {
        match self {
            RevealMode::Chunk => "chunk",
            RevealMode::Word => "word",
            RevealMode::Character => "character",
        }
    }

    /// Split a fragment into reveal tokens. Concatenating the tokens
    /// always gives back the fragment.
    pub fn tokenize<'a>(&self, fragment: &'a str) -> Vec<&'a str> {
        match self {
            RevealMode::Chunk => vec![fragment],
            RevealMode::Word => split_words(fragment),
            RevealMode::Character => fragment.graphemes(true).collect(),
        }
    }
}

impl fmt::Display for RevealMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reveal mode: {0}")]
pub struct ParseRevealModeError(String);

impl FromStr for RevealMode {
    type Err = ParseRevealModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunk" => Ok(RevealMode::Chunk),
            "word" => Ok(RevealMode::Word),
            "character" | "char" => Ok(RevealMode::Character),
            _ => Err(ParseRevealModeError(s.to_string())),
        }
    }
}

/// Runs of whitespace and runs of non-whitespace, both kept.
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Convert a delay in milliseconds from an untrusted source. Negative
/// values fall back to [`DEFAULT_DELAY`].
pub fn delay_from_millis(ms: i64) -> Duration {
    match u64::try_from(ms) {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            tracing::warn!("invalid reveal delay {}ms, using {:?}", ms, DEFAULT_DELAY);
            DEFAULT_DELAY
        }
    }
}

/// Whether the scheduler needs ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// Nothing pending, no timer needed
    Idle,
    /// Tokens pending, tick every `delay`
    Draining,
}

/// Turns appended fragments into a trickle of visible text.
#[derive(Debug, Clone)]
pub struct RevealScheduler {
    mode: RevealMode,
    delay: Duration,

    /// Tokens received but not shown yet, oldest first
    pending: VecDeque<String>,

    /// Everything revealed so far
    visible: String,
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(RevealMode::default(), DEFAULT_DELAY)
    }
}

impl RevealScheduler {
    pub fn new(mode: RevealMode, delay: Duration) -> Self {
        Self {
            mode,
            delay,
            pending: VecDeque::new(),
            visible: String::new(),
        }
    }

    pub fn mode(&self) -> RevealMode {
        self.mode
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn visible(&self) -> &str {
        &self.visible
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn state(&self) -> DrainState {
        if self.pending.is_empty() {
            DrainState::Idle
        } else {
            DrainState::Draining
        }
    }

    pub fn is_draining(&self) -> bool {
        self.state() == DrainState::Draining
    }

    /// Switch reveal granularity.
    ///
    /// Switching to [`RevealMode::Chunk`] shows everything pending right
    /// away. Other modes only affect fragments enqueued afterwards.
    /// Returns `true` if the visible value changed.
    pub fn set_mode(&mut self, mode: RevealMode) -> bool {
        self.mode = mode;
        if mode == RevealMode::Chunk {
            return self.flush();
        }
        false
    }

    /// Change the pace. A zero delay reveals synchronously, so anything
    /// still pending is shown right away. Returns `true` if the visible
    /// value changed.
    pub fn set_delay(&mut self, delay: Duration) -> bool {
        self.delay = delay;
        if delay.is_zero() {
            return self.flush();
        }
        false
    }

    /// Queue a fragment for reveal. Returns `true` if the visible value
    /// changed immediately.
    pub fn enqueue(&mut self, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }

        if self.mode == RevealMode::Chunk {
            // keep order with anything a previous mode left behind
            self.flush();
            self.visible.push_str(fragment);
            return true;
        }

        self.pending
            .extend(self.mode.tokenize(fragment).into_iter().map(str::to_owned));

        if self.delay.is_zero() {
            return self.flush();
        }
        false
    }

    /// Reveal exactly one pending token. Returns the revealed token, or
    /// `None` when idle.
    pub fn tick(&mut self) -> Option<&str> {
        let token = self.pending.pop_front()?;
        let start = self.visible.len();
        self.visible.push_str(&token);
        Some(&self.visible[start..])
    }

    /// Reveal everything pending at once. Returns `true` if anything was
    /// pending.
    pub fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for token in self.pending.drain(..) {
            self.visible.push_str(&token);
        }
        true
    }

    /// Drop pending tokens and freeze what is visible.
    pub fn stop(&mut self) {
        self.pending.clear();
    }

    /// Drop pending tokens and replace the visible value.
    pub fn reset(&mut self, visible: &str) {
        self.pending.clear();
        self.visible.clear();
        self.visible.push_str(visible);
    }
}
