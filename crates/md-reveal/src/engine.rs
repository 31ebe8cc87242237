//! The synchronous core of a stream: buffer, scheduler and session
//! bookkeeping, without any notion of time or tasks.
//!
//! [`crate::spawn`] wraps this in a tokio task. Driving it directly is
//! useful when the host already owns a loop, and in tests.

use std::fmt;
use std::time::Duration;

use crate::buffer::AccumulationBuffer;
use crate::config::StreamConfig;
use crate::error::Error;
use crate::fragment::Fragment;
use crate::observer::StreamObserver;
use crate::reveal::{DrainState, RevealMode, RevealScheduler};
use crate::sanitize::{sanitize_with, SanitizeOptions};

/// Identifies one `start` of a stream. Fragments and completions from a
/// superseded session are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the most recent session stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session has run since the last reset
    #[default]
    Idle,
    Streaming(SessionId),
    Ended(SessionId),
    Stopped(SessionId),
    Failed(SessionId, Error),
}

impl SessionStatus {
    pub fn is_streaming(&self) -> bool {
        matches!(self, SessionStatus::Streaming(_))
    }

    pub fn session(&self) -> Option<SessionId> {
        match self {
            SessionStatus::Idle => None,
            SessionStatus::Streaming(id)
            | SessionStatus::Ended(id)
            | SessionStatus::Stopped(id)
            | SessionStatus::Failed(id, _) => Some(*id),
        }
    }
}

pub struct StreamEngine<O> {
    buffer: AccumulationBuffer,
    scheduler: RevealScheduler,
    sanitize: SanitizeOptions,
    seed: String,
    observer: O,
    status: SessionStatus,
    next_session: u64,

    /// Bumped on every observable change
    revision: u64,
}

impl<O: StreamObserver> StreamEngine<O> {
    pub fn new(config: StreamConfig, observer: O) -> Self {
        let StreamConfig {
            seed,
            mode,
            delay,
            sanitize,
            ..
        } = config;

        let mut scheduler = RevealScheduler::new(mode, delay);
        scheduler.reset(&seed);

        StreamEngine {
            buffer: AccumulationBuffer::with_seed(&seed),
            scheduler,
            sanitize,
            seed,
            observer,
            status: SessionStatus::Idle,
            next_session: 0,
            revision: 0,
        }
    }

    /// Everything received since the last reset.
    pub fn value(&self) -> &str {
        self.buffer.value()
    }

    /// The paced prefix of [`Self::value`] shown so far.
    pub fn visible(&self) -> &str {
        self.scheduler.visible()
    }

    /// The visible value repaired for a markdown parser.
    pub fn sanitized(&self) -> String {
        sanitize_with(self.visible(), &self.sanitize)
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn mode(&self) -> RevealMode {
        self.scheduler.mode()
    }

    pub fn delay(&self) -> Duration {
        self.scheduler.delay()
    }

    pub fn drain_state(&self) -> DrainState {
        self.scheduler.state()
    }

    pub fn is_draining(&self) -> bool {
        self.scheduler.is_draining()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn is_live(&self, id: SessionId) -> bool {
        self.status == SessionStatus::Streaming(id)
    }

    /// Start a new session from the seed. Any live session is cancelled
    /// first.
    pub fn begin_session(&mut self) -> SessionId {
        if let SessionStatus::Streaming(old) = self.status {
            tracing::debug!("session {} superseded", old);
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);

        self.buffer.reset(&self.seed);
        self.scheduler.reset(&self.seed);
        self.status = SessionStatus::Streaming(id);
        self.bump();

        tracing::debug!("session {} started", id);
        id
    }

    /// Consume one fragment for `id`. Returns `false` if the session is no
    /// longer live and the fragment was dropped.
    pub fn accept(&mut self, id: SessionId, fragment: Fragment) -> bool {
        if !self.is_live(id) {
            tracing::trace!("dropping fragment for inactive session {}", id);
            return false;
        }
        self.ingest(fragment.as_str());
        true
    }

    /// Append a fragment outside of any source, as if it had just been
    /// received.
    pub fn append(&mut self, fragment: Fragment) {
        self.ingest(fragment.as_str());
    }

    fn ingest(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        tracing::trace!("fragment of {} bytes", fragment.len());

        self.observer.on_chunk(fragment);
        self.buffer.append(fragment);
        self.scheduler.enqueue(fragment);
        self.bump();
    }

    /// The source for `id` is exhausted. Pending tokens keep draining.
    pub fn finish(&mut self, id: SessionId) {
        if !self.is_live(id) {
            return;
        }
        tracing::debug!("session {} ended", id);
        self.status = SessionStatus::Ended(id);
        self.bump();
        self.observer.on_end();
    }

    /// The source for `id` failed. Errors from a session that was already
    /// stopped or superseded are swallowed.
    pub fn fail(&mut self, id: SessionId, error: Error) {
        if !self.is_live(id) {
            tracing::debug!("ignoring error from inactive session {}: {}", id, error);
            return;
        }
        tracing::error!("session {} failed: {}", id, error);
        self.status = SessionStatus::Failed(id, error.clone());
        self.bump();
        self.observer.on_error(&error);
    }

    /// A source could not be turned into a session. Nothing else changes.
    pub fn reject(&mut self, error: Error) {
        tracing::error!("cannot start stream: {}", error);
        self.observer.on_error(&error);
    }

    /// Cancel the live session, if any, and freeze the visible value.
    /// Text that was received but never revealed is discarded, so later
    /// appends continue right after what is visible. Safe to call
    /// repeatedly.
    pub fn stop(&mut self) {
        if let SessionStatus::Streaming(id) = self.status {
            tracing::debug!("session {} stopped", id);
            self.status = SessionStatus::Stopped(id);
            self.bump();
        }
        if self.scheduler.is_draining() {
            self.scheduler.stop();
            self.buffer.truncate(self.scheduler.visible().len());
            self.bump();
        }
    }

    /// Stop, then return to the seed.
    pub fn reset(&mut self) {
        self.stop();
        tracing::debug!("reset to seed ({} bytes)", self.seed.len());
        self.buffer.reset(&self.seed);
        self.scheduler.reset(&self.seed);
        self.status = SessionStatus::Idle;
        self.bump();
    }

    /// Replace the seed and reset to it.
    pub fn set_seed(&mut self, seed: impl Into<String>) {
        self.seed = seed.into();
        self.reset();
    }

    /// Stop, then show `text` directly, with no pacing.
    pub fn set_content(&mut self, text: &str) {
        self.stop();
        tracing::debug!("content replaced ({} bytes)", text.len());
        self.buffer.reset(text);
        self.scheduler.reset(text);
        self.bump();
    }

    pub fn set_mode(&mut self, mode: RevealMode) {
        if self.scheduler.mode() == mode {
            return;
        }
        tracing::debug!("reveal mode {} -> {}", self.scheduler.mode(), mode);
        self.scheduler.set_mode(mode);
        self.bump();
    }

    pub fn set_delay(&mut self, delay: Duration) {
        tracing::debug!("reveal delay {:?} -> {:?}", self.scheduler.delay(), delay);
        if self.scheduler.set_delay(delay) {
            self.bump();
        }
    }

    /// Reveal one pending token. Returns `false` when idle.
    pub fn tick(&mut self) -> bool {
        let Some(token) = self.scheduler.tick() else {
            return false;
        };
        tracing::trace!("revealed {:?}", token);
        self.bump();
        true
    }
}
