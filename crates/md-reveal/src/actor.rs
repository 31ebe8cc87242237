//! The engine as a tokio task.
//!
//! [`spawn`] moves a [`StreamEngine`] onto its own task and returns a
//! [`StreamHandle`]. The task runs one cooperative loop that waits on
//! three things: control commands (always served first), the next
//! fragment of the live session, and the drain timer while tokens are
//! pending. Every observable change is published as a [`Snapshot`].

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::StreamConfig;
use crate::engine::{SessionId, SessionStatus, StreamEngine};
use crate::error::{Error, Result};
use crate::fragment::{Fragment, IntoFragment};
use crate::observer::StreamObserver;
use crate::parse::MarkdownParser;
use crate::reveal::{delay_from_millis, RevealMode};
use crate::source::{FragmentStream, Source};

/// What a renderer needs after each change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Text revealed so far
    pub visible: String,
    /// `visible` with incomplete markup repaired
    pub sanitized: String,
    pub status: SessionStatus,
    /// Tokens are still waiting to be revealed
    pub draining: bool,
    pub mode: RevealMode,
    pub revision: u64,
}

impl Snapshot {
    /// Nothing more will appear without a new command.
    pub fn is_settled(&self) -> bool {
        !self.draining && !self.status.is_streaming()
    }

    /// Hand the sanitized text to a markdown parser.
    pub fn parse_with<P: MarkdownParser>(&self, parser: &P) -> P::Tree {
        parser.parse(&self.sanitized)
    }
}

enum Command {
    Start(Option<Source>),
    Append(Fragment),
    Stop,
    Reset,
    SetContent(String),
    SetSeed(String),
    SetMode(RevealMode),
    SetDelay(Duration),
    Shutdown,
}

/// Cheap, cloneable control surface of a spawned engine.
///
/// Control calls never block; they queue a command that the engine task
/// serves before consuming another fragment. After the task is gone every
/// call returns [`Error::Closed`].
#[derive(Clone)]
pub struct StreamHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl StreamHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.command_tx.send(command).map_err(|_| Error::Closed)
    }

    /// Start a session from `source`, or from the source given to
    /// [`spawn`] when `None`. A live session is superseded.
    pub fn start(&self, source: Option<Source>) -> Result<()> {
        self.send(Command::Start(source))
    }

    /// Feed a fragment directly, without a source.
    pub fn append(&self, fragment: impl IntoFragment) -> Result<()> {
        self.send(Command::Append(fragment.into_fragment()))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    pub fn set_content(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::SetContent(text.into()))
    }

    pub fn set_seed(&self, seed: impl Into<String>) -> Result<()> {
        self.send(Command::SetSeed(seed.into()))
    }

    pub fn set_mode(&self, mode: RevealMode) -> Result<()> {
        self.send(Command::SetMode(mode))
    }

    pub fn set_delay(&self, delay: Duration) -> Result<()> {
        self.send(Command::SetDelay(delay))
    }

    /// Like [`Self::set_delay`], for values from untrusted input. Negative
    /// values fall back to the default delay.
    pub fn set_delay_millis(&self, ms: i64) -> Result<()> {
        self.set_delay(delay_from_millis(ms))
    }

    /// Stop the engine task. Pending tokens are dropped.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// The latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait for the first snapshot, current one included, that satisfies
    /// `pred`.
    pub async fn wait_for(&self, pred: impl FnMut(&Snapshot) -> bool) -> Result<Snapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx.wait_for(pred).await.map_err(|_| Error::Closed)?;
        Ok(snapshot.clone())
    }
}

struct Session {
    id: SessionId,
    fragments: FragmentStream,
}

struct StreamActor<O> {
    engine: StreamEngine<O>,
    default_source: Option<Source>,
    session: Option<Session>,
    auto_start: bool,

    /// When the next token is due, armed only while draining
    next_tick: Option<Instant>,

    command_rx: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<Snapshot>,
}

/// Spawn an engine task on the current tokio runtime.
///
/// `source` is what [`StreamHandle::start`] falls back to; with
/// `config.auto_start` it is started right away.
pub fn spawn<O>(
    config: StreamConfig,
    observer: O,
    source: Option<Source>,
) -> (StreamHandle, JoinHandle<()>)
where
    O: StreamObserver + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let auto_start = config.auto_start;
    let engine = StreamEngine::new(config, observer);
    let (snapshot_tx, snapshot_rx) = watch::channel(snapshot_of(&engine));

    let actor = StreamActor {
        engine,
        default_source: source,
        session: None,
        auto_start,
        next_tick: None,
        command_rx,
        snapshot_tx,
    };

    let task = tokio::spawn(actor.run());
    let handle = StreamHandle {
        command_tx,
        snapshot_rx,
    };
    (handle, task)
}

fn snapshot_of<O: StreamObserver>(engine: &StreamEngine<O>) -> Snapshot {
    Snapshot {
        visible: engine.visible().to_string(),
        sanitized: engine.sanitized(),
        status: engine.status().clone(),
        draining: engine.is_draining(),
        mode: engine.mode(),
        revision: engine.revision(),
    }
}

async fn next_fragment(session: &mut Option<Session>) -> Option<Result<Fragment>> {
    match session {
        Some(session) => session.fragments.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<O: StreamObserver> StreamActor<O> {
    async fn run(mut self) {
        if self.auto_start && self.default_source.is_some() {
            self.start(None);
            self.publish();
        }

        loop {
            self.arm_timer();

            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            tracing::debug!("stream engine shutting down");
                            return;
                        }
                        Some(cmd) => self.handle(cmd),
                    }
                }

                item = next_fragment(&mut self.session) => {
                    self.on_fragment(item);
                }

                _ = sleep_until(self.next_tick) => {
                    self.next_tick = None;
                    self.engine.tick();
                }
            }

            self.publish();
        }
    }

    fn arm_timer(&mut self) {
        if !self.engine.is_draining() {
            self.next_tick = None;
        } else if self.next_tick.is_none() {
            self.next_tick = Some(Instant::now() + self.engine.delay());
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start(source) => self.start(source),
            Command::Append(fragment) => self.engine.append(fragment),
            Command::Stop => {
                self.session = None;
                self.engine.stop();
            }
            Command::Reset => {
                self.session = None;
                self.engine.reset();
            }
            Command::SetContent(text) => {
                self.session = None;
                self.engine.set_content(&text);
            }
            Command::SetSeed(seed) => {
                self.session = None;
                self.engine.set_seed(seed);
            }
            Command::SetMode(mode) => self.engine.set_mode(mode),
            Command::SetDelay(delay) => {
                self.engine.set_delay(delay);
                // re-arm with the new pace
                self.next_tick = None;
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self, source: Option<Source>) {
        let source = match source {
            Some(source) => Some(source),
            None => match self.default_source.as_ref().and_then(Source::reusable) {
                Some(again) => Some(again),
                None => self.default_source.take(),
            },
        };

        let Some(source) = source else {
            self.engine
                .reject(Error::UnsupportedSource("no source to start".to_string()));
            return;
        };

        match source.into_stream() {
            Ok(fragments) => {
                let id = self.engine.begin_session();
                self.session = Some(Session { id, fragments });
            }
            Err(err) => self.engine.reject(err),
        }
    }

    fn on_fragment(&mut self, item: Option<Result<Fragment>>) {
        let Some(id) = self.session.as_ref().map(|s| s.id) else {
            return;
        };

        match item {
            Some(Ok(fragment)) => {
                self.engine.accept(id, fragment);
            }
            Some(Err(err)) => {
                self.session = None;
                self.engine.fail(id, err);
            }
            None => {
                self.session = None;
                self.engine.finish(id);
            }
        }
    }

    fn publish(&mut self) {
        let revision = self.engine.revision();
        if self.snapshot_tx.borrow().revision == revision {
            return;
        }
        self.snapshot_tx.send_replace(snapshot_of(&self.engine));
    }
}
