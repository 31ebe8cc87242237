//! Streaming markdown reconciliation for LLM output.
//!
//! Text arrives as fragments, is accumulated, revealed at a configurable
//! pace, and repaired on every change so a regular markdown parser can
//! render the partial document without dangling syntax.

mod actor;
mod buffer;
mod config;
mod engine;
mod error;
mod fragment;
mod observer;
mod parse;
mod reveal;
pub mod sanitize;
mod source;

pub use actor::{spawn, Snapshot, StreamHandle};
pub use buffer::AccumulationBuffer;
pub use config::StreamConfig;
pub use engine::{SessionId, SessionStatus, StreamEngine};
pub use error::{Error, Result};
pub use fragment::{Fragment, IntoFragment};
pub use observer::{Callbacks, StreamObserver};
pub use parse::MarkdownParser;
pub use reveal::{
    delay_from_millis, DrainState, ParseRevealModeError, RevealMode, RevealScheduler,
    DEFAULT_DELAY,
};
pub use sanitize::{sanitize, sanitize_with, SanitizeOptions, INCOMPLETE_LINK_URL};
pub use source::{FragmentReader, FragmentStream, ReadResult, Source};
