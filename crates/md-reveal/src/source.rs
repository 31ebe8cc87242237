//! Shapes of fragment producers a session can consume.
//!
//! Every shape is normalized into a single [`FragmentStream`] before a
//! session starts, so the ingestion loop only ever pulls from one kind of
//! thing.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::fragment::{Fragment, IntoFragment};

/// The normalized form of every source.
pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

/// One pull from a [`FragmentReader`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadResult {
    pub done: bool,
    pub value: Option<Fragment>,
}

impl ReadResult {
    pub fn value(value: impl IntoFragment) -> Self {
        ReadResult {
            done: false,
            value: Some(value.into_fragment()),
        }
    }

    pub fn done() -> Self {
        ReadResult {
            done: true,
            value: None,
        }
    }
}

/// A pull-based producer with an explicit lock, released once the
/// session is done with it for any reason.
pub trait FragmentReader: Send {
    fn read(&mut self) -> BoxFuture<'_, Result<ReadResult>>;

    fn release_lock(&mut self) {}
}

type SourceFactory = Arc<dyn Fn() -> Source + Send + Sync>;

/// Something a session can pull fragments from.
pub enum Source {
    /// An async sequence of fragments
    Stream(FragmentStream),
    /// Produces the real source when a session starts. Can be invoked
    /// again for every restart.
    Factory(SourceFactory),
    /// A reader with a `read`/`release_lock` protocol
    Reader(Box<dyn FragmentReader>),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stream(_) => f.write_str("Source::Stream"),
            Source::Factory(_) => f.write_str("Source::Factory"),
            Source::Reader(_) => f.write_str("Source::Reader"),
        }
    }
}

impl Source {
    /// A finite sequence of fragments, yielded in order.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: IntoFragment,
    {
        Source::Stream(stream::iter(items).map(|item| Ok(item.into_fragment())).boxed())
    }

    /// An infallible async stream of fragment-like items.
    pub fn stream<S>(items: S) -> Self
    where
        S: Stream + Send + 'static,
        S::Item: IntoFragment,
    {
        Source::Stream(items.map(|item| Ok(item.into_fragment())).boxed())
    }

    /// A fallible async stream. The first error fails the session.
    pub fn try_stream<S, T, E>(items: S) -> Self
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        T: IntoFragment,
        E: fmt::Display,
    {
        Source::Stream(
            items
                .map(|item| match item {
                    Ok(value) => Ok(value.into_fragment()),
                    Err(err) => Err(Error::Source(err.to_string())),
                })
                .boxed(),
        )
    }

    pub fn factory(factory: impl Fn() -> Source + Send + Sync + 'static) -> Self {
        Source::Factory(Arc::new(factory))
    }

    pub fn reader(reader: impl FragmentReader + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// A copy usable for another session, if this shape allows one.
    pub(crate) fn reusable(&self) -> Option<Source> {
        match self {
            Source::Factory(factory) => Some(Source::Factory(Arc::clone(factory))),
            _ => None,
        }
    }

    /// Resolve this source into the stream a session consumes.
    ///
    /// Factories are invoked once. A factory that hands back another
    /// factory is rejected.
    pub fn into_stream(self) -> Result<FragmentStream> {
        match self {
            Source::Factory(factory) => match factory() {
                Source::Factory(_) => Err(Error::UnsupportedSource(
                    "factory produced another factory".to_string(),
                )),
                resolved => resolved.into_stream(),
            },
            Source::Stream(fragments) => Ok(fragments),
            Source::Reader(reader) => Ok(reader_stream(reader)),
        }
    }
}

/// Releases the reader lock when dropped, whether the session finished,
/// failed or was cancelled.
struct ReaderGuard(Box<dyn FragmentReader>);

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.release_lock();
    }
}

fn reader_stream(reader: Box<dyn FragmentReader>) -> FragmentStream {
    stream::unfold(Some(ReaderGuard(reader)), |state| async move {
        let Some(mut guard) = state else {
            return None;
        };
        let read = guard.0.read().await;
        match read {
            Ok(ReadResult { done: true, .. }) => None,
            Ok(ReadResult { value, .. }) => Some((Ok(value.unwrap_or_default()), Some(guard))),
            Err(err) => Some((Err(err), None)),
        }
    })
    .boxed()
}

impl<T: IntoFragment + Send + 'static> From<Vec<T>> for Source {
    fn from(items: Vec<T>) -> Self {
        Source::iter(items)
    }
}
