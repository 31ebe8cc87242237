/// Errors surfaced by the streaming engine.
///
/// The sanitizer never fails; everything here comes from fragment
/// sources or from talking to an engine task that has gone away.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The source matched none of the shapes the ingestion loop can pull from.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// The source raised while a session was consuming it.
    #[error("source error: {0}")]
    Source(String),

    /// The engine task has shut down.
    #[error("stream engine closed")]
    Closed,
}

impl Error {
    /// Wrap any source-side error so it can travel through a fragment stream.
    pub fn source_failure(err: impl std::error::Error) -> Self {
        Error::Source(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
