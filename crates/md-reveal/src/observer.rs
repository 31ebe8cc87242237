use crate::error::Error;

/// Lifecycle notifications from a stream engine.
///
/// Callbacks run on the engine task between two steps of the ingestion
/// loop, so they must not block. To control the engine from inside a
/// callback, send a command through a cloned
/// [`StreamHandle`](crate::StreamHandle); it takes effect before the next
/// fragment is consumed.
pub trait StreamObserver: Send {
    /// A raw fragment was received, before any pacing.
    fn on_chunk(&mut self, _fragment: &str) {}

    /// The source finished without error.
    fn on_end(&mut self) {}

    /// The source failed, or could not be started.
    fn on_error(&mut self, _error: &Error) {}
}

impl StreamObserver for () {}

type ChunkFn = Box<dyn FnMut(&str) + Send>;
type EndFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(&Error) + Send>;

/// A [`StreamObserver`] assembled from closures.
#[derive(Default)]
pub struct Callbacks {
    on_chunk: Option<ChunkFn>,
    on_end: Option<EndFn>,
    on_error: Option<ErrorFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_chunk = Some(Box::new(f));
        self
    }

    pub fn with_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    pub fn with_error(mut self, f: impl FnMut(&Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl StreamObserver for Callbacks {
    fn on_chunk(&mut self, fragment: &str) {
        if let Some(f) = self.on_chunk.as_mut() {
            f(fragment);
        }
    }

    fn on_end(&mut self) {
        if let Some(f) = self.on_end.as_mut() {
            f();
        }
    }

    fn on_error(&mut self, error: &Error) {
        if let Some(f) = self.on_error.as_mut() {
            f(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callbacks_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let mut callbacks = Callbacks::new()
            .with_chunk(move |s| a.lock().unwrap().push(format!("chunk {s}")))
            .with_end(move || b.lock().unwrap().push("end".to_string()))
            .with_error(move |e| c.lock().unwrap().push(format!("error {e}")));

        callbacks.on_chunk("hi");
        callbacks.on_end();
        callbacks.on_error(&Error::Closed);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["chunk hi", "end", "error stream engine closed"]
        );
    }

    #[test]
    fn test_missing_callbacks_are_noops() {
        let mut callbacks = Callbacks::new();
        callbacks.on_chunk("ignored");
        callbacks.on_end();
        callbacks.on_error(&Error::Closed);
    }
}
