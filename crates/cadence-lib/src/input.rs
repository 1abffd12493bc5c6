//! Input dispatch for [`crate::pipeline::Pipeline::stream`].
//!
//! A closed enum rather than runtime type tests — the segmenter matches on
//! it once and drives each variant with the loop that variant needs (a
//! single pass, a synchronous iterator, or an async stream with per-fragment
//! timeout handling).

use std::pin::Pin;

use futures::Stream;

/// The three shapes of incoming text the segmenter accepts.
pub enum Input {
    /// One complete string, fed to the segmenter in a single pass.
    Text(String),
    /// A finite sequence of fragments, fed one at a time with no timeout
    /// between them (the producer is synchronous, so there's nothing to
    /// wait on).
    Iter(Box<dyn Iterator<Item = String> + Send>),
    /// An async sequence of fragments arriving at unpredictable intervals;
    /// the segmenter applies its idle-flush timeout between fragments.
    Stream(Pin<Box<dyn Stream<Item = String> + Send>>),
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text)
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string())
    }
}

impl Input {
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        Input::Iter(Box::new(iter.into_iter()))
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
    {
        Input::Stream(Box::pin(stream))
    }
}
