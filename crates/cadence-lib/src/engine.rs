//! The synthesis engine contract and the engines that ship with this crate.
//!
//! `Engine` is a trait, not a concrete struct, so any synthesis backend can
//! plug in behind it — `async-trait` marks the boundary as async.

use async_trait::async_trait;
use cadence_core::types::AudioChunk;
use cadence_core::types::AudioSpec;

/// Converts text to audio. Implementations may call out to a network
/// service, a local model, or — for `DummyEngine` — nothing at all.
///
/// `target` is a hint: an engine that can synthesize directly in the
/// requested format may do so, but is not required to. The worker pool
/// transcodes the result if it doesn't already match the pipeline's output
/// spec.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn synth(&self, text: &str, target: Option<&AudioSpec>) -> anyhow::Result<AudioChunk>;
}

/// Deterministic placeholder engine: no real synthesis, just a reproducible
/// byte pattern derived from the input text, so the pipeline is testable
/// without a real backend.
pub struct DummyEngine {
    spec: AudioSpec,
}

impl DummyEngine {
    pub fn new(spec: AudioSpec) -> Self {
        Self { spec }
    }
}

impl Default for DummyEngine {
    fn default() -> Self {
        Self {
            spec: AudioSpec::default_output(),
        }
    }
}

#[async_trait]
impl Engine for DummyEngine {
    async fn synth(&self, text: &str, _target: Option<&AudioSpec>) -> anyhow::Result<AudioChunk> {
        let pattern = format!("DUMMY_AUDIO[{text}]");
        let repeats = text.len() / pattern.len().max(1) + 2;
        let mut data = pattern.repeat(repeats).into_bytes();
        data.truncate((text.len() * 16).max(16));
        Ok(AudioChunk::new(data, self.spec.clone()))
    }
}

/// Wraps a blocking synthesis closure, run on tokio's blocking thread pool.
pub struct CallableEngine<F> {
    f: std::sync::Arc<F>,
    spec: AudioSpec,
}

impl<F> CallableEngine<F>
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    pub fn new(f: F, spec: AudioSpec) -> Self {
        Self {
            f: std::sync::Arc::new(f),
            spec,
        }
    }
}

#[async_trait]
impl<F> Engine for CallableEngine<F>
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    async fn synth(&self, text: &str, _target: Option<&AudioSpec>) -> anyhow::Result<AudioChunk> {
        let f = self.f.clone();
        let text = text.to_string();
        let data = tokio::task::spawn_blocking(move || f(&text)).await?;
        Ok(AudioChunk::new(data, self.spec.clone()))
    }
}
