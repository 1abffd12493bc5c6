//! The `Pipeline` orchestrator: wires a `Segmenter`, a synthesis worker pool,
//! and a reorder consumer around two bounded channels, and exposes the
//! result as a single lazy stream.
//!
//! The engine is built at most once, lazily, behind a `tokio::sync::OnceCell`
//! — a `OnceCell` rather than a sync `OnceLock` because building a model
//! engine may itself be async.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cadence_core::token::StreamToken;
use cadence_core::types::AudioChunk;
use futures::Stream;
use tokio::sync::{mpsc, OnceCell};

use crate::engine::Engine;
use crate::error::PipelineError;
use crate::input::Input;
use crate::registry::GLOBAL_REGISTRY;
use crate::reorder::reorder_consumer;
use crate::segmenter::{PreHook, Segmenter, SegmenterConfig};
use crate::transcode::{FfmpegTranscoder, Transcoder};
use crate::worker::spawn_workers;

/// Channel capacity between pipeline stages. Bounded to apply backpressure
/// from slow synthesis back to the segmenter, sized up from a two-deep audio
/// prefetch to a segment/result pipeline.
const CHANNEL_CAPACITY: usize = 64;

/// How a `Pipeline` obtains its `Engine`.
///
/// An enum rather than two optional fields: Rust's type system rules out
/// "both given" and "neither given" by construction — there is nothing left
/// to validate at runtime for this configuration error.
pub enum EngineChoice {
    Direct(Arc<dyn Engine>),
    Model { name: String, kwargs: HashMap<String, String> },
}

#[derive(Clone)]
pub struct PipelineConfig {
    pub output_spec: cadence_core::types::AudioSpec,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub timeout_ms: u64,
    pub worker_count: usize,
    pub pre_hook: Option<PreHook>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_spec: cadence_core::types::AudioSpec::default_output(),
            min_tokens: 10,
            max_tokens: 50,
            timeout_ms: 800,
            worker_count: 1,
            pre_hook: None,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    choice: Mutex<Option<EngineChoice>>,
    transcoder: Arc<dyn Transcoder>,
    engine_cell: OnceCell<Arc<dyn Engine>>,
    token: Mutex<Option<StreamToken>>,
}

impl Pipeline {
    /// Builds a pipeline. Fails immediately if `choice` names a model that
    /// isn't registered — every other configuration error this spec defines
    /// is ruled out by `EngineChoice`'s shape.
    pub fn new(choice: EngineChoice, config: PipelineConfig) -> Result<Self, PipelineError> {
        if let EngineChoice::Model { name, .. } = &choice {
            if !GLOBAL_REGISTRY.contains(name) {
                return Err(PipelineError::UnknownModel(name.clone()));
            }
        }
        Ok(Self {
            config,
            choice: Mutex::new(Some(choice)),
            transcoder: Arc::new(FfmpegTranscoder::default()),
            engine_cell: OnceCell::new(),
            token: Mutex::new(None),
        })
    }

    /// Builds a pipeline with a custom transcoder, for callers who don't
    /// want to depend on the system `ffmpeg` binary.
    pub fn with_transcoder(
        choice: EngineChoice,
        config: PipelineConfig,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new(choice, config)?;
        pipeline.transcoder = transcoder;
        Ok(pipeline)
    }

    /// Cancels the in-flight `stream()` call, if any. Idempotent; a no-op if
    /// nothing is streaming.
    pub fn cancel(&self) {
        if let Some(token) = self.token.lock().expect("pipeline token mutex poisoned").as_ref() {
            token.cancel();
        }
    }

    async fn get_or_init_engine(&self) -> Result<Arc<dyn Engine>, PipelineError> {
        let engine = self
            .engine_cell
            .get_or_try_init(|| async move {
                let choice = self
                    .choice
                    .lock()
                    .expect("pipeline engine-choice mutex poisoned")
                    .take()
                    .expect("engine already constructed");
                match choice {
                    EngineChoice::Direct(engine) => Ok(engine),
                    EngineChoice::Model { name, kwargs } => GLOBAL_REGISTRY
                        .build(&name, kwargs.clone())
                        .await
                        .map_err(|source| PipelineError::EngineConstruction { model: name, source }),
                }
            })
            .await?;
        Ok(engine.clone())
    }

    /// Streams `input` through the segmenter, worker pool, and reorder
    /// consumer, returning a lazy stream of `(AudioChunk, text)` pairs.
    pub async fn stream(
        &self,
        input: impl Into<Input>,
    ) -> Result<impl Stream<Item = (AudioChunk, String)> + '_, PipelineError> {
        let token = StreamToken::new();
        *self.token.lock().expect("pipeline token mutex poisoned") = Some(token.clone());

        let engine = self.get_or_init_engine().await?;

        let (seg_tx, seg_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (res_tx, res_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let segmenter_config = SegmenterConfig {
            min_tokens: self.config.min_tokens,
            max_tokens: self.config.max_tokens,
            timeout_ms: self.config.timeout_ms,
            pre_hook: self.config.pre_hook.clone(),
        };
        let segmenter_token = token.clone();
        let input = input.into();
        tokio::spawn(async move {
            Segmenter::new(seg_tx, segmenter_config, segmenter_token)
                .run(input)
                .await;
        });

        spawn_workers(
            self.config.worker_count,
            seg_rx,
            res_tx,
            engine,
            self.transcoder.clone(),
            self.config.output_spec.clone(),
            token.clone(),
        );

        Ok(reorder_consumer(res_rx, token))
    }
}
