//! The synthesis worker pool.
//!
//! N tasks share one job channel through `Arc<tokio::sync::Mutex<mpsc::Receiver<Segment>>>`,
//! the same pattern `fetcher_task` uses elsewhere in this codebase for
//! fanning multiple consumers out over a single mpsc channel. Each worker
//! synthesizes a segment, transcodes it if the engine didn't already produce
//! the pipeline's output format, and forwards the outcome to the reorder
//! consumer. A failure here is logged and never surfaces to the caller —
//! only the `id` escapes, as a `WorkerOutcome::Failed`, so the reorder
//! consumer can unblock without ever seeing the failure's cause.

use std::sync::Arc;

use cadence_core::token::StreamToken;
use cadence_core::types::{AudioSpec, Segment, SynthResult};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::engine::Engine;
use crate::transcode::Transcoder;

/// What a worker hands back to the reorder consumer for one segment id.
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Delivered(SynthResult),
    Failed { id: u64 },
}

pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<Segment>,
    tx: mpsc::Sender<WorkerOutcome>,
    engine: Arc<dyn Engine>,
    transcoder: Arc<dyn Transcoder>,
    output_spec: AudioSpec,
    token: StreamToken,
) {
    let shared_rx = Arc::new(Mutex::new(rx));
    for worker_id in 0..count.max(1) {
        let shared_rx = shared_rx.clone();
        let tx = tx.clone();
        let engine = engine.clone();
        let transcoder = transcoder.clone();
        let output_spec = output_spec.clone();
        let token = token.clone();
        tokio::spawn(async move {
            worker_loop(worker_id, shared_rx, tx, engine, transcoder, output_spec, token).await;
        });
    }
}

async fn worker_loop(
    worker_id: usize,
    shared_rx: Arc<Mutex<mpsc::Receiver<Segment>>>,
    tx: mpsc::Sender<WorkerOutcome>,
    engine: Arc<dyn Engine>,
    transcoder: Arc<dyn Transcoder>,
    output_spec: AudioSpec,
    token: StreamToken,
) {
    loop {
        let segment = {
            let mut rx = shared_rx.lock().await;
            rx.recv().await
        };
        let segment = match segment {
            Some(segment) => segment,
            None => break, // segment channel closed
        };

        if token.is_cancelled() {
            break;
        }

        let outcome = synthesize_one(worker_id, &segment, &engine, &transcoder, &output_spec).await;
        if tx.send(outcome).await.is_err() {
            break; // reorder consumer dropped, no one left to hear about it
        }
    }
}

async fn synthesize_one(
    worker_id: usize,
    segment: &Segment,
    engine: &Arc<dyn Engine>,
    transcoder: &Arc<dyn Transcoder>,
    output_spec: &AudioSpec,
) -> WorkerOutcome {
    let chunk = match engine.synth(&segment.text, Some(output_spec)).await {
        Ok(chunk) => chunk,
        Err(e) => {
            error!("worker[{worker_id}]: synthesis failed for segment {}: {e}", segment.id);
            return WorkerOutcome::Failed { id: segment.id };
        }
    };

    let chunk = if chunk.spec == *output_spec {
        chunk
    } else {
        match transcoder.convert(chunk, output_spec).await {
            Ok(chunk) => chunk,
            Err(e) => {
                error!("worker[{worker_id}]: transcode failed for segment {}: {e}", segment.id);
                return WorkerOutcome::Failed { id: segment.id };
            }
        }
    };

    debug!("worker[{worker_id}]: segment {} ready ({} bytes)", segment.id, chunk.data.len());
    WorkerOutcome::Delivered(SynthResult {
        id: segment.id,
        chunk,
        text: segment.text.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DummyEngine;
    use crate::transcode::FfmpegTranscoder;

    #[tokio::test]
    async fn delivers_matching_segments() {
        let (seg_tx, seg_rx) = mpsc::channel(8);
        let (res_tx, mut res_rx) = mpsc::channel(8);
        let spec = AudioSpec::default_output();
        spawn_workers(
            2,
            seg_rx,
            res_tx,
            Arc::new(DummyEngine::new(spec.clone())),
            Arc::new(FfmpegTranscoder::default()),
            spec,
            StreamToken::new(),
        );

        seg_tx
            .send(Segment { id: 0, text: "hello".into() })
            .await
            .unwrap();
        seg_tx
            .send(Segment { id: 1, text: "world".into() })
            .await
            .unwrap();
        drop(seg_tx);

        let mut delivered = 0;
        while let Some(outcome) = res_rx.recv().await {
            if let WorkerOutcome::Delivered(_) = outcome {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn engine_failure_yields_failed_outcome() {
        struct AlwaysFails;
        #[async_trait::async_trait]
        impl Engine for AlwaysFails {
            async fn synth(&self, _text: &str, _target: Option<&AudioSpec>) -> anyhow::Result<cadence_core::types::AudioChunk> {
                Err(anyhow::anyhow!("boom"))
            }
        }

        let (seg_tx, seg_rx) = mpsc::channel(8);
        let (res_tx, mut res_rx) = mpsc::channel(8);
        let spec = AudioSpec::default_output();
        spawn_workers(
            1,
            seg_rx,
            res_tx,
            Arc::new(AlwaysFails),
            Arc::new(FfmpegTranscoder::default()),
            spec,
            StreamToken::new(),
        );

        seg_tx.send(Segment { id: 0, text: "hello".into() }).await.unwrap();
        drop(seg_tx);

        let outcome = res_rx.recv().await.unwrap();
        assert!(matches!(outcome, WorkerOutcome::Failed { id: 0 }));
    }
}
