//! Restores publication order across a worker pool whose completions arrive
//! out of order, and resolves failures without stalling the stream.
//!
//! Resolves spec's open question on gap tolerance with recommendation (a):
//! the consumer advances `next_expected` on *either* a `Delivered` or a
//! `Failed` outcome, but only yields to the caller on `Delivered`. A failed
//! segment's text never reaches the caller (coverage modulo failure), and a
//! single failure can never block every id above it (no indefinite stall) —
//! both hold simultaneously because advancing and yielding are decoupled.

use std::collections::HashMap;

use cadence_core::token::StreamToken;
use cadence_core::types::{AudioChunk, SynthResult};
use futures::Stream;
use tokio::sync::mpsc;

use crate::worker::WorkerOutcome;

enum Slot {
    Ready(SynthResult),
    Failed,
}

/// Consumes `rx` and yields `(AudioChunk, String)` pairs in strict id order.
/// Ends when `rx` closes or the token is cancelled.
pub fn reorder_consumer(
    mut rx: mpsc::Receiver<WorkerOutcome>,
    token: StreamToken,
) -> impl Stream<Item = (AudioChunk, String)> {
    async_stream::stream! {
        let mut next_expected: u64 = 0;
        let mut pending: HashMap<u64, Slot> = HashMap::new();

        while let Some(outcome) = rx.recv().await {
            if token.is_cancelled() {
                return;
            }
            match outcome {
                WorkerOutcome::Delivered(result) => {
                    pending.insert(result.id, Slot::Ready(result));
                }
                WorkerOutcome::Failed { id } => {
                    pending.insert(id, Slot::Failed);
                }
            }

            while let Some(slot) = pending.remove(&next_expected) {
                next_expected += 1;
                if let Slot::Ready(result) = slot {
                    yield (result.chunk, result.text);
                }
            }
        }
    }
}
