//! cadence-lib — Streaming text-to-speech pipeline.
//!
//! `input → Segmenter → segment channel → worker pool → result channel →
//! reorder consumer → caller`. See [`pipeline::Pipeline`] for the entry
//! point. Depends on `cadence-core` for the pure types and text processing
//! the segmenter and worker pool build on.

pub mod engine;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod registry;
pub mod reorder;
pub mod segmenter;
pub mod transcode;
pub mod worker;

pub use cadence_core;
