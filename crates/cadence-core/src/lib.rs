//! cadence-core — Pure types and text processing for the cadence streaming
//! TTS pipeline.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod text_prep;
pub mod token;
pub mod types;
