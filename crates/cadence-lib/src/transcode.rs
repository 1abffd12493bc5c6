//! Format conversion between what an engine produced and what the pipeline
//! promised its caller.
//!
//! Shells out to `ffmpeg` via `tokio::process::Command` with piped stdio,
//! spawned per call rather than held open.

use async_trait::async_trait;
use cadence_core::types::{AudioChunk, AudioSpec, Codec};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("no converter available for {from} -> {to}")]
    Unsupported { from: &'static str, to: &'static str },
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("ffmpeg is not installed or not on PATH")]
    FfmpegUnavailable,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Converts `chunk` to `target`'s format. Implementations should treat a
    /// chunk that already matches `target` as a no-op, though callers
    /// (the worker pool) skip the call entirely in that case.
    async fn convert(&self, chunk: AudioChunk, target: &AudioSpec) -> anyhow::Result<AudioChunk>;
}

/// Converts via an external `ffmpeg` process, reading the source chunk on
/// stdin and the converted chunk off stdout.
pub struct FfmpegTranscoder {
    binary: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegTranscoder {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn ffmpeg_format(spec: &AudioSpec) -> Option<&'static str> {
        match (spec.codec, spec.sample_width) {
            (Codec::Pcm, Some(16)) => Some("s16le"),
            (Codec::Pcm, Some(8)) => Some("u8"),
            (Codec::Pcm, Some(32)) => Some("s32le"),
            (Codec::Mp3, _) => Some("mp3"),
            (Codec::Opus, _) => Some("opus"),
            _ => None,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, chunk: AudioChunk, target: &AudioSpec) -> anyhow::Result<AudioChunk> {
        if chunk.spec == *target {
            return Ok(chunk);
        }

        let Some(in_fmt) = Self::ffmpeg_format(&chunk.spec) else {
            return Err(TranscodeError::Unsupported {
                from: chunk.spec.codec.as_str(),
                to: target.codec.as_str(),
            }
            .into());
        };
        let Some(out_fmt) = Self::ffmpeg_format(target) else {
            return Err(TranscodeError::Unsupported {
                from: chunk.spec.codec.as_str(),
                to: target.codec.as_str(),
            }
            .into());
        };

        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        args.push("-f".into());
        args.push(in_fmt.into());
        if chunk.spec.codec == Codec::Pcm {
            args.push("-ar".into());
            args.push(chunk.spec.sample_rate.to_string());
            args.push("-ac".into());
            args.push(chunk.spec.channels.to_string());
        }
        args.push("-i".into());
        args.push("pipe:0".into());
        args.push("-f".into());
        args.push(out_fmt.into());
        if target.codec == Codec::Pcm {
            args.push("-ar".into());
            args.push(target.sample_rate.to_string());
            args.push("-ac".into());
            args.push(target.channels.to_string());
        }
        args.push("pipe:1".into());

        debug!("ffmpeg: converting {} -> {}", in_fmt, out_fmt);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|_| TranscodeError::FfmpegUnavailable)?;

        let mut stdin = child.stdin.take().expect("piped stdin");
        let data = chunk.data.clone();
        let write_task = tokio::spawn(async move {
            let _ = stdin.write_all(&data).await;
        });

        let output = child.wait_with_output().await.map_err(|e| TranscodeError::Ffmpeg(e.to_string()))?;
        let _ = write_task.await;

        if !output.status.success() {
            warn!("ffmpeg exited with {}", output.status);
            return Err(TranscodeError::Ffmpeg(String::from_utf8_lossy(&output.stderr).into_owned()).into());
        }

        Ok(AudioChunk::new(output.stdout, target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffmpeg_format_pcm16() {
        let spec = AudioSpec::pcm(16_000, 1, 16);
        assert_eq!(FfmpegTranscoder::ffmpeg_format(&spec), Some("s16le"));
    }

    #[test]
    fn ffmpeg_format_unsupported_pcm_width() {
        let spec = AudioSpec::pcm(16_000, 1, 24);
        assert_eq!(FfmpegTranscoder::ffmpeg_format(&spec), None);
    }

    #[tokio::test]
    async fn convert_is_noop_when_spec_already_matches() {
        let transcoder = FfmpegTranscoder::default();
        let spec = AudioSpec::pcm(16_000, 1, 16);
        let chunk = AudioChunk::new(vec![1, 2, 3, 4], spec.clone());
        let result = transcoder.convert(chunk.clone(), &spec).await.unwrap();
        assert_eq!(result, chunk);
    }
}
