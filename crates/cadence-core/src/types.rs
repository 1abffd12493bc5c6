//! Shared value types for the cadence streaming TTS pipeline.
//!
//! Kept dependency-light (no tokio, no async runtime) so downstream crates
//! can depend on the data model without pulling in the pipeline itself.

/// A numbered unit of text produced by the segmenter.
///
/// `id` is assigned in strict publication order starting from 0; ids form a
/// contiguous prefix for a single `stream()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: u64,
    pub text: String,
}

/// Audio codec tag. Closed set for the codecs this pipeline's collaborators
/// (engine, transcoder) are expected to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Pcm,
    Mp3,
    Opus,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Pcm => "pcm",
            Codec::Mp3 => "mp3",
            Codec::Opus => "opus",
        }
    }
}

/// Audio format specification. Structurally compared, immutable.
///
/// `sample_width` is `Some` iff `codec == Codec::Pcm` — enforced by
/// construction rather than validated after the fact: build one through
/// [`AudioSpec::pcm`] or [`AudioSpec::compressed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpec {
    pub codec: Codec,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: Option<u16>,
}

impl AudioSpec {
    /// A PCM spec; `sample_width` is bits per sample (e.g. 16).
    pub fn pcm(sample_rate: u32, channels: u16, sample_width: u16) -> Self {
        Self {
            codec: Codec::Pcm,
            sample_rate,
            channels,
            sample_width: Some(sample_width),
        }
    }

    /// A compressed (non-PCM) spec — `sample_width` doesn't apply.
    pub fn compressed(codec: Codec, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(codec != Codec::Pcm, "use AudioSpec::pcm for PCM specs");
        Self {
            codec,
            sample_rate,
            channels,
            sample_width: None,
        }
    }

    /// The pipeline's default output spec: 16 kHz mono 16-bit PCM.
    pub fn default_output() -> Self {
        Self::pcm(16_000, 1, 16)
    }
}

/// Opaque audio data tagged with the format it's in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub data: Vec<u8>,
    pub spec: AudioSpec,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>, spec: AudioSpec) -> Self {
        Self { data, spec }
    }
}

/// A synthesized segment, en route from a worker to the reorder consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthResult {
    pub id: u64,
    pub chunk: AudioChunk,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_spec_has_sample_width() {
        let spec = AudioSpec::pcm(16_000, 1, 16);
        assert_eq!(spec.sample_width, Some(16));
    }

    #[test]
    fn compressed_spec_has_no_sample_width() {
        let spec = AudioSpec::compressed(Codec::Mp3, 24_000, 1);
        assert_eq!(spec.sample_width, None);
    }

    #[test]
    fn audio_spec_structural_equality() {
        let a = AudioSpec::pcm(16_000, 1, 16);
        let b = AudioSpec::pcm(16_000, 1, 16);
        let c = AudioSpec::pcm(24_000, 1, 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn default_output_is_16k_mono_16bit_pcm() {
        let spec = AudioSpec::default_output();
        assert_eq!(spec, AudioSpec::pcm(16_000, 1, 16));
    }
}
