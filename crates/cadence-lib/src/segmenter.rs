//! Incremental text segmentation.
//!
//! Accumulates incoming text fragments into a buffer and emits `Segment`s
//! once the buffer holds enough tokens to be worth synthesizing, cutting at
//! the best available separator. Tier detection itself is hand-rolled (see
//! `cadence_core::text_prep`) since Rust's `regex` crate has no lookaround.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::text_prep::{clean_text_for_tts, count_tokens, decode, encode, tier1_matches, tier2_matches};
use cadence_core::token::StreamToken;
use cadence_core::types::Segment;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::input::Input;

/// Ratio of `max_tokens` at which Tier-2 (soft) separators are considered,
/// even though `min_tokens` hasn't been reached by a Tier-1 cut.
const SOFT_BREAK_RATIO: f64 = 0.8;

/// A hook run on cleaned segment text before publication, e.g. to inject
/// SSML or per-segment metadata. Must tolerate being skipped on empty input;
/// the segmenter never calls it on an empty string.
pub type PreHook = Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct SegmenterConfig {
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub timeout_ms: u64,
    pub pre_hook: Option<PreHook>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_tokens: 10,
            max_tokens: 50,
            timeout_ms: 800,
            pre_hook: None,
        }
    }
}

pub struct Segmenter {
    buf: String,
    next_id: u64,
    tx: mpsc::Sender<Segment>,
    config: SegmenterConfig,
    token: StreamToken,
}

impl Segmenter {
    pub fn new(tx: mpsc::Sender<Segment>, config: SegmenterConfig, token: StreamToken) -> Self {
        Self {
            buf: String::new(),
            next_id: 0,
            tx,
            config,
            token,
        }
    }

    /// Drives `input` to completion: feeds fragments into the buffer,
    /// segments eagerly, and flushes whatever remains once the input is
    /// exhausted. Returns early, without flushing further, if the token is
    /// cancelled or the downstream channel closes.
    pub async fn run(mut self, input: Input) {
        match input {
            Input::Text(text) => {
                if self.token.is_cancelled() {
                    return;
                }
                if !self.process_chunk(&text).await {
                    return;
                }
            }
            Input::Iter(iter) => {
                for fragment in iter {
                    if self.token.is_cancelled() {
                        return;
                    }
                    if !self.process_chunk(&fragment).await {
                        return;
                    }
                }
            }
            Input::Stream(mut stream) => {
                let timeout = Duration::from_millis(self.config.timeout_ms.max(1));
                loop {
                    if self.token.is_cancelled() {
                        return;
                    }
                    match tokio::time::timeout(timeout, stream.next()).await {
                        Ok(Some(fragment)) => {
                            if !self.process_chunk(&fragment).await {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(_) => {
                            if !self.flush().await {
                                return;
                            }
                        }
                    }
                }
            }
        }
        self.flush().await;
    }

    /// Appends `text` to the buffer and segments as much as is ready.
    /// Returns `false` if the downstream channel closed, signalling the
    /// caller to stop driving more input.
    async fn process_chunk(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return true;
        }
        self.buf.push_str(text);
        self.check_and_segment().await
    }

    async fn check_and_segment(&mut self) -> bool {
        loop {
            if self.buf.trim().is_empty() {
                return true;
            }
            let tokens = count_tokens(&self.buf);

            if tokens >= self.config.max_tokens {
                match self.cut_at_token_boundary().await {
                    Some(keep_going) => {
                        if !keep_going {
                            return false;
                        }
                        continue;
                    }
                    None => return true,
                }
            }

            if tokens >= self.config.min_tokens {
                if let Some(end) = self.find_break(tier1_matches(&self.buf)) {
                    if !self.cut_and_emit(end).await {
                        return false;
                    }
                    if count_tokens(&self.buf) >= self.config.min_tokens {
                        continue;
                    }
                    return true;
                }
            }

            if tokens as f64 >= self.config.max_tokens as f64 * SOFT_BREAK_RATIO {
                if let Some(end) = self.find_break(tier2_matches(&self.buf)) {
                    if !self.cut_and_emit(end).await {
                        return false;
                    }
                    if count_tokens(&self.buf) >= self.config.min_tokens {
                        continue;
                    }
                    return true;
                }
            }

            return true;
        }
    }

    /// Finds the earliest candidate end-offset whose prefix already carries
    /// at least `min_tokens`. Candidates earlier than that are too small a
    /// segment to be worth emitting on their own.
    fn find_break(&self, candidates: Vec<usize>) -> Option<usize> {
        for end in candidates {
            if count_tokens(&self.buf[..end]) >= self.config.min_tokens {
                return Some(end);
            }
        }
        None
    }

    async fn cut_and_emit(&mut self, end: usize) -> bool {
        let text = self.buf[..end].to_string();
        self.buf.replace_range(..end, "");
        self.emit(text).await
    }

    /// The buffer has reached `max_tokens` with no acceptable separator cut
    /// yet found by the caller. Searches backward, on token boundaries, for
    /// the largest prefix (down to `min_tokens`) whose text contains a
    /// separator; failing that, the largest prefix that ends on a whitespace
    /// boundary; failing that, a hard cut at `max_tokens`.
    ///
    /// Returns `None` if nothing was emitted (buffer below `max_tokens`,
    /// shouldn't happen given the caller's guard, kept defensive), `Some(ok)`
    /// otherwise where `ok` mirrors whether the downstream channel is still
    /// open.
    async fn cut_at_token_boundary(&mut self) -> Option<bool> {
        let tokens = encode(&self.buf);
        if tokens.len() < self.config.max_tokens {
            return None;
        }
        let max_search = self.config.max_tokens.min(tokens.len());
        let min_search = self.config.min_tokens.min(max_search);

        let mut cut = None;
        let mut i = max_search;
        while i > min_search {
            let candidate = decode(&tokens[..i]);
            if !tier1_matches(&candidate).is_empty() || !tier2_matches(&candidate).is_empty() {
                cut = Some(i);
                break;
            }
            i -= 1;
        }

        if cut.is_none() {
            let mut i = max_search;
            while i > min_search {
                let candidate = decode(&tokens[..i]);
                if candidate.ends_with(char::is_whitespace) {
                    cut = Some(i);
                    break;
                }
                i -= 1;
            }
        }

        let cut = cut.unwrap_or(max_search);
        debug!("segmenter: forced token-boundary cut at {cut} tokens");
        let text = decode(&tokens[..cut]);
        self.buf = decode(&tokens[cut..]);
        Some(self.emit(text).await)
    }

    async fn flush(&mut self) -> bool {
        if self.buf.trim().is_empty() {
            return true;
        }
        let text = std::mem::take(&mut self.buf);
        self.emit(text).await
    }

    async fn emit(&mut self, text: String) -> bool {
        let cleaned = clean_text_for_tts(&text);
        let final_text = match &self.config.pre_hook {
            Some(hook) if !cleaned.is_empty() => (hook)(cleaned).await,
            _ => cleaned,
        };
        if final_text.trim().is_empty() {
            return true;
        }
        let segment = Segment {
            id: self.next_id,
            text: final_text,
        };
        debug!("segmenter: emitting segment {}", segment.id);
        self.next_id += 1;
        self.tx.send(segment).await.is_ok()
    }
}
