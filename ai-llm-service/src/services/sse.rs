//! Server-sent-events decoding for OpenAI-compatible streamed completions.
//!
//! Upstream sends `data: {json}\n\n` frames and finishes with `data: [DONE]`.
//! Frames may be split across network chunks at any byte, including inside a
//! multi-byte UTF-8 sequence, so lines are assembled from raw bytes first.

use std::{collections::VecDeque, fmt::Display, time::Duration};

use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    completion::TokenStream,
    config::llm_provider::LlmProvider,
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
};

/// One decoded SSE event relevant to chat streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental line decoder. Feed raw chunks, collect complete events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(ev) = decode_line(&line) {
                out.push(ev);
            }
        }
        out
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    // comments (`: keep-alive`), `event:`/`id:` fields and blank separators
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        Some(SseEvent::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

/// Extracts `choices[0].delta.content` from one data frame.
///
/// `Ok(None)` for frames without text (role announcements, finish markers).
pub fn parse_delta(data: &str) -> Result<Option<String>, ProviderErrorKind> {
    let payload: ChunkPayload = serde_json::from_str(data).map_err(|e| {
        ProviderErrorKind::Decode(format!("serde error: {e}; expected `choices[0].delta`"))
    })?;
    if let Some(err) = payload.error {
        return Err(ProviderErrorKind::Stream(err.message));
    }
    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|s| !s.is_empty()))
}

struct DeltaState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, AiLlmError>>,
    finished: bool,
    provider: LlmProvider,
    idle: Duration,
}

impl<S> DeltaState<S> {
    /// Queues the outcome of `events`; returns `true` once the stream is over.
    fn absorb(&mut self, events: Vec<SseEvent>) -> bool {
        for ev in events {
            match ev {
                SseEvent::Done => return true,
                SseEvent::Data(data) => match parse_delta(&data) {
                    Ok(Some(text)) => self.pending.push_back(Ok(text)),
                    Ok(None) => {}
                    Err(kind) => {
                        warn!(provider = %self.provider, error = %kind, "completion stream frame rejected");
                        self.pending
                            .push_back(Err(ProviderError::new(self.provider, kind).into()));
                        return true;
                    }
                },
            }
        }
        false
    }
}

/// Turns a raw SSE byte stream into a [`TokenStream`] of content deltas.
///
/// Every delta is yielded as soon as its frame is complete; nothing is merged.
/// A transport failure, an upstream error frame or no bytes for `idle` ends
/// the stream with `Err`.
pub fn delta_stream<S, B, E>(provider: LlmProvider, bytes: S, idle: Duration) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DeltaState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
        provider,
        idle,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            let next = match tokio::time::timeout(st.idle, st.bytes.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(provider = %st.provider, idle_ms = st.idle.as_millis(), "completion stream stalled");
                    st.finished = true;
                    let kind = ProviderErrorKind::Stream("idle timeout".into());
                    st.pending
                        .push_back(Err(ProviderError::new(st.provider, kind).into()));
                    continue;
                }
            };
            match next {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.finished = st.absorb(events);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    let kind = ProviderErrorKind::Stream(e.to_string());
                    st.pending
                        .push_back(Err(ProviderError::new(st.provider, kind).into()));
                }
                None => {
                    debug!(provider = %st.provider, "completion body ended");
                    let tail = st.decoder.finish().into_iter().collect();
                    st.absorb(tail);
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}
