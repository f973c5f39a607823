//! Decoder for the backend's `data: <json>\n\n` command streams.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::runtime::LiveToken;

pub const DATA_PREFIX: &str = "data:";
const RECORD_BOUNDARY: &[u8] = b"\n\n";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Cmd {
        cmd: String,
    },
    JsonLine(Value),
    TextLine(String),
    StderrText(Value),
    StderrLine(Value),
    Done {
        #[serde(default)]
        exit_code: Option<i64>,
        #[serde(default)]
        ok: bool,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cmd { .. } => "cmd",
            Self::JsonLine(_) => "json_line",
            Self::TextLine(_) => "text_line",
            Self::StderrText(_) => "stderr_text",
            Self::StderrLine(_) => "stderr_line",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Incremental record splitter. Bytes are buffered until a blank line closes a
/// record, so chunk boundaries may fall anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    dropped: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every event completed by it, in wire order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend(chunk.iter().filter(|byte| **byte != b'\r'));
        let mut events = Vec::new();
        while let Some(end) = find_boundary(&self.buffer) {
            let record: Vec<u8> = self.buffer.drain(..end + RECORD_BOUNDARY.len()).collect();
            let body = record.get(..end).unwrap_or_default();
            match parse_record(body) {
                Some(event) => events.push(event),
                None => {
                    self.dropped += 1;
                    tracing::trace!(
                        record = %String::from_utf8_lossy(body),
                        "dropping unrecognised stream record"
                    );
                }
            }
        }
        events
    }

    /// Bytes of an unfinished record still waiting for its boundary.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(RECORD_BOUNDARY.len())
        .position(|window| window == RECORD_BOUNDARY)
}

fn parse_record(body: &[u8]) -> Option<StreamEvent> {
    let text = std::str::from_utf8(body).ok()?;
    let payload: String = text
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect::<Vec<_>>()
        .join("\n");
    if payload.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&payload).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { delivered: usize },
    /// The page went away; the remaining body was not read.
    Abandoned,
}

/// Reads `chunks` to the end, delivering decoded events in order. Stops early,
/// dropping the reader, once `live` is revoked.
pub async fn pump<S, E>(
    mut chunks: S,
    live: &LiveToken,
    on_event: &mut dyn FnMut(StreamEvent),
) -> Result<StreamOutcome, E>
where
    S: Stream<Item = Result<Vec<u8>, E>> + Unpin,
{
    let mut decoder = SseDecoder::new();
    let mut delivered = 0;
    while let Some(chunk) = chunks.next().await {
        if !live.is_live() {
            return Ok(StreamOutcome::Abandoned);
        }
        for event in decoder.feed(&chunk?) {
            if !live.is_live() {
                return Ok(StreamOutcome::Abandoned);
            }
            on_event(event);
            delivered += 1;
        }
    }
    if decoder.pending() > 0 {
        tracing::trace!(bytes = decoder.pending(), "stream ended mid-record");
    }
    Ok(StreamOutcome::Completed { delivered })
}
