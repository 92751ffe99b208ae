//! # Live Stream Reader
//!
//! Pulls a generated artifact from `GET /live-stream/?file_type=<format>` and
//! exposes it as an ordered, append-only sequence of text chunks.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Utf8Decoder`] | Incremental decoder carrying split code points across chunks |
//! | [`ChunkReader`] | Pull-based reader turning a byte body into [`StreamChunk`]s |
//! | [`StreamReader`] | Owns the shared buffer; one active read at a time |
//! | [`StreamHandle`] | Caller's view of one started read |
//!
//! Starting a read resets the buffer synchronously and bumps its generation.
//! A read only appends while its generation is current, so a superseded read
//! that is still draining its body never leaks into the newer buffer.
//!
//! ```rust,ignore
//! let reader = StreamReader::new(Arc::new(ReqwestHttpClient::new()), &ApiConfig::default());
//! let mut handle = reader.start(StreamSelector::Stream { format: StreamFormat::Csv });
//! while let Some(chunk) = handle.next().await {
//!     print!("{}", chunk.as_text());
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{ApiConfig, ApiEndpoints};
use crate::error::{StreamError, ValidationError};
use crate::http_client::{ByteStream, HttpClient, HttpRequest};

/// Encoding requested from the live-stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Csv,
    Json,
}

impl StreamFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(ValidationError::InvalidStreamFormat {
                value: value.to_owned(),
            }),
        }
    }
}

/// What a read pulls from.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSelector {
    /// Live body from the backend.
    Stream { format: StreamFormat },
    /// Data already in hand; rendered as pretty JSON without touching the network.
    Snapshot { data: Value },
}

/// One element of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    /// Terminal failure. `message` is the display rendering.
    Error { message: String, cause: StreamError },
}

impl StreamChunk {
    fn failure(format: StreamFormat, cause: StreamError) -> Self {
        Self::Error {
            message: format!("Error loading {format} data: {cause}"),
            cause,
        }
    }

    /// Display text; error chunks render their formatted message.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Error { message, .. } => message,
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Incremental UTF-8 decoder.
///
/// A code point split across chunk boundaries is held back until its
/// remaining bytes arrive. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buffer = std::mem::take(&mut self.pending);
        buffer.extend_from_slice(bytes);

        let mut decoded = String::with_capacity(buffer.len());
        let mut start = 0;
        while start < buffer.len() {
            match std::str::from_utf8(&buffer[start..]) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    start = buffer.len();
                }
                Err(error) => {
                    let valid_end = start + error.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&buffer[start..valid_end]));
                    match error.error_len() {
                        Some(invalid) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid;
                        }
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.pending = buffer[valid_end..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        decoded
    }

    /// Flushes the decoder at end of body. A dangling partial sequence
    /// becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Pulls decoded chunks out of a streamed body, one per non-empty fragment.
pub struct ChunkReader {
    format: StreamFormat,
    body: Option<ByteStream>,
    decoder: Utf8Decoder,
    deferred: Option<StreamChunk>,
}

impl ChunkReader {
    pub fn new(format: StreamFormat, body: ByteStream) -> Self {
        Self {
            format,
            body: Some(body),
            decoder: Utf8Decoder::new(),
            deferred: None,
        }
    }

    /// Next chunk, or `None` once the body is exhausted. A transport failure
    /// yields one error chunk and ends the sequence.
    pub async fn next(&mut self) -> Option<StreamChunk> {
        if let Some(chunk) = self.deferred.take() {
            return Some(chunk);
        }

        loop {
            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(bytes)) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Some(StreamChunk::Text(text));
                    }
                }
                Some(Err(error)) => {
                    self.body = None;
                    let failure = StreamChunk::failure(self.format, StreamError::Interrupted(error));
                    let tail = self.decoder.finish();
                    if tail.is_empty() {
                        return Some(failure);
                    }
                    self.deferred = Some(failure);
                    return Some(StreamChunk::Text(tail));
                }
                None => {
                    self.body = None;
                    let tail = self.decoder.finish();
                    return (!tail.is_empty()).then_some(StreamChunk::Text(tail));
                }
            }
        }
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("format", &self.format)
            .field("exhausted", &self.body.is_none())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct StreamBuffer {
    generation: u64,
    chunks: Vec<StreamChunk>,
}

/// Appends on behalf of one read, only while that read is current.
struct ChunkSink {
    buffer: Arc<Mutex<StreamBuffer>>,
    generation: u64,
    sender: mpsc::UnboundedSender<StreamChunk>,
}

impl ChunkSink {
    /// Returns false once the read has been superseded.
    fn push(&self, chunk: StreamChunk) -> bool {
        let mut buffer = lock_buffer(&self.buffer);
        if buffer.generation != self.generation {
            return false;
        }
        buffer.chunks.push(chunk.clone());
        // The caller may have dropped its handle; the buffer still records the chunk.
        let _ = self.sender.send(chunk);
        true
    }
}

fn lock_buffer(buffer: &Mutex<StreamBuffer>) -> MutexGuard<'_, StreamBuffer> {
    buffer.lock().expect("stream buffer lock is not poisoned")
}

/// Owns the stream buffer and starts reads into it.
#[derive(Clone)]
pub struct StreamReader {
    client: Arc<dyn HttpClient>,
    endpoints: ApiEndpoints,
    buffer: Arc<Mutex<StreamBuffer>>,
}

impl StreamReader {
    pub fn new(client: Arc<dyn HttpClient>, config: &ApiConfig) -> Self {
        Self::with_endpoints(client, config.endpoints())
    }

    pub fn with_endpoints(client: Arc<dyn HttpClient>, endpoints: ApiEndpoints) -> Self {
        Self {
            client,
            endpoints,
            buffer: Arc::new(Mutex::new(StreamBuffer::default())),
        }
    }

    /// Starts a read, replacing whatever the buffer held.
    ///
    /// The buffer is empty when this returns. Live reads run on a spawned
    /// task, so this must be called from within a tokio runtime.
    pub fn start(&self, selector: StreamSelector) -> StreamHandle {
        let generation = {
            let mut buffer = lock_buffer(&self.buffer);
            buffer.generation += 1;
            buffer.chunks.clear();
            buffer.generation
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = ChunkSink {
            buffer: Arc::clone(&self.buffer),
            generation,
            sender,
        };

        let task = match selector {
            StreamSelector::Snapshot { data } => {
                let rendered = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
                sink.push(StreamChunk::Text(rendered));
                None
            }
            StreamSelector::Stream { format } => {
                debug!(generation, %format, "starting live stream read");
                Some(tokio::spawn(read_live(
                    Arc::clone(&self.client),
                    self.endpoints.live_stream(format),
                    format,
                    sink,
                )))
            }
        };

        StreamHandle {
            generation,
            receiver,
            task,
        }
    }

    /// Chunks accepted for the current read so far.
    pub fn chunks(&self) -> Vec<StreamChunk> {
        lock_buffer(&self.buffer).chunks.clone()
    }

    /// Concatenated display text of the current buffer.
    pub fn text(&self) -> String {
        lock_buffer(&self.buffer)
            .chunks
            .iter()
            .map(StreamChunk::as_text)
            .collect()
    }

    pub fn generation(&self) -> u64 {
        lock_buffer(&self.buffer).generation
    }
}

async fn read_live(client: Arc<dyn HttpClient>, url: String, format: StreamFormat, sink: ChunkSink) {
    let request = HttpRequest::get(url).without_timeout();
    let response = match client.open_stream(request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%format, %error, "live stream connection failed");
            sink.push(StreamChunk::failure(format, StreamError::Connect(error)));
            return;
        }
    };

    if !response.is_success() {
        warn!(%format, status = response.status, "live stream request rejected");
        sink.push(StreamChunk::failure(
            format,
            StreamError::Open {
                status_code: response.status,
            },
        ));
        return;
    }

    let mut reader = ChunkReader::new(format, response.body);
    let mut accepted = 0usize;
    while let Some(chunk) = reader.next().await {
        if chunk.is_error() {
            warn!(%format, message = chunk.as_text(), "live stream interrupted");
        } else {
            debug!(%format, bytes = chunk.as_text().len(), "stream chunk");
        }
        if !sink.push(chunk) {
            debug!(generation = sink.generation, "read superseded, dropping body");
            return;
        }
        accepted += 1;
    }
    debug!(generation = sink.generation, chunks = accepted, "live stream finished");
}

/// One started read. Yields the chunks the buffer accepted for it, in order.
#[derive(Debug)]
pub struct StreamHandle {
    generation: u64,
    receiver: mpsc::UnboundedReceiver<StreamChunk>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next accepted chunk, or `None` when the read has ended or was superseded.
    pub async fn next(&mut self) -> Option<StreamChunk> {
        self.receiver.recv().await
    }

    /// Drains the read to completion.
    pub async fn collect(mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next().await {
            chunks.push(chunk);
        }
        chunks
    }

    /// Waits for the background read, if any, to stop.
    pub async fn finished(self) {
        if let Some(task) = self.task {
            if let Err(error) = task.await {
                warn!(generation = self.generation, %error, "stream task ended abnormally");
            }
        }
    }
}
