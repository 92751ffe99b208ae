//! Deterministic, scriptable transport for offline tests.
//!
//! Replies are registered per URL fragment and consumed in order; the last
//! reply registered for a fragment is sticky and keeps being returned once
//! the queue drains. Every request is recorded for later inspection.
//! Delays use `tokio::time`, so tests running with a paused clock can
//! advance through them deterministically.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;

use crate::http_client::{
    ByteStream, HttpClient, HttpError, HttpRequest, HttpResponse, HttpStreamResponse,
};

/// One scripted body chunk, released after `delay`.
#[derive(Debug, Clone)]
pub struct ScriptedChunk {
    delay: Duration,
    item: Result<Bytes, HttpError>,
}

impl ScriptedChunk {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            delay: Duration::ZERO,
            item: Ok(Bytes::from(bytes.into())),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::bytes(text.as_bytes().to_vec())
    }

    /// A transport failure in the middle of the body.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            item: Err(HttpError::new(message)),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A scripted transport outcome.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(HttpResponse),
    Error(HttpError),
    Stream { status: u16, chunks: Vec<ScriptedChunk> },
    Delayed { delay: Duration, reply: Box<ScriptedReply> },
}

impl ScriptedReply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::Response(HttpResponse::new(status, body))
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::json(200, body)
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, format!("{{\"detail\":\"status {status}\"}}"))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(HttpError::new(message))
    }

    pub fn stream(chunks: Vec<ScriptedChunk>) -> Self {
        Self::Stream {
            status: 200,
            chunks,
        }
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed {
            delay,
            reply: Box::new(self),
        }
    }
}

#[derive(Debug)]
struct Route {
    fragment: String,
    replies: VecDeque<ScriptedReply>,
}

/// Transport that answers from a script instead of the network.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for requests whose URL contains `fragment`.
    pub fn on(&self, fragment: impl Into<String>, reply: ScriptedReply) -> &Self {
        let fragment = fragment.into();
        let mut routes = self.routes.lock().expect("scripted routes lock is not poisoned");
        match routes.iter_mut().find(|route| route.fragment == fragment) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                fragment,
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log
            .lock()
            .expect("scripted log lock is not poisoned")
            .clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn request_count(&self, fragment: &str) -> usize {
        self.log
            .lock()
            .expect("scripted log lock is not poisoned")
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> ScriptedReply {
        self.log
            .lock()
            .expect("scripted log lock is not poisoned")
            .push(request.clone());

        let mut routes = self.routes.lock().expect("scripted routes lock is not poisoned");
        let route = routes
            .iter_mut()
            .find(|route| request.url.contains(route.fragment.as_str()));

        match route {
            Some(route) if route.replies.len() > 1 => route
                .replies
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::error("scripted queue drained")),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::error("scripted queue drained")),
            None => ScriptedReply::error(format!("no scripted reply for {}", request.url)),
        }
    }
}

async fn settle(mut reply: ScriptedReply) -> ScriptedReply {
    while let ScriptedReply::Delayed { delay, reply: inner } = reply {
        tokio::time::sleep(delay).await;
        reply = *inner;
    }
    reply
}

fn chunk_stream(chunks: Vec<ScriptedChunk>) -> ByteStream {
    let body = stream::unfold(VecDeque::from(chunks), |mut pending| async move {
        let chunk = pending.pop_front()?;
        if !chunk.delay.is_zero() {
            tokio::time::sleep(chunk.delay).await;
        }
        Some((chunk.item, pending))
    });
    Box::pin(body)
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = self.next_reply(&request);
        Box::pin(async move {
            match settle(reply).await {
                ScriptedReply::Response(response) => Ok(response),
                ScriptedReply::Error(error) => Err(error),
                ScriptedReply::Stream { status, chunks } => {
                    let mut body = Vec::new();
                    for chunk in chunks {
                        tokio::time::sleep(chunk.delay).await;
                        body.extend_from_slice(&chunk.item?);
                    }
                    Ok(HttpResponse::new(
                        status,
                        String::from_utf8_lossy(&body).into_owned(),
                    ))
                }
                ScriptedReply::Delayed { .. } => unreachable!("settle unwraps every delay"),
            }
        })
    }

    fn open_stream<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpStreamResponse, HttpError>> + Send + 'a>> {
        let reply = self.next_reply(&request);
        Box::pin(async move {
            match settle(reply).await {
                ScriptedReply::Response(response) => Ok(HttpStreamResponse {
                    status: response.status,
                    body: chunk_stream(vec![ScriptedChunk::text(&response.body)]),
                }),
                ScriptedReply::Error(error) => Err(error),
                ScriptedReply::Stream { status, chunks } => Ok(HttpStreamResponse {
                    status,
                    body: chunk_stream(chunks),
                }),
                ScriptedReply::Delayed { .. } => unreachable!("settle unwraps every delay"),
            }
        })
    }
}
