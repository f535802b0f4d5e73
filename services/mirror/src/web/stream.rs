//! services/mirror/src/web/stream.rs
//!
//! Simulates a token-by-token AI reply as an event stream.
//!
//! A producer task writes one `data:` record per word into a bounded channel,
//! pausing between words. Chunk k is only scheduled after chunk k-1 has been
//! enqueued. The stream ends when the producer drops its sender. Dropping the
//! consumer side cancels the producer, so no task outlives its reader.

use crate::web::protocol::ChatChunk;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
#[cfg(test)]
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Splits a reply into chunks: the first word bare, every later word with a
/// leading space, so the chunks concatenate back to the reply.
pub fn word_chunks(text: &str) -> Vec<String> {
    text.split(' ')
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
        .collect()
}

/// Formats one event-stream record.
pub fn event_record(content: &str) -> Bytes {
    let chunk = ChatChunk {
        content: content.to_string(),
    };
    // Serializing a struct of one string field cannot fail.
    let json = serde_json::to_string(&chunk).unwrap_or_default();
    Bytes::from(format!("data: {}\n\n", json))
}

/// The consumer side of a simulated reply.
pub struct ChunkStream {
    rx: mpsc::Receiver<Bytes>,
    _guard: DropGuard,
    #[cfg(test)]
    token: CancellationToken,
    #[cfg(test)]
    producer: Option<JoinHandle<()>>,
}

impl ChunkStream {
    /// Starts producing `text` word by word, `delay` apart.
    pub fn spawn(text: &str, delay: Duration) -> Self {
        let chunks = word_chunks(text);
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let producer_token = token.clone();

        let producer = tokio::spawn(async move {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if i > 0 {
                    tokio::select! {
                        _ = producer_token.cancelled() => {
                            debug!(sent = i, "Chat stream cancelled.");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                tokio::select! {
                    _ = producer_token.cancelled() => {
                        debug!(sent = i, "Chat stream cancelled.");
                        return;
                    }
                    sent = tx.send(event_record(&chunk)) => {
                        if sent.is_err() {
                            debug!(sent = i, "Chat stream reader went away.");
                            return;
                        }
                    }
                }
            }
            // Dropping `tx` closes the channel.
        });

        // The producer runs detached; the drop guard is what stops it.
        #[cfg(not(test))]
        drop(producer);

        Self {
            rx,
            _guard: token.clone().drop_guard(),
            #[cfg(test)]
            token,
            #[cfg(test)]
            producer: Some(producer),
        }
    }

    /// The next record, or `None` once the reply is complete.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Hands out the producer's handle so tests can await its exit.
    #[cfg(test)]
    pub fn take_producer(&mut self) -> Option<JoinHandle<()>> {
        self.producer.take()
    }

    /// Wraps the stream as a response body. Dropping the body cancels the producer.
    pub fn into_body(self) -> Body {
        let mut this = self;
        Body::from_stream(async_stream::stream! {
            while let Some(record) = this.next_chunk().await {
                yield Ok::<_, Infallible>(record);
            }
        })
    }
}

/// A 200 event-stream response carrying `stream`.
pub fn event_stream_response(stream: ChunkStream) -> Response {
    let mut response = Response::new(stream.into_body());
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(record: &Bytes) -> String {
        let text = std::str::from_utf8(record).unwrap();
        let json = text.strip_prefix("data: ").unwrap().strip_suffix("\n\n").unwrap();
        serde_json::from_str::<ChatChunk>(json).unwrap().content
    }

    #[test]
    fn chunks_concatenate_to_the_reply() {
        let reply = "Please sign in to use Trick AI!";
        let chunks = word_chunks(reply);
        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0], "Please");
        assert_eq!(chunks[1], " sign");
        assert_eq!(chunks.concat(), reply);
    }

    #[test]
    fn records_are_event_stream_data_lines() {
        assert_eq!(event_record("hi"), Bytes::from("data: {\"content\":\"hi\"}\n\n"));
    }

    #[tokio::test]
    async fn stream_delivers_every_word_in_order_then_closes() {
        let mut stream = ChunkStream::spawn("one two three", Duration::from_millis(1));
        let mut received = Vec::new();
        while let Some(record) = stream.next_chunk().await {
            received.push(content(&record));
        }
        assert_eq!(received, vec!["one", " two", " three"]);
        assert!(stream.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_reader_stops_the_producer() {
        let words = vec!["word"; 500].join(" ");
        let mut stream = ChunkStream::spawn(&words, Duration::from_millis(20));
        let token = stream.cancellation_token();
        let producer = stream.take_producer().unwrap();

        assert!(stream.next_chunk().await.is_some());
        drop(stream);

        assert!(token.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .expect("producer should exit promptly")
            .unwrap();
    }
}
