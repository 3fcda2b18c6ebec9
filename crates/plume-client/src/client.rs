//! HTTP client for the inference service

use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::lines::LineDecoder;
use crate::record::{StreamRecord, classify_line};
use crate::types::ChatRequest;

/// Fallback display name when the identity lookup fails
const DEFAULT_USER_NAME: &str = "user";

/// A stream of classified records decoded from one turn's response body
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<StreamRecord>> + Send>>;

/// Client for the inference service's chat endpoint
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a turn and open the NDJSON record stream for its reply.
    ///
    /// A non-success status fails the turn immediately, carrying the status
    /// and the endpoint. Transport failures mid-stream surface as an `Err`
    /// item on the returned stream.
    pub async fn send(&self, request: &ChatRequest) -> Result<RecordStream> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(%url, messages = request.messages.len(), "submitting turn");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status });
        }

        let bytes = response.bytes_stream().map({
            let url = url.clone();
            move |chunk| {
                chunk.map_err(|source| Error::Transport {
                    url: url.clone(),
                    source,
                })
            }
        });
        Ok(Box::pin(decode_records(bytes)))
    }

    /// Resolve the display name for the session.
    ///
    /// The service has answered with `USER`, `user`, or `name` depending on
    /// its configuration; the first string found wins. Any failure falls
    /// back to a generic name, since identity is cosmetic here.
    pub async fn fetch_user_name(&self) -> String {
        let url = format!("{}/api/user", self.base_url);
        let response = match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => return DEFAULT_USER_NAME.to_string(),
        };
        let Ok(value) = response.json::<serde_json::Value>().await else {
            return DEFAULT_USER_NAME.to_string();
        };
        ["USER", "user", "name"]
            .iter()
            .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
            .unwrap_or(DEFAULT_USER_NAME)
            .to_string()
    }
}

/// Decode a chunked body into classified records.
///
/// Generic over the chunk stream so tests can drive it with hand-built
/// chunk sequences; the classified output is invariant under how the bytes
/// were split into chunks. An error item ends the stream.
fn decode_records<S, B, E>(bytes: S) -> impl Stream<Item = std::result::Result<StreamRecord, E>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Send,
{
    stream! {
        futures::pin_mut!(bytes);
        let mut decoder = LineDecoder::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in decoder.push(chunk.as_ref()) {
                        for record in classify_line(&line) {
                            yield Ok(record);
                        }
                    }
                }
                Err(error) => {
                    yield Err(error);
                    return;
                }
            }
        }
        // any unterminated residue is discarded with the decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_chunks(chunks: Vec<&'static [u8]>) -> Vec<StreamRecord> {
        let bytes = futures::stream::iter(
            chunks.into_iter().map(Ok::<_, String>),
        );
        decode_records(bytes)
            .map(|item| item.expect("no errors in this fixture"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_chunk_boundary_invariance() {
        let body: &[u8] = b"{\"prompt_eval_count\":3}\n{\"message\":{\"content\":\"hi\",\"thinking\":\"\"}}\n{\"done\":true}\n";

        let whole = decode_chunks(vec![body]).await;
        assert!(whole.contains(&StreamRecord::Completion));

        for split in 1..body.len() {
            let parts = vec![&body[..split], &body[split..]];
            assert_eq!(decode_chunks(parts).await, whole, "split at {split}");
        }
    }

    #[tokio::test]
    async fn test_one_line_can_yield_several_records() {
        let records =
            decode_chunks(vec![b"{\"message\":{\"content\":\"A\"},\"done\":true}\n" as &[u8]]).await;
        assert_eq!(
            records,
            vec![
                StreamRecord::Delta {
                    content: Some("A".to_string()),
                    reasoning: None
                },
                StreamRecord::Completion,
            ]
        );
    }

    #[tokio::test]
    async fn test_error_item_ends_the_stream() {
        let bytes = futures::stream::iter(vec![
            Ok::<&[u8], String>(b"{\"content\":\"x\"}\n"),
            Err("connection reset".to_string()),
            Ok(b"{\"done\":true}\n"),
        ]);
        let items: Vec<_> = decode_records(bytes).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err(), "connection reset");
    }

    #[tokio::test]
    async fn test_trailing_residue_discarded() {
        let records = decode_chunks(vec![
            b"{\"content\":\"x\"}\n{\"done\":true}\n{\"trunc" as &[u8],
        ])
        .await;
        assert_eq!(records.len(), 2);
    }
}
