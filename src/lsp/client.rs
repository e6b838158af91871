//! Handle for writing to the client

use std::sync::Arc;

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;
use tower_lsp::jsonrpc::Response;
use tower_lsp::lsp_types::{LogMessageParams, MessageType};
use tracing::warn;

use crate::rpc::{CodecError, MessageCodec, Outgoing};

type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, MessageCodec>;

/// Cloneable handle to the single output stream.
///
/// Each message is encoded and flushed while holding the lock, so frames from
/// concurrently finishing handlers never interleave.
#[derive(Clone)]
pub struct Client {
    writer: Arc<Mutex<Writer>>,
}

impl Client {
    pub fn new<W>(output: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let output: Box<dyn AsyncWrite + Send + Unpin> = Box::new(output);
        Self {
            writer: Arc::new(Mutex::new(FramedWrite::new(output, MessageCodec::new()))),
        }
    }

    /// Writes one framed message
    pub async fn send(&self, message: Outgoing) -> Result<(), CodecError> {
        let mut writer = self.writer.lock().await;
        writer.send(message).await
    }

    pub async fn respond(&self, response: Response) -> Result<(), CodecError> {
        self.send(Outgoing::Response(response)).await
    }

    /// Sends a `window/logMessage` notification. Failures are only logged.
    pub async fn log_message(&self, typ: MessageType, message: impl Into<String>) {
        let params = LogMessageParams {
            typ,
            message: message.into(),
        };
        let notification = match serde_json::to_value(params) {
            Ok(params) => Outgoing::notification("window/logMessage", params),
            Err(e) => {
                warn!("Failed to serialize log message: {}", e);
                return;
            }
        };
        if let Err(e) = self.send(notification).await {
            warn!("Failed to send log message: {}", e);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::{Value, json};
    use tokio_util::codec::FramedRead;
    use tower_lsp::jsonrpc::Id;

    fn body(frame: &[u8]) -> Value {
        let text = std::str::from_utf8(frame).unwrap();
        let (_, body) = text.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn concurrent_sends_produce_whole_frames() {
        let (output, input) = tokio::io::duplex(64);
        let client = Client::new(output);
        let mut reader = FramedRead::new(input, MessageCodec::new());

        let senders: Vec<_> = (0..20i64)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let result = json!({"contents": "x".repeat(100 + i as usize)});
                    client.respond(Response::from_ok(Id::Number(i), result)).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for _ in 0..20 {
            let frame = reader.next().await.unwrap().unwrap();
            ids.push(body(&frame)["id"].as_i64().unwrap());
        }
        for sender in senders {
            sender.await.unwrap().unwrap();
        }

        ids.sort();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn log_message_writes_notification() {
        let (output, input) = tokio::io::duplex(1024);
        let client = Client::new(output);
        let mut reader = FramedRead::new(input, MessageCodec::new());

        client.log_message(MessageType::INFO, "hello").await;

        let message = body(&reader.next().await.unwrap().unwrap());
        assert_eq!(message["method"], "window/logMessage");
        assert_eq!(message["params"]["message"], "hello");
        assert!(message.get("id").is_none());
    }
}
