#![allow(dead_code)]

use std::time::Duration;

use futures::StreamExt;
use serde_json::{Value, json};
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_util::codec::FramedRead;

use embed_lsp::rpc::{MessageCodec, encode};

pub type Reader = FramedRead<DuplexStream, MessageCodec>;

pub fn create_initialize_request(id: i64, root: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "processId": null,
            "rootUri": root,
            "capabilities": {}
        }
    })
}

pub fn create_initialized_notification() -> Value {
    json!({"jsonrpc": "2.0", "method": "initialized", "params": {}})
}

pub fn create_did_open_notification(uri: &str, text: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": {
            "textDocument": {
                "uri": uri,
                "languageId": "go",
                "version": 1,
                "text": text
            }
        }
    })
}

fn position_request(id: i64, method: &str, uri: &str, line: u32, character: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": {
            "textDocument": {"uri": uri},
            "position": {"line": line, "character": character}
        }
    })
}

pub fn create_hover_request(id: i64, uri: &str, line: u32, character: u32) -> Value {
    position_request(id, "textDocument/hover", uri, line, character)
}

pub fn create_completion_request(id: i64, uri: &str, line: u32, character: u32) -> Value {
    position_request(id, "textDocument/completion", uri, line, character)
}

pub fn create_definition_request(id: i64, uri: &str, line: u32, character: u32) -> Value {
    position_request(id, "textDocument/definition", uri, line, character)
}

pub fn create_shutdown_request(id: i64) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": "shutdown"})
}

pub fn create_exit_notification() -> Value {
    json!({"jsonrpc": "2.0", "method": "exit"})
}

/// Writes `message` as one framed message
pub async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) {
    let frame = encode(message).unwrap();
    writer.write_all(&frame).await.unwrap();
}

/// Reads the next response, skipping notifications such as `window/logMessage`
pub async fn read_response(reader: &mut Reader) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = reader.next().await.unwrap().unwrap();
            let text = std::str::from_utf8(&frame).unwrap();
            let (_, body) = text.split_once("\r\n\r\n").unwrap();
            let message: Value = serde_json::from_str(body).unwrap();
            if message.get("id").is_some() {
                return message;
            }
        }
    })
    .await
    .expect("Expected a response within 5 seconds")
}
