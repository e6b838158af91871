//! LSP message framing
//!
//! Every message on the wire is a header block followed by a JSON body:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <body>
//! ```
//!
//! [`split`] finds frame boundaries in a growing buffer, [`decode_message`]
//! turns one frame into a [`Message`], and [`encode`] produces the framed bytes
//! for anything the server writes. [`MessageCodec`] wires these into
//! `tokio_util`'s framed reader and writer.

use bytes::{Buf, Bytes, BytesMut};
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::rpc::error::{CodecError, DecodeError};
use crate::rpc::message::{Envelope, Message, Outgoing};

/// Separator between the header block and the body
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const CONTENT_LENGTH: &str = "Content-Length";

/// Largest body the server will buffer (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Largest unterminated header block kept while waiting for `\r\n\r\n`
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

/// Result of looking for one frame at the front of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// The header is incomplete or the body has not fully arrived
    NeedMore,
    /// One frame of `len` bytes starts the buffer
    Frame {
        len: usize,
        /// Declared body bytes that were not buffered and must be dropped as
        /// they arrive (oversized messages only)
        discard: usize,
    },
}

/// Finds the first frame in `buf` without consuming anything.
///
/// A frame is returned only when the full declared body is present and never
/// extends past `header + Content-Length`. Bytes that do not start a valid
/// header (for example the tail of an undersized body) are returned as a
/// garbage frame reaching up to the next `Content-Length`, so the caller can
/// report them and pick up the following message.
pub fn split(buf: &[u8]) -> Split {
    let Some(header_end) = find_header_end(buf) else {
        if buf.len() > MAX_HEADER_SIZE {
            // Keep a tail that could still grow into a header name
            let len = find_content_length(buf, 1)
                .unwrap_or(buf.len() + 1 - CONTENT_LENGTH.len());
            return Split::Frame { len, discard: 0 };
        }
        return Split::NeedMore;
    };
    let body_start = header_end + HEADER_TERMINATOR.len();

    let Ok(declared) = parse_content_length(&buf[..header_end]) else {
        let len = find_content_length(buf, 1).unwrap_or(body_start);
        return Split::Frame { len, discard: 0 };
    };

    if declared > MAX_MESSAGE_SIZE {
        return Split::Frame {
            len: body_start,
            discard: declared,
        };
    }

    let available = buf.len() - body_start;
    if available < declared {
        trace!(
            "Incomplete frame - need {} more bytes",
            declared - available
        );
        return Split::NeedMore;
    }

    Split::Frame {
        len: body_start + declared,
        discard: 0,
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Offset of the first `Content-Length` (any case) at or after `from`
fn find_content_length(buf: &[u8], from: usize) -> Option<usize> {
    let name = CONTENT_LENGTH.as_bytes();
    buf.get(from..)?
        .windows(name.len())
        .position(|window| window.eq_ignore_ascii_case(name))
        .map(|position| position + from)
}

/// Parses the `Content-Length` value out of a header block (without the
/// terminating blank line).
///
/// Other headers such as `Content-Type` are ignored.
pub fn parse_content_length(header: &[u8]) -> Result<usize, DecodeError> {
    let header = std::str::from_utf8(header)
        .map_err(|e| DecodeError::MalformedHeader(format!("header is not UTF-8: {}", e)))?;

    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            return Err(DecodeError::MalformedHeader(line.to_string()));
        };
        if !name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        let value = value.trim();
        let length = value
            .parse::<usize>()
            .map_err(|_| DecodeError::InvalidContentLength(value.to_string()))?;
        return Ok(length);
    }

    Err(DecodeError::MissingContentLength)
}

/// Decodes one frame produced by [`split`].
///
/// The header is validated again on its own, so a frame that reached this
/// point through a resynchronisation is rejected here rather than trusted.
pub fn decode_message(frame: &[u8]) -> Result<Message, DecodeError> {
    let header_end = find_header_end(frame)
        .ok_or_else(|| DecodeError::MalformedHeader("missing header terminator".to_string()))?;
    let declared = parse_content_length(&frame[..header_end])?;
    if declared > MAX_MESSAGE_SIZE {
        return Err(DecodeError::MessageTooLarge {
            size: declared,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let body = &frame[header_end + HEADER_TERMINATOR.len()..];
    if body.len() != declared {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    let envelope: Envelope = serde_json::from_slice(body)?;
    debug!("read msg [{}] ({})", declared, envelope.method);

    Ok(Message {
        method: envelope.method,
        id: envelope.id,
        content: Bytes::copy_from_slice(body),
    })
}

/// Serializes `message` to compact JSON and prefixes the `Content-Length`
/// header computed from the exact body length.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    let body = serde_json::to_vec(message)?;
    let header = format!("{}: {}\r\n\r\n", CONTENT_LENGTH, body.len());

    let mut framed = Vec::with_capacity(header.len() + body.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// `tokio_util` codec over [`split`] and [`encode`].
///
/// Decoding yields raw frames; turning them into [`Message`]s is left to the
/// read loop so a bad frame is reported without ending the stream.
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Body bytes of an oversized frame still to be dropped
    discard: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for MessageCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.discard > 0 {
            let dropped = self.discard.min(src.len());
            src.advance(dropped);
            self.discard -= dropped;
            if self.discard > 0 {
                return Ok(None);
            }
        }

        match split(src) {
            Split::NeedMore => Ok(None),
            Split::Frame { len, discard } => {
                if discard > 0 {
                    warn!("Dropping oversized message body of {} bytes", discard);
                }
                self.discard = discard;
                Ok(Some(src.split_to(len).freeze()))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            warn!("Input closed inside a message, dropping {} bytes", src.len());
            src.clear();
        }
        self.discard = 0;
        Ok(None)
    }
}

impl Encoder<Outgoing> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Outgoing, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let framed = encode(&item)?;
        debug!("wrote msg [{}] ({})", framed.len(), item.describe());
        dst.extend_from_slice(&framed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use tower_lsp::jsonrpc::{Id, Request, Response};

    fn frame(body: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
    }

    #[test]
    fn split_returns_exact_frame_and_leaves_next_frame_untouched() {
        let first = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let second = r#"{"jsonrpc":"2.0","method":"exit"}"#;
        let mut buf = frame(first);
        buf.extend_from_slice(&frame(second));

        let Split::Frame { len, discard } = split(&buf) else {
            panic!("expected a frame");
        };

        assert_eq!(discard, 0);
        assert_eq!(&buf[..len], frame(first).as_slice());
        assert_eq!(split(&buf[len..]), Split::Frame { len: frame(second).len(), discard: 0 });
    }

    #[rstest]
    #[case::empty("")]
    #[case::partial_header("Content-Length: 10\r\n")]
    #[case::partial_body("Content-Length: 10\r\n\r\n{\"a\":")]
    fn split_needs_more_until_declared_body_arrives(#[case] input: &str) {
        assert_eq!(split(input.as_bytes()), Split::NeedMore);
    }

    #[test]
    fn split_isolates_header_without_content_length() {
        let input = b"Content-Type: application/json\r\n\r\n{}";

        assert_eq!(split(input), Split::Frame { len: 34, discard: 0 });
    }

    #[test]
    fn split_stops_garbage_frame_at_next_content_length() {
        let input = b"a\":1}Content-Length: 2\r\n\r\n{}";

        assert_eq!(split(input), Split::Frame { len: 5, discard: 0 });
        assert_eq!(split(&input[5..]), Split::Frame { len: 23, discard: 0 });
    }

    #[test]
    fn split_flushes_long_garbage_but_keeps_possible_header_start() {
        let mut input = vec![b'x'; MAX_HEADER_SIZE + 1];
        input.extend_from_slice(b"Content-Le");

        let Split::Frame { len, discard: 0 } = split(&input) else {
            panic!("expected a garbage frame");
        };

        assert_eq!(len, input.len() + 1 - CONTENT_LENGTH.len());
        assert!(input[len..].ends_with(b"Content-Le"));
    }

    #[test]
    fn split_discards_oversized_body() {
        let input = format!("Content-Length: {}\r\n\r\n", MAX_MESSAGE_SIZE + 1);

        assert_eq!(
            split(input.as_bytes()),
            Split::Frame {
                len: input.len(),
                discard: MAX_MESSAGE_SIZE + 1
            }
        );
    }

    #[rstest]
    #[case::plain("Content-Length: 42", 42)]
    #[case::lowercase("content-length:7", 7)]
    #[case::extra_headers("Content-Type: application/vscode-jsonrpc\r\nContent-Length: 3", 3)]
    fn parse_content_length_reads_value(#[case] header: &str, #[case] expected: usize) {
        assert_eq!(parse_content_length(header.as_bytes()).unwrap(), expected);
    }

    #[test]
    fn parse_content_length_rejects_non_numeric_value() {
        let result = parse_content_length(b"Content-Length: invalid");

        assert!(matches!(result, Err(DecodeError::InvalidContentLength(v)) if v == "invalid"));
    }

    #[test]
    fn parse_content_length_rejects_header_without_colon() {
        let result = parse_content_length(b"garbage");

        assert!(matches!(result, Err(DecodeError::MalformedHeader(_))));
    }

    #[test]
    fn decode_message_recovers_method_id_and_body() {
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"textDocument/hover","params":{}}"#;

        let message = decode_message(&frame(body)).unwrap();

        assert_eq!(message.method, "textDocument/hover");
        assert_eq!(message.id, Some(Id::Number(7)));
        assert_eq!(message.content.as_ref(), body.as_bytes());
        assert!(!message.is_notification());
    }

    #[test]
    fn decode_message_treats_missing_id_as_notification() {
        let message = decode_message(&frame(r#"{"jsonrpc":"2.0","method":"initialized"}"#)).unwrap();

        assert!(message.is_notification());
    }

    #[test]
    fn decode_message_rejects_invalid_json() {
        let result = decode_message(&frame("{not json}"));

        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn decode_message_rejects_missing_method() {
        let result = decode_message(&frame(r#"{"jsonrpc":"2.0","id":1,"result":null}"#));

        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn decode_message_rejects_length_mismatch() {
        let result = decode_message(b"Content-Length: 10\r\n\r\n{}");

        assert!(matches!(
            result,
            Err(DecodeError::LengthMismatch {
                declared: 10,
                actual: 2
            })
        ));
    }

    #[test]
    fn decode_message_rejects_missing_content_length() {
        let result = decode_message(b"Content-Type: application/json\r\n\r\n");

        assert!(matches!(result, Err(DecodeError::MissingContentLength)));
    }

    #[test]
    fn encode_prefixes_exact_body_length() {
        let response = Response::from_ok(Id::Number(1), json!({"contents": "<b>é</b>"}));

        let framed = encode(&response).unwrap();

        let text = String::from_utf8(framed).unwrap();
        let (header, body) = text.split_once("\r\n\r\n").unwrap();
        assert_eq!(header, format!("Content-Length: {}", body.len()));
        assert!(body.contains("<b>é</b>"));
        assert!(!body.ends_with('\n'));
    }

    #[test]
    fn encoded_request_decodes_to_same_envelope() {
        let request = Request::build("textDocument/completion")
            .id(3i64)
            .params(json!({"textDocument": {"uri": "file:///a.go"}}))
            .finish();

        let message = decode_message(&encode(&request).unwrap()).unwrap();

        assert_eq!(message.method, "textDocument/completion");
        assert_eq!(message.id, Some(Id::Number(3)));
        let body: serde_json::Value = serde_json::from_slice(&message.content).unwrap();
        assert_eq!(body["params"]["textDocument"]["uri"], "file:///a.go");
    }

    #[test]
    fn decoder_yields_same_frame_for_byte_by_byte_input() {
        let framed = frame(r#"{"jsonrpc":"2.0","id":"abc","method":"shutdown"}"#);
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();

        for byte in &framed {
            buf.extend_from_slice(&[*byte]);
            if let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), framed.as_slice());
        assert!(buf.is_empty());
    }

    #[test]
    fn decoder_resynchronises_after_oversized_frame() {
        let oversized = MAX_MESSAGE_SIZE + 4;
        let next = frame(r#"{"jsonrpc":"2.0","method":"initialized"}"#);
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(format!("Content-Length: {}\r\n\r\n", oversized).as_bytes());

        let rejected = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(
            decode_message(&rejected),
            Err(DecodeError::MessageTooLarge { .. })
        ));

        buf.extend_from_slice(&vec![b'x'; oversized - 4]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"xxxx");
        buf.extend_from_slice(&next);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_message(&frame).unwrap().method, "initialized");
    }

    #[test]
    fn decoder_resynchronises_after_undersized_frame() {
        let mut buf = BytesMut::from(&b"Content-Length: 2\r\n\r\n{\"a\":1}"[..]);
        for id in 1..=3 {
            buf.extend_from_slice(&frame(&format!(
                r#"{{"jsonrpc":"2.0","id":{},"method":"shutdown"}}"#,
                id
            )));
        }
        let mut codec = MessageCodec::new();

        let mut ids = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).unwrap() {
            if let Ok(message) = decode_message(&frame) {
                ids.push(message.id);
            }
        }

        assert_eq!(
            ids,
            vec![Some(Id::Number(1)), Some(Id::Number(2)), Some(Id::Number(3))]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_eof_drops_partial_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"Content-Length: 50\r\n\r\n{\"jsonrpc\""[..]);

        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn encoder_writes_framed_notification() {
        let mut codec = MessageCodec::new();
        let mut dst = BytesMut::new();

        codec
            .encode(
                Outgoing::notification("window/logMessage", json!({"type": 4, "message": "hi"})),
                &mut dst,
            )
            .unwrap();

        let message = decode_message(&dst).unwrap();
        assert_eq!(message.method, "window/logMessage");
        assert!(message.is_notification());
    }
}
