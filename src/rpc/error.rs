use thiserror::Error;

/// Errors raised while turning a frame into a [`Message`](crate::rpc::Message)
/// or a typed request.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Missing Content-Length header")]
    MissingContentLength,

    #[error("Invalid content length: {0}")]
    InvalidContentLength(String),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Body length mismatch: header declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decode ({method}) failed: {source}")]
    Params {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request ({0}) has no id")]
    MissingId(String),
}

/// Errors surfaced by [`MessageCodec`](crate::rpc::MessageCodec) to the
/// framed reader and writer.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize message: {0}")]
    Encode(#[from] serde_json::Error),
}
