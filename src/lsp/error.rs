use std::time::Duration;

use thiserror::Error;
use tower_lsp::lsp_types::Url;

use crate::files::FileError;
use crate::rpc::DecodeError;

/// Failures inside a handler. None of them produce a reply.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("document not found: {0}")]
    DocumentNotFound(Url),

    #[error("embedded file not found: {0}")]
    EmbedNotFound(String),

    #[error("not a file URI: {0}")]
    InvalidUri(Url),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

/// Terminal failure of one dispatched message
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{method} failed: {source}")]
    Handler {
        method: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error("{method} timed out after {after:?}")]
    Timeout {
        method: &'static str,
        after: Duration,
    },

    #[error("{method} task failed: {source}")]
    Task {
        method: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl DispatchError {
    /// True when the request stopped because of a client cancel, shutdown,
    /// or its deadline
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            DispatchError::Handler {
                source: HandlerError::Cancelled,
                ..
            } | DispatchError::Timeout { .. }
        )
    }
}
