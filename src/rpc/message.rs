//! JSON-RPC envelopes read from and written to the wire

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp::jsonrpc::{Id, Request, Response};

/// Minimal parse of an incoming message.
///
/// Only `method` and `id` are read up front; the raw body is retained so the
/// dispatcher can decode `params` into the shape the method expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub method: String,
    /// Present for requests, absent for notifications
    pub id: Option<Id>,
    pub content: Bytes,
}

impl Message {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Fields every envelope must carry before typed decoding
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub method: String,
    pub id: Option<Id>,
}

/// A message the server writes to the client
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Response(Response),
    Notification(Request),
}

impl Outgoing {
    /// Builds a notification with the given method and params
    pub fn notification(method: &'static str, params: Value) -> Self {
        Outgoing::Notification(Request::build(method).params(params).finish())
    }

    /// Short description used in log lines
    pub fn describe(&self) -> String {
        match self {
            Outgoing::Response(response) => format!("response {}", response.id()),
            Outgoing::Notification(request) => format!("notification {}", request.method()),
        }
    }
}

impl From<Response> for Outgoing {
    fn from(response: Response) -> Self {
        Outgoing::Response(response)
    }
}
