//! Typed requests and notifications
//!
//! Each [`Method`] has one decode function that turns a [`Message`] body into
//! the matching [`Request`] variant.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tower_lsp::jsonrpc::Id;
use tower_lsp::lsp_types::{
    CancelParams, CodeActionParams, CompletionParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    GotoDefinitionParams, HoverParams, InitializeParams, NumberOrString,
    WillSaveTextDocumentParams,
};

use crate::lsp::method::Method;
use crate::rpc::{DecodeError, Message};

/// A decoded message, tagged by method
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Initialize {
        id: Id,
        params: Box<InitializeParams>,
    },
    Initialized,
    Shutdown {
        id: Id,
    },
    Exit,
    /// Sent as a notification by most clients, but answered when it has an id
    CancelRequest {
        id: Option<Id>,
        params: CancelParams,
    },
    DidOpen(DidOpenTextDocumentParams),
    DidChange(DidChangeTextDocumentParams),
    WillSave(WillSaveTextDocumentParams),
    DidSave(DidSaveTextDocumentParams),
    DidClose(DidCloseTextDocumentParams),
    Completion {
        id: Id,
        params: CompletionParams,
    },
    Hover {
        id: Id,
        params: HoverParams,
    },
    Definition {
        id: Id,
        params: GotoDefinitionParams,
    },
    CodeAction {
        id: Id,
        params: CodeActionParams,
    },
}

type DecodeFn = fn(&Message) -> Result<Request, DecodeError>;

impl Request {
    /// Decodes `message` into the variant registered for `method`
    pub fn decode(method: Method, message: &Message) -> Result<Self, DecodeError> {
        decoder(method)(message)
    }

    pub fn method(&self) -> Method {
        match self {
            Request::Initialize { .. } => Method::Initialize,
            Request::Initialized => Method::Initialized,
            Request::Shutdown { .. } => Method::Shutdown,
            Request::Exit => Method::Exit,
            Request::CancelRequest { .. } => Method::CancelRequest,
            Request::DidOpen(_) => Method::DidOpen,
            Request::DidChange(_) => Method::DidChange,
            Request::WillSave(_) => Method::WillSave,
            Request::DidSave(_) => Method::DidSave,
            Request::DidClose(_) => Method::DidClose,
            Request::Completion { .. } => Method::Completion,
            Request::Hover { .. } => Method::Hover,
            Request::Definition { .. } => Method::Definition,
            Request::CodeAction { .. } => Method::CodeAction,
        }
    }

    /// Id of the request, `None` for notifications
    pub fn id(&self) -> Option<&Id> {
        match self {
            Request::Initialize { id, .. }
            | Request::Shutdown { id }
            | Request::Completion { id, .. }
            | Request::Hover { id, .. }
            | Request::Definition { id, .. }
            | Request::CodeAction { id, .. } => Some(id),
            Request::CancelRequest { id, .. } => id.as_ref(),
            _ => None,
        }
    }
}

fn decoder(method: Method) -> DecodeFn {
    match method {
        Method::Initialize => |m| {
            Ok(Request::Initialize {
                id: request_id(m)?,
                params: Box::new(params(m)?),
            })
        },
        Method::Initialized => |_| Ok(Request::Initialized),
        Method::Shutdown => |m| Ok(Request::Shutdown { id: request_id(m)? }),
        Method::Exit => |_| Ok(Request::Exit),
        Method::CancelRequest => |m| {
            Ok(Request::CancelRequest {
                id: m.id.clone(),
                params: params(m)?,
            })
        },
        Method::DidOpen => |m| Ok(Request::DidOpen(params(m)?)),
        Method::DidChange => |m| Ok(Request::DidChange(params(m)?)),
        Method::WillSave => |m| Ok(Request::WillSave(params(m)?)),
        Method::DidSave => |m| Ok(Request::DidSave(params(m)?)),
        Method::DidClose => |m| Ok(Request::DidClose(params(m)?)),
        Method::Completion => |m| {
            Ok(Request::Completion {
                id: request_id(m)?,
                params: params(m)?,
            })
        },
        Method::Hover => |m| {
            Ok(Request::Hover {
                id: request_id(m)?,
                params: params(m)?,
            })
        },
        Method::Definition => |m| {
            Ok(Request::Definition {
                id: request_id(m)?,
                params: params(m)?,
            })
        },
        Method::CodeAction => |m| {
            Ok(Request::CodeAction {
                id: request_id(m)?,
                params: params(m)?,
            })
        },
    }
}

#[derive(Deserialize)]
struct Body<P> {
    params: P,
}

fn params<P: DeserializeOwned>(message: &Message) -> Result<P, DecodeError> {
    serde_json::from_slice::<Body<P>>(&message.content)
        .map(|body| body.params)
        .map_err(|source| DecodeError::Params {
            method: message.method.clone(),
            source,
        })
}

fn request_id(message: &Message) -> Result<Id, DecodeError> {
    message
        .id
        .clone()
        .ok_or_else(|| DecodeError::MissingId(message.method.clone()))
}

/// Converts the id carried by `$/cancelRequest` params into a request id
pub fn cancel_target(params: &CancelParams) -> Id {
    match &params.id {
        NumberOrString::Number(n) => Id::Number(i64::from(*n)),
        NumberOrString::String(s) => Id::String(s.clone()),
    }
}
