//! Supported LSP methods

use std::fmt;
use std::str::FromStr;

/// Closed set of methods the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Initialized,
    Shutdown,
    Exit,
    CancelRequest,
    DidOpen,
    DidChange,
    WillSave,
    DidSave,
    DidClose,
    Completion,
    Hover,
    Definition,
    CodeAction,
}

impl Method {
    pub const ALL: [Method; 14] = [
        Method::Initialize,
        Method::Initialized,
        Method::Shutdown,
        Method::Exit,
        Method::CancelRequest,
        Method::DidOpen,
        Method::DidChange,
        Method::WillSave,
        Method::DidSave,
        Method::DidClose,
        Method::Completion,
        Method::Hover,
        Method::Definition,
        Method::CodeAction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::Initialized => "initialized",
            Method::Shutdown => "shutdown",
            Method::Exit => "exit",
            Method::CancelRequest => "$/cancelRequest",
            Method::DidOpen => "textDocument/didOpen",
            Method::DidChange => "textDocument/didChange",
            Method::WillSave => "textDocument/willSave",
            Method::DidSave => "textDocument/didSave",
            Method::DidClose => "textDocument/didClose",
            Method::Completion => "textDocument/completion",
            Method::Hover => "textDocument/hover",
            Method::Definition => "textDocument/definition",
            Method::CodeAction => "textDocument/codeAction",
        }
    }

    /// Methods whose handlers do file I/O and can be cancelled by the client
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            Method::Completion | Method::Hover | Method::Definition | Method::CodeAction
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
