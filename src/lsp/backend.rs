use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{Id, Response};
use tower_lsp::lsp_types::*;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::files::{DiskFileSource, EmbeddableFile, FileError, FileSource};
use crate::lsp::client::Client;
use crate::lsp::error::HandlerError;
use crate::lsp::request::{Request, cancel_target};
use crate::parser::{SourceContext, SourceParser};
use crate::store::{DocumentStore, InFlightRequests};

/// What the dispatcher should do once a handler finishes
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Write this response to the client
    Respond(Response),
    /// Nothing to send (notifications)
    Silent,
    /// Stop the server
    Exit,
}

fn respond<T: Serialize>(id: Id, result: T) -> Result<Reply, HandlerError> {
    Ok(Reply::Respond(Response::from_ok(
        id,
        serde_json::to_value(result)?,
    )))
}

pub struct Backend {
    client: Client,
    config: ServerConfig,
    documents: DocumentStore,
    in_flight: InFlightRequests,
    files: Arc<dyn FileSource>,
    parser: SourceParser,
}

impl Backend {
    pub fn new(client: Client, config: ServerConfig) -> Self {
        Self::build(client, config, Arc::new(DiskFileSource::new()))
    }

    pub fn build(client: Client, config: ServerConfig, files: Arc<dyn FileSource>) -> Self {
        let parser = SourceParser::new(&config.directive);
        Self {
            client,
            config,
            documents: DocumentStore::new(),
            in_flight: InFlightRequests::new(),
            files,
            parser,
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    will_save: Some(true),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..Default::default()
                },
            )),
            completion_provider: Some(CompletionOptions::default()),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn in_flight(&self) -> &InFlightRequests {
        &self.in_flight
    }

    /// Runs the handler for `request`.
    ///
    /// `token` is cancelled by `$/cancelRequest`, shutdown, or the dispatch
    /// deadline; handlers observe it while waiting on file I/O.
    pub async fn handle(
        &self,
        request: Request,
        token: CancellationToken,
    ) -> Result<Reply, HandlerError> {
        match request {
            Request::Initialize { id, params } => self.initialize(id, *params).await,
            Request::Initialized => {
                info!("LSP server initialized");
                Ok(Reply::Silent)
            }
            Request::Shutdown { id } => self.shutdown(id).await,
            Request::Exit => Ok(self.exit()),
            Request::CancelRequest { id, params } => self.cancel_request(id, params),
            Request::DidOpen(params) => self.did_open(params).await,
            Request::DidChange(params) => Ok(self.did_change(params)),
            Request::WillSave(_) => Ok(Reply::Silent),
            Request::DidSave(params) => self.did_save(params, &token).await,
            Request::DidClose(params) => Ok(self.did_close(params)),
            Request::Completion { id, params } => self.completion(id, params, &token).await,
            Request::Hover { id, params } => self.hover(id, params, &token).await,
            Request::Definition { id, params } => self.definition(id, params, &token).await,
            Request::CodeAction { id, params } => self.code_action(id, params),
        }
    }

    async fn initialize(&self, id: Id, _params: InitializeParams) -> Result<Reply, HandlerError> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;
        respond(
            id,
            InitializeResult {
                capabilities: Self::server_capabilities(),
                server_info: Some(ServerInfo {
                    name: "embed-lsp".to_string(),
                    version: Some(env!("CARGO_PKG_VERSION").to_string()),
                }),
            },
        )
    }

    async fn shutdown(&self, id: Id) -> Result<Reply, HandlerError> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        self.in_flight.cancel_all();
        respond(id, Value::Null)
    }

    fn exit(&self) -> Reply {
        info!("Exit requested");
        self.in_flight.cancel_all();
        self.documents.clear();
        Reply::Exit
    }

    fn cancel_request(&self, id: Option<Id>, params: CancelParams) -> Result<Reply, HandlerError> {
        let target = cancel_target(&params);
        if !self.in_flight.cancel(&target) {
            debug!("No in-flight request {} to cancel", target);
        }
        match id {
            Some(id) => respond(id, Value::Null),
            None => Ok(Reply::Silent),
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) -> Result<Reply, HandlerError> {
        let uri = params.text_document.uri;
        if !self.config.tracks(uri.path()) {
            debug!("Ignoring untracked document {}", uri);
            return Ok(Reply::Silent);
        }

        self.client
            .log_message(MessageType::LOG, format!("Document opened: {}", uri))
            .await;
        self.documents.set(uri, params.text_document.text);
        Ok(Reply::Silent)
    }

    fn did_change(&self, mut params: DidChangeTextDocumentParams) -> Reply {
        let uri = params.text_document.uri;
        if !self.config.tracks(uri.path()) {
            return Reply::Silent;
        }
        // Full sync: the last change carries the whole document
        if let Some(change) = params.content_changes.pop() {
            self.documents.set(uri, change.text);
        }
        Reply::Silent
    }

    async fn did_save(
        &self,
        params: DidSaveTextDocumentParams,
        token: &CancellationToken,
    ) -> Result<Reply, HandlerError> {
        let uri = params.text_document.uri;
        if !self.config.tracks(uri.path()) {
            return Ok(Reply::Silent);
        }

        let text = match params.text {
            Some(text) => text,
            None => {
                let path = file_path(&uri)?;
                cancellable(token, self.files.read_file(&path)).await?
            }
        };
        self.documents.set(uri, text);
        Ok(Reply::Silent)
    }

    fn did_close(&self, params: DidCloseTextDocumentParams) -> Reply {
        self.documents.delete(&params.text_document.uri);
        Reply::Silent
    }

    async fn completion(
        &self,
        id: Id,
        params: CompletionParams,
        token: &CancellationToken,
    ) -> Result<Reply, HandlerError> {
        let position = params.text_document_position;
        let uri = &position.text_document.uri;
        let context = self.context_at(uri, position.position)?;
        if context == SourceContext::Unknown {
            debug!("Cursor is not in a comment, no completions");
            return respond(id, Value::Null);
        }

        let dir = document_dir(uri)?;
        let files = cancellable(token, self.files.list_files(&dir)).await?;
        let prefix = context
            .embed_path()
            .and_then(|path| path.split_whitespace().last())
            .unwrap_or_default();

        let items: Vec<CompletionItem> = files
            .into_iter()
            .filter(|file| file.name.starts_with(prefix))
            .map(|file| CompletionItem {
                label: file.name.clone(),
                kind: Some(CompletionItemKind::FILE),
                detail: Some(file.name),
                documentation: Some(Documentation::String(file.content)),
                ..Default::default()
            })
            .collect();

        respond(id, CompletionResponse::Array(items))
    }

    async fn hover(
        &self,
        id: Id,
        params: HoverParams,
        token: &CancellationToken,
    ) -> Result<Reply, HandlerError> {
        let position = params.text_document_position_params;
        let uri = &position.text_document.uri;
        let context = self.context_at(uri, position.position)?;
        let Some(embed) = context.embed_path() else {
            return respond(id, Value::Null);
        };

        let dir = document_dir(uri)?;
        let files = cancellable(token, self.files.list_files(&dir)).await?;
        let file = find_embed(&files, embed)
            .ok_or_else(|| HandlerError::EmbedNotFound(embed.to_string()))?;
        debug!("Hovering embedded file {}", file.name);

        respond(
            id,
            Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::PlainText,
                    value: file.content.clone(),
                }),
                range: None,
            },
        )
    }

    async fn definition(
        &self,
        id: Id,
        params: GotoDefinitionParams,
        token: &CancellationToken,
    ) -> Result<Reply, HandlerError> {
        let position = params.text_document_position_params;
        let uri = &position.text_document.uri;
        let context = self.context_at(uri, position.position)?;
        let Some(embed) = context.embed_path() else {
            return respond(id, Value::Null);
        };

        let dir = document_dir(uri)?;
        let files = cancellable(token, self.files.list_files(&dir)).await?;
        let Some(file) = find_embed(&files, embed) else {
            return respond(id, Value::Null);
        };

        let target = Url::from_file_path(dir.join(&file.name))
            .map_err(|_| HandlerError::InvalidUri(uri.clone()))?;
        respond(
            id,
            GotoDefinitionResponse::Scalar(Location {
                uri: target,
                range: Range::default(),
            }),
        )
    }

    fn code_action(&self, id: Id, _params: CodeActionParams) -> Result<Reply, HandlerError> {
        let actions: CodeActionResponse = Vec::new();
        respond(id, actions)
    }

    fn context_at(&self, uri: &Url, position: Position) -> Result<SourceContext, HandlerError> {
        let text = self
            .documents
            .get(uri)
            .ok_or_else(|| HandlerError::DocumentNotFound(uri.clone()))?;
        Ok(self.parser.parse_position(Some(&text), position))
    }
}

/// Awaits `future` unless `token` is cancelled first
async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T, HandlerError>
where
    F: Future<Output = Result<T, FileError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(HandlerError::Cancelled),
        result = future => result.map_err(HandlerError::from),
    }
}

fn file_path(uri: &Url) -> Result<PathBuf, HandlerError> {
    uri.to_file_path()
        .map_err(|_| HandlerError::InvalidUri(uri.clone()))
}

fn document_dir(uri: &Url) -> Result<PathBuf, HandlerError> {
    file_path(uri)?
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| HandlerError::InvalidUri(uri.clone()))
}

/// Finds the file an embed directive refers to.
///
/// Each whitespace-separated pattern is tried in order; an exact name match
/// wins over a name that merely ends with the pattern.
fn find_embed<'a>(files: &'a [EmbeddableFile], embed: &str) -> Option<&'a EmbeddableFile> {
    embed.split_whitespace().find_map(|pattern| {
        files
            .iter()
            .find(|file| file.name == pattern)
            .or_else(|| files.iter().find(|file| file.name.ends_with(pattern)))
    })
}
