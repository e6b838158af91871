//! Routes decoded messages to the backend under a deadline

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Id;
use tracing::{debug, warn};

use crate::lsp::backend::{Backend, Reply};
use crate::lsp::error::DispatchError;
use crate::lsp::method::Method;
use crate::lsp::request::Request;
use crate::rpc::Message;
use crate::store::Registration;

pub struct Dispatcher {
    backend: Arc<Backend>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(backend: Arc<Backend>) -> Self {
        let timeout = backend.config().request_timeout;
        Self { backend, timeout }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    /// Decodes `message` and prepares it to run.
    ///
    /// The deadline starts now, and cancellable requests are registered in
    /// the in-flight table before this returns, so a `$/cancelRequest` read
    /// after this message always finds it.
    pub fn begin(&self, message: Message) -> Result<Job, DispatchError> {
        let method: Method = message
            .method
            .parse()
            .map_err(|_| DispatchError::UnknownMethod(message.method.clone()))?;
        let request = Request::decode(method, &message)?;
        let token = CancellationToken::new();

        let registration = match request.id() {
            Some(id) if method.is_cancellable() => {
                let registration = self.backend.in_flight().register(id.clone(), token.clone());
                if registration.is_none() {
                    warn!("Request id {} is already in flight, it cannot be cancelled", id);
                }
                registration
            }
            _ => None,
        };

        debug!("Dispatching {}", method);
        Ok(Job {
            backend: Arc::clone(&self.backend),
            request,
            token,
            registration,
            deadline: Instant::now() + self.timeout,
            timeout: self.timeout,
        })
    }

    /// Decodes and runs `message` to completion
    pub async fn dispatch(&self, message: Message) -> Result<Reply, DispatchError> {
        self.begin(message)?.run().await
    }
}

/// A decoded message waiting to run
pub struct Job {
    backend: Arc<Backend>,
    request: Request,
    token: CancellationToken,
    registration: Option<Registration>,
    deadline: Instant,
    timeout: Duration,
}

impl Job {
    pub fn method(&self) -> Method {
        self.request.method()
    }

    /// Id to answer, `None` for notifications
    pub fn id(&self) -> Option<&Id> {
        self.request.id()
    }

    /// Runs the handler on its own task until it finishes or the deadline
    /// passes. On timeout the handler is cancelled and aborted.
    pub async fn run(self) -> Result<Reply, DispatchError> {
        let Job {
            backend,
            request,
            token,
            registration,
            deadline,
            timeout,
        } = self;
        let method = request.method().as_str();

        let handler_token = token.clone();
        let mut handle =
            tokio::spawn(async move { backend.handle(request, handler_token).await });

        let result = match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(result)) => result.map_err(|source| DispatchError::Handler { method, source }),
            Ok(Err(source)) => Err(DispatchError::Task { method, source }),
            Err(_) => {
                token.cancel();
                handle.abort();
                Err(DispatchError::Timeout {
                    method,
                    after: timeout,
                })
            }
        };

        drop(registration);
        result
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("method", &self.method())
            .field("id", &self.id())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
