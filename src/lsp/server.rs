use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinSet;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::log::init;
use crate::lsp::backend::{Backend, Reply};
use crate::lsp::client::Client;
use crate::lsp::dispatcher::Dispatcher;
use crate::lsp::error::DispatchError;
use crate::rpc::{CodecError, MessageCodec, decode_message};

/// Reads framed messages from `input` and writes replies to `output`
pub struct Server<I, O> {
    input: I,
    output: O,
}

impl<I, O> Server<I, O>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    /// Serves until the input closes or an `exit` notification arrives.
    ///
    /// Requests run on their own tasks so a slow handler never blocks the
    /// reader. Notifications run inline, in arrival order.
    pub async fn serve<F>(self, build: F) -> Result<(), CodecError>
    where
        F: FnOnce(Client) -> Backend,
    {
        let client = Client::new(self.output);
        let backend = Arc::new(build(client.clone()));
        let dispatcher = Dispatcher::new(Arc::clone(&backend));
        let mut reader = FramedRead::new(self.input, MessageCodec::new());
        let mut requests = JoinSet::new();

        let result = loop {
            let frame = match reader.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break Err(e),
                None => {
                    debug!("Input closed");
                    break Ok(());
                }
            };
            while requests.try_join_next().is_some() {}

            let message = match decode_message(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Dropping malformed message: {}", e);
                    continue;
                }
            };
            let job = match dispatcher.begin(message) {
                Ok(job) => job,
                Err(e) => {
                    report(e);
                    continue;
                }
            };

            if job.id().is_some() {
                let client = client.clone();
                requests.spawn(async move {
                    match job.run().await {
                        Ok(reply) => deliver(&client, reply).await,
                        Err(e) => report(e),
                    }
                });
                continue;
            }

            match job.run().await {
                Ok(Reply::Exit) => break Ok(()),
                Ok(reply) => deliver(&client, reply).await,
                Err(e) => report(e),
            }
        };

        backend.in_flight().cancel_all();
        requests.shutdown().await;
        result
    }
}

async fn deliver(client: &Client, reply: Reply) {
    match reply {
        Reply::Respond(response) => {
            if let Err(e) = client.respond(response).await {
                error!("Failed to write response: {}", e);
            }
        }
        Reply::Silent => {}
        Reply::Exit => warn!("Ignoring exit sent as a request"),
    }
}

/// Failed messages get no reply; the failure is only logged
fn report(error: DispatchError) {
    if error.is_cancellation() {
        debug!("{}", error);
    } else {
        warn!("{}", error);
    }
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let _guard = init(&config)?;

    info!("Starting embed-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    Server::new(stdin, stdout)
        .serve(|client| Backend::new(client, config))
        .await?;

    info!("embed-lsp server stopped");
    Ok(())
}
