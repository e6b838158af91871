// LSP protocol layer
// - server.rs: Read loop, request tasks, shutdown
// - dispatcher.rs: Method routing, cancellation registration, deadlines
// - backend.rs: Handlers and shared server state
// - request.rs / method.rs: Typed messages and the supported method set
// - client.rs: Serialized writes to the client

pub mod backend;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod method;
pub mod request;
pub mod server;
