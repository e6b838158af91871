pub mod config;
pub mod files;
pub mod log;
pub mod lsp;
pub mod parser;
pub mod rpc;
pub mod store;
