//! JSON-RPC transport layer
//! - codec.rs: Content-Length framing, envelope decode, encode
//! - message.rs: Incoming envelope and outgoing message types
//! - error.rs: Framing and decode errors

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{MessageCodec, decode_message, encode};
pub use error::{CodecError, DecodeError};
pub use message::{Message, Outgoing};
