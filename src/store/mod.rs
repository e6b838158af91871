//! Shared state touched by concurrently running handlers
//! - documents.rs: Open document text keyed by URI
//! - in_flight.rs: Cancellation tokens keyed by request id

pub mod documents;
pub mod in_flight;

pub use documents::DocumentStore;
pub use in_flight::{InFlightRequests, Registration};
