//! Parser layer
//! - source.rs: Cursor line classification and embed directive extraction

pub mod source;

pub use source::{SourceContext, SourceParser};
