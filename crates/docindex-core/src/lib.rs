//! docindex-core
//!
//! Engine-independent building blocks: field kinds and schemas, typed values,
//! search results and cursors, the error taxonomy, configuration loading, and
//! the document-source contract used by upstream collaborators.

pub mod config;
pub mod error;
pub mod source;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
