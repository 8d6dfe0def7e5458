//! docindex-text
//!
//! Tantivy-backed typed-field document index: the field type registry and
//! document codec on the write path, the index lifecycle (handles, writers,
//! point-in-time readers), structured query construction, and ranked,
//! cursor-paginated search on the read path.

pub mod codec;
pub mod collector;
pub mod index;
pub mod query;
pub mod registry;
pub mod search;
pub mod tantivy_utils;

pub use codec::{encode_fresh, to_value_map, FieldSet};
pub use collector::Interrupt;
pub use index::{IndexHandle, Location, OpenMode, Reader, Writer};
pub use query::{as_filter, ClauseArg, ConstructionPolicy, Filter, Occur, Query, QueryBuilder};
pub use registry::{FieldInstance, FieldType};
pub use search::{search, SearchRequest};
pub use tantivy_utils::AnalyzerConfig;
